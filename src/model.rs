//! Output records.
//!
//! Field order is the JSON field order. Empty collections, empty strings and
//! `None` are omitted from the output.

use serde::{Deserialize, Serialize};

/// Tag put on a sense that has no definition text.
pub const NO_GLOSS_TAG: &str = "no-gloss";

/// One lexical entry: one (word, language, part of speech).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub word: String,
    pub lang: String,
    pub lang_code: String,
    pub pos: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pos_title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub senses: Vec<Sense>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
    /// Counting words used with a noun (`ตัว` for animals).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifiers: Vec<String>,

    // Linkages, one list per kind
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub antonyms: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hypernyms: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hyponyms: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compounds: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proverbs: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub idioms: Vec<Linkage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anagrams: Vec<Linkage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<Translation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descendants: Vec<Descendant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sounds: Vec<Sound>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hyphenation: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etymology_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Entry {
    /// The language-level record every entry of one language block starts from.
    pub fn base(word: &str, lang: &str, lang_code: &str) -> Self {
        Entry {
            word: word.to_string(),
            lang: lang.to_string(),
            lang_code: lang_code.to_string(),
            pos: "unknown".to_string(),
            ..Default::default()
        }
    }

    pub fn linkages(&self, kind: LinkageKind) -> &[Linkage] {
        match kind {
            LinkageKind::Synonyms => &self.synonyms,
            LinkageKind::Antonyms => &self.antonyms,
            LinkageKind::Hypernyms => &self.hypernyms,
            LinkageKind::Hyponyms => &self.hyponyms,
            LinkageKind::Derived => &self.derived,
            LinkageKind::Related => &self.related,
            LinkageKind::Compounds => &self.compounds,
            LinkageKind::Proverbs => &self.proverbs,
            LinkageKind::Idioms => &self.idioms,
            LinkageKind::Anagrams => &self.anagrams,
        }
    }

    pub fn linkages_mut(&mut self, kind: LinkageKind) -> &mut Vec<Linkage> {
        match kind {
            LinkageKind::Synonyms => &mut self.synonyms,
            LinkageKind::Antonyms => &mut self.antonyms,
            LinkageKind::Hypernyms => &mut self.hypernyms,
            LinkageKind::Hyponyms => &mut self.hyponyms,
            LinkageKind::Derived => &mut self.derived,
            LinkageKind::Related => &mut self.related,
            LinkageKind::Compounds => &mut self.compounds,
            LinkageKind::Proverbs => &mut self.proverbs,
            LinkageKind::Idioms => &mut self.idioms,
            LinkageKind::Anagrams => &mut self.anagrams,
        }
    }

    pub fn add_category(&mut self, category: &str) {
        push_unique(&mut self.categories, category);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageKind {
    Synonyms,
    Antonyms,
    Hypernyms,
    Hyponyms,
    Derived,
    Related,
    Compounds,
    Proverbs,
    Idioms,
    Anagrams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glosses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense_index: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl Sense {
    pub fn no_gloss() -> Self {
        Sense {
            tags: vec![NO_GLOSS_TAG.to_string()],
            ..Default::default()
        }
    }

    pub fn is_no_gloss(&self) -> bool {
        self.tags.iter().chain(&self.raw_tags).any(|t| t == NO_GLOSS_TAG)
    }

    /// Last gloss fragment, used as the `sense` of linkages found under it.
    pub fn last_gloss(&self) -> &str {
        self.glosses.last().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub translation: String,
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub roman: String,
}

impl Example {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.translation.is_empty() && self.reference.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linkage {
    pub word: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense_index: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub roman: String,
}

impl Linkage {
    pub fn new(word: impl Into<String>) -> Self {
        Linkage {
            word: word.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub form: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense_index: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub lang: String,
    pub lang_code: String,
    pub word: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub roman: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense_index: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
}

/// A word in another language derived from this one. Nested descendants form a tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Descendant {
    pub lang: String,
    pub lang_code: String,
    pub word: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub roman: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sense: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descendants: Vec<Descendant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ipa: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub audio: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rhymes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tags: Vec<String>,
}

pub(crate) fn push_unique(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let mut entry = Entry::base("kucing", "Bahasa Melayu", "ms");
        entry.senses.push(Sense::no_gloss());
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"word":"kucing","lang":"Bahasa Melayu","lang_code":"ms","pos":"unknown","senses":[{"tags":["no-gloss"]}]}"#
        );
    }

    #[test]
    fn example_reference_serialises_as_ref() {
        let example = Example {
            text: "a".into(),
            reference: "b".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&example).unwrap();
        assert_eq!(json, r#"{"text":"a","ref":"b"}"#);
    }

    #[test]
    fn linkage_lists_by_kind() {
        let mut entry = Entry::default();
        entry.linkages_mut(LinkageKind::Proverbs).push(Linkage::new("x"));
        assert_eq!(entry.proverbs.len(), 1);
        assert_eq!(entry.linkages(LinkageKind::Proverbs)[0].word, "x");
    }

    #[test]
    fn categories_are_deduplicated() {
        let mut entry = Entry::default();
        entry.add_category("Kata nama");
        entry.add_category("Kata nama");
        assert_eq!(entry.categories, vec!["Kata nama"]);
    }
}
