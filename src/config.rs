//! Per-edition configuration.
//!
//! Every Wiktionary edition names its sections and templates differently.
//! An [`Edition`] bundles those tables; it is loaded from YAML (the built-in
//! editions live in `editions/*.yaml`) and passed to the walker, so several
//! editions can be used side by side in one process.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::LinkageKind;
use crate::wikitext::{ArgName, TemplateArgs};

const BUILTIN_EDITIONS: &[(&str, &str)] = &[
    ("ms", include_str!("../editions/ms.yaml")),
    ("th", include_str!("../editions/th.yaml")),
    ("simple", include_str!("../editions/simple.yaml")),
    ("ru", include_str!("../editions/ru.yaml")),
];

/// Where an etymology section's text goes once entries exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtymologyScope {
    /// Always the language-level base record (later entries inherit it).
    Base,
    /// Shallow headings apply to every entry of the language, deeper ones to
    /// the last entry only.
    ByDepth,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PosInfo {
    pub pos: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SectionTables {
    pub pos: HashMap<String, PosInfo>,
    pub linkage: HashMap<String, LinkageKind>,
    /// Alternative-form sections and the tags their forms get.
    pub forms: HashMap<String, Vec<String>>,
    pub etymology: Vec<String>,
    pub translations: Vec<String>,
    pub pronunciation: Vec<String>,
    pub notes: Vec<String>,
    pub descendants: Vec<String>,
    /// Known sections with nothing to extract (references, external links).
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlossConventions {
    /// Character a gloss list marker is made of (`#`, `##`, ...).
    pub marker: char,
    /// Last marker characters of example lists nested in a gloss (`#:`, `#*`).
    pub example_suffixes: Vec<char>,
    /// Give each committed sense a dotted index (`1`, `1.1`, ...).
    pub number_senses: bool,
    /// Leading templates whose rendering ends in `)` or `]` are tags.
    pub bracketed_templates_are_tags: bool,
    /// Text fragments trimmed from the front of a gloss after tags are removed.
    pub connectives: Vec<String>,
    /// Templates whose name ends with this suffix are tag shorthand (`{{разг.}}`).
    pub tag_shorthand_suffix: String,
}

impl Default for GlossConventions {
    fn default() -> Self {
        GlossConventions {
            marker: '#',
            example_suffixes: vec![':', '*'],
            number_senses: false,
            bracketed_templates_are_tags: false,
            connectives: [",", ".", ";", ":"].iter().map(|s| s.to_string()).collect(),
            tag_shorthand_suffix: String::new(),
        }
    }
}

/// `{{ux|lang|text|translation|tr=...}}`-style inline example templates.
/// Argument references are positional numbers or parameter names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExampleTemplate {
    pub text: String,
    pub translation: String,
    pub roman: String,
    pub reference: String,
}

/// Synonym/antonym shorthand used inside glosses and example lists.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkageTemplate {
    pub kind: LinkageKind,
    #[serde(default = "default_first_arg")]
    pub first_arg: usize,
}

/// Head-line template that yields forms and entry tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeadTemplate {
    /// Tags added to the entry.
    pub tags: Vec<String>,
    /// First positional argument of `(raw tag, form)` pairs.
    pub pairs_from: Option<usize>,
    /// First positional argument of plain forms.
    pub forms_from: Option<usize>,
    /// Tags given to plain forms.
    pub form_tags: Vec<String>,
    /// First positional argument of the noun's classifiers.
    pub classifiers_from: Option<usize>,
}

/// A template carrying a whole sense in named parameters:
/// `{{значение|определение=...|пометы=...|синонимы=...}}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeaningTemplate {
    /// Parameter holding the gloss.
    pub gloss: String,
    /// Parameter holding comma-separated tags.
    pub tags: String,
    /// Parameter holding example templates.
    pub examples: String,
    /// Parameter → kind of the comma-separated words it lists.
    pub linkages: HashMap<String, LinkageKind>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranslationTemplates {
    /// `{{t|code|word|tr=...}}`
    pub word: Vec<String>,
    /// `{{trans-top|gloss}}` opens a sense block.
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    /// Templates whose first arguments hold a whole nested translation list.
    pub container: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PronunciationTemplates {
    /// name → first positional argument holding a transcription
    pub ipa: HashMap<String, usize>,
    /// name → positional argument holding the file name
    pub audio: HashMap<String, usize>,
    pub rhymes: HashMap<String, usize>,
    pub hyphenation: HashMap<String, usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateVocabulary {
    /// Label/qualifier templates: name → first positional argument of labels.
    pub labels: HashMap<String, usize>,
    /// Templates whose rendering stays in the gloss but also adds a canonical tag.
    pub tag_gloss: HashMap<String, String>,
    pub linkage: HashMap<String, LinkageTemplate>,
    pub examples: HashMap<String, ExampleTemplate>,
    /// Name prefixes of quotation templates (`quote-book`, ...).
    pub quote_prefixes: Vec<String>,
    /// Templates marking a sense that has no definition yet.
    pub no_gloss: Vec<String>,
    /// Templates dropped from gloss text.
    pub ignored: Vec<String>,
    pub head: HashMap<String, HeadTemplate>,
    /// Templates that only add topic categories.
    pub topics: Vec<String>,
    pub translation: TranslationTemplates,
    /// name → positional argument of the language code (word follows it)
    pub descendants: HashMap<String, usize>,
    pub pronunciation: PronunciationTemplates,
    /// `{{l|code|word}}`-style link templates inside linkage lists:
    /// name → positional argument of the word.
    pub linkage_items: HashMap<String, usize>,
    /// Column templates listing words from a positional argument on.
    pub columns: HashMap<String, usize>,
    /// `{{sense|...}}` templates giving the sense of the following linkages.
    pub sense: Vec<String>,
    pub meaning: HashMap<String, MeaningTemplate>,
    /// `{{cls|th|ตัว}}`: name → first positional argument of classifiers.
    pub classifiers: HashMap<String, usize>,
}

fn default_first_arg() -> usize {
    1
}

fn contains_name(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n == name)
}

impl TemplateVocabulary {
    pub fn label_first_arg(&self, name: &str) -> Option<usize> {
        self.labels.get(&template_key(name)).copied()
    }

    pub fn tag_gloss(&self, name: &str) -> Option<&str> {
        self.tag_gloss.get(&template_key(name)).map(String::as_str)
    }

    pub fn linkage(&self, name: &str) -> Option<&LinkageTemplate> {
        self.linkage.get(&template_key(name))
    }

    pub fn example(&self, name: &str) -> Option<&ExampleTemplate> {
        self.examples.get(&template_key(name))
    }

    pub fn is_quote(&self, name: &str) -> bool {
        let key = template_key(name);
        self.quote_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    pub fn is_no_gloss(&self, name: &str) -> bool {
        contains_name(&self.no_gloss, &template_key(name))
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        contains_name(&self.ignored, &template_key(name))
    }

    pub fn head(&self, name: &str) -> Option<&HeadTemplate> {
        self.head.get(&template_key(name))
    }

    pub fn is_topic(&self, name: &str) -> bool {
        contains_name(&self.topics, &template_key(name))
    }

    pub fn is_sense(&self, name: &str) -> bool {
        contains_name(&self.sense, &template_key(name))
    }

    pub fn meaning(&self, name: &str) -> Option<&MeaningTemplate> {
        self.meaning.get(&template_key(name))
    }

    pub fn classifier_first_arg(&self, name: &str) -> Option<usize> {
        self.classifiers.get(&template_key(name)).copied()
    }

    fn normalize(&mut self) {
        self.labels = lowercase_keys(std::mem::take(&mut self.labels));
        self.tag_gloss = lowercase_keys(std::mem::take(&mut self.tag_gloss));
        self.linkage = lowercase_keys(std::mem::take(&mut self.linkage));
        self.examples = lowercase_keys(std::mem::take(&mut self.examples));
        self.head = lowercase_keys(std::mem::take(&mut self.head));
        self.descendants = lowercase_keys(std::mem::take(&mut self.descendants));
        self.linkage_items = lowercase_keys(std::mem::take(&mut self.linkage_items));
        self.columns = lowercase_keys(std::mem::take(&mut self.columns));
        self.meaning = lowercase_keys(std::mem::take(&mut self.meaning));
        self.classifiers = lowercase_keys(std::mem::take(&mut self.classifiers));
        let pron = &mut self.pronunciation;
        pron.ipa = lowercase_keys(std::mem::take(&mut pron.ipa));
        pron.audio = lowercase_keys(std::mem::take(&mut pron.audio));
        pron.rhymes = lowercase_keys(std::mem::take(&mut pron.rhymes));
        pron.hyphenation = lowercase_keys(std::mem::take(&mut pron.hyphenation));
        let tr = &mut self.translation;
        for names in [&mut tr.word, &mut tr.top, &mut tr.bottom, &mut tr.container] {
            lowercase_all(names);
        }
        for names in [
            &mut self.quote_prefixes,
            &mut self.no_gloss,
            &mut self.ignored,
            &mut self.topics,
            &mut self.sense,
        ] {
            lowercase_all(names);
        }
    }
}

/// Per-edition configuration bundle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Edition {
    pub code: String,
    pub name: String,

    /// Heading depth of language blocks (`== Bahasa Melayu ==`).
    pub language_depth: usize,
    /// Prefixes stripped from language headings before the code lookup.
    pub language_prefixes: Vec<String>,
    /// Language name (as written in this edition) → language code.
    pub languages: HashMap<String, String>,

    /// Characters stripped from the end of section titles (`Etimologi 2`).
    pub title_trailing_chars: String,
    pub case_insensitive_titles: bool,
    /// Category namespace names, without the colon.
    pub category_prefixes: Vec<String>,

    /// Sections at this depth or shallower apply to every entry of the language.
    pub language_scope_depth: usize,
    pub etymology_scope: EtymologyScope,
    /// Emit one entry for a language block without any part-of-speech section.
    pub entry_without_pos: bool,

    pub sections: SectionTables,
    pub gloss: GlossConventions,
    pub templates: TemplateVocabulary,
    /// Raw tag → canonical tags.
    pub raw_tags: HashMap<String, Vec<String>>,
}

impl Default for Edition {
    fn default() -> Self {
        Edition {
            code: String::new(),
            name: String::new(),
            language_depth: 2,
            language_prefixes: Vec::new(),
            languages: HashMap::new(),
            title_trailing_chars: "0123456789".to_string(),
            case_insensitive_titles: true,
            category_prefixes: vec!["Category".to_string()],
            language_scope_depth: 3,
            etymology_scope: EtymologyScope::ByDepth,
            entry_without_pos: false,
            sections: SectionTables::default(),
            gloss: GlossConventions::default(),
            templates: TemplateVocabulary::default(),
            raw_tags: HashMap::new(),
        }
    }
}

impl Edition {
    /// One of the editions compiled into the crate.
    pub fn builtin(code: &str) -> Result<Self> {
        let (_, yaml) = BUILTIN_EDITIONS
            .iter()
            .find(|(c, _)| *c == code)
            .ok_or_else(|| Error::UnknownEdition(code.to_string()))?;
        Self::from_yaml_str(yaml, &PathBuf::from(format!("editions/{}.yaml", code)))
    }

    pub fn builtin_codes() -> impl Iterator<Item = &'static str> {
        BUILTIN_EDITIONS.iter().map(|(code, _)| *code)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content, path)
    }

    /// Parse and validate an edition; `origin` is only used in error messages.
    pub fn from_yaml_str(yaml: &str, origin: &Path) -> Result<Self> {
        let mut edition: Edition = serde_yaml::from_str(yaml).map_err(|source| Error::Yaml {
            path: origin.to_path_buf(),
            source,
        })?;
        edition.normalize();
        edition.validate()?;
        Ok(edition)
    }

    fn normalize(&mut self) {
        if self.case_insensitive_titles {
            let sections = &mut self.sections;
            sections.pos = lowercase_keys(std::mem::take(&mut sections.pos));
            sections.linkage = lowercase_keys(std::mem::take(&mut sections.linkage));
            sections.forms = lowercase_keys(std::mem::take(&mut sections.forms));
            for titles in [
                &mut sections.etymology,
                &mut sections.translations,
                &mut sections.pronunciation,
                &mut sections.notes,
                &mut sections.descendants,
                &mut sections.ignored,
            ] {
                lowercase_all(titles);
            }
        }
        self.templates.normalize();
    }

    fn validate(&self) -> Result<()> {
        if self.code.is_empty() {
            return Err(Error::Config("edition code is empty".to_string()));
        }
        if self.language_depth == 0 {
            return Err(Error::Config(format!(
                "{}: language_depth must be at least 1",
                self.code
            )));
        }
        if self.language_scope_depth < self.language_depth {
            return Err(Error::Config(format!(
                "{}: language_scope_depth ({}) is shallower than language_depth ({})",
                self.code, self.language_scope_depth, self.language_depth
            )));
        }
        Ok(())
    }

    /// Section title as used for table lookups: trailing numbering removed,
    /// case folded when the edition is case-insensitive.
    pub fn normalize_title(&self, title: &str) -> String {
        let trailing: &[char] = &self.title_trailing_chars.chars().collect::<Vec<_>>();
        let stripped = title
            .trim()
            .trim_end_matches(|c: char| c.is_whitespace() || trailing.contains(&c))
            .trim();
        if self.case_insensitive_titles {
            stripped.to_lowercase()
        } else {
            stripped.to_string()
        }
    }

    /// Language heading text with the edition's decorative prefix removed.
    pub fn strip_language_prefix<'t>(&self, heading: &'t str) -> &'t str {
        let heading = heading.trim();
        self.language_prefixes
            .iter()
            .find_map(|prefix| heading.strip_prefix(prefix.as_str()))
            .map(str::trim)
            .unwrap_or(heading)
    }

    /// Language code for a language name, exact match first, then case-folded.
    pub fn lang_code(&self, name: &str) -> Option<&str> {
        let name = self.strip_language_prefix(name);
        if let Some(code) = self.languages.get(name) {
            return Some(code);
        }
        let folded = name.to_lowercase();
        self.languages
            .iter()
            .find(|(n, _)| n.to_lowercase() == folded)
            .map(|(_, code)| code.as_str())
    }

    /// Language name for a code, if this edition's table knows it.
    pub fn lang_name(&self, code: &str) -> Option<&str> {
        self.languages
            .iter()
            .filter(|(_, c)| c.as_str() == code)
            .map(|(name, _)| name.as_str())
            .min()
    }

    /// Category name if `target` is a link into a category namespace.
    pub fn category_name<'t>(&self, target: &'t str) -> Option<&'t str> {
        let (namespace, name) = target.split_once(':')?;
        let namespace = namespace.trim();
        self.category_prefixes
            .iter()
            .any(|p| p.eq_ignore_ascii_case(namespace) || p == namespace)
            .then(|| name.trim())
    }

    /// Canonical tags for a raw tag, if the edition maps it.
    pub fn canonical_tags(&self, raw_tag: &str) -> Option<&[String]> {
        self.raw_tags
            .get(raw_tag)
            .or_else(|| self.raw_tags.get(&raw_tag.to_lowercase()))
            .map(Vec::as_slice)
    }

    /// A gloss list marker: one or more gloss marker characters (`#`, `##`).
    pub fn is_gloss_marker(&self, marker: &str) -> bool {
        !marker.is_empty() && marker.chars().all(|c| c == self.gloss.marker)
    }

    /// An example list nested under a gloss (`#:`, `#*`, `##*:`), not a bare
    /// `:`/`*` list.
    pub fn is_example_marker(&self, marker: &str) -> bool {
        marker.starts_with(self.gloss.marker)
            && marker
                .chars()
                .last()
                .map(|c| self.gloss.example_suffixes.contains(&c))
                .unwrap_or(false)
    }
}

/// Template lookup key: trimmed, lowercased, underscores as spaces.
pub fn template_key(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}

/// Look up a template argument by an edition reference: a positional number or a name.
pub fn arg_by_ref<'t>(args: &'t TemplateArgs, reference: &str) -> Option<&'t str> {
    if reference.is_empty() {
        return None;
    }
    let name = match reference.parse::<usize>() {
        Ok(index) => ArgName::Positional(index),
        Err(_) => ArgName::Named(reference.to_string()),
    };
    args.get(&name)
}

fn lowercase_keys<V>(map: HashMap<String, V>) -> HashMap<String, V> {
    map.into_iter().map(|(k, v)| (template_key(&k), v)).collect()
}

fn lowercase_all(names: &mut [String]) {
    for name in names.iter_mut() {
        *name = template_key(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_editions_load() {
        for code in Edition::builtin_codes() {
            let edition = Edition::builtin(code).unwrap();
            assert_eq!(edition.code, code);
            assert!(!edition.sections.pos.is_empty(), "{} has no pos table", code);
        }
    }

    #[test]
    fn unknown_edition_is_an_error() {
        assert!(matches!(Edition::builtin("xx"), Err(Error::UnknownEdition(_))));
    }

    #[test]
    fn yaml_defaults_fill_missing_fields() {
        let edition = Edition::from_yaml_str("code: test\n", Path::new("test.yaml")).unwrap();
        assert_eq!(edition.language_depth, 2);
        assert_eq!(edition.gloss.marker, '#');
        assert_eq!(edition.etymology_scope, EtymologyScope::ByDepth);
    }

    #[test]
    fn invalid_edition_is_rejected() {
        let result = Edition::from_yaml_str(
            "code: test\nlanguage_depth: 3\nlanguage_scope_depth: 2\n",
            Path::new("test.yaml"),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn title_normalisation_strips_numbering() {
        let edition = Edition::builtin("ms").unwrap();
        assert_eq!(edition.normalize_title("Etimologi 2"), "etimologi");
        assert_eq!(edition.normalize_title("Kata nama II"), "kata nama");
    }

    #[test]
    fn language_lookup_strips_prefix() {
        let edition = Edition::builtin("ms").unwrap();
        assert_eq!(edition.lang_code("Bahasa Melayu"), Some("ms"));
        assert_eq!(edition.lang_code("Bahasa Tiada"), None);
    }

    #[test]
    fn category_links_are_recognised() {
        let edition = Edition::builtin("ms").unwrap();
        assert_eq!(edition.category_name("Kategori:Kata nama"), Some("Kata nama"));
        assert_eq!(edition.category_name("Category:Nouns"), Some("Nouns"));
        assert_eq!(edition.category_name("kucing"), None);
    }

    #[test]
    fn sense_and_classifier_templates() {
        let ru = Edition::builtin("ru").unwrap();
        let meaning = ru.templates.meaning("Значение").unwrap();
        assert_eq!(meaning.gloss, "определение");
        assert_eq!(meaning.linkages.get("синонимы"), Some(&LinkageKind::Synonyms));
        assert!(ru.templates.meaning("семантика").unwrap().gloss.is_empty());

        let th = Edition::builtin("th").unwrap();
        assert_eq!(th.templates.classifier_first_arg("cls"), Some(2));
        assert_eq!(th.templates.head("th-noun").unwrap().classifiers_from, Some(1));
    }

    #[test]
    fn list_markers() {
        let edition = Edition::builtin("simple").unwrap();
        assert!(edition.is_gloss_marker("##"));
        assert!(!edition.is_gloss_marker("#:"));
        assert!(edition.is_example_marker("#:"));
        assert!(edition.is_example_marker("##*"));
        assert!(!edition.is_example_marker(":"));
    }
}
