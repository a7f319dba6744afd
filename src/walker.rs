//! Section walker: language blocks and the heading tree below them.
//!
//! Every language heading starts a block with a fresh base record. Headings
//! inside the block are classified and dispatched, then their sub-headings
//! are walked in turn. Part-of-speech headings append entries cloned from
//! the base; every other section writes into a scratch entry whose content
//! is then copied to the entries it applies to:
//!
//! - nothing created yet in this block: the base, so later entries inherit it
//! - heading at or above the language-scope depth: every entry of the block
//! - deeper heading: the most recent entry

use lazy_static::lazy_static;
use regex::Regex;

use crate::classify::{classify, linkage_kind, SectionKind};
use crate::clean::{clean_node, clean_nodes, Categories};
use crate::config::EtymologyScope;
use crate::context::ExtractContext;
use crate::extract::descendant::extract_descendant_section;
use crate::extract::etymology::extract_etymology_section;
use crate::extract::form::extract_form_section;
use crate::extract::linkage::extract_linkage_section;
use crate::extract::note::extract_note_section;
use crate::extract::pronunciation::extract_pronunciation_section;
use crate::extract::translation::extract_translation_section;
use crate::gloss::{extract_pos_section, PosSection};
use crate::model::{push_unique, Entry, Sense};
use crate::wikitext::{parse, parse_inline, Level, Node, NodeKind};

lazy_static! {
    // `= {{-ru-}} =` language headings
    static ref LANGUAGE_TEMPLATE: Regex = Regex::new(r"^-([a-z]{2,3}(?:-[a-z]+)*)-$").unwrap();
}

/// Walk one page and return its entries in page order.
pub fn walk_page(ctx: &ExtractContext, text: &str) -> Vec<Entry> {
    let root = parse(text);
    let mut entries = Vec::new();
    // language blocks never nest inside one another
    let languages = root
        .find_child_recursively(NodeKind::Level)
        .into_iter()
        .filter_map(Node::as_level)
        .filter(|level| level.depth == ctx.edition.language_depth);
    for level in languages {
        walk_language(ctx, level, &mut entries);
    }
    for entry in &mut entries {
        if entry.senses.is_empty() {
            entry.senses.push(Sense::no_gloss());
        }
    }
    entries
}

fn walk_language(ctx: &ExtractContext, level: &Level, entries: &mut Vec<Entry>) {
    let Some((lang, lang_code)) = language_of(ctx, level) else {
        ctx.debug("empty-language-heading", "language heading without a name");
        return;
    };
    ctx.start_section(&lang);
    let start = entries.len();
    let mut block = LanguageBlock {
        ctx,
        entries,
        start,
        base: Entry::base(&ctx.page_title, &lang, &lang_code),
    };
    block.heading_categories(level);
    for child in level.levels() {
        block.walk_section(child);
    }
    if block.entries.len() == start && ctx.edition.entry_without_pos {
        let base = block.base.clone();
        block.entries.push(base);
    }
}

/// Language name and code of a language heading.
fn language_of(ctx: &ExtractContext, level: &Level) -> Option<(String, String)> {
    let edition = ctx.edition;
    let heading = clean_nodes(ctx, None, &level.title);
    if !heading.is_empty() {
        let code = match edition.lang_code(&heading) {
            Some(code) => code.to_string(),
            None => {
                ctx.debug("unknown-language", format!("no code for language {}", heading));
                "unknown".to_string()
            }
        };
        return Some((heading, code));
    }
    // headings that are only a `{{-xx-}}` template
    level.title.iter().find_map(|node| {
        let template = node.as_template()?;
        let caps = LANGUAGE_TEMPLATE.captures(template.name.trim())?;
        let code = caps[1].to_string();
        let name = edition.lang_name(&code).map(str::to_string).unwrap_or_else(|| code.clone());
        Some((name, code))
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scope {
    Base,
    Language,
    Last,
}

struct LanguageBlock<'c, 'a, 'e> {
    ctx: &'c ExtractContext<'a>,
    entries: &'e mut Vec<Entry>,
    /// First entry of this language block in `entries`.
    start: usize,
    base: Entry,
}

impl LanguageBlock<'_, '_, '_> {
    fn walk_section(&mut self, level: &Level) {
        let ctx = self.ctx;
        let title = clean_nodes(ctx, None, &level.title);
        ctx.start_subsection(&title);

        match classify(ctx.edition, &title) {
            SectionKind::PartOfSpeech { pos, tags } => {
                let section = PosSection {
                    title: &title,
                    pos: &pos,
                    tags: &tags,
                };
                match extract_pos_section(ctx, &self.base, level, &section) {
                    Some(entry) => self.entries.push(entry),
                    None => {
                        if let Some(kind) = linkage_kind(ctx.edition, &title) {
                            let scope = self.scope(level.depth);
                            self.collect(scope, |scratch| extract_linkage_section(ctx, scratch, level, kind));
                        }
                    }
                }
            }
            SectionKind::Linkage(kind) => {
                let scope = self.scope(level.depth);
                self.collect(scope, |scratch| extract_linkage_section(ctx, scratch, level, kind));
            }
            SectionKind::Etymology => self.etymology(level),
            SectionKind::Forms(tags) => {
                let scope = self.last_or_base();
                self.collect(scope, |scratch| extract_form_section(ctx, scratch, level, &tags));
            }
            SectionKind::Translations => {
                let scope = self.scope(level.depth);
                self.collect(scope, |scratch| extract_translation_section(ctx, scratch, level));
            }
            SectionKind::Pronunciation => {
                let scope = self.scope(level.depth);
                self.collect(scope, |scratch| extract_pronunciation_section(ctx, scratch, level));
            }
            SectionKind::Notes => {
                let scope = self.last_or_base();
                self.collect(scope, |scratch| extract_note_section(ctx, scratch, level));
            }
            SectionKind::Descendants => {
                let scope = self.scope(level.depth);
                self.collect(scope, |scratch| extract_descendant_section(ctx, scratch, level));
            }
            SectionKind::Ignored => {}
            SectionKind::Unknown => ctx.debug("unknown-section", format!("Unknown section: {}", title)),
        }

        for child in level.levels() {
            self.walk_section(child);
        }
        self.heading_categories(level);
    }

    fn has_entries(&self) -> bool {
        self.entries.len() > self.start
    }

    fn scope(&self, depth: usize) -> Scope {
        if !self.has_entries() {
            Scope::Base
        } else if depth <= self.ctx.edition.language_scope_depth {
            Scope::Language
        } else {
            Scope::Last
        }
    }

    fn last_or_base(&self) -> Scope {
        if self.has_entries() {
            Scope::Last
        } else {
            Scope::Base
        }
    }

    fn apply(&mut self, scope: Scope, mut update: impl FnMut(&mut Entry)) {
        match scope {
            Scope::Base => update(&mut self.base),
            Scope::Language => self.entries[self.start..].iter_mut().for_each(update),
            Scope::Last => {
                if let Some(last) = self.entries.last_mut() {
                    update(last);
                }
            }
        }
    }

    /// Run a section extractor on a scratch entry and copy the result.
    fn collect(&mut self, scope: Scope, extract: impl FnOnce(&mut Entry)) {
        let mut scratch = Entry::default();
        extract(&mut scratch);
        self.apply(scope, |entry| merge(entry, &scratch));
    }

    fn etymology(&mut self, level: &Level) {
        let mut scratch = Entry::default();
        extract_etymology_section(self.ctx, &mut scratch, level);
        if scratch.etymology_text.is_empty() {
            return;
        }
        // `Etimologi 1` headings own the entries below them
        let scope = if self.ctx.edition.etymology_scope == EtymologyScope::Base || level.levels().next().is_some() {
            Scope::Base
        } else {
            self.scope(level.depth)
        };
        self.apply(scope, |entry| {
            entry.etymology_text = scratch.etymology_text.clone();
            for category in &scratch.categories {
                entry.add_category(category);
            }
        });
    }

    /// Category links and topic templates directly under a heading.
    fn heading_categories(&mut self, level: &Level) {
        let ctx = self.ctx;
        let vocab = &ctx.edition.templates;
        let mut found = Categories::default();
        for node in level.body() {
            match node {
                Node::Link(_) => {
                    clean_node(ctx, Some(&mut found), node);
                }
                Node::Template(template) if vocab.is_topic(&template.name) => {
                    if ctx.templates.contains(&template.name) {
                        clean_node(ctx, Some(&mut found), node);
                        continue;
                    }
                    // {{topik|ms|Haiwan}} without a template body
                    for value in template.args.positional_from(2) {
                        let topic = clean_nodes(ctx, None, &parse_inline(value));
                        if !topic.is_empty() {
                            push_unique(&mut found.0, &topic);
                        }
                    }
                }
                _ => {}
            }
        }
        if found.0.is_empty() {
            return;
        }
        let scope = self.last_or_base();
        self.apply(scope, |entry| {
            for category in &found.0 {
                entry.add_category(category);
            }
        });
    }
}

/// Append what a section extractor collected to `target`.
fn merge(target: &mut Entry, scratch: &Entry) {
    for form in &scratch.forms {
        if !target.forms.contains(form) {
            target.forms.push(form.clone());
        }
    }
    target.synonyms.extend_from_slice(&scratch.synonyms);
    target.antonyms.extend_from_slice(&scratch.antonyms);
    target.hypernyms.extend_from_slice(&scratch.hypernyms);
    target.hyponyms.extend_from_slice(&scratch.hyponyms);
    target.derived.extend_from_slice(&scratch.derived);
    target.related.extend_from_slice(&scratch.related);
    target.compounds.extend_from_slice(&scratch.compounds);
    target.proverbs.extend_from_slice(&scratch.proverbs);
    target.idioms.extend_from_slice(&scratch.idioms);
    target.anagrams.extend_from_slice(&scratch.anagrams);
    target.translations.extend_from_slice(&scratch.translations);
    target.descendants.extend_from_slice(&scratch.descendants);
    target.sounds.extend_from_slice(&scratch.sounds);
    target.hyphenation.extend_from_slice(&scratch.hyphenation);
    target.notes.extend_from_slice(&scratch.notes);
    for classifier in &scratch.classifiers {
        push_unique(&mut target.classifiers, classifier);
    }
    for category in &scratch.categories {
        target.add_category(category);
    }
    for tag in &scratch.tags {
        push_unique(&mut target.tags, tag);
    }
    for raw_tag in &scratch.raw_tags {
        push_unique(&mut target.raw_tags, raw_tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;

    fn walk(edition: &Edition, title: &str, text: &str) -> Vec<Entry> {
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(edition, &store, title);
        walk_page(&ctx, text)
    }

    fn walk_ms(title: &str, text: &str) -> Vec<Entry> {
        walk(&Edition::builtin("ms").unwrap(), title, text)
    }

    // ── language blocks ────────────────────────────────────────────────

    #[test]
    fn language_name_and_code() {
        let entries = walk_ms("makan", "== Bahasa Melayu ==\n=== Kata kerja ===\n# memamah");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].word, "makan");
        assert_eq!(entries[0].lang, "Bahasa Melayu");
        assert_eq!(entries[0].lang_code, "ms");
        assert_eq!(entries[0].pos, "verb");
    }

    #[test]
    fn language_blocks_below_a_page_heading() {
        let entries = walk_ms(
            "kucing",
            "= kucing =\n== Bahasa Melayu ==\n=== Kata nama ===\n# haiwan\n== Bahasa Indonesia ==\n=== Kata nama ===\n# hewan",
        );
        let langs: Vec<_> = entries.iter().map(|e| e.lang_code.as_str()).collect();
        assert_eq!(langs, vec!["ms", "id"]);
        assert_eq!(entries[1].senses[0].glosses, vec!["hewan"]);
    }

    #[test]
    fn language_without_pos_still_gives_an_entry() {
        let entries = walk_ms(
            "makan",
            "== Bahasa Melayu ==\n=== Takrifan ===\n# memamah serta\n== Bahasa Indonesia ==\n=== Etimologi ===\nDaripada\n=== Terbitan ===\n* [[kaumakan]]",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].lang_code, "id");
        assert_eq!(entries[1].etymology_text, "Daripada");
        assert_eq!(entries[1].derived[0].word, "kaumakan");
        assert!(entries[1].senses[0].is_no_gloss());
        assert!(entries[0].derived.is_empty());
    }

    #[test]
    fn language_template_heading() {
        let entries = walk(
            &Edition::builtin("ru").unwrap(),
            "быстро",
            "= {{-ru-}} =\n=== Семантические свойства ===\n==== Значение ====\n# скоро",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lang, "русский");
        assert_eq!(entries[0].lang_code, "ru");
    }

    #[test]
    fn unknown_section_is_skipped_but_children_are_walked() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "kucing");
        let entries = walk_page(&ctx, "==Bahasa Melayu==\n===Entah===\nteks\n====Kata nama====\n# haiwan");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pos, "noun");
        let diagnostics = ctx.into_diagnostics();
        assert!(diagnostics.iter().any(|d| d.code == "unknown-section"));
    }

    // ── scoping ────────────────────────────────────────────────────────

    #[test]
    fn section_before_pos_goes_to_base() {
        let entries = walk_ms(
            "kucing",
            "==Bahasa Melayu==\n===Sebutan===\n* {{IPA|ms|/ku.t͡ʃiŋ/}}\n===Kata nama===\n# haiwan\n===Kata kerja===\n# mencuri",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sounds, entries[1].sounds);
        assert_eq!(entries[1].sounds[0].ipa, "/ku.t͡ʃiŋ/");
    }

    #[test]
    fn numbered_etymology_shares_sections_before_its_pos() {
        let entries = walk_ms(
            "kali",
            "==Bahasa Melayu==\n===Etimologi 1===\nDaripada Sanskrit.\n====Sebutan====\n* {{IPA|ms|/ka.li/}}\n====Kata nama====\n# sungai\n===Etimologi 2===\n====Kata nama====\n# gandaan",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sounds, entries[1].sounds);
        assert_eq!(entries[1].sounds[0].ipa, "/ka.li/");
    }

    #[test]
    fn language_depth_section_applies_to_all_entries() {
        let entries = walk_ms(
            "makan",
            "== Bahasa Melayu ==\n=== Takrifan ===\n====Kata kerja====\n# memamah serta\n====Kata nama====\n# [[rezeki]].\n=== Tesaurus ===\n; Sinonim: [[santap]]",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].synonyms[0].word, "santap");
        assert_eq!(entries[0].synonyms, entries[1].synonyms);
    }

    #[test]
    fn deeper_section_applies_to_last_entry() {
        let entries = walk_ms(
            "kucing",
            "==Bahasa Melayu==\n===Kata nama===\n# haiwan\n===Kata kerja===\n# mencuri\n====Sinonim====\n* [[curi]]",
        );
        assert!(entries[0].synonyms.is_empty());
        assert_eq!(entries[1].synonyms[0].word, "curi");
    }

    #[test]
    fn etymology_scoping_by_depth() {
        let entries = walk_ms(
            "kucing",
            "==Bahasa Melayu==\n===Kata nama===\n# haiwan\n===Kata kerja===\n# mencuri\n====Etimologi====\nDaripada curi.\n===Etimologi===\nDaripada Jawa.",
        );
        // the later language-level etymology overwrites both
        assert_eq!(entries[0].etymology_text, "Daripada Jawa.");
        assert_eq!(entries[1].etymology_text, "Daripada Jawa.");

        let entries = walk_ms(
            "kucing",
            "==Bahasa Melayu==\n===Kata nama===\n# haiwan\n===Kata kerja===\n# mencuri\n====Etimologi====\nDaripada curi.",
        );
        assert_eq!(entries[0].etymology_text, "");
        assert_eq!(entries[1].etymology_text, "Daripada curi.");
    }

    #[test]
    fn numbered_etymology_owns_its_entries() {
        let entries = walk_ms(
            "bisa",
            "==Bahasa Melayu==\n===Etimologi 1===\nDaripada Sanskrit.\n====Kata sifat====\n# beracun\n===Etimologi 2===\nDaripada Jawa.\n====Kata kerja====\n# boleh",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].etymology_text, "Daripada Sanskrit.");
        assert_eq!(entries[1].etymology_text, "Daripada Jawa.");
    }

    #[test]
    fn forms_go_to_last_entry() {
        let entries = walk_ms(
            "lembu",
            "== Bahasa Melayu ==\n=== Takrifan ===\n# Sejenis\n===Tulisan Jawi===\n[[لمبو]]",
        );
        assert_eq!(entries[0].forms[0].form, "لمبو");
        assert_eq!(entries[0].forms[0].tags, vec!["Jawi"]);
    }

    // ── categories ─────────────────────────────────────────────────────

    #[test]
    fn heading_categories_and_topics() {
        let entries = walk_ms(
            "kucing",
            "==Bahasa Melayu==\n[[Kategori:Kata Melayu]]\n===Kata nama===\n# haiwan\n{{topik|ms|Haiwan}}",
        );
        assert_eq!(entries[0].categories, vec!["Kata Melayu", "Haiwan"]);
    }

    #[test]
    fn walking_twice_gives_the_same_entries() {
        let text = "==Bahasa Melayu==\n===Kata nama===\n# {{lb|ms|kiasan}} haiwan\n## kecil\n===Sinonim===\n* [[meong]]";
        assert_eq!(walk_ms("kucing", text), walk_ms("kucing", text));
    }
}
