//! Structured lexicographic entries from Wiktionary wikitext.
//!
//! A page is parsed into a [`wikitext::Node`] tree, walked heading by heading
//! ([`walker`]) and each part-of-speech section's gloss lists are turned into
//! senses ([`gloss`]). Everything language-specific lives in an [`Edition`].
//!
//! ```no_run
//! use wiktionary_extractor::{Edition, Extractor, TemplateStore};
//!
//! let extractor = Extractor::new(Edition::builtin("ms")?, TemplateStore::new());
//! let result = extractor.parse_page("kucing", "==Bahasa Melayu==\n===Kata nama===\n# haiwan");
//! assert_eq!(result.entries[0].senses[0].glosses, vec!["haiwan"]);
//! # Ok::<(), wiktionary_extractor::Error>(())
//! ```

pub mod classify;
pub mod clean;
pub mod config;
pub mod context;
pub mod dump;
pub mod error;
pub mod extract;
pub mod gloss;
pub mod model;
pub mod parallel;
pub mod tags;
pub mod templates;
pub mod walker;
pub mod wikitext;

pub use config::Edition;
pub use context::{Diagnostic, ExtractContext, Severity};
pub use error::{Error, Result};
pub use model::{Descendant, Entry, Example, Form, Linkage, LinkageKind, Sense, Sound, Translation};
pub use templates::TemplateStore;

/// Read-only configuration shared by every page walk.
#[derive(Debug, Clone)]
pub struct Extractor {
    edition: Edition,
    templates: TemplateStore,
}

/// Entries of one page plus whatever the walk complained about.
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub entries: Vec<Entry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extractor {
    pub fn new(edition: Edition, templates: TemplateStore) -> Self {
        Extractor { edition, templates }
    }

    pub fn edition(&self) -> &Edition {
        &self.edition
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Walk one page. Never fails: structural problems end up in
    /// `diagnostics` and the walk falls back to whatever it could read.
    pub fn parse_page(&self, title: &str, text: &str) -> PageResult {
        let ctx = ExtractContext::new(&self.edition, &self.templates, title);
        let entries = walker::walk_page(&ctx, text);
        PageResult {
            entries,
            diagnostics: ctx.into_diagnostics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_page_collects_entries_and_diagnostics() {
        let extractor = Extractor::new(Edition::builtin("ms").unwrap(), TemplateStore::new());
        let result = extractor.parse_page(
            "kucing",
            "==Bahasa Melayu==\n===Kata nama===\n# haiwan\n===Entah===\nteks",
        );
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].word, "kucing");
        assert_eq!(result.entries[0].pos, "noun");
        assert!(result.diagnostics.iter().any(|d| d.code == "unknown-section"));
    }

    #[test]
    fn pages_without_language_headings_give_nothing() {
        let extractor = Extractor::new(Edition::builtin("ms").unwrap(), TemplateStore::new());
        assert!(extractor.parse_page("x", "just text").entries.is_empty());
    }
}
