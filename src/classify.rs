//! Section classifier: heading title to section kind.

use crate::config::Edition;
use crate::model::LinkageKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SectionKind {
    PartOfSpeech { pos: String, tags: Vec<String> },
    Linkage(LinkageKind),
    Etymology,
    Forms(Vec<String>),
    Translations,
    Pronunciation,
    Notes,
    Descendants,
    /// Known section without extractable content.
    Ignored,
    Unknown,
}

/// Classify a cleaned heading title. Tables are checked in a fixed order:
/// part of speech first, so a title that is both a part of speech and a
/// linkage kind (`peribahasa`) is a part of speech here; the walker falls
/// back to linkage when such a section has no gloss list.
pub fn classify(edition: &Edition, title: &str) -> SectionKind {
    let key = edition.normalize_title(title);
    let sections = &edition.sections;
    if let Some(info) = sections.pos.get(&key) {
        return SectionKind::PartOfSpeech {
            pos: info.pos.clone(),
            tags: info.tags.clone(),
        };
    }
    if contains(&sections.etymology, &key) {
        return SectionKind::Etymology;
    }
    if let Some(tags) = sections.forms.get(&key) {
        return SectionKind::Forms(tags.clone());
    }
    if let Some(kind) = sections.linkage.get(&key) {
        return SectionKind::Linkage(*kind);
    }
    if contains(&sections.translations, &key) {
        return SectionKind::Translations;
    }
    if contains(&sections.pronunciation, &key) {
        return SectionKind::Pronunciation;
    }
    if contains(&sections.notes, &key) {
        return SectionKind::Notes;
    }
    if contains(&sections.descendants, &key) {
        return SectionKind::Descendants;
    }
    if contains(&sections.ignored, &key) {
        return SectionKind::Ignored;
    }
    SectionKind::Unknown
}

/// Linkage kind of a title, regardless of any other classification.
pub fn linkage_kind(edition: &Edition, title: &str) -> Option<LinkageKind> {
    let key = edition.normalize_title(title);
    edition.sections.linkage.get(&key).copied()
}

fn contains(titles: &[String], key: &str) -> bool {
    titles.iter().any(|t| t == key)
}
