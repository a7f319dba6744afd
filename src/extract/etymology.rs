//! Etymology sections.

use crate::clean::clean_nodes;
use crate::context::ExtractContext;
use crate::model::Entry;
use crate::wikitext::{Level, Node};

/// Everything under the heading that is not a sub-heading, as one text.
/// Categories picked up on the way go to `target` as well.
pub fn extract_etymology_section(ctx: &ExtractContext, target: &mut Entry, level: &Level) {
    let nodes: Vec<Node> = level.body().cloned().collect();
    target.etymology_text = clean_nodes(ctx, Some(&mut *target), &nodes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;
    use crate::wikitext::parse;

    #[test]
    fn text_and_categories() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "makan");
        let root = parse("===Etimologi===\nDaripada [[bahasa Jawa]] ''mangan''.[[Kategori:Kata pinjaman]]\n====Kata kerja====\n# x");
        let level = root.levels().next().unwrap();
        let mut entry = Entry::default();
        extract_etymology_section(&ctx, &mut entry, level);
        assert_eq!(entry.etymology_text, "Daripada bahasa Jawa mangan.");
        assert_eq!(entry.categories, vec!["Kata pinjaman"]);
    }
}
