//! Usage-note sections.

use crate::clean::clean_nodes;
use crate::context::ExtractContext;
use crate::model::Entry;
use crate::wikitext::{Level, List, Node, NodeKind};

/// One note per list item, or the whole section text when it has no list.
pub fn extract_note_section(ctx: &ExtractContext, target: &mut Entry, level: &Level) {
    let lists: Vec<&List> = level.find_child(NodeKind::List).filter_map(Node::as_list).collect();
    if lists.is_empty() {
        let nodes: Vec<Node> = level.body().cloned().collect();
        let note = clean_nodes(ctx, Some(&mut *target), &nodes);
        push_note(target, note);
        return;
    }
    for list in lists {
        notes_from_list(ctx, target, list);
    }
}

fn notes_from_list(ctx: &ExtractContext, target: &mut Entry, list: &List) {
    for item in list.items() {
        let note = clean_nodes(ctx, Some(&mut *target), item.split_lead().0);
        push_note(target, note);
        for nested in item.lists() {
            notes_from_list(ctx, target, nested);
        }
    }
}

fn push_note(target: &mut Entry, note: String) {
    if !note.is_empty() {
        target.notes.push(note);
    }
}
