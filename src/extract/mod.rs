//! Sense-scoped sub-extractors.
//!
//! Each extractor reads one section or list item and appends typed records
//! to the `Entry` or `Sense` it is handed. Section extractors write into a
//! scratch `Entry`; the walker then copies what was collected to every entry
//! the section applies to.

pub mod descendant;
pub mod etymology;
pub mod example;
pub mod form;
pub mod linkage;
pub mod note;
pub mod pronunciation;
pub mod translation;

use crate::clean::{clean_nodes, render_template};
use crate::context::ExtractContext;
use crate::wikitext::{ArgName, List, Node, Template};

/// Raw tags of a label/qualifier template. A template the store can expand
/// is rendered and its bracketed text split on commas; otherwise the labels
/// are read from the positional arguments.
pub fn label_tags(ctx: &ExtractContext, template: &Template, first_arg: usize) -> Vec<String> {
    if ctx.templates.contains(&template.name) {
        return split_tags(&render_template(ctx, template));
    }
    let mut tags = Vec::new();
    let mut index = first_arg;
    while template.args.positional(index).is_some() {
        let label = arg_text(ctx, template, index);
        index += 1;
        // {{lb|ms|kiasan|_|bahasa basahan}} joins labels with "_", "and", "or"
        if matches!(label.as_str(), "" | "_" | "and" | "or" | "&") {
            continue;
        }
        tags.push(label);
    }
    tags
}

/// Split rendered qualifier text such as `(kiasan, basahan)` into tags.
pub fn split_tags(text: &str) -> Vec<String> {
    strip_brackets(text)
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove one layer of surrounding `()`/`[]` and whitespace.
pub fn strip_brackets(text: &str) -> &str {
    text.trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']'])
        .trim()
}

/// Cleaned text of one positional template argument.
pub fn arg_text(ctx: &ExtractContext, template: &Template, index: usize) -> String {
    clean_nodes(ctx, None, &template.args.nodes(&ArgName::Positional(index)))
}

/// Cleaned, non-empty positional arguments from `first` on.
pub fn args_text_from(ctx: &ExtractContext, template: &Template, first: usize) -> Vec<String> {
    let mut values = Vec::new();
    let mut index = first;
    while template.args.positional(index).is_some() {
        let value = arg_text(ctx, template, index);
        index += 1;
        if !value.is_empty() {
            values.push(value);
        }
    }
    values
}

/// Cleaned text of a named template argument.
pub fn named_arg_text(ctx: &ExtractContext, template: &Template, name: &str) -> String {
    clean_nodes(ctx, None, &template.args.nodes(&ArgName::Named(name.to_string())))
}

/// Leading `Language:` (or `[[language|Language]]:`) of a list item, split
/// off the remaining nodes. `None` when the item does not start that way.
pub fn split_language_prefix(ctx: &ExtractContext, nodes: &[Node]) -> Option<(String, Vec<Node>)> {
    let first = nodes.iter().position(|n| !n.is_blank())?;
    let (name, rest, next) = match &nodes[first] {
        Node::Text(text) => {
            let (name, rest) = text.split_once(':')?;
            (name.trim().to_string(), rest.to_string(), first + 1)
        }
        Node::Link(_) => {
            let text = nodes.get(first + 1)?.as_text()?;
            let rest = text.trim_start().strip_prefix(':')?;
            let name = clean_nodes(ctx, None, &nodes[first..=first]);
            (name, rest.to_string(), first + 2)
        }
        _ => return None,
    };
    if name.is_empty() {
        return None;
    }
    let mut remaining = Vec::with_capacity(nodes.len() - first);
    if !rest.trim().is_empty() {
        remaining.push(Node::Text(rest));
    }
    remaining.extend_from_slice(&nodes[next..]);
    Some((name, remaining))
}

/// Section body content as paragraph lines and lists.
#[derive(Debug)]
pub enum Block<'a> {
    Line(Vec<Node>),
    List(&'a List),
}

/// Group a section body into lines (split at newlines in text runs) and
/// lists. Lines holding only whitespace are dropped.
pub fn body_blocks<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut line: Vec<Node> = Vec::new();
    fn flush(line: &mut Vec<Node>, blocks: &mut Vec<Block<'_>>) {
        if line.iter().any(|n| !n.is_blank()) {
            blocks.push(Block::Line(std::mem::take(line)));
        }
        line.clear();
    }
    for node in nodes {
        match node {
            Node::List(list) => {
                flush(&mut line, &mut blocks);
                blocks.push(Block::List(list));
            }
            Node::Text(text) => {
                for (i, part) in text.split('\n').enumerate() {
                    if i > 0 {
                        flush(&mut line, &mut blocks);
                    }
                    if !part.is_empty() {
                        line.push(Node::Text(part.to_string()));
                    }
                }
            }
            Node::Level(_) => {}
            other => line.push(other.clone()),
        }
    }
    flush(&mut line, &mut blocks);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;
    use crate::wikitext::parse_inline;

    fn first_template(text: &str) -> Template {
        parse_inline(text)
            .into_iter()
            .find_map(|n| n.as_template().cloned())
            .unwrap()
    }

    #[test]
    fn labels_from_arguments() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "x");
        let template = first_template("{{lb|ms|kiasan|_|basahan}}");
        assert_eq!(label_tags(&ctx, &template, 2), vec!["kiasan", "basahan"]);
    }

    #[test]
    fn labels_from_rendering() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new().with("konteks", "({{{2}}}, {{{3}}})");
        let ctx = ExtractContext::new(&edition, &store, "x");
        let template = first_template("{{konteks|ms|kiasan|usang}}");
        assert_eq!(label_tags(&ctx, &template, 2), vec!["kiasan", "usang"]);
    }

    #[test]
    fn language_prefix() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "x");
        let (name, rest) = split_language_prefix(&ctx, &parse_inline("Inggeris: [[cat]]")).unwrap();
        assert_eq!(name, "Inggeris");
        assert_eq!(rest.len(), 1);
        let (name, _) =
            split_language_prefix(&ctx, &parse_inline("[[inggeris|Inggeris]]: [[cat]]")).unwrap();
        assert_eq!(name, "Inggeris");
        assert!(split_language_prefix(&ctx, &parse_inline("[[cat]]")).is_none());
    }

    #[test]
    fn body_is_split_into_lines_and_lists() {
        let root = crate::wikitext::parse("==A==\n[[a]], [[b]]\n\n{{x}}\n* [[c]]\n");
        let level = root.levels().next().unwrap();
        let blocks = body_blocks(level.body());
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Line(line) if line.len() == 3));
        assert!(matches!(&blocks[2], Block::List(_)));
    }
}
