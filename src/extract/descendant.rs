//! Descendant sections: a tree of words in later languages.

use lazy_static::lazy_static;
use regex::Regex;

use crate::clean::{clean_node, render_template};
use crate::config::template_key;
use crate::context::ExtractContext;
use crate::extract::{arg_text, label_tags, named_arg_text, split_language_prefix, split_tags};
use crate::model::{Descendant, Entry};
use crate::tags::translate_raw_tags;
use crate::wikitext::{Level, List, ListItem, Node, NodeKind};

lazy_static! {
    static ref PARENTHESES: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
}

pub fn extract_descendant_section(ctx: &ExtractContext, target: &mut Entry, level: &Level) {
    for list in level.find_child(NodeKind::List).filter_map(Node::as_list) {
        target.descendants.extend(extract_list(ctx, list));
    }
}

fn extract_list(ctx: &ExtractContext, list: &List) -> Vec<Descendant> {
    let mut descendants = Vec::new();
    for child in &list.children {
        match child {
            Node::ListItem(item) => descendants.extend(extract_item(ctx, item)),
            child if child.is_blank() => {}
            other => ctx.error(
                "unexpected-list-child",
                format!("{:?} directly inside a descendant list", other.kind()),
            ),
        }
    }
    descendants
}

/// Descendants of one item; nested lists hang below the item's last word.
/// An item without words passes its children up a level.
fn extract_item(ctx: &ExtractContext, item: &ListItem) -> Vec<Descendant> {
    let (lead, rest) = item.split_lead();
    let mut found = item_descendants(ctx, lead);
    let children: Vec<Descendant> = rest
        .iter()
        .filter_map(Node::as_list)
        .flat_map(|list| extract_list(ctx, list))
        .collect();
    match found.last_mut() {
        Some(last) => last.descendants.extend(children),
        None => return children,
    }
    found
}

fn item_descendants(ctx: &ExtractContext, lead: &[Node]) -> Vec<Descendant> {
    let vocab = &ctx.edition.templates;
    let (mut lang, mut lang_code, nodes) = match split_language_prefix(ctx, lead) {
        Some((name, nodes)) => {
            let code = ctx.edition.lang_code(&name).unwrap_or("unknown").to_string();
            (name, code, nodes)
        }
        None => (String::new(), String::new(), lead.to_vec()),
    };

    let mut descendants: Vec<Descendant> = Vec::new();
    let mut raw_tags = Vec::new();
    for node in &nodes {
        match node {
            Node::Template(template) => {
                let key = template_key(&template.name);
                if let Some(&code_arg) = vocab.descendants.get(&key) {
                    lang_code = arg_text(ctx, template, code_arg);
                    lang = ctx
                        .edition
                        .lang_name(&lang_code)
                        .map(str::to_string)
                        .unwrap_or_else(|| lang_code.clone());
                    let word = arg_text(ctx, template, code_arg + 1);
                    if !word.is_empty() && word != "-" {
                        descendants.push(Descendant {
                            lang: lang.clone(),
                            lang_code: lang_code.clone(),
                            word,
                            roman: named_arg_text(ctx, template, "tr"),
                            ..Default::default()
                        });
                    }
                } else if let Some(&word_arg) = vocab.linkage_items.get(&key) {
                    let word = arg_text(ctx, template, word_arg);
                    if !word.is_empty() {
                        descendants.push(Descendant {
                            lang: lang.clone(),
                            lang_code: lang_code.clone(),
                            word,
                            roman: named_arg_text(ctx, template, "tr"),
                            ..Default::default()
                        });
                    }
                } else if let Some(first_arg) = vocab.label_first_arg(&key) {
                    raw_tags.extend(label_tags(ctx, template, first_arg));
                } else {
                    annotate(descendants.last_mut(), &render_template(ctx, template), &mut raw_tags);
                }
            }
            Node::Link(_) | Node::Bold(_) => {
                let word = clean_node(ctx, None, node);
                if !word.is_empty() {
                    descendants.push(Descendant {
                        lang: lang.clone(),
                        lang_code: lang_code.clone(),
                        word,
                        ..Default::default()
                    });
                }
            }
            other => annotate(descendants.last_mut(), &clean_node(ctx, None, other), &mut raw_tags),
        }
    }

    for descendant in &mut descendants {
        descendant.raw_tags.extend(raw_tags.iter().cloned());
        translate_raw_tags(ctx.edition, descendant);
    }
    descendants
}

/// Parenthesised text: the romanisation of the preceding word when it has
/// none yet, otherwise qualifiers for the whole item.
fn annotate(last: Option<&mut Descendant>, text: &str, raw_tags: &mut Vec<String>) {
    let mut last = last;
    for caps in PARENTHESES.captures_iter(text) {
        match last.as_deref_mut() {
            Some(descendant) if descendant.roman.is_empty() && !caps[1].contains(',') => {
                descendant.roman = caps[1].trim().to_string();
            }
            _ => raw_tags.extend(split_tags(&caps[1])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;
    use crate::wikitext::parse;

    fn extract(body: &str) -> Vec<Descendant> {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "makan");
        let root = parse(&format!("====Keturunan====\n{}", body));
        let level = root.levels().next().unwrap();
        let mut entry = Entry::default();
        extract_descendant_section(&ctx, &mut entry, level);
        entry.descendants
    }

    #[test]
    fn template_items_build_a_tree() {
        let descendants = extract("* {{desc|id|makan}}\n** {{desc|jv|mangan}}\n** {{desc|su|dahar}}\n* {{desc|tl|kain}}");
        assert_eq!(descendants.len(), 2);
        assert_eq!(descendants[0].lang, "Indonesia");
        assert_eq!(descendants[0].word, "makan");
        let nested: Vec<_> = descendants[0].descendants.iter().map(|d| d.word.as_str()).collect();
        assert_eq!(nested, vec!["mangan", "dahar"]);
        assert_eq!(descendants[0].descendants[0].lang_code, "jv");
        assert!(descendants[1].descendants.is_empty());
    }

    #[test]
    fn word_less_item_passes_children_up() {
        let descendants = extract("* {{desc|cmn|-}}\n*: {{desc|cmn|-}} {{l|cmn|宅男}} (zháinán)");
        assert_eq!(descendants.len(), 1);
        assert_eq!(descendants[0].word, "宅男");
        assert_eq!(descendants[0].lang_code, "cmn");
        assert_eq!(descendants[0].roman, "zháinán");
    }

    #[test]
    fn language_prefix_and_links() {
        let descendants = extract("* Jawa: [[mangan]]");
        assert_eq!(descendants[0].lang, "Jawa");
        assert_eq!(descendants[0].lang_code, "jv");
    }
}
