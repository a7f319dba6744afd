//! Linkage sections (synonyms, derived terms, proverbs, ...) and the
//! linkage shorthand templates used inside glosses.

use lazy_static::lazy_static;
use regex::Regex;

use crate::classify::linkage_kind;
use crate::clean::{clean_node, clean_nodes, render_template};
use crate::config::template_key;
use crate::context::ExtractContext;
use crate::extract::{arg_text, args_text_from, body_blocks, label_tags, split_tags, strip_brackets, Block};
use crate::model::{Entry, Linkage, LinkageKind};
use crate::tags::translate_raw_tags;
use crate::wikitext::{parse_inline, Level, List, Node, Template};

lazy_static! {
    // "Sinonim:" or "(antonim):" opening an item
    static ref KIND_LABEL: Regex = Regex::new(r"^\s*\(?\s*([^():\[\]{}]+?)\s*\)?\s*:").unwrap();
    static ref PARENTHESES: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
}

/// Linkages found inside a gloss, waiting for the entry that owns the sense.
pub type PendingLinkages = Vec<(LinkageKind, Linkage)>;

/// Words of a `{{syn|lang|word|word}}`-style template.
pub fn shorthand_linkages(ctx: &ExtractContext, template: &Template, first_arg: usize) -> Vec<Linkage> {
    args_text_from(ctx, template, first_arg).into_iter().map(Linkage::new).collect()
}

struct LinkageState {
    kind: LinkageKind,
    sense: String,
}

pub fn extract_linkage_section(ctx: &ExtractContext, target: &mut Entry, level: &Level, kind: LinkageKind) {
    let mut state = LinkageState {
        kind,
        sense: String::new(),
    };
    for block in body_blocks(level.body()) {
        match block {
            Block::Line(line) => extract_line(ctx, target, &line, false, &mut state),
            Block::List(list) => extract_list(ctx, target, list, &mut state),
        }
    }
}

fn extract_list(ctx: &ExtractContext, target: &mut Entry, list: &List, state: &mut LinkageState) {
    for child in &list.children {
        match child {
            Node::ListItem(item) => {
                let (lead, rest) = item.split_lead();
                extract_line(ctx, target, lead, item.marker.ends_with(';'), state);
                for nested in rest.iter().filter_map(Node::as_list) {
                    extract_list(ctx, target, nested, state);
                }
            }
            node if node.is_blank() => {}
            other => ctx.error(
                "unexpected-list-child",
                format!("{:?} directly inside a linkage list", other.kind()),
            ),
        }
    }
}

/// One list item or paragraph line. `is_label` marks `;` items, whose
/// leading `label:` gives the sense of what follows when it does not name
/// a linkage kind.
fn extract_line(
    ctx: &ExtractContext,
    target: &mut Entry,
    nodes: &[Node],
    is_label: bool,
    state: &mut LinkageState,
) {
    let mut nodes = nodes.to_vec();
    if let Some(label) = take_label(&mut nodes) {
        match linkage_kind(ctx.edition, &label) {
            Some(kind) => {
                state.kind = kind;
                state.sense.clear();
            }
            None if is_label => state.sense = label,
            None => nodes.insert(0, Node::Text(format!("{}:", label))),
        }
    }

    let starts_with_bold = nodes.iter().find(|n| !n.is_blank()).is_some_and(|n| matches!(n, Node::Bold(_)));
    if starts_with_bold {
        extract_bold_definitions(ctx, target, &nodes, state);
        return;
    }

    let vocab = &ctx.edition.templates;
    let mut sense = state.sense.clone();
    let mut raw_tags = Vec::new();
    let mut words = Vec::new();
    for node in &nodes {
        match node {
            Node::Template(template) => {
                let key = template_key(&template.name);
                if vocab.is_sense(&key) {
                    sense = sense_text(ctx, template);
                } else if let Some(first_arg) = vocab.label_first_arg(&key) {
                    raw_tags.extend(label_tags(ctx, template, first_arg));
                } else if let Some(&index) = vocab.linkage_items.get(&key) {
                    push_word(&mut words, arg_text(ctx, template, index));
                } else if let Some(&first_arg) = vocab.columns.get(&key) {
                    for value in template.args.positional_from(first_arg) {
                        // {{col3|ms|kucing<q:kiasan>}} inline modifiers
                        let word = value.split('<').next().unwrap_or_default();
                        push_word(&mut words, clean_nodes(ctx, None, &parse_inline(word)));
                    }
                } else if let Some(linkage) = vocab.linkage(&key) {
                    for found in shorthand_linkages(ctx, template, linkage.first_arg) {
                        push_word(&mut words, found.word);
                    }
                } else {
                    let text = render_template(ctx, template);
                    split_plain_text(&text, ctx, &mut words, &mut raw_tags);
                }
            }
            Node::Link(_) | Node::Bold(_) => push_word(&mut words, clean_node(ctx, Some(&mut *target), node)),
            Node::Italic(_) => raw_tags.extend(split_tags(&clean_node(ctx, None, node))),
            Node::Text(text) => split_plain_text(text, ctx, &mut words, &mut raw_tags),
            other => ctx.error(
                "unexpected-node",
                format!("{:?} inside a linkage item", other.kind()),
            ),
        }
    }

    for word in words {
        let mut linkage = Linkage {
            word,
            sense: sense.clone(),
            raw_tags: raw_tags.clone(),
            ..Default::default()
        };
        translate_raw_tags(ctx.edition, &mut linkage);
        target.linkages_mut(state.kind).push(linkage);
    }
}

/// `'''word''', '''word''': sense` items: every bold before the colon is a
/// word, everything after it is their shared sense.
fn extract_bold_definitions(ctx: &ExtractContext, target: &mut Entry, nodes: &[Node], state: &LinkageState) {
    let mut words = Vec::new();
    let mut sense_nodes = Vec::new();
    let mut in_sense = false;
    for node in nodes {
        if in_sense {
            sense_nodes.push(node.clone());
            continue;
        }
        match node {
            Node::Bold(_) => push_word(&mut words, clean_node(ctx, Some(&mut *target), node)),
            Node::Text(text) => {
                if let Some((_, after)) = text.split_once(':') {
                    in_sense = true;
                    if !after.trim().is_empty() {
                        sense_nodes.push(Node::Text(after.to_string()));
                    }
                }
            }
            _ => {}
        }
    }
    let sense = clean_nodes(ctx, Some(&mut *target), &sense_nodes);
    let sense = if sense.is_empty() { state.sense.clone() } else { sense };
    for word in words {
        let mut linkage = Linkage::new(word);
        linkage.sense = sense.clone();
        target.linkages_mut(state.kind).push(linkage);
    }
}

/// Remove a leading `label:` from the first text run and return the label.
fn take_label(nodes: &mut Vec<Node>) -> Option<String> {
    let first = nodes.iter().position(|n| !n.is_blank())?;
    let Node::Text(text) = &nodes[first] else {
        return None;
    };
    let caps = KIND_LABEL.captures(text)?;
    let label = caps[1].trim().to_string();
    let rest = text[caps[0].len()..].to_string();
    if rest.trim().is_empty() {
        nodes.remove(first);
    } else {
        nodes[first] = Node::Text(rest);
    }
    Some(label)
}

fn sense_text(ctx: &ExtractContext, template: &Template) -> String {
    let args: Vec<String> = (1..)
        .map_while(|index| template.args.positional(index).map(|_| arg_text(ctx, template, index)))
        .filter(|arg| !arg.is_empty())
        .collect();
    if !args.is_empty() {
        return args.join(", ");
    }
    strip_brackets(render_template(ctx, template).trim_end_matches(':')).to_string()
}

/// Words separated by commas or semicolons in plain text; parenthesised
/// parts are qualifiers.
fn split_plain_text(text: &str, ctx: &ExtractContext, words: &mut Vec<String>, raw_tags: &mut Vec<String>) {
    for caps in PARENTHESES.captures_iter(text) {
        raw_tags.extend(split_tags(&caps[1]));
    }
    let without_qualifiers = PARENTHESES.replace_all(text, "");
    for part in without_qualifiers.split([',', ';']) {
        let word = part.trim().trim_matches(|c: char| c == '.' || c == ':' || c.is_whitespace());
        if word.is_empty() || ctx.edition.gloss.connectives.iter().any(|c| c == word) {
            continue;
        }
        push_word(words, word.to_string());
    }
}

fn push_word(words: &mut Vec<String>, word: String) {
    let word = word.trim();
    if !word.is_empty() {
        words.push(word.to_string());
    }
}
