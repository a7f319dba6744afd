//! Text cleaner: nodes to plain display text.
//!
//! Cleaning also reports category links to an optional sink, which is how a
//! gloss or a heading adds categories to the sense or entry it belongs to.
//! Templates go through the caller's hook first; when the hook declines, the
//! template store expands them and the expansion is rendered in turn.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::context::ExtractContext;
use crate::model::{push_unique, Entry, Sense};
use crate::wikitext::{parse, Link, Node, Template};

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref REF_TAG: Regex = Regex::new(r"(?is)<ref[^>/]*/>|<ref[^>]*>.*?</ref>").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"</?[a-zA-Z][^>]*>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref SPACES: Regex = Regex::new(r"[ \t\u{00a0}]+").unwrap();
}

/// Template expansions nest at most this deep.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Receives side-channel data produced while cleaning.
pub trait CleanSink {
    fn add_category(&mut self, category: &str);
}

impl CleanSink for Entry {
    fn add_category(&mut self, category: &str) {
        Entry::add_category(self, category);
    }
}

impl CleanSink for Sense {
    fn add_category(&mut self, category: &str) {
        push_unique(&mut self.categories, category);
    }
}

/// Collects categories for a record that does not exist yet.
#[derive(Debug, Default)]
pub struct Categories(pub Vec<String>);

impl CleanSink for Categories {
    fn add_category(&mut self, category: &str) {
        push_unique(&mut self.0, category);
    }
}

/// Hook consulted for every template: `Some(wikitext)` replaces the
/// template, `None` falls back to the default expansion.
pub type TemplateHook<'h> = dyn FnMut(&Template) -> Option<String> + 'h;

pub fn clean_nodes(ctx: &ExtractContext, sink: Option<&mut dyn CleanSink>, nodes: &[Node]) -> String {
    clean_nodes_with(ctx, sink, nodes, &mut |_| None)
}

pub fn clean_node(ctx: &ExtractContext, sink: Option<&mut dyn CleanSink>, node: &Node) -> String {
    clean_nodes(ctx, sink, std::slice::from_ref(node))
}

pub fn clean_nodes_with(
    ctx: &ExtractContext,
    sink: Option<&mut dyn CleanSink>,
    nodes: &[Node],
    hook: &mut TemplateHook<'_>,
) -> String {
    let mut renderer = Renderer {
        ctx,
        hook,
        categories: Vec::new(),
    };
    let mut raw = String::new();
    renderer.render_nodes(nodes, 0, &mut raw);
    if let Some(sink) = sink {
        for category in &renderer.categories {
            sink.add_category(category);
        }
    }
    finish(&raw)
}

/// Render one template the way the cleaner would, without a hook.
pub fn render_template(ctx: &ExtractContext, template: &Template) -> String {
    clean_nodes(ctx, None, &[Node::Template(template.clone())])
}

struct Renderer<'c, 'e, 'h, 'f> {
    ctx: &'c ExtractContext<'e>,
    hook: &'h mut TemplateHook<'f>,
    categories: Vec<String>,
}

impl Renderer<'_, '_, '_, '_> {
    fn render_nodes(&mut self, nodes: &[Node], depth: usize, out: &mut String) {
        for node in nodes {
            self.render_node(node, depth, out);
        }
    }

    fn render_node(&mut self, node: &Node, depth: usize, out: &mut String) {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Root(children) | Node::Italic(children) | Node::Bold(children) => {
                self.render_nodes(children, depth, out)
            }
            Node::Level(level) => {
                out.push('\n');
                self.render_nodes(&level.title, depth, out);
                out.push('\n');
                self.render_nodes(&level.children, depth, out);
            }
            Node::List(list) => self.render_nodes(&list.children, depth, out),
            Node::ListItem(item) => {
                out.push('\n');
                self.render_nodes(&item.children, depth, out);
                out.push('\n');
            }
            Node::Link(link) => self.render_link(link, depth, out),
            Node::Template(template) => self.render_template(template, depth, out),
        }
    }

    fn render_link(&mut self, link: &Link, depth: usize, out: &mut String) {
        if let Some(target) = link.target.strip_prefix(':') {
            // [[:Category:X]] links to the category page, no membership
            if link.display.is_empty() {
                out.push_str(target);
            } else {
                self.render_nodes(&link.display, depth, out);
            }
            return;
        }
        if let Some(category) = self.ctx.edition.category_name(&link.target) {
            push_unique(&mut self.categories, category);
            return;
        }
        if let Some((namespace, _)) = link.target.split_once(':') {
            if matches!(namespace.trim().to_lowercase().as_str(), "file" | "image" | "fail" | "imej") {
                return;
            }
        }
        if link.display.is_empty() {
            out.push_str(&link.target);
        } else {
            self.render_nodes(&link.display, depth, out);
        }
    }

    fn render_template(&mut self, template: &Template, depth: usize, out: &mut String) {
        if depth >= MAX_EXPANSION_DEPTH {
            self.ctx.warning_once(
                "template-depth",
                &template.name,
                format!("Template expansion too deep at {{{{{}}}}}", template.name),
            );
            return;
        }
        let replacement = match (self.hook)(template) {
            Some(replacement) => replacement,
            None => match template.name.as_str() {
                "PAGENAME" | "SUBPAGENAME" | "FULLPAGENAME" => {
                    out.push_str(&self.ctx.page_title);
                    return;
                }
                "!" => {
                    out.push('|');
                    return;
                }
                _ => match self.ctx.templates.expand(template) {
                    Some(expanded) => expanded,
                    None => return,
                },
            },
        };
        if !self.ctx.take_expansion() {
            self.ctx.warning_once(
                "template-budget",
                &template.name,
                format!("Expansion budget spent at {{{{{}}}}}", template.name),
            );
            return;
        }
        let tree = parse(&replacement);
        self.render_node(&tree, depth + 1, out);
    }
}

/// Strip markup left over after rendering and normalise whitespace.
pub fn finish(raw: &str) -> String {
    let text = LINE_BREAK.replace_all(raw, "\n");
    let text = REF_TAG.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text: String = text.nfc().collect();

    let mut lines = Vec::new();
    for line in text.lines() {
        let line = SPACES.replace_all(line, " ");
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00a0}'),
                "ndash" => Some('–'),
                "mdash" => Some('—'),
                "hellip" => Some('…'),
                _ => {
                    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;
    use crate::wikitext::parse_inline;

    #[test]
    fn self_doubling_template_is_cut_off_once() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new().with("x", "{{x}}{{x}}");
        let ctx = ExtractContext::new(&edition, &store, "kucing");
        assert_eq!(clean_nodes(&ctx, None, &parse_inline("a {{x}}")), "a");
        assert_eq!(clean_nodes(&ctx, None, &parse_inline("b {{x}}")), "b");
        assert_eq!(ctx.expansions(), crate::context::MAX_PAGE_EXPANSIONS);
        let codes: Vec<_> = ctx.into_diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["template-depth", "template-budget"]);
    }

    fn clean(store: &TemplateStore, text: &str) -> (String, Vec<String>) {
        let edition = Edition::builtin("ms").unwrap();
        let ctx = ExtractContext::new(&edition, store, "kucing");
        let mut categories = Categories::default();
        let out = clean_nodes(&ctx, Some(&mut categories), &parse_inline(text));
        (out, categories.0)
    }

    #[test]
    fn links_render_display_or_target() {
        let store = TemplateStore::new();
        let (out, _) = clean(&store, "[[zaman|Zaman]] yang [[akan#Melayu]] datang");
        assert_eq!(out, "Zaman yang akan datang");
    }

    #[test]
    fn category_links_go_to_sink() {
        let store = TemplateStore::new();
        let (out, categories) = clean(&store, "haiwan[[Kategori:Haiwan]]");
        assert_eq!(out, "haiwan");
        assert_eq!(categories, vec!["Haiwan"]);
    }

    #[test]
    fn colon_link_is_not_a_membership() {
        let store = TemplateStore::new();
        let (out, categories) = clean(&store, "[[:Kategori:Haiwan]]");
        assert_eq!(out, "Kategori:Haiwan");
        assert!(categories.is_empty());
    }

    #[test]
    fn templates_expand_through_store() {
        let store = TemplateStore::new().with("konteks", "({{{2}}})[[Kategori:{{{2}}}]]");
        let (out, categories) = clean(&store, "{{konteks|ms|kiasan}} orang jahat");
        assert_eq!(out, "(kiasan) orang jahat");
        assert_eq!(categories, vec!["kiasan"]);
    }

    #[test]
    fn unknown_templates_render_empty() {
        let store = TemplateStore::new();
        let (out, _) = clean(&store, "a {{nothing|x}} b");
        assert_eq!(out, "a b");
    }

    #[test]
    fn hook_replaces_template() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "kucing");
        let mut seen = Vec::new();
        let out = clean_nodes_with(&ctx, None, &parse_inline("x {{syn|ms|a}} y"), &mut |t| {
            seen.push(t.name.clone());
            Some(String::new())
        });
        assert_eq!(out, "x y");
        assert_eq!(seen, vec!["syn"]);
    }

    #[test]
    fn recursive_template_stops() {
        let store = TemplateStore::new().with("loop", "a{{loop}}");
        let (out, _) = clean(&store, "{{loop}}");
        assert_eq!(out, "a".repeat(MAX_EXPANSION_DEPTH));
    }

    #[test]
    fn html_and_entities() {
        let store = TemplateStore::new();
        let (out, _) = clean(&store, "<span class=\"x\">a&nbsp;&amp;&#98;</span><ref>note</ref>");
        assert_eq!(out, "a &b");
    }

    #[test]
    fn pagename_magic_word() {
        let store = TemplateStore::new();
        let (out, _) = clean(&store, "{{PAGENAME}}");
        assert_eq!(out, "kucing");
    }
}
