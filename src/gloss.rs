//! Gloss/sense extraction for part-of-speech sections.
//!
//! The gloss list is walked item by item. Each item is processed against a
//! snapshot of the sense inherited from its parent item: the snapshot is
//! cloned, extended with the item's own lead (tags, gloss text, inline
//! examples) and handed down to nested gloss lists as a fresh value, so
//! sibling branches never see each other's additions. Only leaves are
//! committed; a parent item is committed on its own only when none of its
//! nested lists produced a sense.

use crate::classify::linkage_kind;
use crate::clean::{clean_node, clean_nodes, clean_nodes_with, render_template};
use crate::config::MeaningTemplate;
use crate::context::ExtractContext;
use crate::extract::example::{example_from_template, extract_example_item};
use crate::extract::form::extract_head_line;
use crate::extract::linkage::{shorthand_linkages, PendingLinkages};
use crate::extract::{args_text_from, body_blocks, label_tags, split_tags, strip_brackets, Block};
use crate::model::{push_unique, Entry, Linkage, Sense, NO_GLOSS_TAG};
use crate::tags::translate_raw_tags;
use crate::wikitext::{parse_inline, ArgName, Level, List, ListItem, Node, Template};

/// Classification of the heading being extracted.
#[derive(Debug, Clone, Copy)]
pub struct PosSection<'s> {
    /// Cleaned heading title.
    pub title: &'s str,
    pub pos: &'s str,
    pub tags: &'s [String],
}

/// Build the entry for one part-of-speech heading, cloned from `base`.
///
/// Returns `None` when the heading yields no entry of its own: a title that
/// is also a linkage title and has no gloss list (the caller treats it as a
/// linkage section), or a heading whose only content is sub-headings.
pub fn extract_pos_section(
    ctx: &ExtractContext,
    base: &Entry,
    level: &Level,
    section: &PosSection,
) -> Option<Entry> {
    let edition = ctx.edition;
    let body: Vec<&Node> = level.body().collect();
    let first_gloss = body
        .iter()
        .position(|node| matches!(node, Node::List(list) if edition.is_gloss_marker(&list.marker)));

    if first_gloss.is_none() {
        if linkage_kind(edition, section.title).is_some() {
            return None;
        }
        if body.iter().all(|node| node.is_blank()) && level.levels().next().is_some() {
            ctx.debug(
                "container-section",
                format!("{} only holds sub-headings", section.title),
            );
            return None;
        }
    }

    let mut entry = base.clone();
    entry.pos = section.pos.to_string();
    entry.pos_title = section.title.to_string();
    for tag in section.tags {
        push_unique(&mut entry.tags, tag);
    }

    let mut walk = GlossWalk {
        ctx,
        linkages: Vec::new(),
    };
    match first_gloss {
        Some(first) => {
            let head: Vec<Node> = body[..first].iter().map(|node| (*node).clone()).collect();
            extract_head_line(ctx, &mut entry, &head);
            let mut counter = 0;
            for node in &body[first..] {
                let Node::List(list) = node else {
                    continue;
                };
                if edition.is_gloss_marker(&list.marker) {
                    let senses = walk.process_list(list, "", &Sense::default(), &mut counter);
                    entry.senses.extend(senses);
                } else if edition.is_example_marker(&list.marker) && !entry.senses.is_empty() {
                    // an example list cut off from its gloss by a blank line
                    walk.attach_examples(&mut entry, list);
                } else {
                    ctx.debug(
                        "stray-list",
                        format!("`{}` list in {}", list.marker, section.title),
                    );
                }
            }
            if entry.senses.is_empty() {
                ctx.error(
                    "empty-gloss-list",
                    format!("{} has a gloss list but no senses", section.title),
                );
                entry.senses.push(Sense::no_gloss());
            }
        }
        None => {
            let sense = walk.implicit_sense(&mut entry, level);
            entry.senses.push(sense);
        }
    }
    walk.finish(&mut entry);
    Some(entry)
}

struct GlossWalk<'c, 'a> {
    ctx: &'c ExtractContext<'a>,
    /// Linkage shorthand met inside glosses, owned by the entry.
    linkages: PendingLinkages,
}

/// Outcome of one template in a gloss lead.
enum Lead {
    /// Taken as data (tag, example, linkage, classifier); no gloss text.
    Consumed,
    /// Part of the gloss text.
    Gloss,
}

impl GlossWalk<'_, '_> {
    fn process_list(
        &mut self,
        list: &List,
        parent_index: &str,
        inherited: &Sense,
        counter: &mut usize,
    ) -> Vec<Sense> {
        let mut senses = Vec::new();
        for child in &list.children {
            match child {
                Node::ListItem(item) => {
                    *counter += 1;
                    let index = if parent_index.is_empty() {
                        counter.to_string()
                    } else {
                        format!("{}.{}", parent_index, counter)
                    };
                    senses.extend(self.process_item(item, index, inherited));
                }
                child if child.is_blank() => {}
                other => self.ctx.error(
                    "unexpected-list-child",
                    format!("{:?} directly inside a gloss list", other.kind()),
                ),
            }
        }
        senses
    }

    fn process_item(&mut self, item: &ListItem, index: String, inherited: &Sense) -> Vec<Sense> {
        let edition = self.ctx.edition;
        let mut sense = inherited.clone();
        if edition.gloss.number_senses {
            sense.sense_index = index.clone();
        }
        let (lead, rest) = item.split_lead();
        let found = self.process_lead(lead, &mut sense);
        // children extend this snapshot, never `sense` itself
        let seed = sense.clone();

        let mut leaves = Vec::new();
        let mut counter = 0;
        for node in rest {
            match node {
                Node::List(list) if edition.is_example_marker(&list.marker) => {
                    for example in list.items() {
                        extract_example_item(self.ctx, &mut sense, example, &mut self.linkages);
                    }
                }
                Node::List(list) if edition.is_gloss_marker(&list.marker) => {
                    leaves.extend(self.process_list(list, &index, &seed, &mut counter));
                }
                Node::List(list) => self.ctx.debug(
                    "stray-list",
                    format!("`{}` list below gloss {}", list.marker, index),
                ),
                other if other.is_blank() => {}
                other => self.ctx.error(
                    "unexpected-item-child",
                    format!("{:?} after a nested list", other.kind()),
                ),
            }
        }

        if !leaves.is_empty() {
            return leaves;
        }
        if found || sense.is_no_gloss() {
            return vec![self.commit(sense)];
        }
        Vec::new()
    }

    /// Read a gloss lead into `sense`: tags, inline examples and linkages
    /// are taken out, the rest is cleaned into one gloss. Returns whether a
    /// gloss was found.
    fn process_lead(&mut self, lead: &[Node], sense: &mut Sense) -> bool {
        let ctx = self.ctx;
        let vocab = &ctx.edition.templates;
        let mark = self.linkages.len();
        let glosses_before = sense.glosses.len();

        let mut nodes: Vec<Node> = Vec::with_capacity(lead.len());
        let mut scanning = true;
        let mut stripped_front = false;
        for node in lead {
            let Node::Template(template) = node else {
                if !is_tag_separator(node) {
                    scanning = false;
                }
                nodes.push(node.clone());
                continue;
            };
            match self.lead_template(template, sense, scanning) {
                Lead::Consumed => {
                    if nodes.iter().all(Node::is_blank) {
                        stripped_front = true;
                    }
                }
                Lead::Gloss => {
                    scanning = false;
                    nodes.push(node.clone());
                }
            }
        }
        if stripped_front {
            trim_leading_connectives(&mut nodes, &ctx.edition.gloss.connectives);
        }

        let mut diverted: PendingLinkages = Vec::new();
        let gloss = clean_nodes_with(ctx, Some(&mut *sense), &nodes, &mut |template| {
            if let Some(linkage) = vocab.linkage(&template.name) {
                for found in shorthand_linkages(ctx, template, linkage.first_arg) {
                    diverted.push((linkage.kind, found));
                }
                return Some(String::new());
            }
            if vocab.is_ignored(&template.name) {
                return Some(String::new());
            }
            None
        });
        self.linkages.extend(diverted);
        for (_, linkage) in &mut self.linkages[mark..] {
            if linkage.sense.is_empty() {
                linkage.sense = gloss.clone();
            }
            linkage.sense_index = sense.sense_index.clone();
        }

        if gloss.is_empty() {
            // a named-parameter template may have supplied the gloss
            return sense.glosses.len() > glosses_before;
        }
        sense.glosses.push(gloss);
        true
    }

    fn lead_template(&mut self, template: &Template, sense: &mut Sense, scanning: bool) -> Lead {
        let ctx = self.ctx;
        let vocab = &ctx.edition.templates;
        let name = &template.name;
        if vocab.is_no_gloss(name) {
            push_unique(&mut sense.tags, NO_GLOSS_TAG);
        } else if vocab.is_ignored(name) {
        } else if let Some(meaning) = vocab.meaning(name) {
            self.meaning_template(template, meaning, sense);
        } else if let Some(spec) = vocab.example(name) {
            let example = example_from_template(ctx, template, spec);
            if !example.is_empty() {
                sense.examples.push(example);
            }
        } else if let Some(linkage) = vocab.linkage(name) {
            for found in shorthand_linkages(ctx, template, linkage.first_arg) {
                self.linkages.push((linkage.kind, found));
            }
        } else if let Some(first_arg) = vocab.label_first_arg(name) {
            sense.raw_tags.extend(label_tags(ctx, template, first_arg));
        } else if let Some(first_arg) = vocab.classifier_first_arg(name) {
            for classifier in args_text_from(ctx, template, first_arg) {
                push_unique(&mut sense.classifiers, &classifier);
            }
        } else if let Some(tag) = vocab.tag_gloss(name) {
            // {{нареч.}} stays in the gloss text
            push_unique(&mut sense.tags, tag);
            return Lead::Gloss;
        } else if !scanning {
            return Lead::Gloss;
        } else if let Some(raw_tag) = self.shorthand_tag(template) {
            sense.raw_tags.push(raw_tag);
        } else if let Some(raw_tag) = self.bracketed_tag(template) {
            sense.raw_tags.push(raw_tag);
        } else {
            return Lead::Gloss;
        }
        Lead::Consumed
    }

    /// `{{значение|определение=...|пометы=...|синонимы=...}}`: the sense is
    /// read from named parameters. Linkage words get the template's own
    /// gloss as their sense, or the lead's gloss when it has none.
    fn meaning_template(&mut self, template: &Template, meaning: &MeaningTemplate, sense: &mut Sense) {
        let ctx = self.ctx;
        let param = |name: &str| {
            if name.is_empty() {
                Vec::new()
            } else {
                template.args.nodes(&ArgName::Named(name.to_string()))
            }
        };

        let gloss = clean_nodes(ctx, Some(&mut *sense), &param(&meaning.gloss));
        if !gloss.is_empty() {
            sense.glosses.push(gloss.clone());
        }

        let suffix = ctx.edition.gloss.tag_shorthand_suffix.as_str();
        for node in param(&meaning.tags) {
            let text = match &node {
                Node::Template(tag) => self.shorthand_tag(tag).unwrap_or_else(|| render_template(ctx, tag)),
                other => clean_node(ctx, None, other),
            };
            for raw_tag in split_tags(&text) {
                let raw_tag = raw_tag.strip_suffix(suffix).unwrap_or(raw_tag.as_str()).trim();
                push_unique(&mut sense.raw_tags, raw_tag);
            }
        }

        for node in param(&meaning.examples) {
            let Node::Template(inner) = &node else {
                continue;
            };
            if let Some(spec) = ctx.edition.templates.example(&inner.name) {
                let example = example_from_template(ctx, inner, spec);
                if !example.is_empty() {
                    sense.examples.push(example);
                }
            }
        }

        // in source order
        for arg in template.args.iter() {
            let ArgName::Named(key) = &arg.name else {
                continue;
            };
            let Some(kind) = meaning.linkages.get(key.trim()) else {
                continue;
            };
            let words = clean_nodes(ctx, None, &parse_inline(&arg.value));
            for word in words.split([',', ';']).map(str::trim) {
                if word.is_empty() || word == "-" {
                    continue;
                }
                let mut linkage = Linkage::new(word);
                linkage.sense = gloss.clone();
                self.linkages.push((*kind, linkage));
            }
        }
    }

    /// `{{разг.}}`: a template whose name ends with the edition's shorthand
    /// suffix is a tag. The rendering is the raw tag when there is one.
    fn shorthand_tag(&self, template: &Template) -> Option<String> {
        let suffix = self.ctx.edition.gloss.tag_shorthand_suffix.as_str();
        if suffix.is_empty() {
            return None;
        }
        let bare = template.name.trim().strip_suffix(suffix)?.trim();
        if bare.is_empty() {
            return None;
        }
        let rendered = render_template(self.ctx, template);
        let shown = strip_brackets(&rendered);
        let shown = shown.strip_suffix(suffix).unwrap_or(shown).trim();
        Some(if shown.is_empty() { bare } else { shown }.to_string())
    }

    /// A template that renders to bracketed text, for editions whose tag
    /// templates all look like `(countable)`.
    fn bracketed_tag(&self, template: &Template) -> Option<String> {
        if !self.ctx.edition.gloss.bracketed_templates_are_tags {
            return None;
        }
        let rendered = render_template(self.ctx, template);
        if !rendered.ends_with([')', ']']) {
            return None;
        }
        let tag = rendered.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
        if tag.is_empty() {
            return None;
        }
        Some(tag.to_string())
    }

    /// Sense of a section without a gloss list: the head line is split off,
    /// everything else is one gloss.
    fn implicit_sense(&mut self, entry: &mut Entry, level: &Level) -> Sense {
        let ctx = self.ctx;
        let mut blocks = body_blocks(level.body());
        if matches!(blocks.first(), Some(Block::Line(line)) if is_head_line(ctx, line)) {
            if let Block::Line(line) = blocks.remove(0) {
                extract_head_line(ctx, entry, &line);
            }
        }

        let mut nodes = Vec::new();
        for block in blocks {
            match block {
                Block::Line(line) => {
                    if !nodes.is_empty() {
                        nodes.push(Node::Text("\n".to_string()));
                    }
                    nodes.extend(line);
                }
                Block::List(list) => nodes.push(Node::List(list.clone())),
            }
        }

        let mut sense = Sense::default();
        if ctx.edition.gloss.number_senses {
            sense.sense_index = "1".to_string();
        }
        let found = self.process_lead(&nodes, &mut sense);
        if let Some(gloss) = sense.glosses.last_mut() {
            *gloss = gloss.split('\n').collect::<Vec<_>>().join(" ");
        }
        if !found {
            push_unique(&mut sense.tags, NO_GLOSS_TAG);
        }
        self.commit(sense)
    }

    fn attach_examples(&mut self, entry: &mut Entry, list: &List) {
        let Some(sense) = entry.senses.last_mut() else {
            return;
        };
        for item in list.items() {
            extract_example_item(self.ctx, sense, item, &mut self.linkages);
        }
    }

    fn commit(&self, mut sense: Sense) -> Sense {
        if !sense.glosses.is_empty() {
            sense.tags.retain(|tag| tag != NO_GLOSS_TAG);
            sense.raw_tags.retain(|tag| tag != NO_GLOSS_TAG);
        }
        translate_raw_tags(self.ctx.edition, &mut sense);
        sense
    }

    fn finish(self, entry: &mut Entry) {
        for (kind, mut linkage) in self.linkages {
            translate_raw_tags(self.ctx.edition, &mut linkage);
            entry.linkages_mut(kind).push(linkage);
        }
        translate_raw_tags(self.ctx.edition, entry);
    }
}

/// Text that may sit between tag templates without ending the tag run.
fn is_tag_separator(node: &Node) -> bool {
    matches!(node, Node::Text(text) if text.chars().all(|c| c.is_whitespace() || c.is_ascii_punctuation()))
}

/// A head line: head templates, bold words and their qualifiers, nothing
/// that reads as prose.
fn is_head_line(ctx: &ExtractContext, line: &[Node]) -> bool {
    let vocab = &ctx.edition.templates;
    let mut has_head = false;
    for node in line {
        match node {
            Node::Template(template) => {
                if vocab.head(&template.name).is_some() {
                    has_head = true;
                } else if vocab.label_first_arg(&template.name).is_none() && !vocab.is_topic(&template.name) {
                    return false;
                }
            }
            Node::Bold(_) => has_head = true,
            Node::Italic(_) | Node::Link(_) => {}
            node if is_tag_separator(node) => {}
            _ => return false,
        }
    }
    has_head
}

/// Drop connectives left at the front once leading tags are gone:
/// `{{lb|ms|kiasan}}, orang jahat` keeps `orang jahat`.
fn trim_leading_connectives(nodes: &mut Vec<Node>, connectives: &[String]) {
    while let Some(Node::Text(text)) = nodes.first_mut() {
        let rest = strip_connectives(text, connectives);
        if rest.trim().is_empty() {
            nodes.remove(0);
            continue;
        }
        *text = rest.to_string();
        break;
    }
}

fn strip_connectives<'t>(text: &'t str, connectives: &[String]) -> &'t str {
    let mut rest = text.trim_start();
    'strip: loop {
        for connective in connectives {
            let Some(after) = rest.strip_prefix(connective.as_str()) else {
                continue;
            };
            let is_word = connective.chars().all(char::is_alphanumeric);
            if is_word && after.chars().next().is_some_and(char::is_alphanumeric) {
                continue;
            }
            rest = after.trim_start();
            continue 'strip;
        }
        return rest;
    }
}
