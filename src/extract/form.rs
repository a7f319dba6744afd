//! Forms: alternative-form sections and the head line of a part-of-speech
//! section.

use crate::clean::{clean_node, clean_nodes};
use crate::context::ExtractContext;
use crate::extract::{arg_text, args_text_from, body_blocks, label_tags, Block};
use crate::model::{push_unique, Entry, Form};
use crate::tags::translate_raw_tags;
use crate::wikitext::{Level, List, Node, Template};

/// Every comma-separated word of the section becomes a form with the
/// section's tags.
pub fn extract_form_section(ctx: &ExtractContext, target: &mut Entry, level: &Level, tags: &[String]) {
    for block in body_blocks(level.body()) {
        match block {
            Block::Line(line) => forms_from_nodes(ctx, target, &line, tags),
            Block::List(list) => forms_from_list(ctx, target, list, tags),
        }
    }
}

fn forms_from_list(ctx: &ExtractContext, target: &mut Entry, list: &List, tags: &[String]) {
    for item in list.items() {
        forms_from_nodes(ctx, target, item.split_lead().0, tags);
        for nested in item.lists() {
            forms_from_list(ctx, target, nested, tags);
        }
    }
}

fn forms_from_nodes(ctx: &ExtractContext, target: &mut Entry, nodes: &[Node], tags: &[String]) {
    let text = clean_nodes(ctx, Some(&mut *target), nodes);
    for part in text.split([',', ';', '\n']) {
        let form = part.trim();
        if form.is_empty() || target.forms.iter().any(|f| f.form == form) {
            continue;
        }
        let mut form = Form {
            form: form.to_string(),
            tags: tags.to_vec(),
            ..Default::default()
        };
        translate_raw_tags(ctx.edition, &mut form);
        target.forms.push(form);
    }
}

/// Head line: everything before the first gloss list. Head templates give
/// forms and entry tags, label templates entry raw tags, and an italic
/// label followed by a bold or linked word a form with that raw tag.
pub fn extract_head_line(ctx: &ExtractContext, entry: &mut Entry, nodes: &[Node]) {
    let vocab = &ctx.edition.templates;
    let mut pending_label: Option<String> = None;
    for node in nodes {
        match node {
            Node::Template(template) => {
                if vocab.head(&template.name).is_some() {
                    extract_head_template(ctx, entry, template);
                } else if let Some(first_arg) = vocab.label_first_arg(&template.name) {
                    for tag in label_tags(ctx, template, first_arg) {
                        push_unique(&mut entry.raw_tags, &tag);
                    }
                } else {
                    // topic and category templates
                    clean_node(ctx, Some(&mut *entry), node);
                }
            }
            Node::Italic(_) => {
                let label = clean_node(ctx, None, node);
                if !label.is_empty() {
                    pending_label = Some(label);
                }
            }
            Node::Bold(_) | Node::Link(_) => {
                let word = clean_node(ctx, Some(&mut *entry), node);
                if word.is_empty() || word == ctx.page_title {
                    continue;
                }
                if let Some(label) = pending_label.take() {
                    push_form(ctx, entry, word, Vec::new(), vec![label]);
                }
            }
            _ => {}
        }
    }
}

fn extract_head_template(ctx: &ExtractContext, entry: &mut Entry, template: &Template) {
    let Some(head) = ctx.edition.templates.head(&template.name) else {
        return;
    };
    for tag in &head.tags {
        push_unique(&mut entry.tags, tag);
    }
    let before = entry.forms.len();
    if let Some(first) = head.pairs_from {
        let mut index = first;
        while template.args.positional(index).is_some() || template.args.positional(index + 1).is_some() {
            let raw_tag = arg_text(ctx, template, index);
            let form = arg_text(ctx, template, index + 1);
            index += 2;
            if form.is_empty() {
                continue;
            }
            let raw_tags = if raw_tag.is_empty() { Vec::new() } else { vec![raw_tag] };
            push_form(ctx, entry, form, Vec::new(), raw_tags);
        }
    }
    if let Some(first) = head.forms_from {
        let mut index = first;
        while template.args.positional(index).is_some() {
            let form = arg_text(ctx, template, index);
            index += 1;
            if !form.is_empty() && form != ctx.page_title {
                push_form(ctx, entry, form, head.form_tags.clone(), Vec::new());
            }
        }
        if entry.forms.len() == before {
            ctx.warning(
                "template-without-forms",
                format!("{{{{{}}}}} gave no forms", template.name),
            );
        }
    }
    if let Some(first) = head.classifiers_from {
        for classifier in args_text_from(ctx, template, first) {
            push_unique(&mut entry.classifiers, &classifier);
        }
    }
}

fn push_form(ctx: &ExtractContext, entry: &mut Entry, form: String, tags: Vec<String>, raw_tags: Vec<String>) {
    let mut form = Form {
        form,
        tags,
        raw_tags,
        ..Default::default()
    };
    translate_raw_tags(ctx.edition, &mut form);
    if !entry.forms.contains(&form) {
        entry.forms.push(form);
    }
}
