//! Translation sections.

use lazy_static::lazy_static;
use regex::Regex;

use crate::clean::{clean_node, render_template};
use crate::config::template_key;
use crate::context::ExtractContext;
use crate::extract::{arg_text, label_tags, named_arg_text, split_language_prefix, strip_brackets};
use crate::model::{Entry, Translation};
use crate::tags::translate_raw_tags;
use crate::wikitext::{parse, ArgName, Level, ListItem, Node, Template};

lazy_static! {
    // "영어(en)" language names that carry their code
    static ref NAME_WITH_CODE: Regex = Regex::new(r"^(.*?)\s*\(([A-Za-z]{2,3}(?:-[A-Za-z]+)*)\)\s*$").unwrap();
    static ref PARENTHESES: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
    static ref LATIN_LOWERCASE: Regex = Regex::new(r"[a-z]").unwrap();
}

#[derive(Debug, Clone, Default)]
struct ItemLanguage {
    name: String,
    code: String,
}

pub fn extract_translation_section(ctx: &ExtractContext, target: &mut Entry, level: &Level) {
    let mut sense = String::new();
    for node in level.body() {
        extract_node(ctx, target, node, &mut sense);
    }
}

fn extract_node(ctx: &ExtractContext, target: &mut Entry, node: &Node, sense: &mut String) {
    let vocab = &ctx.edition.templates.translation;
    match node {
        Node::Template(template) => {
            let key = template_key(&template.name);
            if vocab.top.contains(&key) {
                *sense = arg_text(ctx, template, 1);
            } else if vocab.bottom.contains(&key) {
                sense.clear();
            } else if vocab.container.contains(&key) {
                extract_container(ctx, target, template, sense);
            }
        }
        Node::List(list) => {
            for child in &list.children {
                match child {
                    Node::ListItem(item) => extract_item(ctx, target, item, sense, None),
                    child if child.is_blank() => {}
                    other => ctx.error(
                        "unexpected-list-child",
                        format!("{:?} directly inside a translation list", other.kind()),
                    ),
                }
            }
        }
        _ => {}
    }
}

/// Container templates carry a whole translation list in their first
/// arguments; the argument source is parsed again as a page fragment.
fn extract_container(ctx: &ExtractContext, target: &mut Entry, template: &Template, sense: &mut String) {
    for index in [1, 2] {
        let Some(source) = template.args.get(&ArgName::Positional(index)) else {
            continue;
        };
        let fragment = parse(source);
        for node in fragment.children() {
            extract_node(ctx, target, node, sense);
        }
    }
}

fn extract_item(
    ctx: &ExtractContext,
    target: &mut Entry,
    item: &ListItem,
    sense: &str,
    inherited: Option<&ItemLanguage>,
) {
    let (lead, rest) = item.split_lead();
    let (language, nodes) = match split_language_prefix(ctx, lead) {
        Some((name, nodes)) => (Some(item_language(ctx, &name)), nodes),
        None => (inherited.cloned(), lead.to_vec()),
    };

    let vocab = &ctx.edition.templates;
    let mut translations: Vec<Translation> = Vec::new();
    let mut annotation = String::new();
    for node in &nodes {
        match node {
            Node::Template(template) => {
                if vocab.translation.word.contains(&template_key(&template.name)) {
                    annotate(ctx, translations.last_mut(), &std::mem::take(&mut annotation));
                    if let Some(translation) = from_template(ctx, template, language.as_ref()) {
                        translations.push(translation);
                    }
                } else if let Some(first_arg) = vocab.label_first_arg(&template.name) {
                    if let Some(last) = translations.last_mut() {
                        last.raw_tags.extend(label_tags(ctx, template, first_arg));
                    }
                } else {
                    annotation.push_str(&render_template(ctx, template));
                }
            }
            Node::Link(_) | Node::Bold(_) => {
                let word = clean_node(ctx, None, node);
                if word.is_empty() {
                    continue;
                }
                annotate(ctx, translations.last_mut(), &std::mem::take(&mut annotation));
                let language = language.clone().unwrap_or_default();
                translations.push(Translation {
                    lang: language.name,
                    lang_code: language.code,
                    word,
                    ..Default::default()
                });
            }
            other => annotation.push_str(&clean_node(ctx, None, other)),
        }
    }
    annotate(ctx, translations.last_mut(), &annotation);

    for mut translation in translations {
        if translation.lang_code.is_empty() {
            translation.lang_code = "unknown".to_string();
        }
        translation.sense = sense.to_string();
        translate_raw_tags(ctx.edition, &mut translation);
        target.translations.push(translation);
    }

    for list in rest.iter().filter_map(Node::as_list) {
        for child in list.items() {
            extract_item(ctx, target, child, sense, language.as_ref());
        }
    }
}

fn item_language(ctx: &ExtractContext, name: &str) -> ItemLanguage {
    if let Some(caps) = NAME_WITH_CODE.captures(name) {
        return ItemLanguage {
            name: caps[1].to_string(),
            code: caps[2].to_string(),
        };
    }
    ItemLanguage {
        name: name.to_string(),
        code: ctx.edition.lang_code(name).unwrap_or("unknown").to_string(),
    }
}

/// `{{t|code|word|tr=...}}`
fn from_template(ctx: &ExtractContext, template: &Template, language: Option<&ItemLanguage>) -> Option<Translation> {
    let word = arg_text(ctx, template, 2);
    if word.is_empty() {
        return None;
    }
    let code = template.args.positional(1).unwrap_or_default().trim().to_string();
    let lang = match language {
        Some(language) if language.code == code || code.is_empty() => language.name.clone(),
        _ => ctx
            .edition
            .lang_name(&code)
            .map(str::to_string)
            .or_else(|| language.map(|l| l.name.clone()))
            .unwrap_or_default(),
    };
    let code = if code.is_empty() {
        language.map(|l| l.code.clone()).unwrap_or_default()
    } else {
        code
    };
    let mut roman = named_arg_text(ctx, template, "tr");
    if roman.is_empty() {
        roman = arg_text(ctx, template, 4);
    }
    Some(Translation {
        lang,
        lang_code: code,
        word,
        roman,
        ..Default::default()
    })
}

/// Text after a word: parenthesised text the raw-tag table knows is a raw
/// tag; other Latin text after a non-Latin word is its romanisation.
fn annotate(ctx: &ExtractContext, translation: Option<&mut Translation>, text: &str) {
    let Some(translation) = translation else {
        return;
    };
    for caps in PARENTHESES.captures_iter(text) {
        let inner = strip_brackets(&caps[1]).to_string();
        if inner.is_empty() {
            continue;
        }
        let is_romanisation = translation.roman.is_empty()
            && ctx.edition.canonical_tags(&inner).is_none()
            && !translation.word.chars().any(|c| c.is_ascii_alphabetic())
            && LATIN_LOWERCASE.is_match(&inner);
        if is_romanisation {
            translation.roman = inner;
        } else {
            translation.raw_tags.push(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;

    fn extract(edition: &Edition, body: &str) -> Entry {
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(edition, &store, "kucing");
        let root = parse(&format!("====Terjemahan====\n{}", body));
        let level = root.levels().next().unwrap();
        let mut entry = Entry::default();
        extract_translation_section(&ctx, &mut entry, level);
        entry
    }

    #[test]
    fn sense_blocks_and_word_templates() {
        let edition = Edition::builtin("ms").unwrap();
        let entry = extract(
            &edition,
            "{{ter-atas|haiwan}}\n* Inggeris: {{t+|en|cat}}\n* Jepun: {{t|ja|猫|tr=neko}}\n{{ter-bawah}}\n* Perancis: {{t|fr|chat}}",
        );
        let words: Vec<_> = entry.translations.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["cat", "猫", "chat"]);
        assert_eq!(entry.translations[0].lang, "Inggeris");
        assert_eq!(entry.translations[0].lang_code, "en");
        assert_eq!(entry.translations[0].sense, "haiwan");
        assert_eq!(entry.translations[1].roman, "neko");
        assert_eq!(entry.translations[2].sense, "");
    }

    #[test]
    fn link_items_resolve_language_by_name() {
        let edition = Edition::builtin("ms").unwrap();
        let entry = extract(&edition, "* [[bahasa Jepun|Jepun]]: [[猫]] (neko), [[ネコ]] (formal)");
        assert_eq!(entry.translations.len(), 2);
        assert_eq!(entry.translations[0].lang_code, "ja");
        assert_eq!(entry.translations[0].roman, "neko");
        assert_eq!(entry.translations[1].word, "ネコ");
        assert_eq!(entry.translations[1].tags, vec!["formal"]);
    }

    #[test]
    fn language_with_code_in_name() {
        let edition = Edition::builtin("ms").unwrap();
        let entry = extract(&edition, "* 영어(en): [[cat]]");
        assert_eq!(entry.translations[0].lang, "영어");
        assert_eq!(entry.translations[0].lang_code, "en");
    }

    #[test]
    fn nested_items_inherit_language() {
        let edition = Edition::builtin("ms").unwrap();
        let entry = extract(&edition, "* Cina:\n*: Mandarin: {{t|cmn|貓|tr=māo}}\n*: [[猫]]");
        assert_eq!(entry.translations.len(), 2);
        assert_eq!(entry.translations[0].lang_code, "cmn");
        assert_eq!(entry.translations[1].lang, "Cina");
        assert_eq!(entry.translations[1].lang_code, "zh");
    }

    #[test]
    fn container_template_is_reparsed() {
        let mut edition = Edition::builtin("ms").unwrap();
        edition.templates.translation.container.push("terjemahan".into());
        let entry = extract(&edition, "{{terjemahan|\n* Inggeris: [[cat]]\n* Jerman: [[Katze]]\n}}");
        let codes: Vec<_> = entry.translations.iter().map(|t| t.lang_code.as_str()).collect();
        assert_eq!(codes, vec!["en", "de"]);
    }
}
