//! Examples attached to a sense: `#:`/`#*` items, inline example templates
//! and quotation templates.

use crate::clean::{clean_nodes, render_template};
use crate::config::{arg_by_ref, ExampleTemplate};
use crate::context::ExtractContext;
use crate::extract::linkage::{shorthand_linkages, PendingLinkages};
use crate::model::{Example, Sense};
use crate::wikitext::{parse_inline, ListItem, Node, Template};

/// One item of an example list under a gloss.
///
/// The item's own text is the example; nested items hold the translation
/// (or, below a quotation template, the quoted text and then its
/// translation). Linkage shorthand found here is diverted to `linkages`
/// with the current gloss as its sense.
pub fn extract_example_item(
    ctx: &ExtractContext,
    sense: &mut Sense,
    item: &ListItem,
    linkages: &mut PendingLinkages,
) {
    let vocab = &ctx.edition.templates;
    let (lead, rest) = item.split_lead();

    let mut example = Example::default();
    let mut text_nodes = Vec::with_capacity(lead.len());
    for node in lead {
        if let Node::Template(template) = node {
            if let Some(linkage) = vocab.linkage(&template.name) {
                for mut found in shorthand_linkages(ctx, template, linkage.first_arg) {
                    found.sense = sense.last_gloss().to_string();
                    linkages.push((linkage.kind, found));
                }
                continue;
            }
            if let Some(spec) = vocab.example(&template.name) {
                let inline = example_from_template(ctx, template, spec);
                if !inline.is_empty() {
                    sense.examples.push(inline);
                }
                continue;
            }
            if vocab.is_quote(&template.name) {
                example.reference = render_template(ctx, template);
                continue;
            }
        }
        text_nodes.push(node.clone());
    }
    example.text = clean_nodes(ctx, Some(&mut *sense), &text_nodes);

    for list in rest.iter().filter_map(Node::as_list) {
        for child in list.items() {
            let (child_lead, _) = child.split_lead();
            let text = clean_nodes(ctx, None, child_lead);
            if text.is_empty() {
                continue;
            }
            if example.text.is_empty() {
                example.text = text;
            } else if example.translation.is_empty() {
                example.translation = text;
            }
        }
    }

    if !example.is_empty() {
        sense.examples.push(example);
    }
}

/// Example from an inline `{{ux|...}}`-style template.
pub fn example_from_template(
    ctx: &ExtractContext,
    template: &Template,
    spec: &ExampleTemplate,
) -> Example {
    let arg = |reference: &str| {
        arg_by_ref(&template.args, reference)
            .map(|raw| clean_nodes(ctx, None, &parse_inline(raw)))
            .unwrap_or_default()
    };
    Example {
        text: arg(&spec.text),
        translation: arg(&spec.translation),
        reference: arg(&spec.reference),
        roman: arg(&spec.roman),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::model::LinkageKind;
    use crate::templates::TemplateStore;
    use crate::wikitext::parse;

    fn first_item(text: &str) -> ListItem {
        let root = parse(text);
        let list = root.children()[0].as_list().unwrap().clone();
        let item = list.items().next().unwrap().clone();
        item
    }

    fn run(edition: &Edition, store: &TemplateStore, text: &str) -> (Sense, PendingLinkages) {
        let ctx = ExtractContext::new(edition, store, "abadi");
        let mut sense = Sense {
            glosses: vec!["Zaman yang akan datang.".into()],
            ..Default::default()
        };
        let mut linkages = PendingLinkages::new();
        extract_example_item(&ctx, &mut sense, &first_item(text), &mut linkages);
        (sense, linkages)
    }

    // ─── Plain items ─────────────────────────────────────────────

    #[test]
    fn plain_item_with_translation() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let (sense, _) = run(&edition, &store, "#: ''Kucing itu tidur.''\n#:: The cat sleeps.");
        assert_eq!(
            sense.examples,
            vec![Example {
                text: "Kucing itu tidur.".into(),
                translation: "The cat sleeps.".into(),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn quotation_reference_and_nested_text() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new().with("quote-book", "{{{year}}}, {{{author}}}");
        let (sense, _) = run(
            &edition,
            &store,
            "#* {{quote-book|ms|year=1990|author=Usman Awang}}\n#*: Puisi itu indah.",
        );
        assert_eq!(sense.examples.len(), 1);
        assert_eq!(sense.examples[0].reference, "1990, Usman Awang");
        assert_eq!(sense.examples[0].text, "Puisi itu indah.");
    }

    // ─── Templates ───────────────────────────────────────────────

    #[test]
    fn inline_example_template() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let (sense, _) = run(&edition, &store, "#: {{ux|ms|Saya makan nasi.|I eat rice.}}");
        assert_eq!(sense.examples.len(), 1);
        assert_eq!(sense.examples[0].text, "Saya makan nasi.");
        assert_eq!(sense.examples[0].translation, "I eat rice.");
    }

    #[test]
    fn linkage_shorthand_is_diverted() {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let (sense, linkages) = run(&edition, &store, "#: {{ant|ms|masa lalu|masa lampau}}");
        assert!(sense.examples.is_empty());
        let words: Vec<_> = linkages.iter().map(|(_, l)| l.word.as_str()).collect();
        assert_eq!(words, vec!["masa lalu", "masa lampau"]);
        assert!(linkages
            .iter()
            .all(|(kind, l)| *kind == LinkageKind::Antonyms && l.sense == "Zaman yang akan datang."));
    }
}
