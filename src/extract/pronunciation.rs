//! Pronunciation sections: IPA, audio, rhymes and hyphenation.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::template_key;
use crate::context::ExtractContext;
use crate::extract::{arg_text, body_blocks, label_tags, split_tags, Block};
use crate::model::{Entry, Sound};
use crate::tags::translate_raw_tags;
use crate::wikitext::{Level, List, Node};

lazy_static! {
    // "(Johor-Riau)" before the transcription
    static ref PARENTHESES: Regex = Regex::new(r"\(([^()]*)\)").unwrap();
}

pub fn extract_pronunciation_section(ctx: &ExtractContext, target: &mut Entry, level: &Level) {
    for block in body_blocks(level.body()) {
        match block {
            Block::Line(line) => extract_line(ctx, target, &line),
            Block::List(list) => extract_list(ctx, target, list),
        }
    }
}

fn extract_list(ctx: &ExtractContext, target: &mut Entry, list: &List) {
    for item in list.items() {
        extract_line(ctx, target, item.split_lead().0);
        for nested in item.lists() {
            extract_list(ctx, target, nested);
        }
    }
}

/// Qualifiers anywhere on a line apply to every sound of that line.
fn extract_line(ctx: &ExtractContext, target: &mut Entry, nodes: &[Node]) {
    let vocab = &ctx.edition.templates;
    let templates = &vocab.pronunciation;
    let mut raw_tags = Vec::new();
    let mut sounds = Vec::new();
    for node in nodes {
        match node {
            Node::Template(template) => {
                let key = template_key(&template.name);
                if let Some(first_arg) = vocab.label_first_arg(&key) {
                    raw_tags.extend(label_tags(ctx, template, first_arg));
                } else if let Some(&first_arg) = templates.ipa.get(&key) {
                    let mut index = first_arg;
                    while template.args.positional(index).is_some() {
                        let ipa = arg_text(ctx, template, index);
                        index += 1;
                        if !ipa.is_empty() {
                            sounds.push(Sound {
                                ipa,
                                ..Default::default()
                            });
                        }
                    }
                } else if let Some(&arg) = templates.audio.get(&key) {
                    let audio = template.args.positional(arg).unwrap_or_default().trim().to_string();
                    if !audio.is_empty() {
                        sounds.push(Sound {
                            audio,
                            ..Default::default()
                        });
                    }
                } else if let Some(&first_arg) = templates.rhymes.get(&key) {
                    for index in first_arg.. {
                        if template.args.positional(index).is_none() {
                            break;
                        }
                        let rhymes = arg_text(ctx, template, index);
                        if !rhymes.is_empty() {
                            sounds.push(Sound {
                                rhymes,
                                ..Default::default()
                            });
                        }
                    }
                } else if let Some(&first_arg) = templates.hyphenation.get(&key) {
                    let parts: Vec<String> = (first_arg..)
                        .map_while(|index| template.args.positional(index).map(|_| arg_text(ctx, template, index)))
                        .filter(|part| !part.is_empty())
                        .collect();
                    if !parts.is_empty() {
                        target.hyphenation.push(parts.join("-"));
                    }
                }
            }
            Node::Text(text) => {
                for caps in PARENTHESES.captures_iter(text) {
                    raw_tags.extend(split_tags(&caps[1]));
                }
            }
            _ => {}
        }
    }
    for mut sound in sounds {
        sound.raw_tags = raw_tags.clone();
        translate_raw_tags(ctx.edition, &mut sound);
        target.sounds.push(sound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Edition;
    use crate::templates::TemplateStore;
    use crate::wikitext::parse;

    fn extract(body: &str) -> Entry {
        let edition = Edition::builtin("ms").unwrap();
        let store = TemplateStore::new();
        let ctx = ExtractContext::new(&edition, &store, "kucing");
        let root = parse(&format!("===Sebutan===\n{}", body));
        let level = root.levels().next().unwrap();
        let mut entry = Entry::default();
        extract_pronunciation_section(&ctx, &mut entry, level);
        entry
    }

    #[test]
    fn ipa_with_qualifier() {
        let entry = extract("* (Johor-Riau) {{IPA|ms|/ku.t͡ʃiŋ/|[ku.t͡ʃeŋ]}}");
        assert_eq!(entry.sounds.len(), 2);
        assert_eq!(entry.sounds[0].ipa, "/ku.t͡ʃiŋ/");
        assert_eq!(entry.sounds[1].raw_tags, vec!["Johor-Riau"]);
    }

    #[test]
    fn audio_rhymes_and_hyphenation() {
        let entry = extract("* {{audio|ms|Ms-kucing.ogg}}\n* {{rima|ms|uciŋ}}\n* {{hyph|ms|ku|cing}}");
        assert_eq!(entry.sounds[0].audio, "Ms-kucing.ogg");
        assert_eq!(entry.sounds[1].rhymes, "uciŋ");
        assert_eq!(entry.hyphenation, vec!["ku-cing"]);
    }
}
