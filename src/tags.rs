//! Raw tag to canonical tag translation.

use crate::config::Edition;
use crate::model::{Descendant, Entry, Form, Linkage, Sense, Sound, Translation};

/// Records that carry a tag list next to a raw tag list.
pub trait HasTags {
    fn tag_lists(&mut self) -> (&mut Vec<String>, &mut Vec<String>);
}

macro_rules! impl_has_tags {
    ($($ty:ty),*) => {
        $(impl HasTags for $ty {
            fn tag_lists(&mut self) -> (&mut Vec<String>, &mut Vec<String>) {
                (&mut self.tags, &mut self.raw_tags)
            }
        })*
    };
}

impl_has_tags!(Entry, Sense, Linkage, Form, Translation, Descendant, Sound);

/// Move every raw tag the edition knows into `tags`; unknown raw tags stay
/// where they are. Both lists end up without duplicates, in first-seen order.
pub fn translate_raw_tags<T: HasTags>(edition: &Edition, record: &mut T) {
    let (tags, raw_tags) = record.tag_lists();
    let mut unmapped = Vec::with_capacity(raw_tags.len());
    for raw_tag in raw_tags.drain(..) {
        match edition.canonical_tags(&raw_tag) {
            Some(canonical) => {
                for tag in canonical {
                    push_new(tags, tag);
                }
            }
            None => push_new(&mut unmapped, &raw_tag),
        }
    }
    *raw_tags = unmapped;
    dedup_in_order(tags);
}

fn push_new(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_tags_move_and_unmapped_stay() {
        let edition = Edition::builtin("ms").unwrap();
        let mut sense = Sense {
            raw_tags: vec!["kiasan".into(), "dialek Kedah".into(), "kiasan".into()],
            ..Default::default()
        };
        translate_raw_tags(&edition, &mut sense);
        assert_eq!(sense.tags, vec!["figuratively"]);
        assert_eq!(sense.raw_tags, vec!["dialek Kedah"]);
    }

    #[test]
    fn existing_tags_are_kept_once() {
        let edition = Edition::builtin("ms").unwrap();
        let mut form = Form {
            form: "x".into(),
            tags: vec!["plural".into()],
            raw_tags: vec!["jamak".into()],
            ..Default::default()
        };
        translate_raw_tags(&edition, &mut form);
        assert_eq!(form.tags, vec!["plural"]);
        assert!(form.raw_tags.is_empty());
    }
}
