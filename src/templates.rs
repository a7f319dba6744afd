//! Template bodies and parameter substitution.
//!
//! Bodies are plain wikitext with MediaWiki parameter references
//! (`{{{1}}}`, `{{{tr|}}}`). Expansion substitutes arguments and returns
//! wikitext, which the cleaner parses and renders again.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::wikitext::{ArgName, Template};

lazy_static! {
    // Innermost parameter reference; defaults containing references resolve on later passes
    static ref PARAMETER: Regex = Regex::new(r"\{\{\{([^{}|]*)(?:\|([^{}]*))?\}\}\}").unwrap();
}

const MAX_SUBSTITUTION_PASSES: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    bodies: HashMap<String, String>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, body: impl Into<String>) {
        self.bodies.insert(canonical_name(name), body.into());
    }

    pub fn with(mut self, name: &str, body: impl Into<String>) -> Self {
        self.add(name, body);
        self
    }

    /// Load a `name: body` YAML mapping.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let bodies: HashMap<String, String> =
            serde_yaml::from_str(&content).map_err(|source| Error::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        let mut store = Self::new();
        for (name, body) in bodies {
            store.add(&name, body);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains_key(&canonical_name(name))
    }

    /// Substitute the invocation's arguments into the stored body.
    /// `None` when the template is unknown.
    pub fn expand(&self, template: &Template) -> Option<String> {
        let body = self.bodies.get(&canonical_name(&template.name))?;
        let mut text = body.clone();
        for _ in 0..MAX_SUBSTITUTION_PASSES {
            if !PARAMETER.is_match(&text) {
                break;
            }
            text = PARAMETER
                .replace_all(&text, |caps: &Captures| {
                    let key = caps[1].trim();
                    let name = match key.parse::<usize>() {
                        Ok(index) => ArgName::Positional(index),
                        Err(_) => ArgName::Named(key.to_string()),
                    };
                    template
                        .args
                        .get(&name)
                        .or_else(|| caps.get(2).map(|m| m.as_str()))
                        .unwrap_or("")
                        .to_string()
                })
                .into_owned();
        }
        Some(text)
    }
}

/// MediaWiki treats the first letter of a title case-insensitively and
/// underscores as spaces.
fn canonical_name(name: &str) -> String {
    let name = name.trim().replace('_', " ");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
