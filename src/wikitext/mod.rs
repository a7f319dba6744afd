//! Wikitext tree and parser.

mod node;
mod parser;

pub use node::{
    ArgName, Level, Link, List, ListItem, Node, NodeKind, Template, TemplateArg, TemplateArgs,
};
pub use parser::{parse, parse_inline, to_wikitext};
