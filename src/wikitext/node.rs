//! Typed wikitext tree.
//!
//! Every node kind the extractors care about is a variant of [`Node`], so
//! dispatch over node kinds is an exhaustive `match` rather than a chain of
//! ad hoc type tests.

use super::parser::{parse_inline, to_wikitext};

/// Discriminant of a [`Node`], used by the filtered child iterators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Level,
    List,
    ListItem,
    Template,
    Link,
    Italic,
    Bold,
    Text,
}

/// Heading node: `== title ==` and everything up to the next heading of the
/// same or smaller depth.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Level {
    pub depth: usize,
    pub title: Vec<Node>,
    pub children: Vec<Node>,
}

/// A run of list lines sharing one marker prefix (`#`, `#:`, `*`, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    pub marker: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    pub marker: String,
    pub children: Vec<Node>,
}

/// Parsed wikilink: `[[target#anchor|display]]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    pub target: String,
    pub anchor: Option<String>,
    pub display: Vec<Node>,
}

/// Template invocation: `{{name|arg|key=value}}`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub name: String,
    pub args: TemplateArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgName {
    Positional(usize),
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateArg {
    pub name: ArgName,
    /// Raw wikitext of the value, trimmed.
    pub value: String,
}

/// Template arguments in source order. Values stay raw wikitext and are
/// parsed on demand with [`TemplateArgs::nodes`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateArgs {
    args: Vec<TemplateArg>,
}

impl TemplateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: ArgName, value: impl Into<String>) {
        self.args.push(TemplateArg {
            name,
            value: value.into(),
        });
    }

    pub fn get(&self, name: &ArgName) -> Option<&str> {
        // Later duplicates win, as in MediaWiki.
        self.args
            .iter()
            .rev()
            .find(|arg| &arg.name == name)
            .map(|arg| arg.value.as_str())
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.get(&ArgName::Positional(index))
    }

    pub fn named(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .rev()
            .find(|arg| matches!(&arg.name, ArgName::Named(k) if k == key))
            .map(|arg| arg.value.as_str())
    }

    /// Positional values from `start` onwards, stopping at the first gap.
    pub fn positional_from(&self, start: usize) -> Vec<&str> {
        let mut values = Vec::new();
        let mut index = start;
        while let Some(value) = self.positional(index) {
            values.push(value);
            index += 1;
        }
        values
    }

    /// Re-parse one argument's raw wikitext into inline nodes.
    pub fn nodes(&self, name: &ArgName) -> Vec<Node> {
        self.get(name).map(parse_inline).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateArg> {
        self.args.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root(Vec<Node>),
    Level(Level),
    List(List),
    ListItem(ListItem),
    Template(Template),
    Link(Link),
    Italic(Vec<Node>),
    Bold(Vec<Node>),
    Text(String),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Root(_) => NodeKind::Root,
            Node::Level(_) => NodeKind::Level,
            Node::List(_) => NodeKind::List,
            Node::ListItem(_) => NodeKind::ListItem,
            Node::Template(_) => NodeKind::Template,
            Node::Link(_) => NodeKind::Link,
            Node::Italic(_) => NodeKind::Italic,
            Node::Bold(_) => NodeKind::Bold,
            Node::Text(_) => NodeKind::Text,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(children) | Node::Italic(children) | Node::Bold(children) => children,
            Node::Level(level) => &level.children,
            Node::List(list) => &list.children,
            Node::ListItem(item) => &item.children,
            Node::Link(link) => &link.display,
            Node::Template(_) | Node::Text(_) => &[],
        }
    }

    /// Direct children of the given kind, in order.
    pub fn find_child(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children().iter().filter(move |child| child.kind() == kind)
    }

    /// All descendants of the given kind, depth-first pre-order.
    pub fn find_child_recursively(&self, kind: NodeKind) -> Vec<&Node> {
        let mut found = Vec::new();
        collect_recursively(self.children(), kind, &mut found);
        found
    }

    /// Sub-headings directly below this node.
    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.children().iter().filter_map(Node::as_level)
    }

    pub fn as_level(&self) -> Option<&Level> {
        match self {
            Node::Level(level) => Some(level),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_item(&self) -> Option<&ListItem> {
        match self {
            Node::ListItem(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<&Template> {
        match self {
            Node::Template(template) => Some(template),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True for text runs holding nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }

    pub fn to_wikitext(&self) -> String {
        to_wikitext(std::slice::from_ref(self))
    }
}

fn collect_recursively<'a>(nodes: &'a [Node], kind: NodeKind, found: &mut Vec<&'a Node>) {
    for node in nodes {
        if node.kind() == kind {
            found.push(node);
        }
        if let Node::Level(level) = node {
            collect_recursively(&level.title, kind, found);
        }
        collect_recursively(node.children(), kind, found);
    }
}

impl Level {
    /// Content of this heading that is not itself a sub-heading.
    pub fn body(&self) -> impl Iterator<Item = &Node> {
        self.invert_find_child(&[NodeKind::Level])
    }

    /// Direct children NOT of any of the given kinds, in order.
    pub fn invert_find_child<'a>(&'a self, kinds: &'a [NodeKind]) -> impl Iterator<Item = &'a Node> + 'a {
        self.children
            .iter()
            .filter(move |child| !kinds.contains(&child.kind()))
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.children.iter().filter_map(Node::as_level)
    }

    pub fn find_child(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |child| child.kind() == kind)
    }
}

impl ListItem {
    /// Children up to the first nested list, and the nodes from there on.
    pub fn split_lead(&self) -> (&[Node], &[Node]) {
        let split = self
            .children
            .iter()
            .position(|child| child.kind() == NodeKind::List)
            .unwrap_or(self.children.len());
        self.children.split_at(split)
    }

    pub fn lists(&self) -> impl Iterator<Item = &List> {
        self.children.iter().filter_map(Node::as_list)
    }
}

impl List {
    pub fn items(&self) -> impl Iterator<Item = &ListItem> {
        self.children.iter().filter_map(Node::as_list_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::parse;

    #[test]
    fn positional_from_stops_at_gap() {
        let mut args = TemplateArgs::new();
        args.push(ArgName::Positional(1), "en");
        args.push(ArgName::Positional(2), "a");
        args.push(ArgName::Positional(3), "b");
        args.push(ArgName::Positional(5), "d");
        assert_eq!(args.positional_from(2), vec!["a", "b"]);
    }

    #[test]
    fn later_duplicate_argument_wins() {
        let mut args = TemplateArgs::new();
        args.push(ArgName::Named("tr".into()), "first");
        args.push(ArgName::Named("tr".into()), "second");
        assert_eq!(args.named("tr"), Some("second"));
    }

    #[test]
    fn invert_find_child_skips_headings() {
        let root = parse("==A==\ntext\n===B===\nmore");
        let level = root.levels().next().unwrap();
        let body: Vec<_> = level.invert_find_child(&[NodeKind::Level]).collect();
        assert!(body.iter().all(|n| n.kind() != NodeKind::Level));
        assert_eq!(body.len(), level.body().count());
        assert_eq!(level.levels().count(), 1);
        let no_text: Vec<_> = level.invert_find_child(&[NodeKind::Level, NodeKind::Text]).collect();
        assert!(no_text.is_empty());
    }

    #[test]
    fn find_child_recursively_reaches_nested_items() {
        let root = parse("# a\n## b\n## c\n# d");
        assert_eq!(root.find_child_recursively(NodeKind::ListItem).len(), 4);
    }

    #[test]
    fn split_lead_stops_at_first_list() {
        let root = parse("# gloss {{t}}\n#: example");
        let list = root.find_child(NodeKind::List).next().unwrap();
        let item = list.as_list().unwrap().items().next().unwrap();
        let (lead, rest) = item.split_lead();
        assert_eq!(lead.len(), 2);
        assert_eq!(rest.len(), 1);
    }
}
