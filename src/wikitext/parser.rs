//! Wikitext parser.
//!
//! Two layers: a line-oriented block parser that builds the heading and list
//! structure, and a recursive descent inline parser for templates, links and
//! quote formatting. The inline parser uses the call stack for nesting, no
//! explicit depth counters.

use super::node::{ArgName, Level, Link, List, ListItem, Node, Template, TemplateArgs};

const LIST_MARKERS: &[char] = &['#', '*', ':', ';'];

/// Parse a page (or any wikitext fragment) into a tree rooted at [`Node::Root`].
pub fn parse(text: &str) -> Node {
    BlockParser::new().run(text)
}

/// Parse a fragment without block structure: templates, links, formatting and text.
pub fn parse_inline(text: &str) -> Vec<Node> {
    InlineParser::new(text).parse_nodes(None)
}

// ─────────────────────────────────────────────────────────────────────────────
// Block structure
// ─────────────────────────────────────────────────────────────────────────────

struct BlockParser {
    /// Open headings; index 0 is the page root (depth 0).
    levels: Vec<Level>,
    /// Open lists, outermost first.
    lists: Vec<List>,
}

impl BlockParser {
    fn new() -> Self {
        BlockParser {
            levels: vec![Level::default()],
            lists: Vec::new(),
        }
    }

    fn run(mut self, text: &str) -> Node {
        for line in logical_lines(text) {
            if let Some((depth, title)) = heading(line) {
                self.close_lists();
                self.open_level(depth, title);
            } else if let Some((marker, content)) = list_line(line) {
                self.push_list_line(marker, content);
            } else {
                self.close_lists();
                self.push_text_line(line);
            }
        }
        self.close_lists();
        while self.levels.len() > 1 {
            self.close_level();
        }
        let root = self.levels.pop().unwrap_or_default();
        Node::Root(root.children)
    }

    fn current_children(&mut self) -> &mut Vec<Node> {
        if self.levels.is_empty() {
            self.levels.push(Level::default());
        }
        let last = self.levels.len() - 1;
        &mut self.levels[last].children
    }

    fn open_level(&mut self, depth: usize, title: &str) {
        while self.levels.len() > 1 && self.levels[self.levels.len() - 1].depth >= depth {
            self.close_level();
        }
        self.levels.push(Level {
            depth,
            title: parse_inline(title),
            children: Vec::new(),
        });
    }

    fn close_level(&mut self) {
        if let Some(level) = self.levels.pop() {
            self.current_children().push(Node::Level(level));
        }
    }

    fn push_text_line(&mut self, line: &str) {
        let mut nodes = parse_inline(line);
        nodes.push(Node::Text("\n".to_string()));
        let children = self.current_children();
        for node in nodes {
            push_merging_text(children, node);
        }
    }

    fn push_list_line(&mut self, marker: &str, content: &str) {
        let item = Node::ListItem(ListItem {
            marker: marker.to_string(),
            children: parse_inline(content),
        });
        loop {
            let Some(top) = self.lists.last_mut() else {
                break;
            };
            if top.marker == marker {
                top.children.push(item);
                return;
            }
            let has_items = top.children.iter().any(|c| c.as_list_item().is_some());
            if marker.starts_with(top.marker.as_str()) && has_items {
                self.lists.push(List {
                    marker: marker.to_string(),
                    children: vec![item],
                });
                return;
            }
            self.close_list();
        }
        self.lists.push(List {
            marker: marker.to_string(),
            children: vec![item],
        });
    }

    fn close_list(&mut self) {
        let Some(list) = self.lists.pop() else {
            return;
        };
        let parent_item = self.lists.last_mut().and_then(|parent| {
            parent.children.iter_mut().rev().find_map(|child| match child {
                Node::ListItem(item) => Some(item),
                _ => None,
            })
        });
        match parent_item {
            Some(item) => item.children.push(Node::List(list)),
            None => self.current_children().push(Node::List(list)),
        }
    }

    fn close_lists(&mut self) {
        while !self.lists.is_empty() {
            self.close_list();
        }
    }
}

fn push_merging_text(nodes: &mut Vec<Node>, node: Node) {
    if let Node::Text(text) = &node {
        if let Some(Node::Text(previous)) = nodes.last_mut() {
            previous.push_str(text);
            return;
        }
    }
    nodes.push(node);
}

/// Split on newlines that are not inside a template or a link. A line that
/// looks like a heading always starts a new logical line so that one stray
/// `{{` cannot swallow the rest of the page.
fn logical_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        match (bytes[i], next) {
            (b'{', Some(b'{')) => {
                braces += 1;
                i += 2;
                continue;
            }
            (b'}', Some(b'}')) if braces > 0 => {
                braces -= 1;
                i += 2;
                continue;
            }
            (b'[', Some(b'[')) => {
                brackets += 1;
                i += 2;
                continue;
            }
            (b']', Some(b']')) if brackets > 0 => {
                brackets -= 1;
                i += 2;
                continue;
            }
            (b'\n', _) => {
                let heading_follows = text[i + 1..].starts_with("==");
                if (braces == 0 && brackets == 0) || heading_follows {
                    lines.push(&text[start..i]);
                    start = i + 1;
                    braces = 0;
                    brackets = 0;
                }
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(&text[start..]);
    lines
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_end();
    if !trimmed.starts_with('=') || !trimmed.ends_with('=') {
        return None;
    }
    let lead = trimmed.chars().take_while(|&c| c == '=').count();
    let trail = trimmed.chars().rev().take_while(|&c| c == '=').count();
    if lead + trail >= trimmed.len() {
        return None;
    }
    let depth = lead.min(trail).min(6);
    let title = trimmed[depth..trimmed.len() - depth].trim();
    Some((depth, title))
}

fn list_line(line: &str) -> Option<(&str, &str)> {
    let marker_len = line
        .char_indices()
        .find(|(_, c)| !LIST_MARKERS.contains(c))
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    if marker_len == 0 {
        return None;
    }
    Some((&line[..marker_len], line[marker_len..].trim()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline recursive descent
// ─────────────────────────────────────────────────────────────────────────────

struct InlineParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> InlineParser<'a> {
    fn new(text: &'a str) -> Self {
        InlineParser { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn consume(&mut self, n: usize) -> &'a str {
        // n is character count, not byte count
        let remaining = self.rest();
        let byte_len: usize = remaining.chars().take(n).map(|c| c.len_utf8()).sum();
        let result = &self.text[self.pos..self.pos + byte_len];
        self.pos += byte_len;
        result
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    // ─────────────────────────────────────────────────────────────
    // nodes ::= (template | link | bold | italic | comment | text)*
    // ─────────────────────────────────────────────────────────────
    fn parse_nodes(&mut self, until: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        while !self.at_end() {
            let rest = self.rest();
            if until == Some("]]") && rest.starts_with("]]") {
                break;
            }
            if rest.starts_with("<!--") {
                let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
                self.pos += end;
                continue;
            }
            if rest.starts_with("{{") {
                flush_text(&mut nodes, &mut text);
                let template = self.parse_template();
                nodes.push(Node::Template(template));
                continue;
            }
            if rest.starts_with("[[") {
                flush_text(&mut nodes, &mut text);
                let link = self.parse_link();
                nodes.push(Node::Link(link));
                continue;
            }
            if rest.starts_with("'''") && until != Some("'''") {
                flush_text(&mut nodes, &mut text);
                self.consume(3);
                let inner = self.parse_nodes(Some("'''"));
                if self.rest().starts_with("'''") {
                    self.consume(3);
                }
                nodes.push(Node::Bold(inner));
                continue;
            }
            if let Some(end) = until {
                if rest.starts_with(end) {
                    break;
                }
            }
            if rest.starts_with("''") {
                flush_text(&mut nodes, &mut text);
                self.consume(2);
                let inner = self.parse_nodes(Some("''"));
                if self.rest().starts_with("''") {
                    self.consume(2);
                }
                nodes.push(Node::Italic(inner));
                continue;
            }
            if let Some(c) = self.consume_char() {
                text.push(c);
            }
        }
        flush_text(&mut nodes, &mut text);
        nodes
    }

    // ─────────────────────────────────────────────────────────────
    // template ::= "{{" name ("|" arg)* "}}"
    // ─────────────────────────────────────────────────────────────
    fn parse_template(&mut self) -> Template {
        self.consume(2); // consume "{{"

        let mut parts = vec![String::new()];
        let mut braces = 0usize;
        let mut brackets = 0usize;
        while !self.at_end() {
            let rest = self.rest();
            let Some(current) = parts.last_mut() else {
                break;
            };
            if rest.starts_with("}}") {
                self.consume(2);
                if braces == 0 {
                    break;
                }
                braces -= 1;
                current.push_str("}}");
            } else if rest.starts_with("{{") {
                self.consume(2);
                braces += 1;
                current.push_str("{{");
            } else if rest.starts_with("[[") {
                self.consume(2);
                brackets += 1;
                current.push_str("[[");
            } else if rest.starts_with("]]") && brackets > 0 {
                self.consume(2);
                brackets -= 1;
                current.push_str("]]");
            } else if rest.starts_with('|') && braces == 0 && brackets == 0 {
                self.consume(1);
                parts.push(String::new());
            } else if let Some(c) = self.consume_char() {
                current.push(c);
            }
        }

        let raw_name = parts.remove(0);
        let name = raw_name.trim();
        let name = name
            .strip_prefix("Template:")
            .or_else(|| name.strip_prefix("template:"))
            .unwrap_or(name)
            .trim()
            .to_string();

        let mut args = TemplateArgs::new();
        let mut position = 1;
        for part in parts {
            match split_named_arg(&part) {
                Some((key, value)) => match key.parse::<usize>() {
                    Ok(index) => args.push(ArgName::Positional(index), value),
                    Err(_) => args.push(ArgName::Named(key.to_string()), value),
                },
                None => {
                    args.push(ArgName::Positional(position), part.trim());
                    position += 1;
                }
            }
        }
        Template { name, args }
    }

    // ─────────────────────────────────────────────────────────────
    // link ::= "[[" target ("#" anchor)? ("|" display)? "]]"
    // ─────────────────────────────────────────────────────────────
    fn parse_link(&mut self) -> Link {
        self.consume(2); // consume "[["

        let target = self.parse_target();
        let mut anchor = None;
        let mut display = Vec::new();

        if self.peek_char() == Some('#') {
            self.consume(1);
            anchor = Some(self.parse_anchor());
        }

        if self.peek_char() == Some('|') {
            self.consume(1);
            display = self.parse_nodes(Some("]]"));
        }

        if self.rest().starts_with("]]") {
            self.consume(2);
        }

        Link {
            target: target.trim().to_string(),
            anchor,
            display,
        }
    }

    fn parse_target(&mut self) -> String {
        let mut result = String::new();
        while let Some(c) = self.peek_char() {
            if matches!(c, '#' | '|' | ']') {
                break;
            }
            self.consume_char();
            result.push(c);
        }
        result
    }

    fn parse_anchor(&mut self) -> String {
        let mut result = String::new();
        while let Some(c) = self.peek_char() {
            if matches!(c, '|' | ']') {
                break;
            }
            self.consume_char();
            result.push(c);
        }
        result
    }
}

fn flush_text(nodes: &mut Vec<Node>, text: &mut String) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

/// `key=value` where the `=` sits outside nested templates and links.
fn split_named_arg(part: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let bytes = part.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'[' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' | b']' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth = depth.saturating_sub(1);
                i += 2;
                continue;
            }
            b'=' if depth == 0 => {
                let key = part[..i].trim();
                if key.is_empty() || key.contains('\n') {
                    return None;
                }
                return Some((key, part[i + 1..].trim()));
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Serialisation back to wikitext
// ─────────────────────────────────────────────────────────────────────────────

/// Re-serialise nodes to wikitext, so a subtree can be fed back into [`parse`].
pub fn to_wikitext(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Root(children) => {
            for child in children {
                write_node(child, out);
            }
        }
        Node::Level(level) => {
            ensure_newline(out);
            let marks = "=".repeat(level.depth);
            out.push_str(&marks);
            out.push(' ');
            out.push_str(&to_wikitext(&level.title));
            out.push(' ');
            out.push_str(&marks);
            out.push('\n');
            for child in &level.children {
                write_node(child, out);
            }
        }
        Node::List(list) => {
            ensure_newline(out);
            for child in &list.children {
                write_node(child, out);
            }
        }
        Node::ListItem(item) => {
            ensure_newline(out);
            out.push_str(&item.marker);
            out.push(' ');
            for child in &item.children {
                write_node(child, out);
            }
            ensure_newline(out);
        }
        Node::Template(template) => {
            out.push_str("{{");
            out.push_str(&template.name);
            for arg in template.args.iter() {
                out.push('|');
                if let ArgName::Named(key) = &arg.name {
                    out.push_str(key);
                    out.push('=');
                }
                out.push_str(&arg.value);
            }
            out.push_str("}}");
        }
        Node::Link(link) => {
            out.push_str("[[");
            out.push_str(&link.target);
            if let Some(anchor) = &link.anchor {
                out.push('#');
                out.push_str(anchor);
            }
            if !link.display.is_empty() {
                out.push('|');
                out.push_str(&to_wikitext(&link.display));
            }
            out.push_str("]]");
        }
        Node::Italic(children) => {
            out.push_str("''");
            out.push_str(&to_wikitext(children));
            out.push_str("''");
        }
        Node::Bold(children) => {
            out.push_str("'''");
            out.push_str(&to_wikitext(children));
            out.push_str("'''");
        }
        Node::Text(text) => out.push_str(text),
    }
}
