//! Document to clipboard formats.
//!
//! `to_html` is the inverse of the deserializer's tag table, so a document
//! written here and pasted back comes out equal.

use pulldown_cmark_escape::{escape_href, escape_html};

use crate::document::{Block, BlockKind, ListFormat, Marks, Node, Text};

/// Serialize nodes as HTML.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => write_text(out, text),
        Node::Block(block) => write_block(out, block),
    }
}

fn write_block(out: &mut String, block: &Block) {
    let (open, close) = match &block.kind {
        BlockKind::Paragraph => ("<p>".to_owned(), "</p>"),
        BlockKind::Heading { level } => {
            let level = (*level).clamp(1, 6);
            return write_wrapped(
                out,
                &format!("<h{level}>"),
                &format!("</h{level}>"),
                &block.children,
            );
        }
        BlockKind::Quote => ("<blockquote>".to_owned(), "</blockquote>"),
        BlockKind::List {
            format: ListFormat::Ordered,
        } => ("<ol>".to_owned(), "</ol>"),
        BlockKind::List {
            format: ListFormat::Unordered,
        } => ("<ul>".to_owned(), "</ul>"),
        BlockKind::ListItem => ("<li>".to_owned(), "</li>"),
        BlockKind::Code => ("<pre>".to_owned(), "</pre>"),
        BlockKind::Image { url } => {
            out.push_str("<img src=\"");
            let _ = escape_href(&mut *out, url);
            out.push_str("\">");
            return;
        }
        BlockKind::Link { url } => {
            let mut open = String::from("<a href=\"");
            let _ = escape_href(&mut open, url);
            open.push_str("\">");
            (open, "</a>")
        }
    };
    write_wrapped(out, &open, close, &block.children);
}

fn write_wrapped(out: &mut String, open: &str, close: &str, children: &[Node]) {
    out.push_str(open);
    for child in children {
        write_node(out, child);
    }
    out.push_str(close);
}

const MARK_TAGS: [(fn(&Marks) -> bool, &str); 5] = [
    (|m| m.bold, "strong"),
    (|m| m.italic, "em"),
    (|m| m.underline, "u"),
    (|m| m.strikethrough, "s"),
    (|m| m.code, "code"),
];

fn write_text(out: &mut String, text: &Text) {
    if text.text.is_empty() {
        return;
    }

    for (has, tag) in MARK_TAGS {
        if has(&text.marks) {
            out.push('<');
            out.push_str(tag);
            out.push('>');
        }
    }

    let mut lines = text.text.split('\n');
    if let Some(first) = lines.next() {
        let _ = escape_html(&mut *out, first);
    }
    for line in lines {
        out.push_str("<br>");
        let _ = escape_html(&mut *out, line);
    }

    for (has, tag) in MARK_TAGS.iter().rev() {
        if has(&text.marks) {
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Serialize nodes as plain text: one line per text container, containers
/// joined with `\n`.
pub fn to_plain_text(nodes: &[Node]) -> String {
    let mut lines = Vec::new();
    collect_lines(nodes, &mut lines);
    lines.join("\n")
}

fn collect_lines(nodes: &[Node], lines: &mut Vec<String>) {
    let mut line: Option<String> = None;
    for node in nodes {
        if node.is_inline() {
            line.get_or_insert_with(String::new).push_str(&node.string());
            continue;
        }
        if let Some(done) = line.take() {
            lines.push(done);
        }
        match node {
            Node::Block(block) if block.kind.holds_inline() || block.kind.is_void() => {
                lines.push(node.string());
            }
            Node::Block(block) => collect_lines(&block.children, lines),
            Node::Text(_) => {}
        }
    }
    if let Some(done) = line {
        lines.push(done);
    }
}
