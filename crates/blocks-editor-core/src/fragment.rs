//! Second-pass scrub over a deserialized document.

use std::borrow::Cow;

use crate::document::{Block, Document, Node, Text};
use crate::scrub::{contains_token, scrub};

/// Return a copy of `doc` with the corrupt token removed from every text leaf.
///
/// Block kinds and attributes are untouched. Idempotent.
pub fn clean_document(doc: &Document) -> Document {
    let mut changed = 0usize;
    let children = clean_nodes(&doc.children, &mut changed);
    if changed > 0 {
        tracing::debug!(leaves = changed, "scrubbed document leaves");
    }
    Document::new(children)
}

fn clean_nodes(nodes: &[Node], changed: &mut usize) -> Vec<Node> {
    nodes.iter().map(|node| clean_node(node, changed)).collect()
}

fn clean_node(node: &Node, changed: &mut usize) -> Node {
    match node {
        Node::Text(text) => match scrub(&text.text) {
            Cow::Borrowed(_) => Node::Text(text.clone()),
            Cow::Owned(cleaned) => {
                *changed += 1;
                Node::Text(Text::with_marks(cleaned, text.marks))
            }
        },
        Node::Block(block) => Node::Block(Block {
            kind: block.kind.clone(),
            children: clean_nodes(&block.children, changed),
        }),
    }
}

/// Whether no text leaf of `doc` contains the corrupt token.
pub fn is_clean(doc: &Document) -> bool {
    fn clean(nodes: &[Node]) -> bool {
        nodes.iter().all(|node| match node {
            Node::Text(text) => !contains_token(&text.text),
            Node::Block(block) => clean(&block.children),
        })
    }
    clean(&doc.children)
}
