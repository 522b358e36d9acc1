//! DOM fragment cleaning.
//!
//! Decides, per parsed HTML node, whether it passes through unchanged, has its
//! text rewritten, or is dropped with its whole subtree. The deserializer
//! applies the decisions depth-first while it walks the tree.

use crate::dom::{HtmlElement, HtmlNode};
use crate::scrub::{contains_token, is_only_token, scrub};

/// What to do with one HTML node before tag mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanDecision {
    /// Keep the node and convert it as usual.
    PassThrough,
    /// Keep the node but replace its content with this text.
    RewriteText(String),
    /// Remove the node and everything below it.
    DropSubtree,
}

/// Tags that map to document blocks. Such an element whose whole text is the
/// corrupt token keeps its structure with an empty text instead of vanishing.
pub const BLOCK_TAGS: &[&str] = &[
    "a",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "img",
    "li",
    "ol",
    "p",
    "pre",
    "ul",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Block tags whose children are blocks themselves. They are never rewritten
/// as a whole; the cleaner descends into them so each child keeps its type.
pub const CONTAINER_TAGS: &[&str] = &["blockquote", "ol", "ul"];

pub fn is_container_tag(tag: &str) -> bool {
    CONTAINER_TAGS.contains(&tag)
}

/// Classify a node.
pub fn classify(node: &HtmlNode) -> CleanDecision {
    match node {
        HtmlNode::Text(text) => classify_text(text),
        HtmlNode::Element(el) => classify_element(el),
    }
}

fn classify_text(text: &str) -> CleanDecision {
    if is_only_token(text) {
        CleanDecision::DropSubtree
    } else if contains_token(text) {
        CleanDecision::RewriteText(scrub(text).into_owned())
    } else {
        CleanDecision::PassThrough
    }
}

fn classify_element(el: &HtmlElement) -> CleanDecision {
    if has_drag_attribute(el) {
        tracing::trace!(tag = %el.tag, "dropping element with drag attribute");
        return CleanDecision::DropSubtree;
    }

    // Void elements have no text to judge.
    if el.children.is_empty() || is_container_tag(&el.tag) {
        return CleanDecision::PassThrough;
    }

    if is_only_token(&el.text_content()) {
        if is_block_tag(&el.tag) {
            CleanDecision::RewriteText(String::new())
        } else {
            CleanDecision::DropSubtree
        }
    } else {
        CleanDecision::PassThrough
    }
}

/// Whether the element carries markup left behind by a drag operation:
/// `draggable="true"`, any `data-drag*` attribute, or an id or class token
/// mentioning "drag".
pub fn has_drag_attribute(el: &HtmlElement) -> bool {
    if el
        .attr("draggable")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }

    if el.attrs.iter().any(|(name, _)| name.starts_with("data-drag")) {
        return true;
    }

    if el.id().is_some_and(mentions_drag) {
        return true;
    }

    el.classes().any(mentions_drag)
}

fn mentions_drag(value: &str) -> bool {
    value.to_ascii_lowercase().contains("drag")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str) -> HtmlElement {
        HtmlElement::new(tag)
    }

    #[test]
    fn test_text_decisions() {
        assert_eq!(classify(&HtmlNode::text("hello")), CleanDecision::PassThrough);
        assert_eq!(
            classify(&HtmlNode::text("dragdrag hello")),
            CleanDecision::RewriteText(" hello".into())
        );
        assert_eq!(classify(&HtmlNode::text(" DRAG ")), CleanDecision::DropSubtree);
    }

    #[test]
    fn test_drag_attributes_drop() {
        let cases = [
            el("b").with_attr("draggable", "true").with_child("x"),
            el("span").with_attr("data-drag", "").with_child("x"),
            el("span").with_attr("data-draggable-id", "4").with_child("x"),
            el("div").with_attr("class", "row DragHandle").with_child("x"),
            el("div").with_attr("id", "drag-preview").with_child("x"),
        ];
        for case in cases {
            assert_eq!(
                classify(&HtmlNode::Element(case.clone())),
                CleanDecision::DropSubtree,
                "{case:?}"
            );
        }
    }

    #[test]
    fn test_draggable_false_passes() {
        let node = HtmlNode::Element(el("img").with_attr("draggable", "false"));
        assert_eq!(classify(&node), CleanDecision::PassThrough);
    }

    #[test]
    fn test_token_only_block_is_rewritten() {
        let p = HtmlNode::Element(el("p").with_child("drag"));
        assert_eq!(classify(&p), CleanDecision::RewriteText(String::new()));

        let nested = HtmlNode::Element(
            el("li").with_child(el("b").with_child("drag")).with_child("Drag"),
        );
        assert_eq!(classify(&nested), CleanDecision::RewriteText(String::new()));
    }

    #[test]
    fn test_token_only_container_passes() {
        for tag in ["ul", "ol", "blockquote"] {
            let node = HtmlNode::Element(el(tag).with_child(el("li").with_child("drag")));
            assert_eq!(classify(&node), CleanDecision::PassThrough, "{tag}");
        }
    }

    #[test]
    fn test_container_with_drag_attribute_still_drops() {
        let node = HtmlNode::Element(
            el("ul")
                .with_attr("draggable", "true")
                .with_child(el("li").with_child("x")),
        );
        assert_eq!(classify(&node), CleanDecision::DropSubtree);
    }

    #[test]
    fn test_token_only_inline_is_dropped() {
        let b = HtmlNode::Element(el("b").with_child("dragdrag"));
        assert_eq!(classify(&b), CleanDecision::DropSubtree);
    }

    #[test]
    fn test_mixed_content_passes() {
        // The element passes; its text child is rewritten when visited.
        let p = HtmlNode::Element(el("p").with_child("dragdrag hello"));
        assert_eq!(classify(&p), CleanDecision::PassThrough);
    }
}
