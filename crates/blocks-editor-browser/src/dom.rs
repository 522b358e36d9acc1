//! `DOMParser` based HTML parsing.
//!
//! Pasted HTML is parsed by the browser itself and the resulting `<body>`
//! converted into the core `HtmlNode` tree, so the paste pipeline starts
//! at its tree stage.

use blocks_editor_core::{ClipboardConfig, HtmlElement, HtmlNode, SanitizeError};
use wasm_bindgen::JsCast;

use crate::clipboard::js_error;

/// Parse `markup` with `DOMParser` and convert its body.
pub fn parse_markup(markup: &str, config: &ClipboardConfig) -> Result<HtmlNode, SanitizeError> {
    if markup.len() > config.max_html_bytes {
        return Err(SanitizeError::PayloadTooLarge {
            len: markup.len(),
            max: config.max_html_bytes,
        });
    }

    let parser = web_sys::DomParser::new().map_err(js_error)?;
    let document = parser
        .parse_from_string(markup, web_sys::SupportedType::TextHtml)
        .map_err(js_error)?;
    let empty = || HtmlNode::Element(HtmlElement::new("body"));
    let Some(body) = document.body() else {
        return Ok(empty());
    };
    Ok(convert(&body, 0, config.max_depth)?.unwrap_or_else(empty))
}

/// Convert a live DOM node. Comments and other non-content nodes yield
/// `None`.
pub fn from_dom_node(node: &web_sys::Node) -> Option<HtmlNode> {
    convert(node, 0, usize::MAX).ok().flatten()
}

fn convert(
    node: &web_sys::Node,
    depth: usize,
    max_depth: usize,
) -> Result<Option<HtmlNode>, SanitizeError> {
    if depth > max_depth {
        return Err(SanitizeError::TooDeep { max: max_depth });
    }

    match node.node_type() {
        web_sys::Node::TEXT_NODE => Ok(node.node_value().map(HtmlNode::Text)),
        web_sys::Node::ELEMENT_NODE => {
            let Some(element) = node.dyn_ref::<web_sys::Element>() else {
                return Ok(None);
            };
            let mut out = HtmlElement::new(element.tag_name());

            let attributes = element.attributes();
            for index in 0..attributes.length() {
                if let Some(attr) = attributes.item(index) {
                    out = out.with_attr(attr.name(), attr.value());
                }
            }

            let children = node.child_nodes();
            for index in 0..children.length() {
                let Some(child) = children.get(index) else {
                    continue;
                };
                if let Some(converted) = convert(&child, depth + 1, max_depth)? {
                    out.children.push(converted);
                }
            }
            Ok(Some(HtmlNode::Element(out)))
        }
        _ => Ok(None),
    }
}
