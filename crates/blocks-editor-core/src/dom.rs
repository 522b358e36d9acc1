//! Owned HTML tree for clipboard payloads.
//!
//! Platform parsers (html5ever here, `DOMParser` in the browser crate) build
//! this tree; the cleaner and deserializer only ever see `HtmlNode`.

use scraper::{ElementRef, Html, Node};
use smol_str::SmolStr;

use crate::config::ClipboardConfig;
use crate::error::SanitizeError;

/// A node of a parsed HTML fragment. Comments, doctypes and processing
/// instructions are dropped during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

/// An element with a lowercase tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self {
            tag: SmolStr::new(tag.as_ref().to_ascii_lowercase()),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.attrs.push((
            SmolStr::new(name.as_ref().to_ascii_lowercase()),
            value.into(),
        ));
        self
    }

    pub fn with_child(mut self, child: impl Into<HtmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Attribute value by (lowercase) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace separated class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl HtmlNode {
    pub fn text(text: impl Into<String>) -> Self {
        HtmlNode::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&HtmlElement> {
        match self {
            HtmlNode::Element(el) => Some(el),
            HtmlNode::Text(_) => None,
        }
    }

    /// Text content of this node, the node's own text for text nodes.
    pub fn text_content(&self) -> String {
        match self {
            HtmlNode::Element(el) => el.text_content(),
            HtmlNode::Text(text) => text.clone(),
        }
    }

    /// Nesting depth below and including this node.
    pub fn depth(&self) -> usize {
        match self {
            HtmlNode::Text(_) => 1,
            HtmlNode::Element(el) => 1 + el.children.iter().map(HtmlNode::depth).max().unwrap_or(0),
        }
    }
}

impl From<HtmlElement> for HtmlNode {
    fn from(el: HtmlElement) -> Self {
        HtmlNode::Element(el)
    }
}

impl From<&str> for HtmlNode {
    fn from(text: &str) -> Self {
        HtmlNode::Text(text.to_owned())
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// Parse clipboard HTML and return its `<body>` as the tree root.
///
/// html5ever recovers from any malformed input, so the only failures are
/// the configured size and depth limits.
pub fn parse_html(markup: &str, config: &ClipboardConfig) -> Result<HtmlNode, SanitizeError> {
    if markup.len() > config.max_html_bytes {
        return Err(SanitizeError::PayloadTooLarge {
            len: markup.len(),
            max: config.max_html_bytes,
        });
    }

    let document = Html::parse_document(markup);
    let root = document.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root);

    let tree = convert_element(body, 1, config.max_depth)?;
    tracing::trace!(children = tree.children.len(), "parsed clipboard html");
    Ok(HtmlNode::Element(tree))
}

fn convert_element(
    el: ElementRef<'_>,
    depth: usize,
    max_depth: usize,
) -> Result<HtmlElement, SanitizeError> {
    if depth > max_depth {
        return Err(SanitizeError::TooDeep { max: max_depth });
    }

    let value = el.value();
    let mut out = HtmlElement::new(value.name());
    for (name, attr) in value.attrs() {
        out.attrs
            .push((SmolStr::new(name.to_ascii_lowercase()), attr.to_owned()));
    }

    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.children.push(HtmlNode::Text(String::from(&**text))),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.children.push(HtmlNode::Element(convert_element(
                        child_el,
                        depth + 1,
                        max_depth,
                    )?));
                }
            }
            _ => {}
        }
    }
    Ok(out)
}
