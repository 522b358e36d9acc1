//! HTML tree to block document conversion.

use crate::cleaner::{CleanDecision, classify, has_drag_attribute};
use crate::config::ClipboardConfig;
use crate::document::{
    Block, BlockKind, Document, ListFormat, Mark, Marks, Node, Text, normalize_children,
};
use crate::dom::{HtmlElement, HtmlNode};
use crate::error::SanitizeError;

/// Block kind for a tag of the element tag table.
fn element_kind(el: &HtmlElement) -> Option<BlockKind> {
    let kind = match el.tag.as_str() {
        "a" => BlockKind::Link {
            url: el.attr("href").unwrap_or_default().to_owned(),
        },
        "blockquote" => BlockKind::Quote,
        "h1" => BlockKind::Heading { level: 1 },
        "h2" => BlockKind::Heading { level: 2 },
        "h3" => BlockKind::Heading { level: 3 },
        "h4" => BlockKind::Heading { level: 4 },
        "h5" => BlockKind::Heading { level: 5 },
        "h6" => BlockKind::Heading { level: 6 },
        "img" => BlockKind::Image {
            url: el.attr("src").unwrap_or_default().to_owned(),
        },
        "li" => BlockKind::ListItem,
        "ul" => BlockKind::List {
            format: ListFormat::Unordered,
        },
        "ol" => BlockKind::List {
            format: ListFormat::Ordered,
        },
        "p" => BlockKind::Paragraph,
        "pre" => BlockKind::Code,
        _ => return None,
    };
    Some(kind)
}

/// Marks for a tag of the text tag table.
fn text_tag_marks(tag: &str) -> Option<Marks> {
    let mark = match tag {
        "b" | "strong" => Mark::Bold,
        "i" | "em" => Mark::Italic,
        "u" => Mark::Underline,
        "s" | "del" | "strike" => Mark::Strikethrough,
        "code" => Mark::Code,
        _ => return None,
    };
    Some(Marks::default().with(mark))
}

/// Marks expressed through inline styles, the way document editors export
/// bold/italic/underline on `<span>`.
fn span_style_marks(el: &HtmlElement) -> Marks {
    let mut marks = Marks::default();
    let Some(style) = el.attr("style") else {
        return marks;
    };

    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim().to_ascii_lowercase();
        match property.trim().to_ascii_lowercase().as_str() {
            "font-weight" => {
                let numeric_bold = value.parse::<u16>().is_ok_and(|weight| weight >= 700);
                if numeric_bold || value == "bold" || value == "bolder" {
                    marks.bold = true;
                }
            }
            "font-style" if value == "italic" => marks.italic = true,
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    marks.underline = true;
                }
                if value.contains("line-through") {
                    marks.strikethrough = true;
                }
            }
            _ => {}
        }
    }
    marks
}

/// Recursive HTML to document converter.
///
/// Every node goes through the DOM fragment cleaner before tag mapping.
#[derive(Debug, Clone)]
pub struct Deserializer<'c> {
    config: &'c ClipboardConfig,
}

impl<'c> Deserializer<'c> {
    pub fn new(config: &'c ClipboardConfig) -> Self {
        Self { config }
    }

    /// Convert a parsed fragment root (usually `<body>`) into a document.
    ///
    /// The root is only a holder: its own text never decides anything, so a
    /// fragment made only of the token still keeps its block types.
    pub fn deserialize(&self, root: &HtmlNode) -> Result<Document, SanitizeError> {
        let nodes = match root {
            HtmlNode::Element(el) if has_drag_attribute(el) => Vec::new(),
            HtmlNode::Element(el) => self.children(el, None, 1)?,
            HtmlNode::Text(_) => self.node(root, None, 1)?,
        };
        let doc = Document::from_nodes(nodes);
        tracing::debug!(blocks = doc.children.len(), "deserialized clipboard html");
        Ok(doc)
    }

    fn children(
        &self,
        el: &HtmlElement,
        parent: Option<&str>,
        depth: usize,
    ) -> Result<Vec<Node>, SanitizeError> {
        let mut out = Vec::new();
        for child in &el.children {
            out.extend(self.node(child, parent, depth + 1)?);
        }
        Ok(out)
    }

    fn node(
        &self,
        node: &HtmlNode,
        parent: Option<&str>,
        depth: usize,
    ) -> Result<Vec<Node>, SanitizeError> {
        if depth > self.config.max_depth {
            return Err(SanitizeError::TooDeep {
                max: self.config.max_depth,
            });
        }

        let el = match node {
            HtmlNode::Text(text) => return Ok(self.text_node(text)),
            HtmlNode::Element(el) => el,
        };

        if el.tag == "br" {
            return Ok(if parent.is_some() {
                vec![Node::text("\n")]
            } else {
                vec![Node::Block(Block::paragraph(Vec::new()))]
            });
        }

        let mut children = match classify(node) {
            CleanDecision::DropSubtree => return Ok(Vec::new()),
            CleanDecision::RewriteText(text) => vec![Node::text(text)],
            CleanDecision::PassThrough => {
                let is_wrapper = self.is_external_wrapper(el);
                let next_parent = (!is_wrapper).then_some(el.tag.as_str());

                // `<pre><code>` carries its text one level down.
                let source = match el.children.first() {
                    Some(HtmlNode::Element(code)) if el.tag == "pre" && code.tag == "code" => code,
                    _ => el,
                };
                let children = self.children(source, next_parent, depth)?;

                if is_wrapper {
                    return Ok(children);
                }
                children
            }
        };

        // A `<p>` inside a recognized container is layout noise.
        if el.tag == "p" && parent.and_then(|tag| element_kind(&HtmlElement::new(tag))).is_some() {
            return Ok(children);
        }

        if el.tag == "span" {
            let marks = span_style_marks(el);
            if !marks.is_empty() {
                apply_marks(&mut children, marks);
            }
            return Ok(children);
        }

        if let Some(kind) = element_kind(el) {
            if matches!(kind, BlockKind::List { .. }) {
                children = wrap_list_items(children);
            }
            return Ok(vec![Node::Block(Block::new(kind, children))]);
        }

        if let Some(marks) = text_tag_marks(&el.tag) {
            apply_marks(&mut children, marks);
            return Ok(children);
        }

        Ok(children)
    }

    fn text_node(&self, text: &str) -> Vec<Node> {
        match classify(&HtmlNode::text(text)) {
            CleanDecision::DropSubtree => Vec::new(),
            CleanDecision::RewriteText(cleaned) => vec![Node::text(cleaned)],
            CleanDecision::PassThrough => {
                if text.trim().is_empty() && text.contains('\n') {
                    // Source formatting between tags.
                    Vec::new()
                } else {
                    vec![Node::text(text)]
                }
            }
        }
    }

    fn is_external_wrapper(&self, el: &HtmlElement) -> bool {
        el.tag == "b"
            && el
                .id()
                .is_some_and(|id| id.starts_with(self.config.wrapper_id_prefix.as_str()))
    }
}

/// Merge `marks` into every text leaf below `nodes`.
fn apply_marks(nodes: &mut [Node], marks: Marks) {
    for node in nodes {
        match node {
            Node::Text(Text { marks: own, .. }) => *own = own.merge(marks),
            Node::Block(block) => apply_marks(&mut block.children, marks),
        }
    }
}

/// Gather inline runs directly under a list into list items.
fn wrap_list_items(children: Vec<Node>) -> Vec<Node> {
    let mut items = Vec::with_capacity(children.len());
    let mut inline_run = Vec::new();
    for child in children {
        if child.is_inline() {
            inline_run.push(child);
            continue;
        }
        if has_content(&inline_run) {
            items.push(list_item(std::mem::take(&mut inline_run)));
        }
        inline_run.clear();
        items.push(child);
    }
    if has_content(&inline_run) || items.is_empty() {
        items.push(list_item(inline_run));
    }
    items
}

/// Whether an inline run holds more than whitespace between list items.
fn has_content(run: &[Node]) -> bool {
    run.iter().any(|node| match node {
        Node::Text(text) => !text.text.trim().is_empty(),
        Node::Block(_) => true,
    })
}

fn list_item(children: Vec<Node>) -> Node {
    Node::Block(Block::new(BlockKind::ListItem, children))
}

/// Convenience entry point: deserialize a parsed tree with `config`.
pub fn deserialize(root: &HtmlNode, config: &ClipboardConfig) -> Result<Document, SanitizeError> {
    let mut doc = Deserializer::new(config).deserialize(root)?;
    normalize_children(&mut doc.children);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn html(markup: &str) -> Document {
        let config = ClipboardConfig::default();
        let tree = parse_html(markup, &config).unwrap();
        deserialize(&tree, &config).unwrap()
    }

    fn para(children: Vec<Node>) -> Node {
        Node::Block(Block::paragraph(children))
    }

    fn marked(text: &str, mark: Mark) -> Node {
        Node::Text(Text::with_marks(text, Marks::default().with(mark)))
    }

    #[test]
    fn test_token_only_paragraph_keeps_structure() {
        assert_eq!(html("<p>drag</p>").children, vec![para(vec![Node::text("")])]);
    }

    fn block(kind: BlockKind, children: Vec<Node>) -> Node {
        Node::Block(Block::new(kind, children))
    }

    #[test]
    fn test_lone_token_only_heading_keeps_type() {
        assert_eq!(
            html("<h1>drag</h1>").children,
            vec![block(BlockKind::Heading { level: 1 }, vec![Node::text("")])]
        );
        // Same result with or without siblings.
        assert_eq!(
            html("<h1>drag</h1><p>ok</p>").children[0],
            html("<h1>drag</h1>").children[0]
        );
    }

    #[test]
    fn test_lone_token_only_quote_keeps_type() {
        assert_eq!(
            html("<blockquote>dragdrag</blockquote>").children,
            vec![block(BlockKind::Quote, vec![Node::text("")])]
        );
    }

    #[test]
    fn test_lone_token_only_list_keeps_items() {
        let ordered = BlockKind::List {
            format: ListFormat::Ordered,
        };
        assert_eq!(
            html("<ol><li>drag</li></ol>").children,
            vec![block(
                ordered,
                vec![block(BlockKind::ListItem, vec![Node::text("")])]
            )]
        );

        let doc = html("<ul><li>drag</li><li>DRAG</li></ul><p>x</p>");
        let list = doc.children[0].as_block().unwrap();
        assert_eq!(
            list.children,
            vec![
                block(BlockKind::ListItem, vec![Node::text("")]),
                block(BlockKind::ListItem, vec![Node::text("")]),
            ]
        );
    }

    #[test]
    fn test_stray_list_text_becomes_item() {
        let doc = html("<ul>drag</ul>");
        let list = doc.children[0].as_block().unwrap();
        assert_eq!(
            list.children,
            vec![block(BlockKind::ListItem, vec![Node::text("")])]
        );
    }

    #[test]
    fn test_draggable_root_yields_empty_paragraph() {
        let root = HtmlNode::Element(
            HtmlElement::new("body")
                .with_attr("draggable", "true")
                .with_child(HtmlElement::new("h1").with_child("x")),
        );
        let doc = deserialize(&root, &ClipboardConfig::default()).unwrap();
        assert_eq!(doc.children, vec![para(vec![Node::text("")])]);
    }

    #[test]
    fn test_leading_run_is_removed() {
        assert_eq!(
            html("<p>dragdrag hello</p>").children,
            vec![para(vec![Node::text(" hello")])]
        );
    }

    #[test]
    fn test_draggable_subtree_is_emptied() {
        let doc = html(r#"<b draggable="true">x</b>"#);
        assert_eq!(doc.children, vec![para(vec![Node::text("")])]);
        assert!(!doc.plain_text().contains('x'));
    }

    #[test]
    fn test_trailing_run_leaves_no_empty_leaf() {
        let doc = html("<p>Hello <b>world</b>dragdrag</p>");
        assert_eq!(
            doc.children,
            vec![para(vec![Node::text("Hello "), marked("world", Mark::Bold)])]
        );
    }

    #[test]
    fn test_element_table() {
        let doc = html(concat!(
            "<h3>Title</h3>",
            "<blockquote>quoted</blockquote>",
            r#"<p><a href="https://example.com">site</a></p>"#,
            r#"<img src="cat.png">"#,
            "<ol><li>one</li><li>two</li></ol>",
            "<pre><code>let x = 1;</code></pre>",
        ));
        let kinds: Vec<_> = doc
            .children
            .iter()
            .map(|n| n.as_block().unwrap().kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading { level: 3 },
                BlockKind::Quote,
                BlockKind::Paragraph,
                BlockKind::Image {
                    url: "cat.png".into()
                },
                BlockKind::List {
                    format: ListFormat::Ordered
                },
                BlockKind::Code,
            ]
        );

        let link = doc.children[2].children()[0].as_block().unwrap();
        assert_eq!(
            link.kind,
            BlockKind::Link {
                url: "https://example.com".into()
            }
        );
        assert_eq!(doc.children[3].children(), &[Node::text("")]);
        assert_eq!(doc.children[4].children().len(), 2);
        // Code text is not marked when it comes from <pre><code>.
        assert_eq!(doc.children[5].children(), &[Node::text("let x = 1;")]);
    }

    #[test]
    fn test_text_marks() {
        let doc = html("<p><strong>b</strong><em>i</em><u>u</u><del>s</del><code>c</code></p>");
        assert_eq!(
            doc.children,
            vec![para(vec![
                marked("b", Mark::Bold),
                marked("i", Mark::Italic),
                marked("u", Mark::Underline),
                marked("s", Mark::Strikethrough),
                marked("c", Mark::Code),
            ])]
        );
    }

    #[test]
    fn test_nested_marks_merge() {
        let doc = html("<p><b><i>x</i></b></p>");
        let marks = Marks::default().with(Mark::Bold).with(Mark::Italic);
        assert_eq!(
            doc.children,
            vec![para(vec![Node::Text(Text::with_marks("x", marks))])]
        );
    }

    #[test]
    fn test_span_styles() {
        let doc = html(concat!(
            r#"<p><span style="font-weight:700">b</span>"#,
            r#"<span style="font-style: italic; text-decoration: underline">iu</span>"#,
            r#"<span style="color:red">plain</span></p>"#,
        ));
        let iu = Marks::default().with(Mark::Italic).with(Mark::Underline);
        assert_eq!(
            doc.children,
            vec![para(vec![
                marked("b", Mark::Bold),
                Node::Text(Text::with_marks("iu", iu)),
                Node::text("plain"),
            ])]
        );
    }

    #[test]
    fn test_external_wrapper_is_unwrapped() {
        let doc = html(concat!(
            r#"<meta charset="utf-8"><b style="font-weight:normal;" id="docs-internal-guid-1234">"#,
            r#"<p dir="ltr"><span style="font-weight:700">Bold</span><span> tail</span></p>"#,
            "<ul><li><p>item</p></li></ul>",
            "</b>",
        ));
        assert_eq!(doc.children.len(), 2);
        assert_eq!(
            doc.children[0],
            para(vec![marked("Bold", Mark::Bold), Node::text(" tail")])
        );
        // The <p> inside <li> is unwrapped.
        let item = doc.children[1].children()[0].as_block().unwrap();
        assert_eq!(item.kind, BlockKind::ListItem);
        assert_eq!(item.children, vec![Node::text("item")]);
    }

    #[test]
    fn test_unknown_tags_degrade_to_children() {
        let doc = html("<div><section><p>a</p></section><article>b</article></div>");
        assert_eq!(
            doc.children,
            vec![para(vec![Node::text("a")]), para(vec![Node::text("b")])]
        );
    }

    #[test]
    fn test_line_breaks() {
        let doc = html("<p>a<br>b</p><br>");
        assert_eq!(
            doc.children,
            vec![para(vec![Node::text("a\nb")]), para(vec![Node::text("")])]
        );
    }

    #[test]
    fn test_formatting_whitespace_is_ignored() {
        let doc = html("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");
        let list = doc.children[0].as_block().unwrap();
        assert_eq!(list.children.len(), 2);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(html("").children, vec![para(vec![Node::text("")])]);
    }

    #[test]
    fn test_drag_markup_variants() {
        let doc = html(concat!(
            r#"<p>keep<span class="drag-ghost">ghost</span></p>"#,
            r#"<p><span data-drag-source="1">x</span>ok</p>"#,
            "<h2>DragDrag</h2>",
        ));
        assert_eq!(
            doc.children,
            vec![
                para(vec![Node::text("keep")]),
                para(vec![Node::text("ok")]),
                Node::Block(Block::new(
                    BlockKind::Heading { level: 2 },
                    vec![Node::text("")]
                )),
            ]
        );
    }

    #[test]
    fn test_depth_limit_in_deserializer() {
        let mut tree = HtmlElement::new("span").with_child("x");
        for _ in 0..5 {
            tree = HtmlElement::new("span").with_child(tree);
        }
        let config = ClipboardConfig {
            max_depth: 4,
            ..Default::default()
        };
        let err = deserialize(&HtmlNode::Element(tree), &config).unwrap_err();
        assert!(matches!(err, SanitizeError::TooDeep { max: 4 }));
    }
}
