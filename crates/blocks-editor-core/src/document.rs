//! Block document model.
//!
//! Serialized form, one object per node:
//!
//! ```json
//! [
//!   { "type": "heading", "level": 2, "children": [{ "text": "Title" }] },
//!   { "type": "paragraph", "children": [
//!       { "text": "Hello " },
//!       { "text": "world", "bold": true },
//!       { "type": "link", "url": "https://example.com", "children": [{ "text": "site" }] }
//!   ] }
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// Index path from the document root to a node.
pub type Path = Vec<usize>;

/// Formatting mark flags on a text leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single formatting mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl Marks {
    pub fn with(mut self, mark: Mark) -> Self {
        self.set(mark, true);
        self
    }

    pub fn has(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Strikethrough => self.strikethrough,
            Mark::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Underline => self.underline = on,
            Mark::Strikethrough => self.strikethrough = on,
            Mark::Code => self.code = on,
        }
    }

    /// Union of both mark sets.
    pub fn merge(self, other: Marks) -> Marks {
        Marks {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Marks::default()
    }
}

/// A text leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Length in characters.
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    Ordered,
    Unordered,
}

/// Block kind with its kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    Quote,
    List { format: ListFormat },
    ListItem,
    Code,
    Image { url: String },
    Link { url: String },
}

impl BlockKind {
    /// Inline blocks live among text leaves.
    pub fn is_inline(&self) -> bool {
        matches!(self, BlockKind::Link { .. })
    }

    /// Void blocks carry no editable text.
    pub fn is_void(&self) -> bool {
        matches!(self, BlockKind::Image { .. })
    }

    /// Blocks whose children are inline content (text and links).
    pub fn holds_inline(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph
                | BlockKind::Heading { .. }
                | BlockKind::Quote
                | BlockKind::Code
                | BlockKind::Link { .. }
        )
    }
}

/// A typed element with children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    pub children: Vec<Node>,
}

impl Block {
    pub fn new(kind: BlockKind, children: Vec<Node>) -> Self {
        let mut block = Self { kind, children };
        block.normalize();
        block
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(BlockKind::Paragraph, children)
    }

    /// Restore the block invariants: void blocks hold one empty text, other
    /// blocks never have an empty child list, adjacent text leaves with equal
    /// marks are merged and empty leaves are dropped when they have siblings.
    pub fn normalize(&mut self) {
        if self.kind.is_void() {
            self.children = vec![Node::Text(Text::empty())];
            return;
        }
        normalize_children(&mut self.children);
    }
}

/// Either a block or a text leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Block(Block),
    Text(Text),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(block) => Some(block),
            Node::Text(_) => None,
        }
    }

    /// Inline nodes are text leaves and inline blocks.
    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Block(block) => block.kind.is_inline(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Block(block) => &block.children,
            Node::Text(_) => &[],
        }
    }

    /// Concatenated text of every leaf.
    pub fn string(&self) -> String {
        let mut out = String::new();
        push_string(self, &mut out);
        out
    }

    /// Length in characters of every leaf.
    pub fn len_chars(&self) -> usize {
        match self {
            Node::Text(text) => text.len_chars(),
            Node::Block(block) => block.children.iter().map(Node::len_chars).sum(),
        }
    }
}

impl From<Block> for Node {
    fn from(block: Block) -> Self {
        Node::Block(block)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

fn push_string(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&text.text),
        Node::Block(block) => block.children.iter().for_each(|c| push_string(c, out)),
    }
}

/// Normalize a child list in place, recursing into blocks.
pub fn normalize_children(children: &mut Vec<Node>) {
    for child in children.iter_mut() {
        if let Node::Block(block) = child {
            block.normalize();
        }
    }

    let mut merged: Vec<Node> = Vec::with_capacity(children.len());
    for child in children.drain(..) {
        if let (Some(Node::Text(prev)), Node::Text(next)) = (merged.last_mut(), &child) {
            if prev.marks == next.marks {
                prev.text.push_str(&next.text);
                continue;
            }
        }
        merged.push(child);
    }

    if merged.len() > 1 {
        merged.retain(|node| !matches!(node, Node::Text(text) if text.text.is_empty()));
    }
    if merged.is_empty() {
        merged.push(Node::Text(Text::empty()));
    }
    *children = merged;
}

/// The rich-text field value: an ordered sequence of top-level blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// A document with a single empty paragraph, what a fresh field holds.
    pub fn empty_paragraph() -> Self {
        Self::new(vec![Node::Block(Block::paragraph(Vec::new()))])
    }

    /// Build a block document from a node list, wrapping runs of inline nodes
    /// into paragraphs.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut children = Vec::new();
        let mut inline_run = Vec::new();
        for node in nodes {
            if node.is_inline() {
                inline_run.push(node);
            } else {
                if !inline_run.is_empty() {
                    children.push(Node::Block(Block::paragraph(std::mem::take(
                        &mut inline_run,
                    ))));
                }
                children.push(node);
            }
        }
        if !inline_run.is_empty() {
            children.push(Node::Block(Block::paragraph(inline_run)));
        }
        if children.is_empty() {
            return Self::empty_paragraph();
        }
        let mut doc = Self::new(children);
        doc.normalize();
        doc
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Normalize every top-level block. Top-level text never gets merged
    /// here because a document root only holds blocks.
    pub fn normalize(&mut self) {
        for child in &mut self.children {
            if let Node::Block(block) = child {
                block.normalize();
            }
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = match node {
                Node::Block(block) => block.children.get_mut(*index)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// Child list of the node at `path`; the root list for an empty path.
    pub fn children_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        if path.is_empty() {
            return Some(&mut self.children);
        }
        match self.node_mut(path)? {
            Node::Block(block) => Some(&mut block.children),
            Node::Text(_) => None,
        }
    }

    pub fn text(&self, path: &[usize]) -> Option<&Text> {
        self.node(path)?.as_text()
    }

    pub fn text_mut(&mut self, path: &[usize]) -> Option<&mut Text> {
        match self.node_mut(path)? {
            Node::Text(text) => Some(text),
            Node::Block(_) => None,
        }
    }

    /// Every text leaf path in document order with its global character span.
    pub fn leaf_spans(&self) -> Vec<(Path, std::ops::Range<usize>)> {
        let mut spans = Vec::new();
        let mut offset = 0;
        let mut path = Vec::new();
        collect_spans(&self.children, &mut path, &mut offset, &mut spans);
        spans
    }

    /// Total length in characters.
    pub fn len_chars(&self) -> usize {
        self.children.iter().map(Node::len_chars).sum()
    }

    /// Concatenated text of every block, blocks separated by newlines.
    pub fn plain_text(&self) -> String {
        crate::serialize::to_plain_text(&self.children)
    }
}

fn collect_spans(
    nodes: &[Node],
    path: &mut Path,
    offset: &mut usize,
    spans: &mut Vec<(Path, std::ops::Range<usize>)>,
) {
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        match node {
            Node::Text(text) => {
                let len = text.len_chars();
                spans.push((path.clone(), *offset..*offset + len));
                *offset += len;
            }
            Node::Block(block) => collect_spans(&block.children, path, offset, spans),
        }
        path.pop();
    }
}
