//! Reference block editor.
//!
//! Just enough editing for the clipboard pipeline and the keyboard contract:
//! text and fragment insertion, selection deletion, marks, links and the
//! operation log that drives change notification.
//!
//! Positions are handled internally as a [`Caret`]: the index of a text
//! container (or void block) in document order plus a character offset into
//! its inline content. Normalization only merges or drops text leaves, never
//! blocks, so carets survive it while leaf paths do not.

use std::fmt;

use crate::document::{Block, BlockKind, Document, ListFormat, Mark, Marks, Node, Path, Text};
use crate::ops::{NodeProperties, Operation};
use crate::platform::{ClipboardData, MIME_HTML, MIME_PLAIN, PlatformError};
use crate::serialize::{to_html, to_plain_text};
use crate::types::{Point, Selection};

/// What the clipboard interceptor needs from an editor.
pub trait EditorDocument {
    /// Insert a block fragment at the selection, replacing selected content.
    fn insert_fragment(&mut self, fragment: &Document) -> bool;

    /// Insert plain text at the selection, replacing selected content.
    fn insert_text(&mut self, text: &str) -> bool;

    /// The editor's own handling of a clipboard payload, used when it holds
    /// neither HTML nor plain text the interceptor understands.
    fn insert_data(&mut self, data: &dyn ClipboardData) -> bool;

    /// Write the selection to `data` as `text/html` and `text/plain`.
    /// Returns `Ok(false)` when there is nothing selected.
    fn write_fragment(&self, data: &dyn ClipboardData) -> Result<bool, PlatformError>;

    /// Delete the selected content.
    fn delete_selection(&mut self) -> bool;
}

/// Container index in document order plus a character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Caret {
    pub unit: usize,
    pub offset: usize,
}

/// A text container or void block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unit {
    pub path: Path,
    pub void: bool,
}

pub(crate) fn is_text_container(kind: &BlockKind) -> bool {
    (kind.holds_inline() && !kind.is_inline()) || *kind == BlockKind::ListItem
}

/// Every text container and void block in document order.
pub(crate) fn units(doc: &Document) -> Vec<Unit> {
    fn walk(nodes: &[Node], path: &mut Path, out: &mut Vec<Unit>) {
        for (index, node) in nodes.iter().enumerate() {
            let Node::Block(block) = node else { continue };
            if block.kind.is_inline() {
                continue;
            }
            path.push(index);
            if block.kind.is_void() {
                out.push(Unit {
                    path: path.clone(),
                    void: true,
                });
            } else {
                if is_text_container(&block.kind) {
                    out.push(Unit {
                        path: path.clone(),
                        void: false,
                    });
                }
                walk(&block.children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

pub(crate) fn inline_len(block: &Block) -> usize {
    block
        .children
        .iter()
        .filter(|node| node.is_inline())
        .map(Node::len_chars)
        .sum()
}

/// A text leaf of a container's inline content.
struct Leaf {
    path: Path,
    start: usize,
    len: usize,
    in_link: bool,
}

fn inline_leaves(children: &[Node]) -> Vec<Leaf> {
    fn walk(nodes: &[Node], path: &mut Path, pos: &mut usize, in_link: bool, out: &mut Vec<Leaf>) {
        for (index, node) in nodes.iter().enumerate() {
            path.push(index);
            match node {
                Node::Text(text) => {
                    let len = text.len_chars();
                    out.push(Leaf {
                        path: path.clone(),
                        start: *pos,
                        len,
                        in_link,
                    });
                    *pos += len;
                }
                Node::Block(block) if block.kind.is_inline() => {
                    walk(&block.children, path, pos, true, out)
                }
                Node::Block(_) => {}
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(children, &mut Vec::new(), &mut 0, false, &mut out);
    out
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(byte, _)| byte)
}

/// Split inline content at a character offset. Links straddling the offset
/// are split into two links with the same url.
pub(crate) fn split_inline(nodes: Vec<Node>, at: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for node in nodes {
        let len = node.len_chars();
        if pos + len <= at {
            left.push(node);
        } else if pos >= at {
            right.push(node);
        } else {
            let (head, tail) = split_node(node, at - pos);
            left.push(head);
            right.push(tail);
        }
        pos += len;
    }
    (left, right)
}

fn split_node(node: Node, at: usize) -> (Node, Node) {
    match node {
        Node::Text(mut text) => {
            let byte = char_to_byte(&text.text, at);
            let tail = Text::with_marks(&text.text[byte..], text.marks);
            text.text.truncate(byte);
            (Node::Text(text), Node::Text(tail))
        }
        Node::Block(block) => {
            let (head, tail) = split_inline(block.children, at);
            (
                Node::Block(Block {
                    kind: block.kind.clone(),
                    children: head,
                }),
                Node::Block(Block {
                    kind: block.kind,
                    children: tail,
                }),
            )
        }
    }
}

/// Remove and return the inline children of `block`, leaving nested blocks.
pub(crate) fn take_inline(block: &mut Block) -> Vec<Node> {
    let (inline, rest): (Vec<Node>, Vec<Node>) = std::mem::take(&mut block.children)
        .into_iter()
        .partition(Node::is_inline);
    block.children = rest;
    inline
}

/// Put inline children back in front of the nested blocks.
pub(crate) fn put_inline(block: &mut Block, inline: Vec<Node>) {
    let mut children = inline;
    children.append(&mut block.children);
    block.children = children;
}

fn set_mark(nodes: &mut [Node], mark: Mark, on: bool) {
    for node in nodes {
        match node {
            Node::Text(text) => text.marks.set(mark, on),
            Node::Block(block) => set_mark(&mut block.children, mark, on),
        }
    }
}

fn string_of(nodes: &[Node]) -> String {
    nodes.iter().map(Node::string).collect()
}

fn child_path(parent: &[usize], index: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(index);
    path
}

type ChangeCallback = Box<dyn FnMut(&Document)>;

/// Block editor over an owned [`Document`].
pub struct BlocksEditor {
    doc: Document,
    selection: Option<Selection>,
    pending_marks: Option<Marks>,
    operations: Vec<Operation>,
    /// Set once the current batch was flushed; the next record starts a new one.
    batch_closed: bool,
    on_change: Option<ChangeCallback>,
    last_inserted_link: Option<Path>,
    link_requested: bool,
}

impl fmt::Debug for BlocksEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlocksEditor")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("pending_marks", &self.pending_marks)
            .field("operations", &self.operations.len())
            .finish_non_exhaustive()
    }
}

impl Default for BlocksEditor {
    fn default() -> Self {
        Self::new(Document::empty_paragraph())
    }
}

impl BlocksEditor {
    /// Wrap `doc`. Top-level inline nodes are wrapped into paragraphs and an
    /// empty document gets one empty paragraph.
    pub fn new(doc: Document) -> Self {
        Self {
            doc: Document::from_nodes(doc.children),
            selection: None,
            pending_marks: None,
            operations: Vec::new(),
            batch_closed: false,
            on_change: None,
            last_inserted_link: None,
            link_requested: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Operations of the most recent command.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn take_operations(&mut self) -> Vec<Operation> {
        self.batch_closed = false;
        std::mem::take(&mut self.operations)
    }

    /// Called with the document after every command that changed content.
    pub fn on_change(&mut self, callback: impl FnMut(&Document) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Path of the link the last `insert_link` created, until that node is
    /// removed or merged away.
    pub fn last_inserted_link(&self) -> Option<&[usize]> {
        self.last_inserted_link.as_deref()
    }

    /// Returns and resets the pending link request from `Mod+K`.
    pub fn take_link_request(&mut self) -> bool {
        std::mem::take(&mut self.link_requested)
    }

    pub(crate) fn request_link(&mut self) {
        self.link_requested = true;
    }

    /// Marks the next inserted text gets.
    pub fn marks(&self) -> Marks {
        if let Some(marks) = self.pending_marks {
            return marks;
        }
        self.selected_range()
            .map(|(start, _)| self.marks_at(start))
            .unwrap_or_default()
    }

    // === Selection ===

    /// Set the selection. Offsets are clamped to their leaves; points that
    /// do not name a text leaf are rejected.
    pub fn select(&mut self, anchor: Point, focus: Point) -> bool {
        let (Some(anchor), Some(focus)) = (self.clamp_point(anchor), self.clamp_point(focus)) else {
            return false;
        };
        self.pending_marks = None;
        self.set_selection(Some(Selection::new(anchor, focus)));
        self.flush();
        true
    }

    pub fn select_all(&mut self) -> bool {
        let (Some(start), Some(end)) = (self.start_caret(), self.end_caret()) else {
            return false;
        };
        self.set_carets(start, end);
        self.flush();
        true
    }

    /// Collapse the selection at the very end of the document.
    pub fn focus_end(&mut self) -> bool {
        let Some(end) = self.end_caret() else {
            return false;
        };
        self.set_carets(end, end);
        self.flush();
        true
    }

    fn clamp_point(&self, point: Point) -> Option<Point> {
        let text = self.doc.text(&point.path)?;
        let offset = point.offset.min(text.len_chars());
        Some(Point::new(point.path, offset))
    }

    fn start_caret(&self) -> Option<Caret> {
        (!units(&self.doc).is_empty()).then_some(Caret { unit: 0, offset: 0 })
    }

    fn end_caret(&self) -> Option<Caret> {
        let units = units(&self.doc);
        let unit = units.len().checked_sub(1)?;
        let offset = match self.doc.node(&units[unit].path) {
            Some(Node::Block(block)) if !units[unit].void => inline_len(block),
            _ => 0,
        };
        Some(Caret { unit, offset })
    }

    pub(crate) fn caret_of(&self, point: &Point) -> Option<Caret> {
        let units = units(&self.doc);
        let (index, unit) = units
            .iter()
            .enumerate()
            .filter(|(_, unit)| point.path.starts_with(&unit.path))
            .max_by_key(|(_, unit)| unit.path.len())?;
        if unit.void {
            return Some(Caret {
                unit: index,
                offset: 0,
            });
        }
        let block = self.doc.node(&unit.path)?.as_block()?;
        let relative = &point.path[unit.path.len()..];
        let offset = inline_leaves(&block.children)
            .iter()
            .find(|leaf| leaf.path == relative)
            .map_or(0, |leaf| leaf.start + point.offset.min(leaf.len));
        Some(Caret {
            unit: index,
            offset,
        })
    }

    pub(crate) fn point_at(&self, caret: Caret) -> Option<Point> {
        let units = units(&self.doc);
        let unit = units.get(caret.unit)?;
        if unit.void {
            return Some(Point::new(child_path(&unit.path, 0), 0));
        }
        let block = self.doc.node(&unit.path)?.as_block()?;
        let leaves = inline_leaves(&block.children);

        let mut chosen = None;
        for (index, leaf) in leaves.iter().enumerate() {
            let end = leaf.start + leaf.len;
            if caret.offset > end {
                continue;
            }
            // At the end of a link, prefer the plain text after it.
            if leaf.in_link && caret.offset == end {
                if let Some(next) = leaves.get(index + 1).filter(|next| !next.in_link) {
                    chosen = Some((&next.path, 0));
                    break;
                }
            }
            chosen = Some((&leaf.path, caret.offset - leaf.start));
            break;
        }
        let (relative, offset) = match chosen {
            Some(found) => found,
            None => {
                let last = leaves.last();
                match last {
                    Some(leaf) => (&leaf.path, leaf.len),
                    None => {
                        // Container without inline content: use the first
                        // leaf below it.
                        let (path, _) = self
                            .doc
                            .leaf_spans()
                            .into_iter()
                            .find(|(path, _)| path.starts_with(&unit.path))?;
                        return Some(Point::new(path, 0));
                    }
                }
            }
        };
        let mut path = unit.path.clone();
        path.extend_from_slice(relative);
        Some(Point::new(path, offset))
    }

    /// Anchor and focus as carets.
    pub(crate) fn carets(&self) -> Option<(Caret, Caret)> {
        let selection = self.selection.as_ref()?;
        Some((
            self.caret_of(&selection.anchor)?,
            self.caret_of(&selection.focus)?,
        ))
    }

    /// Selection as ordered carets.
    pub(crate) fn selected_range(&self) -> Option<(Caret, Caret)> {
        let (anchor, focus) = self.carets()?;
        Some((anchor.min(focus), anchor.max(focus)))
    }

    /// Selection as ordered carets, placing the cursor at the end of the
    /// document when there is no selection yet.
    pub(crate) fn ensure_range(&mut self) -> Option<(Caret, Caret)> {
        if self.selection.is_none() {
            let end = self.end_caret()?;
            self.set_carets(end, end);
        }
        self.selected_range()
    }

    pub(crate) fn set_carets(&mut self, anchor: Caret, focus: Caret) {
        let selection = match (self.point_at(anchor), self.point_at(focus)) {
            (Some(anchor), Some(focus)) => Some(Selection::new(anchor, focus)),
            _ => None,
        };
        self.set_selection(selection);
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        if self.selection == selection {
            return;
        }
        self.selection = selection.clone();
        self.record(Operation::SetSelection { selection });
    }

    pub(crate) fn unit_index(&self, path: &[usize]) -> Option<usize> {
        units(&self.doc).iter().position(|unit| unit.path == path)
    }

    fn marks_at(&self, caret: Caret) -> Marks {
        self.point_at(caret)
            .and_then(|point| self.doc.text(&point.path))
            .map(|text| text.marks)
            .unwrap_or_default()
    }

    // === Operation log ===

    pub(crate) fn record(&mut self, op: Operation) {
        if let Some(link) = &self.last_inserted_link {
            if op.removes(link) {
                self.last_inserted_link = None;
            }
        }
        tracing::trace!(?op, "editor operation");
        if self.batch_closed {
            self.operations.clear();
            self.batch_closed = false;
        }
        self.operations.push(op);
    }

    /// Close the current batch and notify the change listener if it changed
    /// content. The log only ever holds one batch.
    pub(crate) fn flush(&mut self) {
        let changed = !self.batch_closed
            && self.operations.iter().any(Operation::is_content_change);
        self.batch_closed = true;

        let link_gone = self.last_inserted_link.as_ref().is_some_and(|path| {
            !matches!(
                self.doc.node(path),
                Some(Node::Block(Block { kind: BlockKind::Link { .. }, .. }))
            )
        });
        if link_gone {
            self.last_inserted_link = None;
        }

        if changed {
            if let Some(callback) = self.on_change.as_mut() {
                callback(&self.doc);
            }
        }
    }

    /// Normalize, move the cursor and notify.
    pub(crate) fn commit(&mut self, caret: Caret) {
        self.doc.normalize();
        self.set_carets(caret, caret);
        self.flush();
    }

    pub(crate) fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Replace the inline content of the container at `path`.
    fn edit_inline<R>(
        &mut self,
        path: &[usize],
        edit: impl FnOnce(Vec<Node>) -> (Vec<Node>, R),
    ) -> Option<R> {
        let Some(Node::Block(block)) = self.doc.node_mut(path) else {
            return None;
        };
        let inline = take_inline(block);
        let (inline, out) = edit(inline);
        put_inline(block, inline);
        Some(out)
    }

    // === Editing ===

    /// Delete between two ordered carets without normalizing.
    fn delete_range(&mut self, start: Caret, end: Caret) -> bool {
        if start >= end {
            return false;
        }
        let units = units(&self.doc);
        let (Some(first), Some(last)) = (units.get(start.unit), units.get(end.unit)) else {
            return false;
        };

        if start.unit == end.unit {
            if first.void {
                return false;
            }
            let len = end.offset - start.offset;
            let removed = self.edit_inline(&first.path, |inline| {
                let (mut left, rest) = split_inline(inline, start.offset);
                let (middle, right) = split_inline(rest, len);
                left.extend(right);
                (left, middle)
            });
            if let Some(removed) = removed {
                self.record(Operation::RemoveText {
                    path: first.path.clone(),
                    offset: start.offset,
                    text: string_of(&removed),
                });
            }
            return true;
        }

        let tail = match self.doc.node(&last.path) {
            Some(Node::Block(block)) if !last.void => {
                let inline = block.children.iter().filter(|n| n.is_inline()).cloned().collect();
                split_inline(inline, end.offset).1
            }
            _ => Vec::new(),
        };

        // Later units first so earlier paths stay valid.
        for unit in units[start.unit + 1..=end.unit].iter().rev() {
            self.remove_unit(unit);
        }

        if first.void {
            // A selection starting on an image turns it into the paragraph
            // that receives the surviving tail.
            if let Some(Node::Block(block)) = self.doc.node_mut(&first.path) {
                block.kind = BlockKind::Paragraph;
                block.children = tail;
            }
            self.record(Operation::SetNode {
                path: first.path.clone(),
                properties: NodeProperties {
                    kind: Some(BlockKind::Paragraph),
                    marks: None,
                },
            });
        } else {
            let offset = start.offset;
            let removed = self.edit_inline(&first.path, |inline| {
                let (mut left, removed) = split_inline(inline, offset);
                left.extend(tail);
                (left, removed)
            });
            if let Some(removed) = removed.filter(|r| !r.is_empty()) {
                self.record(Operation::RemoveText {
                    path: first.path.clone(),
                    offset,
                    text: string_of(&removed),
                });
            }
            self.record(Operation::MergeNode {
                path: last.path.clone(),
                position: offset,
            });
        }
        true
    }

    /// Remove a unit, or only its inline content when it still holds nested
    /// blocks. Lists left without items are removed too.
    fn remove_unit(&mut self, unit: &Unit) {
        let has_blocks = match self.doc.node(&unit.path) {
            Some(Node::Block(block)) => block.children.iter().any(|n| !n.is_inline()),
            _ => false,
        };
        if has_blocks && !unit.void {
            let removed = self.edit_inline(&unit.path, |inline| (Vec::new(), inline));
            if let Some(removed) = removed {
                self.record(Operation::RemoveText {
                    path: unit.path.clone(),
                    offset: 0,
                    text: string_of(&removed),
                });
            }
            return;
        }

        let mut path = unit.path.clone();
        loop {
            let Some((&index, parent)) = path.split_last() else {
                return;
            };
            let Some(siblings) = self.doc.children_mut(parent) else {
                return;
            };
            if index >= siblings.len() {
                return;
            }
            let node = siblings.remove(index);
            let parent = parent.to_vec();
            self.record(Operation::RemoveNode {
                path: path.clone(),
                node,
            });

            let empty_list = matches!(
                self.doc.node(&parent),
                Some(Node::Block(Block { kind: BlockKind::List { .. }, children })) if children.is_empty()
            );
            if !empty_list {
                return;
            }
            path = parent;
        }
    }

    /// Toggle `mark` over the selection, or the pending marks when the
    /// selection is collapsed.
    pub fn toggle_mark(&mut self, mark: Mark) -> bool {
        let Some((anchor, focus)) = self.carets() else {
            return false;
        };
        let (start, end) = (anchor.min(focus), anchor.max(focus));
        if start == end {
            let mut marks = self.marks();
            marks.set(mark, !marks.has(mark));
            self.pending_marks = Some(marks);
            return true;
        }

        let on = !self.selected_fragment().is_some_and(|fragment| {
            fragment.leaf_spans().iter().all(|(path, span)| {
                span.is_empty() || fragment.text(path).is_some_and(|text| text.marks.has(mark))
            })
        });

        let units = units(&self.doc);
        for (index, unit) in units
            .iter()
            .enumerate()
            .take(end.unit + 1)
            .skip(start.unit)
        {
            if unit.void {
                continue;
            }
            let from = if index == start.unit { start.offset } else { 0 };
            let to = if index == end.unit { end.offset } else { usize::MAX };
            self.edit_inline(&unit.path, |inline| {
                let (mut left, rest) = split_inline(inline, from);
                let (mut middle, right) = split_inline(rest, to.saturating_sub(from));
                set_mark(&mut middle, mark, on);
                left.extend(middle);
                left.extend(right);
                (left, ())
            });
            self.record(Operation::SetNode {
                path: unit.path.clone(),
                properties: NodeProperties {
                    kind: None,
                    marks: Some(if on {
                        Marks::default().with(mark)
                    } else {
                        Marks::default()
                    }),
                },
            });
        }

        self.doc.normalize();
        self.set_carets(anchor, focus);
        self.flush();
        true
    }

    /// Insert a link at the selection. The label defaults to the url.
    pub fn insert_link(&mut self, url: &str, text: Option<&str>) -> bool {
        let label = text.filter(|text| !text.is_empty()).unwrap_or(url);
        if label.is_empty() {
            return false;
        }
        let Some((start, end)) = self.ensure_range() else {
            return false;
        };
        self.delete_range(start, end);

        let Some(unit) = units(&self.doc).into_iter().nth(start.unit) else {
            self.flush();
            return false;
        };
        if unit.void {
            self.commit(start);
            return false;
        }

        let link = Node::Block(Block::new(
            BlockKind::Link {
                url: url.to_owned(),
            },
            vec![Node::text(label)],
        ));
        let inserted = link.clone();
        let index = self.edit_inline(&unit.path, |inline| {
            let (mut left, right) = split_inline(inline, start.offset);
            let index = left.len();
            left.push(inserted);
            left.extend(right);
            (left, index)
        });
        if let Some(index) = index {
            self.record(Operation::InsertNode {
                path: child_path(&unit.path, index),
                node: link,
            });
        }

        self.doc.normalize();
        self.last_inserted_link = self.find_link(&unit.path, start.offset, url);
        let caret = Caret {
            unit: start.unit,
            offset: start.offset + label.chars().count(),
        };
        self.commit(caret);
        true
    }

    fn find_link(&self, container: &[usize], offset: usize, url: &str) -> Option<Path> {
        let block = self.doc.node(container)?.as_block()?;
        let mut pos = 0;
        for (index, node) in block.children.iter().enumerate() {
            if pos == offset {
                if let Node::Block(Block {
                    kind: BlockKind::Link { url: found },
                    ..
                }) = node
                {
                    if found == url {
                        return Some(child_path(container, index));
                    }
                }
            }
            pos += node.len_chars();
        }
        None
    }

    /// The selected content as a standalone document.
    pub fn selected_fragment(&self) -> Option<Document> {
        let (start, end) = self.selected_range()?;
        if start == end {
            return None;
        }
        let units = units(&self.doc);
        let mut blocks: Vec<Node> = Vec::new();
        let mut list_parent: Option<&[usize]> = None;

        for (index, unit) in units
            .iter()
            .enumerate()
            .take(end.unit + 1)
            .skip(start.unit)
        {
            let Some(Node::Block(block)) = self.doc.node(&unit.path) else {
                continue;
            };
            if unit.void {
                blocks.push(Node::Block(block.clone()));
                list_parent = None;
                continue;
            }

            let inline: Vec<Node> = block
                .children
                .iter()
                .filter(|n| n.is_inline())
                .cloned()
                .collect();
            let from = if index == start.unit { start.offset } else { 0 };
            let to = if index == end.unit { end.offset } else { usize::MAX };
            let (head, _) = split_inline(inline, to);
            let (_, middle) = split_inline(head, from);
            let piece = Block::new(block.kind.clone(), middle);

            if block.kind != BlockKind::ListItem {
                blocks.push(Node::Block(piece));
                list_parent = None;
                continue;
            }

            // List items travel inside a list of their parent's format.
            let parent = &unit.path[..unit.path.len() - 1];
            let format = match self.doc.node(parent) {
                Some(Node::Block(Block {
                    kind: BlockKind::List { format },
                    ..
                })) => *format,
                _ => ListFormat::Unordered,
            };
            match blocks.last_mut() {
                Some(Node::Block(list)) if list_parent == Some(parent) => {
                    list.children.push(Node::Block(piece));
                }
                _ => {
                    blocks.push(Node::Block(Block::new(
                        BlockKind::List { format },
                        vec![Node::Block(piece)],
                    )));
                }
            }
            list_parent = Some(parent);
        }

        Some(Document::from_nodes(blocks))
    }

    /// Insert fragment blocks after the top-level block `top`. Returns the
    /// index of the first inserted block.
    fn insert_blocks_after(&mut self, top: usize, blocks: Vec<Node>) -> usize {
        let at = (top + 1).min(self.doc.children.len());
        for (offset, block) in blocks.into_iter().enumerate() {
            self.record(Operation::InsertNode {
                path: vec![at + offset],
                node: block.clone(),
            });
            self.doc.children.insert(at + offset, block);
        }
        at
    }

    /// Caret at the end of the last unit inside top-level blocks
    /// `[first, first + count)`.
    fn end_of_blocks(&self, first: usize, count: usize) -> Option<Caret> {
        let units = units(&self.doc);
        let (index, unit) = units
            .iter()
            .enumerate()
            .rev()
            .find(|(_, unit)| (first..first + count).contains(&unit.path[0]))?;
        let offset = match self.doc.node(&unit.path) {
            Some(Node::Block(block)) if !unit.void => inline_len(block),
            _ => 0,
        };
        Some(Caret {
            unit: index,
            offset,
        })
    }
}

impl EditorDocument for BlocksEditor {
    fn insert_fragment(&mut self, fragment: &Document) -> bool {
        let blocks = Document::from_nodes(fragment.children.clone()).children;
        let Some((start, end)) = self.ensure_range() else {
            return false;
        };
        self.delete_range(start, end);

        let Some(unit) = units(&self.doc).into_iter().nth(start.unit) else {
            self.flush();
            return false;
        };

        // A lone paragraph is spliced into the current container.
        if let [Node::Block(Block {
            kind: BlockKind::Paragraph,
            children,
        })] = blocks.as_slice()
        {
            if !unit.void {
                let inline: Vec<Node> = children.iter().filter(|n| n.is_inline()).cloned().collect();
                let len: usize = inline.iter().map(Node::len_chars).sum();
                let inserted = inline.clone();
                let index = self.edit_inline(&unit.path, |current| {
                    let (mut left, right) = split_inline(current, start.offset);
                    let index = left.len();
                    left.extend(inserted);
                    left.extend(right);
                    (left, index)
                });
                if let Some(index) = index {
                    for (i, node) in inline.into_iter().enumerate() {
                        self.record(Operation::InsertNode {
                            path: child_path(&unit.path, index + i),
                            node,
                        });
                    }
                }
                self.commit(Caret {
                    unit: start.unit,
                    offset: start.offset + len,
                });
                return true;
            }
        }

        let count = blocks.len();
        let top = unit.path[0];
        let first = if unit.void || unit.path.len() > 1 {
            // Images and nested containers are not split.
            self.insert_blocks_after(top, blocks)
        } else {
            let Some(Node::Block(block)) = self.doc.children.get_mut(top) else {
                self.flush();
                return false;
            };
            let original = Node::Block(block.clone());
            let inline = take_inline(block);
            let nested = std::mem::take(&mut block.children);
            let kind = block.kind.clone();
            let (left, mut right) = split_inline(inline, start.offset);
            let keep_left = left.iter().map(Node::len_chars).sum::<usize>() > 0;
            right.extend(nested);
            let keep_right = right.iter().any(|n| !n.is_inline() || n.len_chars() > 0);

            self.doc.children.remove(top);
            let mut at = top;
            if keep_left && keep_right {
                self.record(Operation::SplitNode {
                    path: vec![top],
                    position: start.offset,
                });
            } else {
                self.record(Operation::RemoveNode {
                    path: vec![top],
                    node: original,
                });
            }
            if keep_left {
                self.doc.children.insert(
                    at,
                    Node::Block(Block {
                        kind: kind.clone(),
                        children: left,
                    }),
                );
                at += 1;
            }
            let first = at;
            for block in blocks {
                self.record(Operation::InsertNode {
                    path: vec![at],
                    node: block.clone(),
                });
                self.doc.children.insert(at, block);
                at += 1;
            }
            if keep_right {
                self.doc.children.insert(
                    at,
                    Node::Block(Block {
                        kind,
                        children: right,
                    }),
                );
            }
            first
        };

        self.doc.normalize();
        match self.end_of_blocks(first, count) {
            Some(caret) => self.commit(caret),
            None => self.flush(),
        }
        true
    }

    fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let Some((start, end)) = self.ensure_range() else {
            return false;
        };
        self.delete_range(start, end);

        let marks = self.pending_marks.take().unwrap_or_else(|| self.marks_at(start));
        let point = self.point_at(start);
        let void = units(&self.doc).get(start.unit).is_none_or(|unit| unit.void);
        let Some(point) = point.filter(|_| !void) else {
            tracing::debug!("refusing to insert text into a void block");
            self.commit(start);
            return false;
        };

        let Some((&index, parent)) = point.path.split_last() else {
            self.commit(start);
            return false;
        };
        let parent = parent.to_vec();
        let Some(siblings) = self.doc.children_mut(&parent) else {
            self.commit(start);
            return false;
        };
        let Some(Node::Text(leaf)) = siblings.get_mut(index) else {
            self.commit(start);
            return false;
        };

        let byte = char_to_byte(&leaf.text, point.offset);
        if leaf.marks == marks {
            leaf.text.insert_str(byte, text);
            self.record(Operation::InsertText {
                path: point.path.clone(),
                offset: point.offset,
                text: text.to_owned(),
            });
        } else {
            let tail = Text::with_marks(&leaf.text[byte..], leaf.marks);
            leaf.text.truncate(byte);
            let node = Node::Text(Text::with_marks(text, marks));
            siblings.insert(index + 1, node.clone());
            siblings.insert(index + 2, Node::Text(tail));
            self.record(Operation::SplitNode {
                path: point.path.clone(),
                position: point.offset,
            });
            self.record(Operation::InsertNode {
                path: child_path(&parent, index + 1),
                node,
            });
        }

        self.commit(Caret {
            unit: start.unit,
            offset: start.offset + text.chars().count(),
        });
        true
    }

    fn insert_data(&mut self, data: &dyn ClipboardData) -> bool {
        match data.get_data(MIME_PLAIN) {
            Some(text) => self.insert_text(&text),
            None => {
                tracing::debug!("clipboard payload has nothing the editor can insert");
                false
            }
        }
    }

    fn write_fragment(&self, data: &dyn ClipboardData) -> Result<bool, PlatformError> {
        let Some(fragment) = self.selected_fragment() else {
            return Ok(false);
        };
        data.set_data(MIME_HTML, &to_html(&fragment.children))?;
        data.set_data(MIME_PLAIN, &to_plain_text(&fragment.children))?;
        Ok(true)
    }

    fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.selected_range() else {
            return false;
        };
        if !self.delete_range(start, end) {
            return false;
        }
        self.commit(start);
        true
    }
}
