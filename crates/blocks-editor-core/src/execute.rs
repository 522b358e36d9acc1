//! Keyboard command execution for the block editor.
//!
//! `handle_key` is the central dispatch point for key bindings. Commands
//! that do not apply at the current position fall through to the platform,
//! except Tab which is always swallowed so focus stays in the editor.

use crate::document::{Block, BlockKind, ListFormat, Node, Path};
use crate::editor::{BlocksEditor, Caret, inline_len, units};
use crate::keymap::{KeyChord, KeyCommand, KeyOutcome};
use crate::ops::{NodeProperties, Operation};

impl BlocksEditor {
    /// Run the command bound to `chord`.
    pub fn handle_key(&mut self, chord: &KeyChord) -> KeyOutcome {
        let Some(command) = chord.command() else {
            return KeyOutcome::PassThrough;
        };
        tracing::trace!(?command, "key command");
        match command {
            KeyCommand::Indent { outdent } => {
                if !outdent {
                    execute_indent(self);
                }
                KeyOutcome::Handled
            }
            KeyCommand::RequestLink => {
                self.request_link();
                KeyOutcome::Handled
            }
            KeyCommand::ToggleMark(mark) => {
                self.toggle_mark(mark);
                KeyOutcome::Handled
            }
            KeyCommand::ResetBlock => outcome(execute_reset_block(self).is_some()),
            KeyCommand::Break => outcome(execute_break(self).is_some()),
        }
    }
}

fn outcome(handled: bool) -> KeyOutcome {
    if handled {
        KeyOutcome::Handled
    } else {
        KeyOutcome::PassThrough
    }
}

fn parent_of(path: &[usize]) -> Option<(Path, usize)> {
    let (&index, parent) = path.split_last()?;
    Some((parent.to_vec(), index))
}

fn child(parent: &[usize], index: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(index);
    path
}

fn list_format(editor: &BlocksEditor, path: &[usize]) -> Option<ListFormat> {
    match editor.document().node(path)? {
        Node::Block(Block {
            kind: BlockKind::List { format },
            ..
        }) => Some(*format),
        _ => None,
    }
}

/// Collapsed caret and the container it is in.
fn collapsed_container(editor: &BlocksEditor) -> Option<(Caret, Path, Block)> {
    let (start, end) = editor.selected_range()?;
    if start != end {
        return None;
    }
    let unit = units(editor.document()).into_iter().nth(start.unit)?;
    if unit.void {
        return None;
    }
    let block = editor.document().node(&unit.path)?.as_block()?.clone();
    Some((start, unit.path, block))
}

/// Nest the focused list item into a list under its previous sibling.
fn execute_indent(editor: &mut BlocksEditor) -> Option<()> {
    let (anchor, focus) = editor.carets()?;
    let unit = units(editor.document()).into_iter().nth(focus.unit)?;
    if editor.document().node(&unit.path)?.as_block()?.kind != BlockKind::ListItem {
        return None;
    }
    let (list_path, index) = parent_of(&unit.path)?;
    if index == 0 {
        return None;
    }
    let format = list_format(editor, &list_path)?;

    let siblings = editor.doc_mut().children_mut(&list_path)?;
    let moved = siblings.remove(index);
    let Some(Node::Block(previous)) = siblings.get_mut(index - 1) else {
        siblings.insert(index, moved);
        return None;
    };

    let mut target = child(&list_path, index - 1);
    let count = previous.children.len();
    match previous.children.last_mut() {
        Some(Node::Block(nested)) if matches!(nested.kind, BlockKind::List { .. }) => {
            target.push(count - 1);
            target.push(nested.children.len());
            nested.children.push(moved.clone());
        }
        _ => {
            target.push(count);
            target.push(0);
            previous.children.push(Node::Block(Block {
                kind: BlockKind::List { format },
                children: vec![moved.clone()],
            }));
        }
    }

    editor.record(Operation::RemoveNode {
        path: unit.path,
        node: moved.clone(),
    });
    editor.record(Operation::InsertNode {
        path: target,
        node: moved,
    });

    // The item keeps its place in document order, so carets stay valid.
    editor.doc_mut().normalize();
    editor.set_carets(anchor, focus);
    editor.flush();
    Some(())
}

/// Backspace at the very start of a heading, quote or code block turns it
/// into a paragraph.
fn execute_reset_block(editor: &mut BlocksEditor) -> Option<()> {
    let (caret, path, block) = collapsed_container(editor)?;
    let resettable = matches!(
        block.kind,
        BlockKind::Heading { .. } | BlockKind::Quote | BlockKind::Code
    );
    if caret.offset != 0 || !resettable {
        return None;
    }

    if let Some(Node::Block(block)) = editor.doc_mut().node_mut(&path) {
        block.kind = BlockKind::Paragraph;
    }
    editor.record(Operation::SetNode {
        path,
        properties: NodeProperties {
            kind: Some(BlockKind::Paragraph),
            marks: None,
        },
    });
    editor.commit(caret);
    Some(())
}

/// Enter at the end of a heading, or in an empty list item.
fn execute_break(editor: &mut BlocksEditor) -> Option<()> {
    let (caret, path, block) = collapsed_container(editor)?;
    match block.kind {
        BlockKind::Heading { .. } if caret.offset == inline_len(&block) => {
            let (parent, index) = parent_of(&path)?;
            let paragraph = Node::Block(Block::paragraph(Vec::new()));
            editor
                .doc_mut()
                .children_mut(&parent)?
                .insert(index + 1, paragraph.clone());
            editor.record(Operation::InsertNode {
                path: child(&parent, index + 1),
                node: paragraph,
            });
            editor.commit(Caret {
                unit: caret.unit + 1,
                offset: 0,
            });
            Some(())
        }
        BlockKind::ListItem
            if inline_len(&block) == 0 && block.children.iter().all(Node::is_inline) =>
        {
            exit_list(editor, &path)
        }
        _ => None,
    }
}

/// Take an empty list item out of its list. A nested item moves up one
/// level; a top-level item becomes a paragraph after the list, splitting
/// the list when items follow it.
fn exit_list(editor: &mut BlocksEditor, item_path: &[usize]) -> Option<()> {
    let (list_path, index) = parent_of(item_path)?;
    let format = list_format(editor, &list_path)?;
    let (holder, list_index) = parent_of(&list_path)?;
    let nested = matches!(
        editor.document().node(&holder),
        Some(Node::Block(Block {
            kind: BlockKind::ListItem,
            ..
        }))
    );
    let outdent_to = if nested { Some(parent_of(&holder)?) } else { None };

    let list = editor.doc_mut().children_mut(&list_path)?;
    let after = list.split_off(index + 1);
    let item = list.remove(index);
    let list_empty = list.is_empty();
    let mut ops = vec![Operation::RemoveNode {
        path: item_path.to_vec(),
        node: item.clone(),
    }];

    let new_path = match outdent_to {
        Some((grand_list, holder_index)) => {
            let mut moved = item;
            if let Node::Block(block) = &mut moved {
                if !after.is_empty() {
                    block.children.push(Node::Block(Block {
                        kind: BlockKind::List { format },
                        children: after,
                    }));
                }
            }
            if list_empty {
                let siblings = editor.doc_mut().children_mut(&holder)?;
                let removed = siblings.remove(list_index);
                ops.push(Operation::RemoveNode {
                    path: list_path.clone(),
                    node: removed,
                });
            }
            let target = child(&grand_list, holder_index + 1);
            editor
                .doc_mut()
                .children_mut(&grand_list)?
                .insert(holder_index + 1, moved.clone());
            ops.push(Operation::InsertNode {
                path: target.clone(),
                node: moved,
            });
            target
        }
        None => {
            let siblings = editor.doc_mut().children_mut(&holder)?;
            let mut at = list_index + 1;
            if list_empty {
                let removed = siblings.remove(list_index);
                ops.push(Operation::RemoveNode {
                    path: list_path.clone(),
                    node: removed,
                });
                at = list_index;
            }
            let paragraph = Node::Block(Block::paragraph(Vec::new()));
            siblings.insert(at, paragraph.clone());
            ops.push(Operation::InsertNode {
                path: child(&holder, at),
                node: paragraph,
            });
            if !after.is_empty() {
                let rest = Node::Block(Block {
                    kind: BlockKind::List { format },
                    children: after,
                });
                siblings.insert(at + 1, rest.clone());
                ops.push(Operation::InsertNode {
                    path: child(&holder, at + 1),
                    node: rest,
                });
            }
            child(&holder, at)
        }
    };

    for op in ops {
        editor.record(op);
    }
    editor.doc_mut().normalize();
    let unit = editor.unit_index(&new_path)?;
    editor.commit(Caret { unit, offset: 0 });
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Mark, Marks, Text};
    use crate::editor::EditorDocument;
    use crate::types::Point;

    fn para(text: &str) -> Node {
        Node::Block(Block::paragraph(vec![Node::text(text)]))
    }

    fn heading(text: &str) -> Node {
        Node::Block(Block::new(
            BlockKind::Heading { level: 1 },
            vec![Node::text(text)],
        ))
    }

    fn item(children: Vec<Node>) -> Node {
        Node::Block(Block::new(BlockKind::ListItem, children))
    }

    fn list(items: Vec<Node>) -> Node {
        Node::Block(Block::new(
            BlockKind::List {
                format: ListFormat::Unordered,
            },
            items,
        ))
    }

    fn editor_at(children: Vec<Node>, path: &[usize], offset: usize) -> BlocksEditor {
        let mut editor = BlocksEditor::new(Document::new(children));
        let point = Point::new(path.to_vec(), offset);
        assert!(editor.select(point.clone(), point));
        editor
    }

    fn key(name: &str) -> KeyChord {
        KeyChord::from_dom(name, false, false)
    }

    #[test]
    fn test_tab_nests_list_item() {
        let mut ed = editor_at(
            vec![list(vec![
                item(vec![Node::text("a")]),
                item(vec![Node::text("b")]),
            ])],
            &[0, 1, 0],
            1,
        );
        assert_eq!(ed.handle_key(&key("Tab")), KeyOutcome::Handled);
        assert_eq!(
            ed.document().children,
            vec![list(vec![item(vec![
                Node::text("a"),
                list(vec![item(vec![Node::text("b")])]),
            ])])]
        );
        assert_eq!(
            ed.selection().unwrap().focus,
            Point::new(vec![0, 0, 1, 0, 0], 1)
        );
    }

    #[test]
    fn test_tab_appends_to_existing_nested_list() {
        let mut ed = editor_at(
            vec![list(vec![
                item(vec![Node::text("a"), list(vec![item(vec![Node::text("a1")])])]),
                item(vec![Node::text("b")]),
            ])],
            &[0, 1, 0],
            0,
        );
        assert_eq!(ed.handle_key(&key("Tab")), KeyOutcome::Handled);
        let nested = ed.document().node(&[0, 0, 1]).unwrap();
        assert_eq!(nested.children().len(), 2);
        assert_eq!(ed.document().plain_text(), "a\na1\nb");
    }

    #[test]
    fn test_tab_is_always_handled() {
        let doc = vec![para("text")];
        let mut ed = editor_at(doc.clone(), &[0, 0], 2);
        assert_eq!(ed.handle_key(&key("Tab")), KeyOutcome::Handled);
        assert_eq!(
            ed.handle_key(&key("Tab").with_shift(true)),
            KeyOutcome::Handled
        );
        assert_eq!(ed.document().children, doc);

        let first = vec![list(vec![item(vec![Node::text("only")])])];
        let mut ed = editor_at(first.clone(), &[0, 0, 0], 0);
        assert_eq!(ed.handle_key(&key("Tab")), KeyOutcome::Handled);
        assert_eq!(ed.document().children, first);
    }

    #[test]
    fn test_mod_k_requests_link() {
        let mut ed = editor_at(vec![para("x")], &[0, 0], 1);
        assert_eq!(
            ed.handle_key(&KeyChord::from_dom("k", false, true)),
            KeyOutcome::Handled
        );
        assert!(ed.take_link_request());
        assert!(!ed.take_link_request());
    }

    #[test]
    fn test_mod_b_toggles_bold() {
        let mut ed = BlocksEditor::new(Document::new(vec![para("word")]));
        ed.select_all();
        assert_eq!(
            ed.handle_key(&KeyChord::primary("b")),
            KeyOutcome::Handled
        );
        assert_eq!(
            ed.document().children,
            vec![Node::Block(Block::paragraph(vec![Node::Text(
                Text::with_marks("word", Marks::default().with(Mark::Bold))
            )]))]
        );
    }

    #[test]
    fn test_backspace_resets_heading_at_start() {
        let mut ed = editor_at(vec![heading("Title")], &[0, 0], 0);
        assert_eq!(ed.handle_key(&key("Backspace")), KeyOutcome::Handled);
        assert_eq!(ed.document().children, vec![para("Title")]);

        let mut ed = editor_at(vec![heading("Title")], &[0, 0], 2);
        assert_eq!(ed.handle_key(&key("Backspace")), KeyOutcome::PassThrough);

        let mut ed = editor_at(vec![para("Body")], &[0, 0], 0);
        assert_eq!(ed.handle_key(&key("Backspace")), KeyOutcome::PassThrough);
    }

    #[test]
    fn test_enter_after_heading_inserts_paragraph() {
        let mut ed = editor_at(vec![heading("Title"), para("next")], &[0, 0], 5);
        assert_eq!(ed.handle_key(&key("Enter")), KeyOutcome::Handled);
        assert_eq!(
            ed.document().children,
            vec![heading("Title"), para(""), para("next")]
        );
        assert_eq!(ed.selection().unwrap().focus, Point::new(vec![1, 0], 0));

        ed.insert_text("typed");
        assert_eq!(ed.document().plain_text(), "Title\ntyped\nnext");
    }

    #[test]
    fn test_enter_inside_heading_passes_through() {
        let mut ed = editor_at(vec![heading("Title")], &[0, 0], 3);
        assert_eq!(ed.handle_key(&key("Enter")), KeyOutcome::PassThrough);
    }

    #[test]
    fn test_enter_in_empty_item_leaves_list() {
        let mut ed = editor_at(
            vec![list(vec![
                item(vec![Node::text("a")]),
                item(Vec::new()),
                item(vec![Node::text("c")]),
            ])],
            &[0, 1, 0],
            0,
        );
        assert_eq!(ed.handle_key(&key("Enter")), KeyOutcome::Handled);
        assert_eq!(
            ed.document().children,
            vec![
                list(vec![item(vec![Node::text("a")])]),
                para(""),
                list(vec![item(vec![Node::text("c")])]),
            ]
        );
        assert_eq!(ed.selection().unwrap().focus, Point::new(vec![1, 0], 0));
    }

    #[test]
    fn test_enter_in_lone_empty_item_replaces_list() {
        let mut ed = editor_at(vec![list(vec![item(Vec::new())])], &[0, 0, 0], 0);
        assert_eq!(ed.handle_key(&key("Enter")), KeyOutcome::Handled);
        assert_eq!(ed.document().children, vec![para("")]);
    }

    #[test]
    fn test_enter_in_nested_empty_item_outdents() {
        let mut ed = editor_at(
            vec![list(vec![item(vec![
                Node::text("a"),
                list(vec![item(Vec::new())]),
            ])])],
            &[0, 0, 1, 0, 0],
            0,
        );
        assert_eq!(ed.handle_key(&key("Enter")), KeyOutcome::Handled);
        assert_eq!(
            ed.document().children,
            vec![list(vec![item(vec![Node::text("a")]), item(Vec::new())])]
        );
        assert_eq!(ed.selection().unwrap().focus, Point::new(vec![0, 1, 0], 0));
    }

    #[test]
    fn test_enter_in_non_empty_item_passes_through() {
        let mut ed = editor_at(vec![list(vec![item(vec![Node::text("a")])])], &[0, 0, 0], 1);
        assert_eq!(ed.handle_key(&key("Enter")), KeyOutcome::PassThrough);
    }

    #[test]
    fn test_unbound_keys_pass_through() {
        let mut ed = editor_at(vec![para("x")], &[0, 0], 0);
        assert_eq!(ed.handle_key(&key("a")), KeyOutcome::PassThrough);
        assert_eq!(ed.handle_key(&key("ArrowLeft")), KeyOutcome::PassThrough);
    }
}
