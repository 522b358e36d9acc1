//! Editor operation log.
//!
//! Commands append the operations they performed. After a command the
//! editor notifies its change listener when any of them changed content.

use crate::document::{BlockKind, Marks, Node, Path};
use crate::types::Selection;

/// Properties a `SetNode` operation changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeProperties {
    pub kind: Option<BlockKind>,
    pub marks: Option<Marks>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
        node: Node,
    },
    /// Split the node at `path`, `position` characters (or children) in.
    SplitNode {
        path: Path,
        position: usize,
    },
    /// Merge the node at `path` into its previous sibling.
    MergeNode {
        path: Path,
        position: usize,
    },
    SetNode {
        path: Path,
        properties: NodeProperties,
    },
    SetSelection {
        selection: Option<Selection>,
    },
}

impl Operation {
    /// Whether the operation changed document content, as opposed to
    /// structure-only splits and merges or selection moves.
    pub fn is_content_change(&self) -> bool {
        matches!(
            self,
            Operation::InsertNode { .. }
                | Operation::RemoveNode { .. }
                | Operation::InsertText { .. }
                | Operation::RemoveText { .. }
                | Operation::SetNode { .. }
        )
    }

    /// Path of the node the operation touches, if any.
    pub fn path(&self) -> Option<&[usize]> {
        match self {
            Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::SetNode { path, .. } => Some(path),
            Operation::SetSelection { .. } => None,
        }
    }

    /// Whether the operation removes the node at `path` from where it was.
    pub fn removes(&self, path: &[usize]) -> bool {
        match self {
            Operation::RemoveNode { path: at, .. } | Operation::MergeNode { path: at, .. } => {
                at.as_slice() == path
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_classes() {
        let text = Operation::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "a".into(),
        };
        let split = Operation::SplitNode {
            path: vec![0],
            position: 1,
        };
        let select = Operation::SetSelection { selection: None };
        let set = Operation::SetNode {
            path: vec![0],
            properties: NodeProperties {
                kind: Some(BlockKind::Paragraph),
                marks: None,
            },
        };
        assert!(text.is_content_change());
        assert!(set.is_content_change());
        assert!(!split.is_content_change());
        assert!(!select.is_content_change());
        assert_eq!(select.path(), None);
    }

    #[test]
    fn test_removes() {
        let merge = Operation::MergeNode {
            path: vec![0, 2],
            position: 5,
        };
        assert!(merge.removes(&[0, 2]));
        assert!(!merge.removes(&[0, 1]));
    }
}
