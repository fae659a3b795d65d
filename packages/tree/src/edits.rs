//! # Tree Edits
//!
//! Structural operations issued by the synchronization layer.
//!
//! ## Edit Semantics
//!
//! ### Move
//! - Atomic relocation of an existing node; identity and attributes survive
//! - Fails if it would create a cycle or target a character as parent
//!
//! ### SetText
//! - Replaces the value of one character node in place
//!
//! ### Remove
//! - Removes the node and all descendants

use crate::{DocumentTree, NodeId, NodeSpec, TreeError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TreeEdit {
    /// Insert a new subtree under `parent` at `index`
    Insert {
        parent: NodeId,
        index: usize,
        node: NodeSpec,
    },

    /// Remove a node and its descendants
    Remove { node: NodeId },

    /// Relocate an existing node
    #[serde(rename_all = "camelCase")]
    Move {
        node: NodeId,
        new_parent: NodeId,
        index: usize,
    },

    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },

    RemoveAttribute { node: NodeId, name: String },

    /// Replace a character value
    SetText { node: NodeId, value: char },
}

impl TreeEdit {
    /// Apply the edit with validation, returning the affected node
    ///
    /// For `Insert` this is the id of the newly created node.
    pub fn apply(&self, tree: &mut DocumentTree) -> Result<NodeId, TreeError> {
        self.validate(tree)?;

        match self {
            TreeEdit::Insert { parent, index, node } => tree.insert(*parent, *index, node),
            TreeEdit::Remove { node } => tree.remove(*node).map(|_| *node),
            TreeEdit::Move { node, new_parent, index } => {
                tree.move_node(*node, *new_parent, *index).map(|_| *node)
            }
            TreeEdit::SetAttribute { node, name, value } => {
                tree.set_attribute(*node, name, value).map(|_| *node)
            }
            TreeEdit::RemoveAttribute { node, name } => {
                tree.remove_attribute(*node, name).map(|_| *node)
            }
            TreeEdit::SetText { node, value } => tree.set_text(*node, *value).map(|_| *node),
        }
    }

    /// Validate without applying
    pub fn validate(&self, tree: &DocumentTree) -> Result<(), TreeError> {
        match self {
            TreeEdit::Insert { parent, .. } => {
                let parent_node = tree.get(*parent).ok_or(TreeError::ParentNotFound(*parent))?;
                if parent_node.is_character() {
                    return Err(TreeError::LeafParent(*parent));
                }
                Ok(())
            }

            TreeEdit::Remove { node } => {
                if *node == tree.root() {
                    return Err(TreeError::RootImmutable);
                }
                tree.get(*node).ok_or(TreeError::NodeNotFound(*node))?;
                Ok(())
            }

            TreeEdit::Move { node, new_parent, .. } => {
                if *node == tree.root() {
                    return Err(TreeError::RootImmutable);
                }
                tree.get(*node).ok_or(TreeError::NodeNotFound(*node))?;
                let parent_node = tree
                    .get(*new_parent)
                    .ok_or(TreeError::ParentNotFound(*new_parent))?;
                if parent_node.is_character() {
                    return Err(TreeError::LeafParent(*new_parent));
                }
                if tree.is_ancestor_or_self(*node, *new_parent) {
                    return Err(TreeError::CycleDetected);
                }
                Ok(())
            }

            TreeEdit::SetAttribute { node, .. } | TreeEdit::RemoveAttribute { node, .. } => {
                tree.get(*node).ok_or(TreeError::NodeNotFound(*node))?;
                Ok(())
            }

            TreeEdit::SetText { node, .. } => {
                let elem = tree.get(*node).ok_or(TreeError::NodeNotFound(*node))?;
                if !elem.is_character() {
                    return Err(TreeError::NotACharacter(*node));
                }
                Ok(())
            }
        }
    }

    /// Node the edit is addressed to
    pub fn target(&self) -> NodeId {
        match self {
            TreeEdit::Insert { parent, .. } => *parent,
            TreeEdit::Remove { node }
            | TreeEdit::Move { node, .. }
            | TreeEdit::SetAttribute { node, .. }
            | TreeEdit::RemoveAttribute { node, .. }
            | TreeEdit::SetText { node, .. } => *node,
        }
    }

    /// Debug name for logging
    pub fn name(&self) -> &'static str {
        match self {
            TreeEdit::Insert { .. } => "insert",
            TreeEdit::Remove { .. } => "remove",
            TreeEdit::Move { .. } => "move",
            TreeEdit::SetAttribute { .. } => "setAttribute",
            TreeEdit::RemoveAttribute { .. } => "removeAttribute",
            TreeEdit::SetText { .. } => "setText",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds;

    #[test]
    fn test_edit_serialization() {
        let edit = TreeEdit::Move {
            node: NodeId(3),
            new_parent: NodeId(1),
            index: 0,
        };

        let json = serde_json::to_string(&edit).unwrap();
        assert_eq!(json, r#"{"op":"move","node":3,"newParent":1,"index":0}"#);

        let deserialized: TreeEdit = serde_json::from_str(&json).unwrap();
        assert_eq!(edit, deserialized);
    }

    #[test]
    fn test_validation_rejects_missing_nodes() {
        let tree = DocumentTree::new();
        let edit = TreeEdit::SetAttribute {
            node: NodeId(42),
            name: "class".to_string(),
            value: "x".to_string(),
        };

        assert_eq!(edit.validate(&tree), Err(TreeError::NodeNotFound(NodeId(42))));
    }

    #[test]
    fn test_apply_insert_returns_new_id() {
        let mut tree = DocumentTree::new();
        let edit = TreeEdit::Insert {
            parent: tree.root(),
            index: 0,
            node: NodeSpec::new(kinds::PARAGRAPH).with_text("x"),
        };

        let id = edit.apply(&mut tree).unwrap();
        assert_eq!(tree.parent(id), Some(tree.root()));
        assert_eq!(tree.text(id), "x");
    }

    #[test]
    fn test_set_text_on_container_fails_validation() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let edit = TreeEdit::SetText { node: root, value: 'x' };
        assert_eq!(edit.apply(&mut tree), Err(TreeError::NotACharacter(root)));
    }
}
