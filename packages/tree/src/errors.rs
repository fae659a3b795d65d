//! Error types for tree edits

use crate::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("The root node cannot be removed or moved")]
    RootImmutable,

    #[error("Node {0} is not a character")]
    NotACharacter(NodeId),

    #[error("Node {0} cannot have children")]
    LeafParent(NodeId),
}
