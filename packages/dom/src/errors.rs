//! Error types for DOM operations

use crate::DomNodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("DOM node not found: {0}")]
    NodeNotFound(DomNodeId),

    #[error("DOM node {0} is not an element")]
    NotAnElement(DomNodeId),

    #[error("DOM node {node} is not a text node")]
    NotText { node: DomNodeId },

    #[error("DOM node {child} is not a child of {parent}")]
    NotAChild { parent: DomNodeId, child: DomNodeId },

    #[error("Cannot insert {child} into its own descendant {parent}")]
    HierarchyRequest { parent: DomNodeId, child: DomNodeId },
}
