//! Error types for rendering

use crate::FormatId;
use scribe_dom::DomError;
use scribe_tree::{NodeId, TreeError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("No renderer for node {node} ({kind}) in format '{format}' and no default is registered")]
    MissingRenderer {
        format: FormatId,
        node: NodeId,
        kind: String,
    },

    #[error("Renderer '{0}' is already registered")]
    DuplicateRenderer(String),

    #[error("Engine '{engine}' already has a default renderer ('{existing}')")]
    DuplicateDefault { engine: FormatId, existing: String },

    #[error("Rendering engine '{0}' is already registered")]
    DuplicateEngine(FormatId),

    #[error("No rendering engine for format '{0}'")]
    UnknownEngine(FormatId),

    #[error("Format '{format}' is neither '{engine}' nor extended by it")]
    UnknownFormat { engine: FormatId, format: FormatId },

    #[error("Renderer '{renderer}' returned {actual} outputs for {expected} nodes")]
    BatchLength {
        renderer: String,
        expected: usize,
        actual: usize,
    },

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}
