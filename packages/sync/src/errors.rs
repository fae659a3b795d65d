//! Error types for DOM synchronization

use scribe_dom::DomError;
use scribe_render::RenderError;
use scribe_tree::TreeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("The document has not been mounted")]
    NotMounted,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
