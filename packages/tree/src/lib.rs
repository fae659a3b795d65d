//! # Scribe Document Tree
//!
//! The abstract document hierarchy that the rendering and synchronization
//! layers read from and edit.
//!
//! ## Model
//!
//! ```text
//! document
//!  ├── paragraph
//!  │    ├── character 'a'
//!  │    └── character 'b'   { bold: "true" }
//!  └── paragraph            (empty)
//! ```
//!
//! - Every node has a stable [`NodeId`], a kind string and an attribute map.
//! - Text lives in `character` leaves, one `char` each.
//! - Nodes are owned by exactly one parent; the tree never holds cycles.
//!
//! Edits go through [`DocumentTree`] methods or the serializable
//! [`TreeEdit`] enum. Every edit marks the nodes whose rendering became
//! stale; [`DocumentTree::commit`] hands that set to the redraw pipeline.

mod edits;
mod errors;
mod node;
mod tree;

pub use edits::TreeEdit;
pub use errors::TreeError;
pub use node::{kinds, Node, NodeId, NodeRef, NodeSpec};
pub use tree::{Commit, DocumentTree};
