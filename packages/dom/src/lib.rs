//! # Scribe DOM
//!
//! Headless DOM used as the live rendering target.
//!
//! The arena mirrors the parts of the browser DOM the synchronization layer
//! relies on:
//!
//! - element and text nodes with stable [`DomNodeId`]s
//! - `appendChild`/`insertBefore`/`removeChild`/`replaceChild` semantics,
//!   including implicit removal when a node is re-parented
//! - a [`MutationRecord`] queue for every change made to a node connected to
//!   the document body, like a `MutationObserver` on the whole document
//! - structural snapshots for comparing two DOM states
//!
//! Detached nodes stay in the arena until [`Dom::release`] drops them, so ids
//! held in lookup maps never alias a different node.

mod document;
mod errors;
mod mutation;
mod snapshot;

pub use document::{Dom, DomNode, DomNodeData, DomNodeId};
pub use errors::DomError;
pub use mutation::{MutationKind, MutationRecord};
pub use snapshot::DomSnapshot;
