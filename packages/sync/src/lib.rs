//! # Scribe Sync
//!
//! Bidirectional synchronization between a [`DocumentTree`] and a live DOM.
//!
//! ## Architecture
//!
//! ```text
//!   tree edits ──► commit ──► OutboundEngine ──► patched DOM
//!        ▲                         │
//!        │                         ▼
//!   InboundTranslator ◄──── DomMapping ────► SelectionMapper
//!        ▲
//!        │
//!   DOM edits inside with_mutations
//! ```
//!
//! - [`OutboundEngine`] re-renders only the subtrees a commit touched and
//!   patches them into the live DOM.
//! - [`InboundTranslator`] turns the mutation records of one transaction
//!   into tree edits, relocating tracked nodes instead of recreating them.
//! - [`SelectionMapper`] converts DOM selections to tree points and back.
//! - [`Session`] wires the three together around one tree and one DOM.
//!
//! [`DocumentTree`]: scribe_tree::DocumentTree

pub mod config;
mod errors;
pub mod inbound;
pub mod logging;
pub mod mapping;
pub mod outbound;
pub mod selection;
mod session;

pub use config::SyncConfig;
pub use errors::{SyncError, SyncResult};
pub use inbound::InboundTranslator;
pub use mapping::DomMapping;
pub use outbound::{OutboundEngine, Redraw};
pub use selection::{Direction, DomPoint, RelativePosition, Selection, SelectionMapper, TreePoint, TreeSelection};
pub use session::Session;
