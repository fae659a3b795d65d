//! # Scribe Rendering
//!
//! Multi-backend, predicate-dispatched rendering of document trees.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ RendererRegistry: format id → engine         │
//! │   "dom"  ◄── extends ── "dom/html"           │
//! └──────────────────────────────────────────────┘
//!                     ↓
//! ┌──────────────────────────────────────────────┐
//! │ RenderingEngine: ordered (predicate, handler)│
//! │   list + one default, next-match resolution  │
//! └──────────────────────────────────────────────┘
//!                     ↓
//! ┌──────────────────────────────────────────────┐
//! │ RenderPass: renderings + LocationIndex       │
//! │   (created per pass, discarded after)        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Override chaining
//!
//! Every renderer call receives a [`SuperRenderer`]. Rendering through it
//! resolves the next compatible handler *after* the calling one, so a
//! renderer can decorate whatever a less specific handler produces without
//! knowing which handler that is.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_render::{dom, Predicate, RendererDescriptor, RendererRegistry};
//!
//! let mut registry = RendererRegistry::new();
//! registry.add_engine(dom::DOM, &[])?;
//! dom::register_stock_renderers(&mut registry, dom::DOM, dom::TagTable::default(), "span")?;
//!
//! let engine = registry.engine(dom::DOM)?;
//! let mut pass = engine.pass(&tree, &mut document);
//! let outputs = pass.render(&[tree.root()])?;
//! ```

mod backend;
pub mod dom;
mod engine;
mod errors;
mod format;
mod location;
mod pass;
mod predicate;
mod registry;
mod renderer;
pub mod text;

pub use backend::Backend;
pub use engine::{RendererSlot, RenderingEngine};
pub use errors::RenderError;
pub use format::FormatId;
pub use location::LocationIndex;
pub use pass::{PassOutput, RenderGroup, RenderPass};
pub use predicate::Predicate;
pub use registry::RendererRegistry;
pub use renderer::{Renderer, RendererDescriptor, SuperRenderer};
