//! # Renderer Registry
//!
//! Format id → [`RenderingEngine`] lookup.
//!
//! An engine may extend other formats and inherits their renderers at lower
//! priority than its own. Extension is transitive: adding `dom/html`
//! extending `dom`, where `dom` extends `dom/base`, yields the chain
//! `[dom, dom/base]`.
//!
//! Descriptors are kept in registration order and replayed into engines
//! added later, so the resulting dispatch order does not depend on whether
//! an engine or a renderer was registered first.

use crate::{Backend, FormatId, RenderError, RendererDescriptor, RenderingEngine};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub struct RendererRegistry<B: Backend> {
    engines: BTreeMap<FormatId, RenderingEngine<B>>,
    descriptors: Vec<RendererDescriptor<B>>,
}

impl<B: Backend> RendererRegistry<B> {
    pub fn new() -> Self {
        Self {
            engines: BTreeMap::new(),
            descriptors: Vec::new(),
        }
    }

    /// Add an engine for `id` extending `extends` (closest first)
    pub fn add_engine(&mut self, id: impl Into<FormatId>, extends: &[&str]) -> Result<&RenderingEngine<B>, RenderError> {
        let id = id.into();
        if self.engines.contains_key(&id) {
            return Err(RenderError::DuplicateEngine(id));
        }

        let mut chain: Vec<FormatId> = Vec::new();
        for base in extends.iter().map(|base| FormatId::from(*base)) {
            let inherited = self
                .engines
                .get(&base)
                .map(|engine| engine.extends().to_vec())
                .unwrap_or_default();
            for format in std::iter::once(base).chain(inherited) {
                if format != id && !chain.contains(&format) {
                    chain.push(format);
                }
            }
        }

        let mut engine = RenderingEngine::extending(id.clone(), chain);
        for descriptor in &self.descriptors {
            if engine.handles(&descriptor.format) {
                engine.register(descriptor.clone())?;
            }
        }

        info!(engine = %id, extends = ?engine.extends(), renderers = engine.names().count(), "Added rendering engine");
        Ok(self.engines.entry(id).or_insert(engine))
    }

    /// Register a renderer with every engine that is or extends its format
    pub fn register(&mut self, descriptor: RendererDescriptor<B>) -> Result<(), RenderError> {
        if self.descriptors.iter().any(|d| d.name == descriptor.name) {
            return Err(RenderError::DuplicateRenderer(descriptor.name));
        }

        // All handling engines accept it, or none is touched.
        for engine in self.engines.values() {
            if engine.handles(&descriptor.format) {
                engine.check_register(&descriptor)?;
            }
        }
        for engine in self.engines.values_mut() {
            if engine.handles(&descriptor.format) {
                engine.register(descriptor.clone())?;
            }
        }

        debug!(renderer = %descriptor.name, format = %descriptor.format, "Registered renderer descriptor");
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn engine(&self, id: &str) -> Result<&RenderingEngine<B>, RenderError> {
        self.engines
            .get(&FormatId::from(id))
            .ok_or_else(|| RenderError::UnknownEngine(FormatId::from(id)))
    }

    pub fn formats(&self) -> impl Iterator<Item = &FormatId> {
        self.engines.keys()
    }
}

impl<B: Backend> Default for RendererRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}
