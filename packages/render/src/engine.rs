//! # Rendering Engine
//!
//! Ordered renderer list for one output format.
//!
//! ## Priority
//!
//! ```text
//! [ own format (newest first) | closest extended format | … | farthest ] + default
//! ```
//!
//! Registering under the engine's own id inserts at the front. Registering
//! under an extended id inserts before the first entry whose format ranks
//! below it, so within a tier the newest registration wins. The single
//! predicate-less default sits outside the list and is matched last.

use crate::{Backend, FormatId, RenderError, RenderPass, Renderer, RendererDescriptor};
use scribe_dom::Dom;
use scribe_tree::{DocumentTree, Node};
use std::rc::Rc;
use tracing::debug;

/// Position of a renderer in an engine's dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererSlot {
    Listed(usize),
    Default,
}

pub struct RenderingEngine<B: Backend> {
    id: FormatId,
    /// Extended formats, closest first
    extends: Vec<FormatId>,
    entries: Vec<RendererDescriptor<B>>,
    default: Option<RendererDescriptor<B>>,
}

impl<B: Backend> RenderingEngine<B> {
    pub fn new(id: impl Into<FormatId>) -> Self {
        Self::extending(id, Vec::new())
    }

    pub fn extending(id: impl Into<FormatId>, extends: Vec<FormatId>) -> Self {
        Self {
            id: id.into(),
            extends,
            entries: Vec::new(),
            default: None,
        }
    }

    pub fn id(&self) -> &FormatId {
        &self.id
    }

    pub fn extends(&self) -> &[FormatId] {
        &self.extends
    }

    /// True when renderers registered under `format` belong in this engine
    pub fn handles(&self, format: &FormatId) -> bool {
        self.id == *format || self.extends.contains(format)
    }

    /// Whether `register` would accept `descriptor`, without changing anything
    pub fn check_register(&self, descriptor: &RendererDescriptor<B>) -> Result<(), RenderError> {
        if self.names().any(|name| name == descriptor.name) {
            return Err(RenderError::DuplicateRenderer(descriptor.name.clone()));
        }
        self.tier_of(&descriptor.format)?;

        if descriptor.is_default() {
            if let Some(existing) = &self.default {
                return Err(RenderError::DuplicateDefault {
                    engine: self.id.clone(),
                    existing: existing.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Insert a renderer according to its format's priority
    pub fn register(&mut self, descriptor: RendererDescriptor<B>) -> Result<(), RenderError> {
        self.check_register(&descriptor)?;
        let tier = self.tier_of(&descriptor.format)?;

        if descriptor.is_default() {
            debug!(engine = %self.id, renderer = %descriptor.name, "Registered default renderer");
            self.default = Some(descriptor);
            return Ok(());
        }

        let index = match tier {
            None => 0,
            Some(tier) => {
                let outranks = |format: &FormatId| {
                    *format == self.id || self.extends[..tier].contains(format)
                };
                self.entries
                    .iter()
                    .position(|entry| !outranks(&entry.format))
                    .unwrap_or(self.entries.len())
            }
        };

        debug!(
            engine = %self.id,
            renderer = %descriptor.name,
            format = %descriptor.format,
            index,
            "Registered renderer"
        );
        self.entries.insert(index, descriptor);
        Ok(())
    }

    /// First renderer after `previous` whose predicate matches `node`,
    /// falling back to the default
    ///
    /// Pure in (node, registration order, previous).
    pub fn get_compatible_renderer(&self, node: &Node, previous: Option<RendererSlot>) -> Option<RendererSlot> {
        let start = match previous {
            None => 0,
            Some(RendererSlot::Listed(index)) => index + 1,
            Some(RendererSlot::Default) => return None,
        };

        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, entry)| {
                entry
                    .predicate
                    .as_ref()
                    .is_some_and(|predicate| predicate.matches(node))
            })
            .map(|(index, _)| RendererSlot::Listed(index))
            .or_else(|| self.default.as_ref().map(|_| RendererSlot::Default))
    }

    /// Compatible renderer or a `MissingRenderer` configuration error
    pub fn resolve(
        &self,
        node: &Node,
        previous: Option<RendererSlot>,
    ) -> Result<(RendererSlot, &Rc<dyn Renderer<B>>), RenderError> {
        self.get_compatible_renderer(node, previous)
            .and_then(|slot| self.renderer(slot).map(|renderer| (slot, renderer)))
            .ok_or_else(|| RenderError::MissingRenderer {
                format: self.id.clone(),
                node: node.id(),
                kind: node.kind().to_string(),
            })
    }

    pub fn renderer(&self, slot: RendererSlot) -> Option<&Rc<dyn Renderer<B>>> {
        self.descriptor(slot).map(|d| &d.renderer)
    }

    pub fn descriptor(&self, slot: RendererSlot) -> Option<&RendererDescriptor<B>> {
        match slot {
            RendererSlot::Listed(index) => self.entries.get(index),
            RendererSlot::Default => self.default.as_ref(),
        }
    }

    /// Renderer names in dispatch order, default last
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .chain(self.default.as_ref())
            .map(|d| d.name.as_str())
    }

    /// Start a render pass with fresh renderings and locations
    pub fn pass<'a>(&'a self, tree: &'a DocumentTree, target: &'a mut B::Target) -> RenderPass<'a, B> {
        RenderPass::new(self, tree, target)
    }

    /// `None` for the engine's own format, `Some(i)` for `extends[i]`
    fn tier_of(&self, format: &FormatId) -> Result<Option<usize>, RenderError> {
        if *format == self.id {
            return Ok(None);
        }
        self.extends
            .iter()
            .position(|id| id == format)
            .map(Some)
            .ok_or_else(|| RenderError::UnknownFormat {
                engine: self.id.clone(),
                format: format.clone(),
            })
    }
}

impl RenderingEngine<crate::dom::DomBackend> {
    /// Render `nodes` into detached DOM nodes of `dom`
    pub fn render_detached(
        &self,
        tree: &DocumentTree,
        dom: &mut Dom,
        nodes: &[scribe_tree::NodeId],
    ) -> Result<crate::PassOutput<scribe_dom::DomNodeId>, RenderError> {
        let mut pass = self.pass(tree, dom);
        pass.render(nodes)?;
        Ok(pass.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{TextBackend, TextSpan};
    use crate::{Predicate, SuperRenderer};
    use scribe_tree::{kinds, NodeRef, NodeSpec};

    struct Fixed(&'static str);

    impl Renderer<TextBackend> for Fixed {
        fn render(
            &self,
            node: NodeRef<'_>,
            pass: &mut RenderPass<'_, TextBackend>,
            _sup: &SuperRenderer,
        ) -> Result<TextSpan, RenderError> {
            let span = pass.write(node.id(), self.0);
            Ok(span)
        }
    }

    fn descriptor(name: &str, format: &str, predicate: Option<Predicate>) -> RendererDescriptor<TextBackend> {
        let descriptor = RendererDescriptor::new(name, format, Fixed("x"));
        match predicate {
            Some(predicate) => descriptor.when(predicate),
            None => descriptor,
        }
    }

    fn engine() -> RenderingEngine<TextBackend> {
        RenderingEngine::extending(
            "text/mail",
            vec![FormatId::from("text/plain"), FormatId::from("text")],
        )
    }

    #[test]
    fn test_registration_order_follows_format_priority() {
        let mut engine = engine();
        let any = || Some(Predicate::kind(kinds::PARAGRAPH));

        engine.register(descriptor("base-1", "text", any())).unwrap();
        engine.register(descriptor("plain-1", "text/plain", any())).unwrap();
        engine.register(descriptor("own-1", "text/mail", any())).unwrap();
        engine.register(descriptor("base-2", "text", any())).unwrap();
        engine.register(descriptor("plain-2", "text/plain", any())).unwrap();
        engine.register(descriptor("own-2", "text/mail", any())).unwrap();
        engine.register(descriptor("fallback", "text", None)).unwrap();

        let names: Vec<_> = engine.names().collect();
        assert_eq!(
            names,
            vec!["own-2", "own-1", "plain-2", "plain-1", "base-2", "base-1", "fallback"]
        );
    }

    #[test]
    fn test_registration_errors() {
        let mut engine = engine();
        engine.register(descriptor("fallback", "text", None)).unwrap();

        assert_eq!(
            engine.register(descriptor("fallback", "text", Some(Predicate::kind("x")))),
            Err(RenderError::DuplicateRenderer("fallback".to_string()))
        );
        assert!(matches!(
            engine.register(descriptor("other", "text/plain", None)),
            Err(RenderError::DuplicateDefault { .. })
        ));
        assert!(matches!(
            engine.register(descriptor("html", "dom/html", Some(Predicate::kind("x")))),
            Err(RenderError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_compatible_renderer_walks_past_previous() {
        let mut engine = engine();
        engine
            .register(descriptor("paragraphs", "text", Some(Predicate::kind(kinds::PARAGRAPH))))
            .unwrap();
        engine
            .register(descriptor("aligned", "text/mail", Some(Predicate::has_attribute("align"))))
            .unwrap();
        engine.register(descriptor("fallback", "text", None)).unwrap();

        let mut tree = scribe_tree::DocumentTree::new();
        let root = tree.root();
        let p = tree
            .insert(root, 0, &NodeSpec::new(kinds::PARAGRAPH).with_attr("align", "left"))
            .unwrap();
        let node = tree.get(p).unwrap();

        let first = engine.get_compatible_renderer(node, None);
        assert_eq!(first, Some(RendererSlot::Listed(0)));
        let second = engine.get_compatible_renderer(node, first);
        assert_eq!(second, Some(RendererSlot::Listed(1)));
        let third = engine.get_compatible_renderer(node, second);
        assert_eq!(third, Some(RendererSlot::Default));
        assert_eq!(engine.get_compatible_renderer(node, third), None);

        // Deterministic for identical arguments.
        for _ in 0..3 {
            assert_eq!(engine.get_compatible_renderer(node, first), second);
        }

        let root_node = tree.get(root).unwrap();
        assert_eq!(engine.get_compatible_renderer(root_node, None), Some(RendererSlot::Default));
    }

    #[test]
    fn test_missing_renderer_without_default() {
        let engine = engine();
        let tree = scribe_tree::DocumentTree::new();
        let root = tree.get(tree.root()).unwrap();

        match engine.resolve(root, None) {
            Err(RenderError::MissingRenderer { format, kind, .. }) => {
                assert_eq!(format, "text/mail");
                assert_eq!(kind, kinds::DOCUMENT);
            }
            _ => panic!("Expected MissingRenderer"),
        }
    }
}
