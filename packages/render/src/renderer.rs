use crate::{Backend, FormatId, Predicate, RenderError, RenderPass, RendererSlot};
use scribe_tree::NodeRef;
use std::fmt;
use std::rc::Rc;

/// Handler producing output for the nodes it is dispatched
pub trait Renderer<B: Backend> {
    /// Render a single node
    fn render(
        &self,
        node: NodeRef<'_>,
        pass: &mut RenderPass<'_, B>,
        sup: &SuperRenderer,
    ) -> Result<B::Output, RenderError>;

    /// Render a group of adjacent nodes, one output per node in order
    ///
    /// Implementations merging several nodes into one output must return
    /// that output once per node and `locate` the full ordered subset.
    fn render_batch(
        &self,
        nodes: &[NodeRef<'_>],
        pass: &mut RenderPass<'_, B>,
        sup: &SuperRenderer,
    ) -> Result<Vec<B::Output>, RenderError> {
        nodes
            .iter()
            .map(|node| self.render(*node, pass, sup))
            .collect()
    }

    /// Whether adjacent nodes dispatched here should arrive as one batch
    fn batches(&self) -> bool {
        false
    }
}

/// Handle that renders "as the next less specific renderer would"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperRenderer {
    after: RendererSlot,
}

impl SuperRenderer {
    pub(crate) fn new(after: RendererSlot) -> Self {
        Self { after }
    }

    /// Slot of the renderer holding this handle
    pub fn slot(&self) -> RendererSlot {
        self.after
    }

    pub fn render<B: Backend>(
        &self,
        node: NodeRef<'_>,
        pass: &mut RenderPass<'_, B>,
    ) -> Result<B::Output, RenderError> {
        let engine = pass.engine();
        let (slot, renderer) = engine.resolve(&node, Some(self.after))?;
        renderer.render(node, pass, &SuperRenderer::new(slot))
    }

    pub fn render_batch<B: Backend>(
        &self,
        nodes: &[NodeRef<'_>],
        pass: &mut RenderPass<'_, B>,
    ) -> Result<Vec<B::Output>, RenderError> {
        let ids: Vec<_> = nodes.iter().map(|node| node.id()).collect();
        let groups = pass.render_batched(&ids, Some(self.after))?;
        Ok(groups.into_iter().flat_map(|(_, outputs)| outputs).collect())
    }
}

/// Registration record: name, target format, optional predicate, handler
///
/// A descriptor without predicate is the default of every engine it lands in.
pub struct RendererDescriptor<B: Backend> {
    pub name: String,
    pub format: FormatId,
    pub predicate: Option<Predicate>,
    pub renderer: Rc<dyn Renderer<B>>,
}

impl<B: Backend> RendererDescriptor<B> {
    pub fn new(
        name: impl Into<String>,
        format: impl Into<FormatId>,
        renderer: impl Renderer<B> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            predicate: None,
            renderer: Rc::new(renderer),
        }
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn is_default(&self) -> bool {
        self.predicate.is_none()
    }
}

impl<B: Backend> Clone for RendererDescriptor<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            format: self.format.clone(),
            predicate: self.predicate.clone(),
            renderer: Rc::clone(&self.renderer),
        }
    }
}

impl<B: Backend> fmt::Debug for RendererDescriptor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererDescriptor")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("predicate", &self.predicate)
            .finish()
    }
}
