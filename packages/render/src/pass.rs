//! # Render Pass
//!
//! Pass-scoped state: the per-node renderings and the location index.
//!
//! A pass is created by the caller through [`RenderingEngine::pass`], lives
//! for one invocation of the pipeline and is discarded (or turned into a
//! [`PassOutput`]) at the end. Nothing is shared between passes, and the
//! `&mut` target borrow keeps two passes from running over one target.

use crate::{Backend, LocationIndex, RenderError, RenderingEngine, RendererSlot, SuperRenderer};
use scribe_tree::{DocumentTree, NodeId, NodeRef};
use std::collections::HashMap;
use tracing::{instrument, trace};

/// Batched render result: the nodes of one group and their outputs
pub type RenderGroup<O> = (Vec<NodeId>, Vec<O>);

pub struct RenderPass<'a, B: Backend> {
    engine: &'a RenderingEngine<B>,
    tree: &'a DocumentTree,
    target: &'a mut B::Target,
    renderings: HashMap<NodeId, B::Output>,
    locations: LocationIndex<B::Output>,
}

/// What a finished pass leaves behind
#[derive(Debug, Clone)]
pub struct PassOutput<O: Clone + Eq + std::hash::Hash> {
    pub renderings: HashMap<NodeId, O>,
    pub locations: LocationIndex<O>,
}

impl<'a, B: Backend> RenderPass<'a, B> {
    pub(crate) fn new(engine: &'a RenderingEngine<B>, tree: &'a DocumentTree, target: &'a mut B::Target) -> Self {
        Self {
            engine,
            tree,
            target,
            renderings: HashMap::new(),
            locations: LocationIndex::new(),
        }
    }

    pub fn engine(&self) -> &'a RenderingEngine<B> {
        self.engine
    }

    pub fn tree(&self) -> &'a DocumentTree {
        self.tree
    }

    pub fn target(&mut self) -> &mut B::Target {
        &mut *self.target
    }

    /// Render `nodes`, returning one output per node in input order
    #[instrument(level = "debug", skip_all, fields(engine = %self.engine.id(), nodes = nodes.len()))]
    pub fn render(&mut self, nodes: &[NodeId]) -> Result<Vec<B::Output>, RenderError> {
        let groups = self.render_batched(nodes, None)?;

        let mut outputs = Vec::with_capacity(nodes.len());
        for (group, results) in groups {
            for (node, output) in group.into_iter().zip(results) {
                self.renderings.insert(node, output.clone());
                outputs.push(output);
            }
        }
        Ok(outputs)
    }

    /// Render the children of `node`
    pub fn render_children(&mut self, node: NodeId) -> Result<Vec<B::Output>, RenderError> {
        let tree = self.tree;
        self.render(tree.children(node))
    }

    /// Dispatch `nodes` to renderers after `after`, grouped into batches
    ///
    /// Every node forms its own group unless its renderer `batches()`, in
    /// which case a maximal run of adjacent nodes resolving to that renderer
    /// is handed over in one call.
    pub fn render_batched(
        &mut self,
        nodes: &[NodeId],
        after: Option<RendererSlot>,
    ) -> Result<Vec<RenderGroup<B::Output>>, RenderError> {
        let tree = self.tree;
        let engine = self.engine;
        let refs = nodes
            .iter()
            .map(|id| tree.node(*id))
            .collect::<Result<Vec<NodeRef<'a>>, _>>()?;

        let mut groups = Vec::new();
        let mut start = 0;
        while start < refs.len() {
            let (slot, renderer) = engine.resolve(&refs[start], after)?;

            let mut end = start + 1;
            if renderer.batches() {
                while end < refs.len() && engine.get_compatible_renderer(&refs[end], after) == Some(slot) {
                    end += 1;
                }
            }

            let batch = &refs[start..end];
            trace!(renderer = ?slot, size = batch.len(), "Rendering batch");
            let outputs = renderer.render_batch(batch, self, &SuperRenderer::new(slot))?;
            if outputs.len() != batch.len() {
                return Err(RenderError::BatchLength {
                    renderer: engine
                        .descriptor(slot)
                        .map(|d| d.name.clone())
                        .unwrap_or_default(),
                    expected: batch.len(),
                    actual: outputs.len(),
                });
            }

            groups.push((nodes[start..end].to_vec(), outputs));
            start = end;
        }
        Ok(groups)
    }

    /// Record that `output` represents `nodes` (in tree order)
    pub fn locate(&mut self, nodes: &[NodeId], output: B::Output) {
        self.locations.insert(output, nodes.to_vec());
    }

    /// Output stored for `node` during this pass
    pub fn rendering(&self, node: NodeId) -> Option<&B::Output> {
        self.renderings.get(&node)
    }

    pub fn locations(&self) -> &LocationIndex<B::Output> {
        &self.locations
    }

    /// Drop renderings and locations; only valid between full passes
    pub fn clear(&mut self) {
        self.renderings.clear();
        self.locations.clear();
    }

    pub fn finish(self) -> PassOutput<B::Output> {
        PassOutput {
            renderings: self.renderings,
            locations: self.locations,
        }
    }
}
