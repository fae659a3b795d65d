//! Plain-text backend
//!
//! Renders into a `String` buffer. Outputs are byte spans anchored at the
//! first node they represent, which keeps nested spans of equal extent
//! distinct in the location index.

use crate::{
    Backend, Predicate, RenderError, RenderPass, Renderer, RendererDescriptor, RendererRegistry,
    SuperRenderer,
};
use scribe_tree::{kinds, DocumentTree, NodeId, NodeRef};

pub const TEXT_PLAIN: &str = "text/plain";

pub struct TextBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSpan {
    pub anchor: NodeId,
    pub start: usize,
    pub end: usize,
}

impl Backend for TextBackend {
    type Output = TextSpan;
    type Target = String;
}

impl RenderPass<'_, TextBackend> {
    /// Append `text` to the buffer and return the span it occupies
    pub fn write(&mut self, anchor: NodeId, text: &str) -> TextSpan {
        let start = self.target().len();
        self.target().push_str(text);
        TextSpan {
            anchor,
            start,
            end: self.target().len(),
        }
    }
}

/// Default block renderer: children followed by a separator
pub struct BlockRenderer {
    separator: String,
}

impl BlockRenderer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self::new("\n")
    }
}

impl Renderer<TextBackend> for BlockRenderer {
    fn render(
        &self,
        node: NodeRef<'_>,
        pass: &mut RenderPass<'_, TextBackend>,
        _sup: &SuperRenderer,
    ) -> Result<TextSpan, RenderError> {
        let start = pass.target().len();
        pass.render_children(node.id())?;
        if node.parent().is_some() {
            pass.target().push_str(&self.separator);
        }

        let span = TextSpan {
            anchor: node.id(),
            start,
            end: pass.target().len(),
        };
        pass.locate(&[node.id()], span);
        Ok(span)
    }
}

/// Writes adjacent characters as one span
pub struct CharacterRenderer;

impl Renderer<TextBackend> for CharacterRenderer {
    fn render(
        &self,
        node: NodeRef<'_>,
        pass: &mut RenderPass<'_, TextBackend>,
        sup: &SuperRenderer,
    ) -> Result<TextSpan, RenderError> {
        let outputs = self.render_batch(&[node], pass, sup)?;
        outputs
            .into_iter()
            .next()
            .ok_or(RenderError::BatchLength {
                renderer: "text-characters".to_string(),
                expected: 1,
                actual: 0,
            })
    }

    fn render_batch(
        &self,
        nodes: &[NodeRef<'_>],
        pass: &mut RenderPass<'_, TextBackend>,
        _sup: &SuperRenderer,
    ) -> Result<Vec<TextSpan>, RenderError> {
        let Some(first) = nodes.first() else {
            return Ok(Vec::new());
        };
        let text: String = nodes.iter().filter_map(|n| n.value()).collect();
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id()).collect();

        let span = pass.write(first.id(), &text);
        pass.locate(&ids, span);
        Ok(vec![span; nodes.len()])
    }

    fn batches(&self) -> bool {
        true
    }
}

/// Register the plain-text engine's stock renderers
pub fn register_stock_renderers(registry: &mut RendererRegistry<TextBackend>) -> Result<(), RenderError> {
    registry.register(RendererDescriptor::new("text-block", TEXT_PLAIN, BlockRenderer::default()))?;
    registry.register(
        RendererDescriptor::new("text-characters", TEXT_PLAIN, CharacterRenderer)
            .when(Predicate::kind(kinds::CHARACTER)),
    )
}

/// Render the whole tree to plain text
pub fn render_to_string(
    registry: &RendererRegistry<TextBackend>,
    format: &str,
    tree: &DocumentTree,
) -> Result<(String, crate::PassOutput<TextSpan>), RenderError> {
    let engine = registry.engine(format)?;
    let mut buffer = String::new();
    let output = {
        let mut pass = engine.pass(tree, &mut buffer);
        pass.render(&[tree.root()])?;
        pass.finish()
    };
    Ok((buffer, output))
}
