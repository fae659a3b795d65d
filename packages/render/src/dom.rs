//! DOM backend and its stock renderers
//!
//! - [`ElementRenderer`]: the catch-all default. One element per node, tag
//!   from the [`TagTable`], attributes copied, children rendered in place.
//! - [`CharacterRunRenderer`]: merges adjacent characters with equal
//!   attributes into one text node. Formatted runs are wrapped in a span
//!   that carries the attributes. Both the text node and the wrapper are
//!   located against the full run.

use crate::{
    Backend, Predicate, RenderError, RenderPass, Renderer, RendererDescriptor, RendererRegistry,
    SuperRenderer,
};
use scribe_dom::{Dom, DomNodeId};
use scribe_tree::{kinds, NodeId, NodeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DOM: &str = "dom";

pub struct DomBackend;

impl Backend for DomBackend {
    type Output = DomNodeId;
    type Target = Dom;
}

/// Node kind ↔ element tag table
///
/// Kinds without an entry render under their own name, so the mapping stays
/// reversible for unknown kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagTable {
    tags: BTreeMap<String, String>,
}

impl TagTable {
    pub fn new(tags: BTreeMap<String, String>) -> Self {
        Self { tags }
    }

    pub fn tag_for<'a>(&'a self, kind: &'a str) -> &'a str {
        self.tags.get(kind).map(String::as_str).unwrap_or(kind)
    }

    pub fn kind_for<'a>(&'a self, tag: &'a str) -> &'a str {
        self.tags
            .iter()
            .find(|(_, t)| t.as_str() == tag)
            .map(|(kind, _)| kind.as_str())
            .unwrap_or(tag)
    }
}

impl Default for TagTable {
    fn default() -> Self {
        let tags = [
            (kinds::DOCUMENT, "div"),
            (kinds::PARAGRAPH, "p"),
            ("heading", "h1"),
            ("quote", "blockquote"),
            ("list", "ul"),
            ("item", "li"),
        ]
        .into_iter()
        .map(|(kind, tag)| (kind.to_string(), tag.to_string()))
        .collect();
        Self { tags }
    }
}

pub struct ElementRenderer {
    tags: TagTable,
}

impl ElementRenderer {
    pub fn new(tags: TagTable) -> Self {
        Self { tags }
    }
}

impl Renderer<DomBackend> for ElementRenderer {
    fn render(
        &self,
        node: NodeRef<'_>,
        pass: &mut RenderPass<'_, DomBackend>,
        _sup: &SuperRenderer,
    ) -> Result<DomNodeId, RenderError> {
        let element = pass.target().create_element(self.tags.tag_for(node.kind()));
        for (name, value) in node.attributes() {
            pass.target().set_attribute(element, name, value)?;
        }

        let mut children = pass.render_children(node.id())?;
        // Merged runs report one output per node.
        children.dedup();
        for child in children {
            pass.target().append_child(element, child)?;
        }

        pass.locate(&[node.id()], element);
        Ok(element)
    }
}

pub struct CharacterRunRenderer {
    wrapper_tag: String,
}

impl CharacterRunRenderer {
    pub fn new(wrapper_tag: impl Into<String>) -> Self {
        Self {
            wrapper_tag: wrapper_tag.into(),
        }
    }

    fn render_run(&self, run: &[NodeRef<'_>], pass: &mut RenderPass<'_, DomBackend>) -> Result<DomNodeId, RenderError> {
        let text: String = run.iter().filter_map(|n| n.value()).collect();
        let ids: Vec<NodeId> = run.iter().map(|n| n.id()).collect();

        let text_node = pass.target().create_text(text);
        pass.locate(&ids, text_node);

        let attributes = match run.first() {
            Some(first) if !first.attributes().is_empty() => first.attributes(),
            _ => return Ok(text_node),
        };

        let wrapper = pass.target().create_element(self.wrapper_tag.as_str());
        for (name, value) in attributes {
            pass.target().set_attribute(wrapper, name, value)?;
        }
        pass.target().append_child(wrapper, text_node)?;
        pass.locate(&ids, wrapper);
        Ok(wrapper)
    }
}

impl Default for CharacterRunRenderer {
    fn default() -> Self {
        Self::new("span")
    }
}

impl Renderer<DomBackend> for CharacterRunRenderer {
    fn render(
        &self,
        node: NodeRef<'_>,
        pass: &mut RenderPass<'_, DomBackend>,
        _sup: &SuperRenderer,
    ) -> Result<DomNodeId, RenderError> {
        self.render_run(&[node], pass)
    }

    fn render_batch(
        &self,
        nodes: &[NodeRef<'_>],
        pass: &mut RenderPass<'_, DomBackend>,
        _sup: &SuperRenderer,
    ) -> Result<Vec<DomNodeId>, RenderError> {
        let mut outputs = Vec::with_capacity(nodes.len());
        for run in runs(nodes) {
            let output = self.render_run(run, pass)?;
            outputs.extend(std::iter::repeat(output).take(run.len()));
        }
        Ok(outputs)
    }

    fn batches(&self) -> bool {
        true
    }
}

/// Split `nodes` where the attribute set changes
fn runs<'n, 'a>(nodes: &'n [NodeRef<'a>]) -> Vec<&'n [NodeRef<'a>]> {
    let mut out = Vec::new();
    let mut start = 0;
    for index in 1..=nodes.len() {
        let boundary = index == nodes.len() || nodes[index].attributes() != nodes[start].attributes();
        if boundary {
            out.push(&nodes[start..index]);
            start = index;
        }
    }
    out
}

/// Register the DOM engine's stock renderers under `format`
pub fn register_stock_renderers(
    registry: &mut RendererRegistry<DomBackend>,
    format: &str,
    tags: TagTable,
    wrapper_tag: &str,
) -> Result<(), RenderError> {
    registry.register(RendererDescriptor::new("dom-element", format, ElementRenderer::new(tags)))?;
    registry.register(
        RendererDescriptor::new("dom-characters", format, CharacterRunRenderer::new(wrapper_tag))
            .when(Predicate::kind(kinds::CHARACTER)),
    )
}
