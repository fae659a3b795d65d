//! # DOM ↔ Tree Mapping
//!
//! The live mapping is a [`LocationIndex`] over DOM node ids, kept across
//! passes by the sync layer. Outputs come in two shapes:
//!
//! - an element standing for exactly one non-character node (its *owner*)
//! - a text node or wrapper standing for a run of adjacent characters
//!
//! Helpers here classify DOM nodes by that shape and keep the index free of
//! entries pointing at detached DOM or removed tree nodes.

use scribe_dom::{Dom, DomNodeId};
use scribe_render::LocationIndex;
use scribe_tree::{DocumentTree, NodeId};

pub type DomMapping = LocationIndex<DomNodeId>;

/// What a tracked DOM node stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Represents {
    /// An element rendered for one non-character node
    Node(NodeId),
    /// A text node or wrapper rendered for adjacent characters
    Run(Vec<NodeId>),
}

/// Classify a tracked DOM node
pub fn represents(mapping: &DomMapping, tree: &DocumentTree, output: DomNodeId) -> Option<Represents> {
    let nodes = mapping.nodes(&output)?;
    // Characters removed since the output was located do not change its shape.
    let mut present = nodes.iter().filter_map(|node| tree.get(*node)).peekable();
    let is_run = present.peek().is_some() && present.all(|n| n.is_character());

    match nodes {
        _ if is_run => Some(Represents::Run(nodes.to_vec())),
        [node] => Some(Represents::Node(*node)),
        _ => None,
    }
}

/// The element `node` alone owns, if any
///
/// Characters never own an element: a wrapper around a single formatted
/// character is part of a run and belongs to its container.
pub fn owned_element(mapping: &DomMapping, tree: &DocumentTree, dom: &Dom, node: NodeId) -> Option<DomNodeId> {
    mapping.outputs(node).iter().copied().find(|output| {
        dom.is_element(*output) && represents(mapping, tree, *output) == Some(Represents::Node(node))
    })
}

/// Nearest ancestor-or-self of `output` that is an owned element, with its node
pub fn owning_container(
    mapping: &DomMapping,
    tree: &DocumentTree,
    dom: &Dom,
    output: DomNodeId,
) -> Option<(DomNodeId, NodeId)> {
    std::iter::once(output)
        .chain(dom.ancestors(output))
        .find_map(|candidate| match represents(mapping, tree, candidate)? {
            Represents::Node(node) if dom.is_element(candidate) => Some((candidate, node)),
            _ => None,
        })
}

/// True when `output` or one of its ancestors is tracked
pub fn is_within_tracked(mapping: &DomMapping, dom: &Dom, output: DomNodeId) -> bool {
    std::iter::once(output)
        .chain(dom.ancestors(output))
        .any(|candidate| mapping.is_tracked(&candidate))
}

/// Drop entries for disconnected DOM nodes and removed tree nodes
pub fn prune(mapping: &mut DomMapping, tree: &DocumentTree, dom: &Dom) {
    mapping.retain(|output, nodes| {
        dom.is_connected(*output) && nodes.iter().all(|node| tree.contains(*node))
    });
}

/// Pre-order list of `id` and its DOM descendants
pub fn dom_subtree(dom: &Dom, id: DomNodeId) -> Vec<DomNodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        if dom.exists(next) {
            out.push(next);
            stack.extend(dom.children(next).iter().rev().copied());
        }
    }
    out
}
