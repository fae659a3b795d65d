//! # Location Index
//!
//! Reverse map from rendered artifacts to the tree nodes they represent.
//!
//! Two ownership-free relations are kept side by side:
//!
//! - output → ordered node list (one output may merge several nodes)
//! - node → outputs (one node may produce several outputs, e.g. a text node
//!   and the span wrapping it)
//!
//! Neither side owns anything; entries are plain ids.

use scribe_tree::NodeId;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq)]
pub struct LocationIndex<O: Clone + Eq + Hash> {
    nodes_by_output: HashMap<O, Vec<NodeId>>,
    outputs_by_node: HashMap<NodeId, Vec<O>>,
}

impl<O: Clone + Eq + Hash> LocationIndex<O> {
    pub fn new() -> Self {
        Self {
            nodes_by_output: HashMap::new(),
            outputs_by_node: HashMap::new(),
        }
    }

    /// Record that `output` represents exactly `nodes`, in order
    ///
    /// Replaces any previous entry for `output`.
    pub fn insert(&mut self, output: O, nodes: Vec<NodeId>) {
        self.remove_output(&output);
        for node in &nodes {
            let outputs = self.outputs_by_node.entry(*node).or_default();
            if !outputs.contains(&output) {
                outputs.push(output.clone());
            }
        }
        self.nodes_by_output.insert(output, nodes);
    }

    /// Nodes represented by `output`
    pub fn nodes(&self, output: &O) -> Option<&[NodeId]> {
        self.nodes_by_output.get(output).map(Vec::as_slice)
    }

    /// Outputs produced for `node`, in the order they were located
    pub fn outputs(&self, node: NodeId) -> &[O] {
        self.outputs_by_node
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_tracked(&self, output: &O) -> bool {
        self.nodes_by_output.contains_key(output)
    }

    pub fn has_node(&self, node: NodeId) -> bool {
        self.outputs_by_node.contains_key(&node)
    }

    pub fn remove_output(&mut self, output: &O) -> Option<Vec<NodeId>> {
        let nodes = self.nodes_by_output.remove(output)?;
        for node in &nodes {
            if let Some(outputs) = self.outputs_by_node.get_mut(node) {
                outputs.retain(|o| o != output);
                if outputs.is_empty() {
                    self.outputs_by_node.remove(node);
                }
            }
        }
        Some(nodes)
    }

    /// Forget every output that lists `node`
    pub fn remove_node(&mut self, node: NodeId) -> Vec<O> {
        let outputs = self.outputs_by_node.remove(&node).unwrap_or_default();
        for output in &outputs {
            self.remove_output(output);
        }
        outputs
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&O, &[NodeId]) -> bool) {
        let stale: Vec<O> = self
            .nodes_by_output
            .iter()
            .filter(|(output, nodes)| !keep(output, nodes))
            .map(|(output, _)| output.clone())
            .collect();
        for output in &stale {
            self.remove_output(output);
        }
    }

    /// Merge `other` into `self`, replacing entries for the same outputs
    pub fn absorb(&mut self, other: LocationIndex<O>) {
        for (output, nodes) in other.nodes_by_output {
            self.insert(output, nodes);
        }
    }

    /// Rewrite every output through `f`
    pub fn map_outputs(self, mut f: impl FnMut(&O) -> O) -> LocationIndex<O> {
        let mut mapped = LocationIndex::new();
        for (output, nodes) in self.nodes_by_output {
            mapped.insert(f(&output), nodes);
        }
        mapped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&O, &[NodeId])> {
        self.nodes_by_output
            .iter()
            .map(|(output, nodes)| (output, nodes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.nodes_by_output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_by_output.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes_by_output.clear();
        self.outputs_by_node.clear();
    }
}

impl<O: Clone + Eq + Hash> Default for LocationIndex<O> {
    fn default() -> Self {
        Self::new()
    }
}
