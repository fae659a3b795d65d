//! # Document Tree
//!
//! Arena-backed document hierarchy.
//!
//! ## Change tracking
//!
//! Each edit records the nodes whose rendered form became stale:
//!
//! | edit            | marked                               |
//! |-----------------|--------------------------------------|
//! | insert          | parent, inserted subtree root        |
//! | remove          | former parent                        |
//! | move            | old parent, new parent, moved node   |
//! | attribute/text  | the node itself                      |
//!
//! [`DocumentTree::commit`] drains the marked set together with a version
//! bump. Ids of removed nodes may still appear in a commit; consumers must
//! tolerate ids that no longer resolve.

use crate::{kinds, Node, NodeId, NodeRef, NodeSpec, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Result of committing a batch of edits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub version: u64,
    pub changed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    version: u64,
    changed: BTreeSet<NodeId>,
}

impl DocumentTree {
    /// Create an empty tree with a `document` root
    pub fn new() -> Self {
        Self::with_root(kinds::DOCUMENT)
    }

    pub fn with_root(kind: impl Into<String>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                id: root,
                kind: kind.into(),
                value: None,
                attributes: Default::default(),
                parent: None,
                children: Vec::new(),
            },
        );

        Self {
            nodes,
            root,
            next_id: 1,
            version: 0,
            changed: BTreeSet::new(),
        }
    }

    /// Build a tree whose root children are the given specs
    pub fn from_specs(specs: impl IntoIterator<Item = NodeSpec>) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        let root = tree.root;
        for (index, spec) in specs.into_iter().enumerate() {
            tree.insert(root, index, &spec)?;
        }
        tree.changed.clear();
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<NodeRef<'_>, TreeError> {
        self.nodes
            .get(&id)
            .map(|node| NodeRef::new(self, node))
            .ok_or(TreeError::NodeNotFound(id))
    }

    /// Children of `id`; empty when the node is unknown
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Position of `id` among its parent's children
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// True when `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Pre-order list of `id` and everything below it
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Deepest last descendant of `id` (the node itself when it is a leaf)
    pub fn last_descendant(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(last) = self.children(current).last() {
            current = *last;
        }
        current
    }

    /// Concatenated character values below `id`
    pub fn text(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.nodes.get(&n).and_then(|node| node.value))
            .collect()
    }

    /// Insert a subtree built from `spec` under `parent` at `index` (clamped)
    pub fn insert(&mut self, parent: NodeId, index: usize, spec: &NodeSpec) -> Result<NodeId, TreeError> {
        self.check_container(parent, TreeError::ParentNotFound(parent))?;

        let id = self.build(parent, spec);
        let children = &mut self.node_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, id);

        debug!(node = %id, parent = %parent, index, kind = %spec.kind, "Inserted node");
        self.changed.insert(parent);
        self.changed.insert(id);
        Ok(id)
    }

    /// Detach and drop the subtree rooted at `id`, returning its spec
    pub fn remove(&mut self, id: NodeId) -> Result<NodeSpec, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        let parent = self.detach(id)?;
        let spec = self.to_spec(id)?;
        for node in self.descendants(id) {
            self.nodes.remove(&node);
            self.changed.remove(&node);
        }

        debug!(node = %id, parent = %parent, "Removed node");
        self.changed.insert(parent);
        Ok(spec)
    }

    /// Relocate `id` under `new_parent`; `index` counts positions after the
    /// node has been detached from its old place
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: usize) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        self.check_container(new_parent, TreeError::ParentNotFound(new_parent))?;
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(TreeError::CycleDetected);
        }

        let old_parent = self.detach(id)?;
        let children = &mut self.node_mut(new_parent)?.children;
        let index = index.min(children.len());
        children.insert(index, id);
        self.node_mut(id)?.parent = Some(new_parent);

        debug!(node = %id, from = %old_parent, to = %new_parent, index, "Moved node");
        self.changed.insert(old_parent);
        self.changed.insert(new_parent);
        self.changed.insert(id);
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        self.node_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        self.changed.insert(id);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), TreeError> {
        self.node_mut(id)?.attributes.remove(name);
        self.changed.insert(id);
        Ok(())
    }

    /// Replace the value of a character node
    pub fn set_text(&mut self, id: NodeId, value: char) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        match node.value.as_mut() {
            Some(current) => *current = value,
            None => return Err(TreeError::NotACharacter(id)),
        }
        self.changed.insert(id);
        Ok(())
    }

    /// Nodes marked stale since the last commit
    pub fn pending_changes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.changed.iter().copied()
    }

    /// Drain the stale set and bump the version
    pub fn commit(&mut self) -> Commit {
        self.version += 1;
        let changed: Vec<NodeId> = std::mem::take(&mut self.changed).into_iter().collect();
        debug!(version = self.version, changed = changed.len(), "Committed tree edits");
        Commit {
            version: self.version,
            changed,
        }
    }

    /// Snapshot of the subtree at `id`
    pub fn to_spec(&self, id: NodeId) -> Result<NodeSpec, TreeError> {
        let node = self.get(id).ok_or(TreeError::NodeNotFound(id))?;
        let children = node
            .children
            .iter()
            .map(|child| self.to_spec(*child))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NodeSpec {
            kind: node.kind.clone(),
            value: node.value,
            attributes: node.attributes.clone(),
            children,
        })
    }

    fn build(&mut self, parent: NodeId, spec: &NodeSpec) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let children = spec
            .children
            .iter()
            .map(|child| self.build(id, child))
            .collect();

        self.nodes.insert(
            id,
            Node {
                id,
                kind: spec.kind.clone(),
                value: spec.value,
                attributes: spec.attributes.clone(),
                parent: Some(parent),
                children,
            },
        );
        id
    }

    fn detach(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        let parent = self.parent(id).ok_or(TreeError::NodeNotFound(id))?;
        self.node_mut(parent)?.children.retain(|c| *c != id);
        self.node_mut(id)?.parent = None;
        Ok(parent)
    }

    fn check_container(&self, id: NodeId, missing: TreeError) -> Result<(), TreeError> {
        match self.nodes.get(&id) {
            None => Err(missing),
            Some(node) if node.is_character() => Err(TreeError::LeafParent(id)),
            Some(_) => Ok(()),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DocumentTree, NodeId, NodeId) {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let p1 = tree
            .insert(root, 0, &NodeSpec::new(kinds::PARAGRAPH).with_text("ab"))
            .unwrap();
        let p2 = tree.insert(root, 1, &NodeSpec::new(kinds::PARAGRAPH)).unwrap();
        (tree, p1, p2)
    }

    #[test]
    fn test_insert_builds_subtree() {
        let (tree, p1, _) = sample();
        assert_eq!(tree.children(p1).len(), 2);
        assert_eq!(tree.text(p1), "ab");
        assert_eq!(tree.depth(tree.children(p1)[0]), 2);
    }

    #[test]
    fn test_insert_index_is_clamped() {
        let (mut tree, p1, _) = sample();
        let c = tree.insert(p1, 99, &NodeSpec::character('c')).unwrap();
        assert_eq!(tree.index_of(c), Some(2));
    }

    #[test]
    fn test_insert_under_character_fails() {
        let (mut tree, p1, _) = sample();
        let a = tree.children(p1)[0];
        let result = tree.insert(a, 0, &NodeSpec::character('x'));
        assert_eq!(result, Err(TreeError::LeafParent(a)));
    }

    #[test]
    fn test_move_preserves_identity() {
        let (mut tree, p1, p2) = sample();
        let a = tree.children(p1)[0];
        tree.move_node(a, p2, 0).unwrap();

        assert_eq!(tree.parent(a), Some(p2));
        assert_eq!(tree.children(p1).len(), 1);
        assert_eq!(tree.get(a).and_then(|n| n.value()), Some('a'));
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let (mut tree, p1, p2) = sample();
        let inner = tree.insert(p1, 0, &NodeSpec::new("span")).unwrap();
        assert_eq!(tree.move_node(p1, inner, 0), Err(TreeError::CycleDetected));
        assert!(tree.move_node(p2, p2, 0).is_err());
    }

    #[test]
    fn test_remove_drops_descendants() {
        let (mut tree, p1, _) = sample();
        let a = tree.children(p1)[0];
        let spec = tree.remove(p1).unwrap();

        assert_eq!(spec.children.len(), 2);
        assert!(!tree.contains(p1));
        assert!(!tree.contains(a));
        assert_eq!(tree.remove(tree.root()), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_commit_reports_stale_nodes() {
        let (mut tree, p1, p2) = sample();
        tree.commit();

        let a = tree.children(p1)[0];
        tree.set_text(a, 'z').unwrap();
        tree.set_attribute(p2, "align", "right").unwrap();

        let commit = tree.commit();
        assert_eq!(commit.version, 2);
        assert_eq!(commit.changed, vec![a, p2]);
        assert!(tree.commit().changed.is_empty());
    }

    #[test]
    fn test_set_text_requires_character() {
        let (mut tree, p1, _) = sample();
        assert_eq!(tree.set_text(p1, 'x'), Err(TreeError::NotACharacter(p1)));
    }

    #[test]
    fn test_last_descendant() {
        let (tree, p1, p2) = sample();
        assert_eq!(tree.last_descendant(p1), tree.children(p1)[1]);
        assert_eq!(tree.last_descendant(p2), p2);
        assert_eq!(tree.last_descendant(tree.root()), p2);
    }
}
