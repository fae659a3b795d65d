use crate::DocumentTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

/// Well-known node kinds
pub mod kinds {
    pub const DOCUMENT: &str = "document";
    pub const PARAGRAPH: &str = "paragraph";
    pub const CHARACTER: &str = "character";
}

/// Stable identity of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A node stored in the tree arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: String,
    pub(crate) value: Option<char>,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Kind test used by renderer predicates
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn is_character(&self) -> bool {
        self.value.is_some()
    }

    /// Character value (character nodes only)
    pub fn value(&self) -> Option<char> {
        self.value
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Borrowed view of a node together with the tree it lives in
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a DocumentTree,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a DocumentTree, node: &'a Node) -> Self {
        Self { tree, node }
    }

    pub fn tree(&self) -> &'a DocumentTree {
        self.tree
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn child_refs(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let node = self.node;
        node.children
            .iter()
            .filter_map(move |id| tree.node(*id).ok())
    }

    pub fn parent_ref(&self) -> Option<NodeRef<'a>> {
        self.node.parent.and_then(|id| self.tree.node(id).ok())
    }
}

impl Deref for NodeRef<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        self.node
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.node.id)
            .field("kind", &self.node.kind)
            .finish()
    }
}

/// Detached description of a subtree, used to insert new content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<char>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn character(value: char) -> Self {
        Self {
            value: Some(value),
            ..Self::new(kinds::CHARACTER)
        }
    }

    /// One character spec per char of `text`
    pub fn text(text: &str) -> Vec<NodeSpec> {
        text.chars().map(NodeSpec::character).collect()
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_children(NodeSpec::text(text))
    }
}
