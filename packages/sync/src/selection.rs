//! # Selection Mapping
//!
//! Converts DOM `(node, offset)` endpoints to tree points and back.
//!
//! ## DOM → tree
//!
//! 1. Walk from the DOM point to a tracked node: an untracked node hands
//!    over to its previous sibling (offset = sibling length) or, at the start
//!    of its parent, to the parent (offset = child index).
//! 2. Turn the offset into an index inside what the tracked node stands for:
//!    characters of a run, or children of a container.
//! 3. Descend into the child at that index until a leaf or an empty
//!    container is reached.
//!
//! | situation                          | result                  |
//! |------------------------------------|-------------------------|
//! | offset 0 in a run                  | `(run[0], Before)`      |
//! | offset k > 0 in a run              | `(run[k-1], After)`     |
//! | container without children         | `(container, Inside)`   |
//! | offset at or past container length | `(last descendant, After)` |

use crate::mapping::{self, DomMapping, Represents};
use scribe_dom::{Dom, DomNodeId};
use scribe_tree::{DocumentTree, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativePosition {
    Before,
    After,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomPoint {
    pub node: DomNodeId,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePoint {
    pub node: NodeId,
    pub position: RelativePosition,
}

impl TreePoint {
    pub fn new(node: NodeId, position: RelativePosition) -> Self {
        Self { node, position }
    }
}

/// Selection in DOM terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub anchor_node: DomNodeId,
    pub anchor_offset: usize,
    pub focus_node: DomNodeId,
    pub focus_offset: usize,
    #[serde(default)]
    pub direction: Direction,
}

impl Selection {
    pub fn collapsed(node: DomNodeId, offset: usize) -> Self {
        Self {
            anchor_node: node,
            anchor_offset: offset,
            focus_node: node,
            focus_offset: offset,
            direction: Direction::None,
        }
    }
}

/// Selection in tree terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSelection {
    pub anchor: TreePoint,
    pub focus: TreePoint,
    #[serde(default)]
    pub direction: Direction,
}

/// Read-only view over a synchronized tree/DOM pair
pub struct SelectionMapper<'a> {
    tree: &'a DocumentTree,
    dom: &'a Dom,
    mapping: &'a DomMapping,
}

impl<'a> SelectionMapper<'a> {
    pub fn new(tree: &'a DocumentTree, dom: &'a Dom, mapping: &'a DomMapping) -> Self {
        Self { tree, dom, mapping }
    }

    pub fn to_tree_selection(&self, selection: &Selection) -> Option<TreeSelection> {
        Some(TreeSelection {
            anchor: self.to_tree(selection.anchor_node, selection.anchor_offset)?,
            focus: self.to_tree(selection.focus_node, selection.focus_offset)?,
            direction: selection.direction,
        })
    }

    pub fn to_dom_selection(&self, selection: &TreeSelection) -> Option<Selection> {
        let anchor = self.to_dom(selection.anchor)?;
        let focus = self.to_dom(selection.focus)?;
        Some(Selection {
            anchor_node: anchor.node,
            anchor_offset: anchor.offset,
            focus_node: focus.node,
            focus_offset: focus.offset,
            direction: selection.direction,
        })
    }

    /// Map a DOM point to a tree point; `None` outside tracked DOM
    pub fn to_tree(&self, node: DomNodeId, offset: usize) -> Option<TreePoint> {
        let (tracked, offset) = self.climb(node, offset)?;

        match mapping::represents(self.mapping, self.tree, tracked)? {
            Represents::Run(run) => {
                let consumed = if self.dom.is_text(tracked) {
                    offset
                } else {
                    self.text_before(tracked, offset)
                };
                Some(run_point(&run, consumed))
            }
            Represents::Node(container) => {
                let index = self.tree_index(tracked, offset);
                Some(self.descend(container, index))
            }
        }
    }

    /// Map a tree point to a DOM point; `None` when the node is not rendered
    pub fn to_dom(&self, point: TreePoint) -> Option<DomPoint> {
        let node = self.tree.get(point.node)?;

        if node.is_character() {
            let text = self
                .mapping
                .outputs(point.node)
                .iter()
                .copied()
                .find(|output| self.dom.is_text(*output))?;
            let index = self
                .mapping
                .nodes(&text)?
                .iter()
                .position(|n| *n == point.node)?;
            let offset = match point.position {
                RelativePosition::After => index + 1,
                RelativePosition::Before | RelativePosition::Inside => index,
            };
            return Some(DomPoint { node: text, offset });
        }

        let element = mapping::owned_element(self.mapping, self.tree, self.dom, point.node)?;
        let point = match (point.position, self.dom.parent(element), self.dom.index_of(element)) {
            (RelativePosition::Inside, _, _) => DomPoint { node: element, offset: 0 },
            (RelativePosition::Before, Some(parent), Some(index)) => DomPoint { node: parent, offset: index },
            (RelativePosition::After, Some(parent), Some(index)) => DomPoint {
                node: parent,
                offset: index + 1,
            },
            (RelativePosition::Before, _, _) => DomPoint { node: element, offset: 0 },
            (RelativePosition::After, _, _) => DomPoint {
                node: element,
                offset: self.dom.content_length(element),
            },
        };
        Some(point)
    }

    /// Walk to the nearest tracked DOM node, carrying the offset along
    fn climb(&self, mut node: DomNodeId, mut offset: usize) -> Option<(DomNodeId, usize)> {
        loop {
            if self.mapping.is_tracked(&node) {
                return Some((node, offset));
            }
            if let Some(previous) = self.dom.previous_sibling(node) {
                offset = self.dom.content_length(previous);
                node = previous;
            } else {
                offset = self.dom.index_of(node)?;
                node = self.dom.parent(node)?;
            }
        }
    }

    /// Characters rendered by the first `offset` children of `element`
    fn text_before(&self, element: DomNodeId, offset: usize) -> usize {
        self.dom
            .children(element)
            .iter()
            .take(offset)
            .map(|child| self.dom.text_content(*child).chars().count())
            .sum()
    }

    /// Number of tree children rendered before DOM child `offset`
    fn tree_index(&self, element: DomNodeId, offset: usize) -> usize {
        let mut seen: Vec<NodeId> = Vec::new();
        for child in self.dom.children(element).iter().take(offset) {
            for node in self.mapping.nodes(child).unwrap_or(&[]) {
                if !seen.contains(node) {
                    seen.push(*node);
                }
            }
        }
        seen.len()
    }

    /// Resolve child `index` of `container` down to its deepest leaf
    fn descend(&self, container: NodeId, index: usize) -> TreePoint {
        let mut current = container;
        let mut index = index;
        loop {
            let children = self.tree.children(current);
            match children.get(index) {
                None if children.is_empty() => {
                    return TreePoint::new(current, RelativePosition::Inside)
                }
                None => {
                    return TreePoint::new(self.tree.last_descendant(current), RelativePosition::After)
                }
                Some(child) if self.tree.get(*child).is_some_and(|n| n.is_character()) => {
                    return TreePoint::new(*child, RelativePosition::Before)
                }
                Some(child) => {
                    current = *child;
                    index = 0;
                }
            }
        }
    }
}

fn run_point(run: &[NodeId], consumed: usize) -> TreePoint {
    match consumed.min(run.len()) {
        0 => TreePoint::new(run[0], RelativePosition::Before),
        k => TreePoint::new(run[k - 1], RelativePosition::After),
    }
}
