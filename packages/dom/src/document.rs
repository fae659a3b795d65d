use crate::{DomError, DomSnapshot, MutationKind, MutationRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::trace;

/// ID used to address nodes in the DOM arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomNodeId(pub u64);

impl fmt::Display for DomNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomNodeData {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text {
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    pub data: DomNodeData,
    parent: Option<DomNodeId>,
    children: Vec<DomNodeId>,
}

/// Headless document with a `body` root
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: HashMap<DomNodeId, DomNode>,
    body: DomNodeId,
    next_id: u64,
    records: Vec<MutationRecord>,
}

impl Dom {
    pub fn new() -> Self {
        let body = DomNodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            body,
            DomNode {
                data: DomNodeData::Element {
                    tag: "body".to_string(),
                    attributes: BTreeMap::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );

        Self {
            nodes,
            body,
            next_id: 1,
            records: Vec::new(),
        }
    }

    pub fn body(&self) -> DomNodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> DomNodeId {
        self.alloc(DomNodeData::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> DomNodeId {
        self.alloc(DomNodeData::Text {
            content: content.into(),
        })
    }

    // ---- reads ----

    pub fn get(&self, id: DomNodeId) -> Option<&DomNode> {
        self.nodes.get(&id)
    }

    pub fn exists(&self, id: DomNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_element(&self, id: DomNodeId) -> bool {
        matches!(self.data(id), Some(DomNodeData::Element { .. }))
    }

    pub fn is_text(&self, id: DomNodeId) -> bool {
        matches!(self.data(id), Some(DomNodeData::Text { .. }))
    }

    pub fn tag(&self, id: DomNodeId) -> Option<&str> {
        match self.data(id)? {
            DomNodeData::Element { tag, .. } => Some(tag),
            DomNodeData::Text { .. } => None,
        }
    }

    /// Data of a text node
    pub fn text(&self, id: DomNodeId) -> Option<&str> {
        match self.data(id)? {
            DomNodeData::Text { content } => Some(content),
            DomNodeData::Element { .. } => None,
        }
    }

    /// Concatenated text of `id` and its descendants
    pub fn text_content(&self, id: DomNodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    pub fn attributes(&self, id: DomNodeId) -> Option<&BTreeMap<String, String>> {
        match self.data(id)? {
            DomNodeData::Element { attributes, .. } => Some(attributes),
            DomNodeData::Text { .. } => None,
        }
    }

    pub fn attribute(&self, id: DomNodeId, name: &str) -> Option<&str> {
        self.attributes(id)?.get(name).map(String::as_str)
    }

    pub fn parent(&self, id: DomNodeId) -> Option<DomNodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: DomNodeId) -> &[DomNodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_of(&self, id: DomNodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn previous_sibling(&self, id: DomNodeId) -> Option<DomNodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: DomNodeId) -> Option<DomNodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Inclusive ancestry test (`Node.contains`)
    pub fn contains(&self, ancestor: DomNodeId, node: DomNodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_connected(&self, id: DomNodeId) -> bool {
        self.contains(self.body, id)
    }

    /// Offset range of a node: characters for text, children for elements
    pub fn content_length(&self, id: DomNodeId) -> usize {
        match self.data(id) {
            Some(DomNodeData::Text { content }) => content.chars().count(),
            Some(DomNodeData::Element { .. }) => self.children(id).len(),
            None => 0,
        }
    }

    /// Ancestors of `id`, nearest first, excluding `id`
    pub fn ancestors(&self, id: DomNodeId) -> Vec<DomNodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Deepest node containing both `a` and `b`
    pub fn common_ancestor(&self, a: DomNodeId, b: DomNodeId) -> Option<DomNodeId> {
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|candidate| self.contains(*candidate, b))
    }

    pub fn depth(&self, id: DomNodeId) -> usize {
        self.ancestors(id).len()
    }

    // ---- writes ----

    pub fn append_child(&mut self, parent: DomNodeId, child: DomNodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end), detaching it from
    /// any current parent first
    pub fn insert_before(
        &mut self,
        parent: DomNodeId,
        child: DomNodeId,
        reference: Option<DomNodeId>,
    ) -> Result<(), DomError> {
        self.check_element(parent)?;
        self.check_exists(child)?;
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }

        let children = &mut self.node_mut(parent)?.children;
        let index = match reference {
            Some(reference) => children
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(children.len()),
            None => children.len(),
        };
        children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);

        let previous = index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied());
        self.record(
            MutationRecord::child_list(parent, vec![child], Vec::new())
                .with_siblings(previous, reference),
        );
        Ok(())
    }

    pub fn remove_child(&mut self, parent: DomNodeId, child: DomNodeId) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        let previous = self.previous_sibling(child);
        let next = self.next_sibling(child);

        self.node_mut(parent)?.children.retain(|c| *c != child);
        self.node_mut(child)?.parent = None;

        self.record(
            MutationRecord::child_list(parent, Vec::new(), vec![child]).with_siblings(previous, next),
        );
        Ok(())
    }

    /// Detach `id` from its parent, if any
    pub fn remove(&mut self, id: DomNodeId) -> Result<(), DomError> {
        match self.parent(id) {
            Some(parent) => self.remove_child(parent, id),
            None => self.check_exists(id),
        }
    }

    /// Put `new` where `old` is
    pub fn replace_child(&mut self, parent: DomNodeId, new: DomNodeId, old: DomNodeId) -> Result<(), DomError> {
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(());
        }
        self.insert_before(parent, new, Some(old))?;
        self.remove_child(parent, old)
    }

    pub fn set_attribute(&mut self, id: DomNodeId, name: &str, value: &str) -> Result<(), DomError> {
        let attributes = self.attributes_mut(id)?;
        let old = attributes.insert(name.to_string(), value.to_string());
        self.record(MutationRecord::attributes(id, name, Some(value.to_string()), old));
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: DomNodeId, name: &str) -> Result<(), DomError> {
        let attributes = self.attributes_mut(id)?;
        if let Some(old) = attributes.remove(name) {
            self.record(MutationRecord::attributes(id, name, None, Some(old)));
        }
        Ok(())
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, id: DomNodeId, content: &str) -> Result<(), DomError> {
        let old = match &mut self.node_mut(id)?.data {
            DomNodeData::Text { content: current } => std::mem::replace(current, content.to_string()),
            DomNodeData::Element { .. } => return Err(DomError::NotText { node: id }),
        };
        self.record(MutationRecord::character_data(id, content, Some(old)));
        Ok(())
    }

    /// Drop a detached subtree from the arena
    pub fn release(&mut self, id: DomNodeId) {
        if id == self.body || self.parent(id).is_some() {
            return;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
            }
        }
    }

    // ---- mutation records ----

    /// Drain queued mutation records (`MutationObserver.takeRecords`)
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn pending_records(&self) -> &[MutationRecord] {
        &self.records
    }

    /// Replay a record produced by another DOM with the same node ids
    pub fn apply_record(&mut self, record: &MutationRecord) -> Result<(), DomError> {
        match record.kind {
            MutationKind::Attributes => {
                let name = record.name.as_deref().unwrap_or_default();
                match &record.value {
                    Some(value) => self.set_attribute(record.target, name, value),
                    None => self.remove_attribute(record.target, name),
                }
            }
            MutationKind::CharacterData => {
                let text = record.text_content.as_deref().unwrap_or_default();
                self.set_text(record.target, text)
            }
            MutationKind::ChildList => {
                for removed in &record.removed_nodes {
                    if self.parent(*removed) == Some(record.target) {
                        self.remove_child(record.target, *removed)?;
                    }
                }
                let reference = record
                    .next_sibling
                    .filter(|next| self.parent(*next) == Some(record.target));
                for added in &record.added_nodes {
                    self.insert_before(record.target, *added, reference)?;
                }
                Ok(())
            }
        }
    }

    // ---- snapshots ----

    /// Structural copy of the subtree at `id`
    pub fn snapshot(&self, id: DomNodeId) -> Option<DomSnapshot> {
        match self.data(id)? {
            DomNodeData::Text { content } => Some(DomSnapshot::text(content.clone())),
            DomNodeData::Element { tag, attributes } => {
                let children = self
                    .children(id)
                    .iter()
                    .filter_map(|child| self.snapshot(*child))
                    .collect();
                Some(DomSnapshot::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                    children,
                })
            }
        }
    }

    /// Build detached nodes from a snapshot
    pub fn instantiate(&mut self, snapshot: &DomSnapshot) -> DomNodeId {
        match snapshot {
            DomSnapshot::Text { content } => self.create_text(content.clone()),
            DomSnapshot::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.alloc(DomNodeData::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                });
                for child in children {
                    let child_id = self.instantiate(child);
                    // Fresh, detached nodes: attaching cannot fail.
                    if let Ok(node) = self.node_mut(child_id) {
                        node.parent = Some(id);
                    }
                    if let Ok(node) = self.node_mut(id) {
                        node.children.push(child_id);
                    }
                }
                id
            }
        }
    }

    pub fn to_html(&self, id: DomNodeId) -> String {
        self.snapshot(id).map(|s| s.to_html()).unwrap_or_default()
    }

    fn alloc(&mut self, data: DomNodeData) -> DomNodeId {
        let id = DomNodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            DomNode {
                data,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn data(&self, id: DomNodeId) -> Option<&DomNodeData> {
        self.nodes.get(&id).map(|n| &n.data)
    }

    fn collect_text(&self, id: DomNodeId, out: &mut String) {
        match self.data(id) {
            Some(DomNodeData::Text { content }) => out.push_str(content),
            Some(DomNodeData::Element { .. }) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    fn record(&mut self, record: MutationRecord) {
        if self.is_connected(record.target) {
            trace!(kind = ?record.kind, target = %record.target, "Queued mutation record");
            self.records.push(record);
        }
    }

    fn check_exists(&self, id: DomNodeId) -> Result<(), DomError> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(DomError::NodeNotFound(id))
        }
    }

    fn check_element(&self, id: DomNodeId) -> Result<(), DomError> {
        match self.data(id) {
            Some(DomNodeData::Element { .. }) => Ok(()),
            Some(DomNodeData::Text { .. }) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::NodeNotFound(id)),
        }
    }

    fn attributes_mut(&mut self, id: DomNodeId) -> Result<&mut BTreeMap<String, String>, DomError> {
        match &mut self.node_mut(id)?.data {
            DomNodeData::Element { attributes, .. } => Ok(attributes),
            DomNodeData::Text { .. } => Err(DomError::NotAnElement(id)),
        }
    }

    fn node_mut(&mut self, id: DomNodeId) -> Result<&mut DomNode, DomError> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomNode {
    pub fn parent(&self) -> Option<DomNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[DomNodeId] {
        &self.children
    }
}
