//! Mutation records
//!
//! Shape follows the browser's `MutationRecord` so a batch captured from a
//! live page and a batch produced by [`crate::Dom`] can be fed to the same
//! translator. Records serialize to JSON for replaying recorded sessions.

use crate::DomNodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Attributes,
    CharacterData,
    ChildList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    #[serde(rename = "type")]
    pub kind: MutationKind,
    pub target: DomNodeId,
    /// Attribute name (attributes records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New attribute value; `None` when the attribute was removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    /// New text data (characterData records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_nodes: Vec<DomNodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_nodes: Vec<DomNodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sibling: Option<DomNodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sibling: Option<DomNodeId>,
}

impl MutationRecord {
    fn empty(kind: MutationKind, target: DomNodeId) -> Self {
        Self {
            kind,
            target,
            name: None,
            value: None,
            old_value: None,
            text_content: None,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
        }
    }

    pub fn attributes(
        target: DomNodeId,
        name: impl Into<String>,
        value: Option<String>,
        old_value: Option<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            value,
            old_value,
            ..Self::empty(MutationKind::Attributes, target)
        }
    }

    pub fn character_data(target: DomNodeId, text: impl Into<String>, old_value: Option<String>) -> Self {
        Self {
            text_content: Some(text.into()),
            old_value,
            ..Self::empty(MutationKind::CharacterData, target)
        }
    }

    pub fn child_list(target: DomNodeId, added: Vec<DomNodeId>, removed: Vec<DomNodeId>) -> Self {
        Self {
            added_nodes: added,
            removed_nodes: removed,
            ..Self::empty(MutationKind::ChildList, target)
        }
    }

    pub fn with_siblings(mut self, previous: Option<DomNodeId>, next: Option<DomNodeId>) -> Self {
        self.previous_sibling = previous;
        self.next_sibling = next;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let record = MutationRecord::attributes(DomNodeId(4), "class", Some("a b".into()), None);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"type":"attributes","target":4,"name":"class","value":"a b"}"#);

        let parsed: MutationRecord = serde_json::from_str(
            r#"{"type":"childList","target":1,"addedNodes":[7],"nextSibling":3}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, MutationKind::ChildList);
        assert_eq!(parsed.added_nodes, vec![DomNodeId(7)]);
        assert_eq!(parsed.next_sibling, Some(DomNodeId(3)));
        assert!(parsed.removed_nodes.is_empty());
    }
}
