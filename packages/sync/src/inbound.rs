//! # Inbound Translator
//!
//! Turns DOM mutations into tree edits.
//!
//! ## Transactions
//!
//! Mutations are captured between [`InboundTranslator::begin`] and
//! [`InboundTranslator::end`]. Transactions nest: an inner `begin` widens the
//! scope to the common ancestor of both scopes, and only the outermost `end`
//! translates. One logical action therefore yields one edit set no matter how
//! many nested helpers touched the DOM.
//!
//! ## Translation
//!
//! ```text
//! records ──► filter (in scope, under tracked DOM)
//!         ──► coalesce: attribute names per element, dirty containers
//!         ──► plan every dirty container (claims existing nodes)
//!         ──► execute plans shallowest first: Move / Insert / SetText / Remove
//!         ──► attribute diffs: SetAttribute / RemoveAttribute
//! ```
//!
//! Planning reads the DOM children of a container and describes the tree
//! children it should end up with. Tracked elements become claims on their
//! existing node, so content moved between containers is relocated rather
//! than recreated. Text runs are diffed by common prefix and suffix; only the
//! middle is rewritten. A run takes its formatting from where it now sits:
//! the attributes of its wrapper, or none for bare text. Kept characters
//! whose attributes differ from that are updated in place.
//!
//! A run that was both moved and edited in one transaction is matched
//! against its old characters in its new place. The result is correct but not
//! always the smallest possible edit set.

use crate::mapping::{self, DomMapping, Represents};
use crate::SyncResult;
use scribe_dom::{Dom, DomNodeId, MutationKind, MutationRecord};
use scribe_render::dom::TagTable;
use scribe_tree::{DocumentTree, NodeId, NodeSpec, TreeEdit};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, instrument, trace, warn};

type Attributes = BTreeMap<String, String>;

/// Desired tree child of a container
#[derive(Debug, Clone, PartialEq)]
enum Planned {
    Existing {
        node: NodeId,
        text: Option<char>,
        attributes: Option<Attributes>,
    },
    NewChars { text: String, attributes: Attributes },
    NewElement {
        kind: String,
        attributes: Attributes,
        children: Vec<Planned>,
    },
}

pub struct InboundTranslator {
    tags: TagTable,
    wrapper_tag: String,
    depth: usize,
    scope: Option<DomNodeId>,
}

impl InboundTranslator {
    pub fn new(tags: TagTable, wrapper_tag: impl Into<String>) -> Self {
        Self {
            tags,
            wrapper_tag: wrapper_tag.into(),
            depth: 0,
            scope: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Covering scope of the active transaction
    pub fn scope(&self) -> Option<DomNodeId> {
        self.scope
    }

    /// Open a transaction over `scope`, merging into an active one
    pub fn begin(&mut self, dom: &mut Dom, scope: DomNodeId) {
        if self.depth == 0 {
            let stale = dom.take_records();
            if !stale.is_empty() {
                debug!(records = stale.len(), "Discarding mutations recorded outside a transaction");
            }
            self.scope = Some(scope);
        } else {
            self.scope = self
                .scope
                .and_then(|outer| dom.common_ancestor(outer, scope))
                .or(Some(dom.body()));
        }
        self.depth += 1;
        trace!(depth = self.depth, scope = ?self.scope, "Began mutation transaction");
    }

    /// Close a transaction; the outermost one translates its records
    pub fn end(&mut self, dom: &mut Dom, tree: &mut DocumentTree, mapping: &DomMapping) -> SyncResult<Vec<TreeEdit>> {
        if self.depth == 0 {
            warn!("Ending a mutation transaction that was never begun");
            return Ok(Vec::new());
        }
        self.depth -= 1;
        if self.depth > 0 {
            return Ok(Vec::new());
        }

        let scope = self.scope.take();
        let records = dom.take_records();
        self.translate(&records, scope, dom, tree, mapping)
    }

    /// Close a transaction without translating
    pub fn abort(&mut self, dom: &mut Dom) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.scope = None;
            let dropped = dom.take_records();
            debug!(records = dropped.len(), "Aborted mutation transaction");
        }
    }

    /// Translate `records` and apply the resulting edits to `tree`
    ///
    /// Records outside `scope` or outside tracked DOM are ignored.
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn translate(
        &self,
        records: &[MutationRecord],
        scope: Option<DomNodeId>,
        dom: &Dom,
        tree: &mut DocumentTree,
        mapping: &DomMapping,
    ) -> SyncResult<Vec<TreeEdit>> {
        let mut attributes: BTreeMap<DomNodeId, BTreeSet<String>> = BTreeMap::new();
        let mut containers: BTreeMap<NodeId, DomNodeId> = BTreeMap::new();

        for record in records {
            let in_scope = scope.map_or(true, |scope| dom.contains(scope, record.target));
            if !in_scope || !mapping::is_within_tracked(mapping, dom, record.target) {
                trace!(target = %record.target, kind = ?record.kind, "Ignoring untracked mutation");
                continue;
            }

            match (&record.kind, &record.name) {
                (MutationKind::Attributes, Some(name)) if mapping.is_tracked(&record.target) => {
                    attributes
                        .entry(record.target)
                        .or_default()
                        .insert(name.clone());
                }
                _ => {
                    if let Some((element, node)) =
                        mapping::owning_container(mapping, tree, dom, record.target)
                    {
                        containers.insert(node, element);
                    }
                }
            }
        }

        let mut edits = Vec::new();

        let mut ordered: Vec<(NodeId, DomNodeId)> = containers
            .into_iter()
            .filter(|(_, element)| dom.is_connected(*element))
            .collect();
        ordered.sort_by_key(|(node, _)| tree.depth(*node));

        let mut planner = Planner {
            dom,
            tree: &*tree,
            mapping,
            tags: &self.tags,
            wrapper_tag: &self.wrapper_tag,
            claimed: HashSet::new(),
        };
        let plans: Vec<(NodeId, Vec<Planned>)> = ordered
            .into_iter()
            .map(|(node, element)| (node, planner.plan_children(element)))
            .collect();
        let claimed = planner.claimed;

        for (container, plan) in &plans {
            if tree.contains(*container) {
                execute(tree, *container, plan, &claimed, &mut edits)?;
            }
        }

        for (target, names) in attributes {
            if !dom.is_connected(target) {
                continue;
            }
            let nodes = match mapping::represents(mapping, tree, target) {
                Some(Represents::Node(node)) => vec![node],
                Some(Represents::Run(run)) => run,
                None => continue,
            };
            for node in nodes {
                if !tree.contains(node) {
                    continue;
                }
                for name in &names {
                    let wanted = dom.attribute(target, name);
                    let current = tree.get(node).and_then(|n| n.attribute(name));
                    let edit = match (wanted, current) {
                        (Some(value), current) if current != Some(value) => TreeEdit::SetAttribute {
                            node,
                            name: name.clone(),
                            value: value.to_string(),
                        },
                        (None, Some(_)) => TreeEdit::RemoveAttribute {
                            node,
                            name: name.clone(),
                        },
                        _ => continue,
                    };
                    apply(tree, edit, &mut edits)?;
                }
            }
        }

        debug!(edits = edits.len(), "Translated mutations");
        Ok(edits)
    }
}

struct Planner<'a> {
    dom: &'a Dom,
    tree: &'a DocumentTree,
    mapping: &'a DomMapping,
    tags: &'a TagTable,
    wrapper_tag: &'a str,
    claimed: HashSet<NodeId>,
}

impl Planner<'_> {
    fn plan_children(&mut self, element: DomNodeId) -> Vec<Planned> {
        let mut out = Vec::new();
        for child in self.dom.children(element) {
            self.plan_node(*child, &mut out);
        }
        out
    }

    fn plan_node(&mut self, child: DomNodeId, out: &mut Vec<Planned>) {
        let dom = self.dom;

        if let Some(text) = dom.text(child) {
            match mapping::represents(self.mapping, self.tree, child) {
                Some(Represents::Run(run)) => {
                    // Bare text in a container carries no formatting.
                    self.plan_run(&run, text, Attributes::new(), out);
                }
                _ if text.is_empty() => {}
                _ => out.push(Planned::NewChars {
                    text: text.to_string(),
                    attributes: Attributes::new(),
                }),
            }
            return;
        }

        let attributes = dom.attributes(child).cloned().unwrap_or_default();
        match mapping::represents(self.mapping, self.tree, child) {
            Some(Represents::Node(node)) if !self.claimed.contains(&node) && self.tree.contains(node) => {
                self.claimed.insert(node);
                out.push(Planned::Existing {
                    node,
                    text: None,
                    attributes: None,
                });
            }
            Some(Represents::Run(run)) => {
                self.plan_run(&run, &dom.text_content(child), attributes, out);
            }
            _ => {
                let tag = dom.tag(child).unwrap_or_default();
                if tag == self.wrapper_tag {
                    let text = dom.text_content(child);
                    if !text.is_empty() {
                        out.push(Planned::NewChars { text, attributes });
                    }
                } else {
                    out.push(Planned::NewElement {
                        kind: self.tags.kind_for(tag).to_string(),
                        attributes,
                        children: self.plan_children(child),
                    });
                }
            }
        }
    }

    /// Diff the characters of `run` against `text` by common prefix/suffix
    ///
    /// `attributes` is the formatting the DOM applies to `text`.
    fn plan_run(&mut self, run: &[NodeId], text: &str, attributes: Attributes, out: &mut Vec<Planned>) {
        let old: Vec<(NodeId, char)> = run
            .iter()
            .filter(|id| !self.claimed.contains(*id))
            .filter_map(|id| self.tree.get(*id).and_then(|n| n.value()).map(|v| (*id, v)))
            .collect();
        let new: Vec<char> = text.chars().collect();

        let prefix = old
            .iter()
            .zip(&new)
            .take_while(|(old, new)| old.1 == **new)
            .count();
        let suffix = old[prefix..]
            .iter()
            .rev()
            .zip(new[prefix..].iter().rev())
            .take_while(|(old, new)| old.1 == **new)
            .count();

        let old_middle = &old[prefix..old.len() - suffix];
        let new_middle = &new[prefix..new.len() - suffix];
        let overlap = old_middle.len().min(new_middle.len());

        let tree = self.tree;
        let claimed = &mut self.claimed;
        let mut keep = |node: NodeId, text: Option<char>, out: &mut Vec<Planned>| {
            claimed.insert(node);
            let restyled = tree
                .get(node)
                .is_some_and(|n| *n.attributes() != attributes)
                .then(|| attributes.clone());
            out.push(Planned::Existing {
                node,
                text,
                attributes: restyled,
            });
        };

        for (node, _) in &old[..prefix] {
            keep(*node, None, out);
        }
        for ((node, current), wanted) in old_middle.iter().zip(new_middle).take(overlap) {
            keep(*node, (current != wanted).then_some(*wanted), out);
        }
        if new_middle.len() > overlap {
            out.push(Planned::NewChars {
                text: new_middle[overlap..].iter().collect(),
                attributes: attributes.clone(),
            });
        }
        for (node, _) in &old[old.len() - suffix..] {
            keep(*node, None, out);
        }
    }
}

/// Reshape the children of `container` to match `plan`
fn execute(
    tree: &mut DocumentTree,
    container: NodeId,
    plan: &[Planned],
    claimed: &HashSet<NodeId>,
    edits: &mut Vec<TreeEdit>,
) -> SyncResult<()> {
    let mut index = 0;
    for item in plan {
        match item {
            Planned::Existing {
                node,
                text,
                attributes,
            } => {
                let in_place = tree.parent(*node) == Some(container) && tree.index_of(*node) == Some(index);
                if !in_place {
                    let edit = TreeEdit::Move {
                        node: *node,
                        new_parent: container,
                        index,
                    };
                    apply(tree, edit, edits)?;
                }
                if let Some(value) = text {
                    apply(tree, TreeEdit::SetText { node: *node, value: *value }, edits)?;
                }
                if let Some(wanted) = attributes {
                    restyle(tree, *node, wanted, edits)?;
                }
                index += 1;
            }
            Planned::NewChars { text, attributes } => {
                for value in text.chars() {
                    let node = NodeSpec {
                        attributes: attributes.clone(),
                        ..NodeSpec::character(value)
                    };
                    apply(tree, TreeEdit::Insert { parent: container, index, node }, edits)?;
                    index += 1;
                }
            }
            Planned::NewElement {
                kind,
                attributes,
                children,
            } => {
                let node = NodeSpec {
                    attributes: attributes.clone(),
                    ..NodeSpec::new(kind.as_str())
                };
                let created = apply(tree, TreeEdit::Insert { parent: container, index, node }, edits)?;
                execute(tree, created, children, claimed, edits)?;
                index += 1;
            }
        }
    }

    let leftovers: Vec<NodeId> = tree
        .children(container)
        .iter()
        .skip(index)
        .filter(|node| !claimed.contains(*node))
        .copied()
        .collect();
    for node in leftovers {
        apply(tree, TreeEdit::Remove { node }, edits)?;
    }
    Ok(())
}

/// Make the attributes of `node` equal `wanted`
fn restyle(tree: &mut DocumentTree, node: NodeId, wanted: &Attributes, edits: &mut Vec<TreeEdit>) -> SyncResult<()> {
    let current = tree
        .get(node)
        .map(|n| n.attributes().clone())
        .unwrap_or_default();

    for name in current.keys().filter(|name| !wanted.contains_key(*name)) {
        let edit = TreeEdit::RemoveAttribute {
            node,
            name: name.clone(),
        };
        apply(tree, edit, edits)?;
    }
    for (name, value) in wanted {
        if current.get(name) != Some(value) {
            let edit = TreeEdit::SetAttribute {
                node,
                name: name.clone(),
                value: value.clone(),
            };
            apply(tree, edit, edits)?;
        }
    }
    Ok(())
}

fn apply(tree: &mut DocumentTree, edit: TreeEdit, edits: &mut Vec<TreeEdit>) -> SyncResult<NodeId> {
    let node = edit.apply(tree)?;
    debug!(op = edit.name(), target = %edit.target(), "Applied tree edit");
    edits.push(edit);
    Ok(node)
}
