//! # Outbound Engine
//!
//! Keeps the live DOM in step with the tree after each commit.
//!
//! ## Redraw
//!
//! ```text
//! changed ids ──► redraw roots ──► fresh render ──► patch live ──► mapping
//!                 (owned elements,   (detached       (by position)
//!                  nested dropped)    fragment)
//! ```
//!
//! A redraw root is the nearest ancestor-or-self that alone owns one
//! element. Characters never qualify, so a run is always re-rendered whole
//! by its container and merges the way a full render would. Its subtree is rendered in a new pass and the result is patched
//! onto the live element: same tag keeps the node and syncs attributes, text
//! nodes take the new data, anything else is replaced. Fresh outputs that
//! were patched onto live nodes are translated to the surviving ids before
//! the pass locations are merged into the mapping.
//!
//! Nodes outside the redraw roots are never touched, so focus and selection
//! held by untouched DOM survive.

use crate::mapping::{self, DomMapping};
use crate::{SyncError, SyncResult};
use scribe_dom::{Dom, DomNodeId};
use scribe_render::{dom::DomBackend, FormatId, RendererRegistry};
use scribe_tree::{DocumentTree, NodeId};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// What a redraw touched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Redraw {
    /// Subtrees re-rendered, shallowest first
    pub roots: Vec<NodeId>,
    /// Changed ids that did not resolve to a tree node
    pub skipped: Vec<NodeId>,
}

pub struct OutboundEngine {
    format: FormatId,
    mount: Option<DomNodeId>,
}

impl OutboundEngine {
    pub fn new(format: impl Into<FormatId>) -> Self {
        Self {
            format: format.into(),
            mount: None,
        }
    }

    pub fn format(&self) -> &FormatId {
        &self.format
    }

    /// Live element rendered for the tree root
    pub fn mount_point(&self) -> Option<DomNodeId> {
        self.mount
    }

    /// Render the whole tree and append it to `host`
    ///
    /// Mounting again replaces the previous rendering.
    #[instrument(level = "debug", skip_all, fields(format = %self.format, host = %host))]
    pub fn mount(
        &mut self,
        registry: &RendererRegistry<DomBackend>,
        tree: &DocumentTree,
        dom: &mut Dom,
        mapping: &mut DomMapping,
        host: DomNodeId,
    ) -> SyncResult<DomNodeId> {
        if let Some(previous) = self.mount.take() {
            dom.remove(previous)?;
            dom.release(previous);
        }
        mapping.clear();

        let engine = registry.engine(self.format.as_str())?;
        let output = engine.render_detached(tree, dom, &[tree.root()])?;
        let root = *output
            .renderings
            .get(&tree.root())
            .ok_or(SyncError::NotMounted)?;
        dom.append_child(host, root)?;

        mapping.absorb(output.locations);
        self.mount = Some(root);
        info!(root = %root, outputs = mapping.len(), "Mounted document");
        Ok(root)
    }

    /// Patch the live DOM for the nodes changed by the last commit
    ///
    /// Ids that no longer resolve are logged and skipped.
    #[instrument(level = "debug", skip_all, fields(format = %self.format, changed = changed.len()))]
    pub fn redraw(
        &mut self,
        registry: &RendererRegistry<DomBackend>,
        tree: &DocumentTree,
        dom: &mut Dom,
        mapping: &mut DomMapping,
        changed: &[NodeId],
    ) -> SyncResult<Redraw> {
        if self.mount.is_none() {
            return Err(SyncError::NotMounted);
        }
        let engine = registry.engine(self.format.as_str())?;

        let mut report = Redraw::default();
        let mut roots: BTreeMap<NodeId, DomNodeId> = BTreeMap::new();
        for id in changed {
            match self.redraw_root(tree, dom, mapping, *id) {
                Some((node, element)) => {
                    roots.insert(node, element);
                }
                None => {
                    warn!(node = %id, "Skipping redraw of unknown node");
                    report.skipped.push(*id);
                }
            }
        }

        let mut ordered: Vec<(NodeId, DomNodeId)> = roots.into_iter().collect();
        ordered.sort_by_key(|(node, _)| tree.depth(*node));
        let mut collapsed: Vec<(NodeId, DomNodeId)> = Vec::new();
        for (node, element) in ordered {
            if !collapsed
                .iter()
                .any(|(root, _)| tree.is_ancestor_or_self(*root, node))
            {
                collapsed.push((node, element));
            }
        }

        for (node, live) in collapsed {
            for stale in mapping::dom_subtree(dom, live) {
                mapping.remove_output(&stale);
            }

            let output = engine.render_detached(tree, dom, &[node])?;
            let fresh = *output
                .renderings
                .get(&node)
                .ok_or(SyncError::NotMounted)?;

            let mut translation = HashMap::new();
            let survivor = patch(dom, live, fresh, &mut translation)?;
            if survivor != fresh {
                dom.release(fresh);
            }
            if self.mount == Some(live) {
                self.mount = Some(survivor);
            }

            mapping.absorb(
                output
                    .locations
                    .map_outputs(|o| translation.get(o).copied().unwrap_or(*o)),
            );
            debug!(root = %node, live = %survivor, "Redrew subtree");
            report.roots.push(node);
        }

        mapping::prune(mapping, tree, dom);
        if !report.roots.is_empty() {
            info!(roots = report.roots.len(), skipped = report.skipped.len(), "Redraw complete");
        }
        Ok(report)
    }

    /// Nearest non-character ancestor-or-self of `id` owning one live element
    fn redraw_root(
        &self,
        tree: &DocumentTree,
        dom: &Dom,
        mapping: &DomMapping,
        id: NodeId,
    ) -> Option<(NodeId, DomNodeId)> {
        if !tree.contains(id) {
            return None;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = mapping::owned_element(mapping, tree, dom, node) {
                if dom.is_connected(element) {
                    return Some((node, element));
                }
            }
            current = tree.parent(node);
        }
        None
    }
}

/// Make `live` look like `fresh`, returning the node now in `live`'s place
///
/// `translation` receives fresh → live for every fresh node whose role was
/// taken over by an existing live node.
fn patch(
    dom: &mut Dom,
    live: DomNodeId,
    fresh: DomNodeId,
    translation: &mut HashMap<DomNodeId, DomNodeId>,
) -> SyncResult<DomNodeId> {
    if let (Some(current), Some(next)) = (dom.text(live), dom.text(fresh)) {
        if current != next {
            let next = next.to_string();
            dom.set_text(live, &next)?;
        }
        translation.insert(fresh, live);
        return Ok(live);
    }

    let same_tag = matches!((dom.tag(live), dom.tag(fresh)), (Some(a), Some(b)) if a == b);
    if !same_tag {
        if let Some(parent) = dom.parent(live) {
            dom.replace_child(parent, fresh, live)?;
        }
        dom.release(live);
        return Ok(fresh);
    }

    sync_attributes(dom, live, fresh)?;

    let live_children = dom.children(live).to_vec();
    let fresh_children = dom.children(fresh).to_vec();
    for index in 0..live_children.len().max(fresh_children.len()) {
        match (live_children.get(index), fresh_children.get(index)) {
            (Some(l), Some(f)) => {
                patch(dom, *l, *f, translation)?;
            }
            (None, Some(f)) => dom.append_child(live, *f)?,
            (Some(l), None) => {
                dom.remove_child(live, *l)?;
                dom.release(*l);
            }
            (None, None) => {}
        }
    }

    translation.insert(fresh, live);
    Ok(live)
}

fn sync_attributes(dom: &mut Dom, live: DomNodeId, fresh: DomNodeId) -> SyncResult<()> {
    let current = dom.attributes(live).cloned().unwrap_or_default();
    let next = dom.attributes(fresh).cloned().unwrap_or_default();

    for name in current.keys().filter(|name| !next.contains_key(*name)) {
        dom.remove_attribute(live, name)?;
    }
    for (name, value) in &next {
        if current.get(name) != Some(value) {
            dom.set_attribute(live, name, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_render::dom::{self, TagTable};
    use scribe_tree::{kinds, NodeSpec};

    struct Fixture {
        registry: RendererRegistry<DomBackend>,
        tree: DocumentTree,
        dom: Dom,
        mapping: DomMapping,
        outbound: OutboundEngine,
    }

    impl Fixture {
        fn new(specs: Vec<NodeSpec>) -> Self {
            Self::mounted(DocumentTree::from_specs(specs).unwrap())
        }

        fn mounted(tree: DocumentTree) -> Self {
            let mut registry = RendererRegistry::new();
            registry.add_engine(dom::DOM, &[]).unwrap();
            dom::register_stock_renderers(&mut registry, dom::DOM, TagTable::default(), "span").unwrap();

            let mut fixture = Self {
                registry,
                tree,
                dom: Dom::new(),
                mapping: DomMapping::new(),
                outbound: OutboundEngine::new(dom::DOM),
            };
            let body = fixture.dom.body();
            fixture
                .outbound
                .mount(&fixture.registry, &fixture.tree, &mut fixture.dom, &mut fixture.mapping, body)
                .unwrap();
            fixture.dom.take_records();
            fixture
        }

        fn commit(&mut self) -> Redraw {
            let commit = self.tree.commit();
            self.outbound
                .redraw(&self.registry, &self.tree, &mut self.dom, &mut self.mapping, &commit.changed)
                .unwrap()
        }

        fn html(&self) -> String {
            self.dom.to_html(self.dom.body())
        }

        /// Located node lists in DOM pre-order below the body
        fn locations(&self) -> Vec<Option<Vec<NodeId>>> {
            mapping::dom_subtree(&self.dom, self.dom.body())
                .iter()
                .map(|output| self.mapping.nodes(output).map(<[NodeId]>::to_vec))
                .collect()
        }

        /// Live DOM and mapping equal a fresh mount of the current tree
        fn assert_matches_fresh_mount(&self) {
            let fresh = Fixture::mounted(self.tree.clone());
            let body = self.dom.body();

            assert_eq!(self.dom.snapshot(body), fresh.dom.snapshot(fresh.dom.body()));
            assert_eq!(self.locations(), fresh.locations());
            assert_eq!(self.mapping.len(), fresh.mapping.len());
        }
    }

    #[test]
    fn test_mount_renders_tree() {
        let fixture = Fixture::new(vec![NodeSpec::new(kinds::PARAGRAPH).with_text("hi")]);
        assert_eq!(fixture.html(), "<body><div><p>hi</p></div></body>");

        let p = fixture.tree.children(fixture.tree.root())[0];
        let element = mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, p).unwrap();
        assert_eq!(fixture.dom.tag(element), Some("p"));
    }

    #[test]
    fn test_redraw_patches_in_place() {
        let mut fixture = Fixture::new(vec![
            NodeSpec::new(kinds::PARAGRAPH).with_text("ab"),
            NodeSpec::new(kinds::PARAGRAPH).with_text("cd"),
        ]);
        let root = fixture.tree.root();
        let first = fixture.tree.children(root)[0];
        let second = fixture.tree.children(root)[1];
        let second_el = mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, second).unwrap();
        let first_el = mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, first).unwrap();
        let first_text = fixture.dom.children(first_el)[0];

        fixture
            .tree
            .insert(first, 2, &NodeSpec::character('!'))
            .unwrap();
        let report = fixture.commit();

        assert_eq!(report.roots, vec![first]);
        assert_eq!(fixture.html(), "<body><div><p>ab!</p><p>cd</p></div></body>");
        // Live nodes keep their identity.
        assert_eq!(mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, first), Some(first_el));
        assert_eq!(fixture.dom.children(first_el), &[first_text]);
        assert_eq!(mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, second), Some(second_el));

        let chars = fixture.tree.children(first).to_vec();
        assert_eq!(fixture.mapping.nodes(&first_text), Some(chars.as_slice()));
    }

    #[test]
    fn test_redraw_formatting_change_wraps_run() {
        let mut fixture = Fixture::new(vec![NodeSpec::new(kinds::PARAGRAPH).with_text("ab")]);
        let p = fixture.tree.children(fixture.tree.root())[0];
        let b = fixture.tree.children(p)[1];

        fixture.tree.set_attribute(b, "bold", "true").unwrap();
        let report = fixture.commit();

        assert_eq!(report.roots, vec![p]);
        assert_eq!(
            fixture.html(),
            r#"<body><div><p>a<span bold="true">b</span></p></div></body>"#
        );
        let outputs = fixture.mapping.outputs(b);
        assert_eq!(outputs.len(), 2);
        assert!(outputs.iter().all(|o| fixture.dom.is_connected(*o)));
    }

    #[test]
    fn test_unformatting_a_character_remerges_the_run() {
        let mut fixture = Fixture::new(vec![NodeSpec::new(kinds::PARAGRAPH)
            .with_text("a")
            .with_child(NodeSpec::character('b').with_attr("bold", "true"))
            .with_text("c")]);
        let p = fixture.tree.children(fixture.tree.root())[0];
        let b = fixture.tree.children(p)[1];
        assert_eq!(mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, b), None);

        fixture.tree.remove_attribute(b, "bold").unwrap();
        let report = fixture.commit();

        assert_eq!(report.roots, vec![p]);
        assert_eq!(fixture.html(), "<body><div><p>abc</p></div></body>");
        let p_el = mapping::owned_element(&fixture.mapping, &fixture.tree, &fixture.dom, p).unwrap();
        let text = fixture.dom.children(p_el)[0];
        assert_eq!(fixture.dom.children(p_el).len(), 1);
        assert_eq!(fixture.mapping.nodes(&text), Some(fixture.tree.children(p)));
        fixture.assert_matches_fresh_mount();
    }

    #[test]
    fn test_redraws_match_fresh_mount() {
        let mut fixture = Fixture::new(vec![
            NodeSpec::new(kinds::PARAGRAPH).with_text("xyz"),
            NodeSpec::new("quote").with_child(NodeSpec::new(kinds::PARAGRAPH).with_text("q")),
        ]);
        let root = fixture.tree.root();
        let first = fixture.tree.children(root)[0];
        let quote = fixture.tree.children(root)[1];
        let chars = fixture.tree.children(first).to_vec();

        // Format the middle character, then the last one, then clear both.
        fixture.tree.set_attribute(chars[1], "bold", "true").unwrap();
        fixture.commit();
        fixture.assert_matches_fresh_mount();

        fixture.tree.set_attribute(chars[2], "bold", "true").unwrap();
        fixture.commit();
        fixture.assert_matches_fresh_mount();
        assert_eq!(
            fixture.html(),
            r#"<body><div><p>x<span bold="true">yz</span></p><blockquote><p>q</p></blockquote></div></body>"#
        );

        fixture.tree.remove_attribute(chars[1], "bold").unwrap();
        fixture.tree.remove_attribute(chars[2], "bold").unwrap();
        fixture.tree.move_node(first, quote, 1).unwrap();
        fixture.commit();
        fixture.assert_matches_fresh_mount();

        fixture.tree.set_text(chars[0], 'w').unwrap();
        fixture.tree.remove(chars[2]).unwrap();
        fixture.commit();
        fixture.assert_matches_fresh_mount();
        assert_eq!(
            fixture.html(),
            "<body><div><blockquote><p>q</p><p>wy</p></blockquote></div></body>"
        );
    }

    #[test]
    fn test_nested_roots_collapse() {
        let mut fixture = Fixture::new(vec![NodeSpec::new("quote")
            .with_child(NodeSpec::new(kinds::PARAGRAPH).with_text("x"))]);
        let quote = fixture.tree.children(fixture.tree.root())[0];
        let p = fixture.tree.children(quote)[0];

        fixture.tree.set_attribute(quote, "cite", "me").unwrap();
        fixture.tree.set_attribute(p, "align", "left").unwrap();
        let report = fixture.commit();

        assert_eq!(report.roots, vec![quote]);
        assert_eq!(
            fixture.html(),
            r#"<body><div><blockquote cite="me"><p align="left">x</p></blockquote></div></body>"#
        );
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let mut fixture = Fixture::new(vec![NodeSpec::new(kinds::PARAGRAPH)]);
        let report = fixture
            .outbound
            .redraw(
                &fixture.registry,
                &fixture.tree,
                &mut fixture.dom,
                &mut fixture.mapping,
                &[NodeId(999)],
            )
            .unwrap();

        assert!(report.roots.is_empty());
        assert_eq!(report.skipped, vec![NodeId(999)]);
    }

    #[test]
    fn test_untouched_dom_survives() {
        let mut fixture = Fixture::new(vec![NodeSpec::new(kinds::PARAGRAPH).with_text("a")]);
        let body = fixture.dom.body();
        let sidebar = fixture.dom.create_element("aside");
        fixture.dom.append_child(body, sidebar).unwrap();

        let p = fixture.tree.children(fixture.tree.root())[0];
        fixture.tree.remove(p).unwrap();
        fixture.commit();

        assert_eq!(fixture.html(), "<body><div></div><aside></aside></body>");
        assert_eq!(fixture.dom.children(body)[1], sidebar);
        assert!(fixture.mapping.outputs(p).is_empty());
    }

    #[test]
    fn test_redraw_before_mount_fails() {
        let registry: RendererRegistry<DomBackend> = RendererRegistry::new();
        let tree = DocumentTree::new();
        let mut outbound = OutboundEngine::new(dom::DOM);
        let result = outbound.redraw(&registry, &tree, &mut Dom::new(), &mut DomMapping::new(), &[]);
        assert_eq!(result, Err(SyncError::NotMounted));
    }
}
