//! # Sync Session
//!
//! Owns one document tree, its live DOM and everything that keeps the two in
//! step:
//!
//! - tree edits → [`Session::commit`] → outbound redraw
//! - DOM edits inside [`Session::with_mutations`] → inbound translation →
//!   tree edits → outbound redraw
//!
//! The DOM records produced by a redraw are discarded so they never come back
//! as inbound mutations.

use crate::inbound::InboundTranslator;
use crate::mapping::DomMapping;
use crate::outbound::{OutboundEngine, Redraw};
use crate::selection::{Selection, SelectionMapper, TreeSelection};
use crate::{SyncConfig, SyncError, SyncResult};
use scribe_dom::{Dom, DomNodeId};
use scribe_render::dom::{self, DomBackend};
use scribe_render::RendererRegistry;
use scribe_tree::{DocumentTree, NodeId, TreeEdit};
use tracing::{debug, info, instrument};

pub struct Session {
    config: SyncConfig,
    tree: DocumentTree,
    dom: Dom,
    registry: RendererRegistry<DomBackend>,
    mapping: DomMapping,
    outbound: OutboundEngine,
    inbound: InboundTranslator,
}

impl Session {
    /// Session rendering through the stock DOM renderers
    pub fn new(tree: DocumentTree, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let extends: Vec<&str> = config.extends.iter().map(String::as_str).collect();
        let mut registry = RendererRegistry::new();
        for (index, base) in extends.iter().enumerate().rev() {
            registry.add_engine(*base, &extends[index + 1..])?;
        }
        registry.add_engine(config.format.as_str(), &extends)?;

        // Stock renderers sit at the lowest tier so every engine inherits them.
        let stock_format = extends.last().copied().unwrap_or(config.format.as_str());
        dom::register_stock_renderers(
            &mut registry,
            stock_format,
            config.tags.clone(),
            config.wrapper_tag.as_str(),
        )?;
        Self::with_registry(tree, registry, config)
    }

    /// Session rendering through a caller-provided registry
    ///
    /// The registry must hold an engine for `config.format`.
    pub fn with_registry(
        tree: DocumentTree,
        registry: RendererRegistry<DomBackend>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        registry.engine(config.format.as_str())?;
        Ok(Self {
            outbound: OutboundEngine::new(config.format.as_str()),
            inbound: InboundTranslator::new(config.tags.clone(), config.wrapper_tag.clone()),
            config,
            tree,
            dom: Dom::new(),
            registry,
            mapping: DomMapping::new(),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Mutable DOM access; changes made outside [`Session::with_mutations`]
    /// are not translated
    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn registry(&self) -> &RendererRegistry<DomBackend> {
        &self.registry
    }

    pub fn mapping(&self) -> &DomMapping {
        &self.mapping
    }

    pub fn mount_point(&self) -> Option<DomNodeId> {
        self.outbound.mount_point()
    }

    /// Render the tree into the DOM body
    pub fn mount(&mut self) -> SyncResult<DomNodeId> {
        let body = self.dom.body();
        let root = self
            .outbound
            .mount(&self.registry, &self.tree, &mut self.dom, &mut self.mapping, body)?;
        self.dom.take_records();
        Ok(root)
    }

    /// Apply a tree edit; the DOM follows on the next [`Session::commit`]
    pub fn edit(&mut self, edit: TreeEdit) -> SyncResult<NodeId> {
        let node = edit.apply(&mut self.tree)?;
        debug!(op = edit.name(), target = %edit.target(), "Applied tree edit");
        Ok(node)
    }

    /// Commit pending tree edits and redraw what they touched
    #[instrument(level = "debug", skip_all)]
    pub fn commit(&mut self) -> SyncResult<Redraw> {
        let commit = self.tree.commit();
        let redraw = self.outbound.redraw(
            &self.registry,
            &self.tree,
            &mut self.dom,
            &mut self.mapping,
            &commit.changed,
        )?;
        self.dom.take_records();
        debug!(version = commit.version, roots = redraw.roots.len(), "Committed");
        Ok(redraw)
    }

    /// Run `f` as one mutation transaction over `scope`
    ///
    /// DOM changes made by `f` are translated into tree edits when the
    /// outermost transaction ends; those edits are applied, committed and
    /// returned. Nested calls merge into the enclosing transaction and return
    /// no edits of their own. When `f` fails, its DOM changes are left
    /// untranslated and the error is returned.
    pub fn with_mutations<F>(&mut self, scope: DomNodeId, f: F) -> SyncResult<Vec<TreeEdit>>
    where
        F: FnOnce(&mut Session) -> SyncResult<()>,
    {
        if self.outbound.mount_point().is_none() {
            return Err(SyncError::NotMounted);
        }

        self.inbound.begin(&mut self.dom, scope);
        if let Err(error) = f(self) {
            self.inbound.abort(&mut self.dom);
            return Err(error);
        }

        let edits = self
            .inbound
            .end(&mut self.dom, &mut self.tree, &self.mapping)?;
        if self.inbound.is_active() {
            return Ok(Vec::new());
        }

        if !edits.is_empty() {
            self.commit()?;
            info!(edits = edits.len(), "Applied DOM mutations");
        }
        Ok(edits)
    }

    /// Whether a mutation transaction is open
    pub fn in_transaction(&self) -> bool {
        self.inbound.is_active()
    }

    pub fn selection(&self) -> SelectionMapper<'_> {
        SelectionMapper::new(&self.tree, &self.dom, &self.mapping)
    }

    pub fn to_tree_selection(&self, selection: &Selection) -> Option<TreeSelection> {
        self.selection().to_tree_selection(selection)
    }

    pub fn to_dom_selection(&self, selection: &TreeSelection) -> Option<Selection> {
        self.selection().to_dom_selection(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_tree::{kinds, NodeSpec};

    fn session(specs: Vec<NodeSpec>) -> Session {
        let tree = DocumentTree::from_specs(specs).unwrap();
        let mut session = Session::new(tree, SyncConfig::default()).unwrap();
        session.mount().unwrap();
        session
    }

    #[test]
    fn test_edit_and_commit_redraws() {
        let mut session = session(vec![NodeSpec::new(kinds::PARAGRAPH).with_text("a")]);
        let root = session.tree().root();

        session
            .edit(TreeEdit::Insert {
                parent: root,
                index: 1,
                node: NodeSpec::new(kinds::PARAGRAPH).with_text("b"),
            })
            .unwrap();
        session.commit().unwrap();

        let mount = session.mount_point().unwrap();
        assert_eq!(session.dom().to_html(mount), "<div><p>a</p><p>b</p></div>");
        assert!(session.dom().pending_records().is_empty());
    }

    #[test]
    fn test_mutations_before_mount_fail() {
        let tree = DocumentTree::from_specs([NodeSpec::new(kinds::PARAGRAPH)]).unwrap();
        let mut session = Session::new(tree, SyncConfig::default()).unwrap();
        let body = session.dom().body();
        let result = session.with_mutations(body, |_| Ok(()));
        assert_eq!(result, Err(SyncError::NotMounted));
    }

    #[test]
    fn test_failed_callback_aborts_transaction() {
        let mut session = session(vec![NodeSpec::new(kinds::PARAGRAPH).with_text("a")]);
        let mount = session.mount_point().unwrap();

        let result = session.with_mutations(mount, |s| {
            let p = s.dom().children(mount)[0];
            s.dom_mut().set_attribute(p, "class", "x")?;
            Err(SyncError::Config("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(!session.in_transaction());
        let p = session.tree().children(session.tree().root())[0];
        assert_eq!(session.tree().get(p).unwrap().attribute("class"), None);
    }

    #[test]
    fn test_extended_format_inherits_stock_renderers() {
        let config = SyncConfig {
            format: "dom/html".to_string(),
            extends: vec!["dom".to_string()],
            ..SyncConfig::default()
        };
        let tree = DocumentTree::from_specs([NodeSpec::new(kinds::PARAGRAPH).with_text("a")]).unwrap();
        let mut session = Session::new(tree, config).unwrap();
        let mount = session.mount().unwrap();

        assert_eq!(session.dom().to_html(mount), "<div><p>a</p></div>");
        let names: Vec<_> = session.registry().engine("dom/html").unwrap().names().collect();
        assert_eq!(names, vec!["dom-characters", "dom-element"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SyncConfig {
            wrapper_tag: String::new(),
            ..SyncConfig::default()
        };
        let result = Session::new(DocumentTree::new(), config);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
