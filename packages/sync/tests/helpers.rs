//! Session fixtures shared by the integration tests

#![allow(dead_code)]

use scribe_dom::DomNodeId;
use scribe_sync::{logging, mapping, Session, SyncConfig};
use scribe_tree::{DocumentTree, NodeId, NodeSpec};

pub fn mounted(specs: Vec<NodeSpec>) -> Session {
    logging::init();
    let tree = DocumentTree::from_specs(specs).unwrap();
    let mut session = Session::new(tree, SyncConfig::default()).unwrap();
    session.mount().unwrap();
    session
}

pub fn element_for(session: &Session, node: NodeId) -> DomNodeId {
    mapping::owned_element(session.mapping(), session.tree(), session.dom(), node).unwrap()
}

/// Located nodes of every output under the mount, in document order
pub fn locations(session: &Session) -> Vec<Option<Vec<NodeId>>> {
    let mount = session.mount_point().unwrap();
    mapping::dom_subtree(session.dom(), mount)
        .iter()
        .map(|output| session.mapping().nodes(output).map(<[NodeId]>::to_vec))
        .collect()
}

/// The live DOM and mapping must equal what a fresh mount of the current
/// tree produces, text node boundaries included.
pub fn assert_matches_fresh_mount(session: &Session) {
    let mut fresh = Session::new(session.tree().clone(), session.config().clone()).unwrap();
    let fresh_mount = fresh.mount().unwrap();
    let mount = session.mount_point().unwrap();

    assert_eq!(
        session.dom().snapshot(mount).unwrap(),
        fresh.dom().snapshot(fresh_mount).unwrap()
    );
    assert_eq!(locations(session), locations(&fresh));
    assert_eq!(session.mapping().len(), fresh.mapping().len());
}
