//! Tests for recording and replaying DOM changes
//!
//! This tests:
//! - Record batches replayed on a replica through JSON
//! - Snapshot instantiation and normalization
//! - Error reporting for invalid tree operations

use scribe_dom::{Dom, DomError, DomSnapshot, MutationKind, MutationRecord};

fn page() -> Dom {
    let snapshot = DomSnapshot::element("div")
        .with_child(DomSnapshot::element("p").with_child(DomSnapshot::text("one")))
        .with_child(DomSnapshot::element("p").with_child(DomSnapshot::text("two")));
    let mut dom = Dom::new();
    let root = dom.instantiate(&snapshot);
    let body = dom.body();
    dom.append_child(body, root).unwrap();
    dom.take_records();
    dom
}

#[test]
fn test_editing_session_replays_through_json() {
    let mut dom = page();
    let body = dom.body();
    let root = dom.children(body)[0];
    let first = dom.children(root)[0];
    let second = dom.children(root)[1];
    let text = dom.children(first)[0];
    let mut replica = dom.clone();

    dom.set_text(text, "one!").unwrap();
    dom.set_attribute(second, "class", "lead").unwrap();
    dom.insert_before(root, second, Some(first)).unwrap();
    dom.remove_attribute(second, "class").unwrap();
    dom.remove_child(first, text).unwrap();

    let json = serde_json::to_string(&dom.take_records()).unwrap();
    let records: Vec<MutationRecord> = serde_json::from_str(&json).unwrap();
    let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MutationKind::CharacterData,
            MutationKind::Attributes,
            MutationKind::ChildList,
            MutationKind::ChildList,
            MutationKind::Attributes,
            MutationKind::ChildList,
        ]
    );

    for record in &records {
        replica.apply_record(record).unwrap();
    }
    assert_eq!(replica.snapshot(body), dom.snapshot(body));
    assert_eq!(dom.to_html(root), "<div><p>two</p><p></p></div>");
}

#[test]
fn test_instantiated_snapshot_round_trips() {
    let snapshot = DomSnapshot::element("p")
        .with_attr("align", "center")
        .with_child(DomSnapshot::text("a"))
        .with_child(DomSnapshot::element("span").with_attr("bold", "true").with_child(DomSnapshot::text("b")));

    let mut dom = Dom::new();
    let id = dom.instantiate(&snapshot);
    assert_eq!(dom.snapshot(id), Some(snapshot.clone()));
    assert_eq!(dom.parent(id), None);
    assert!(!dom.is_connected(id));
    assert_eq!(dom.text_content(id), "ab");
}

#[test]
fn test_split_text_normalizes_to_one_node() {
    let mut dom = page();
    let root = dom.children(dom.body())[0];
    let first = dom.children(root)[0];
    let tail = dom.create_text("!");
    let empty = dom.create_text("");
    dom.append_child(first, empty).unwrap();
    dom.append_child(first, tail).unwrap();

    let normalized = dom.snapshot(first).unwrap().normalized();
    assert_eq!(
        normalized,
        DomSnapshot::element("p").with_child(DomSnapshot::text("one!"))
    );
    assert_eq!(dom.children(first).len(), 3);
}

#[test]
fn test_invalid_operations_are_errors() {
    let mut dom = page();
    let root = dom.children(dom.body())[0];
    let first = dom.children(root)[0];
    let second = dom.children(root)[1];
    let text = dom.children(first)[0];

    assert_eq!(
        dom.append_child(text, second),
        Err(DomError::NotAnElement(text))
    );
    assert_eq!(
        dom.remove_child(second, text),
        Err(DomError::NotAChild {
            parent: second,
            child: text
        })
    );
    assert_eq!(dom.set_text(first, "x"), Err(DomError::NotText { node: first }));
    assert!(dom.take_records().is_empty());
}
