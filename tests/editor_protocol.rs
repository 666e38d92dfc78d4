//! Integration tests for the cursor-based editor
//!
//! These tests drive the editor the way a front end would:
//! - Creating objects under tree cursors
//! - Removing objects and inspecting what went with them
//! - Undo/redo across structural edits

mod common;

use common::{assert_tree_consistent, builders::pipeline_documents, editor};
use signalgraph_rs::model::NewImplementation;
use signalgraph_rs::tree::{Cursor, EditableObject, Permissions};
use signalgraph_rs::{Direction, EditError, NewObject};

fn cursor(s: &str) -> Cursor {
    s.parse().unwrap()
}

fn port_type(name: &str, direction: Direction) -> NewObject {
    NewObject::PortType {
        name: name.to_string(),
        direction,
        signal_type: "s1".to_string(),
    }
}

#[test]
fn test_build_pipeline_through_editor() {
    let mut ed = editor();
    let lib = ed.new_library("base.json").unwrap();
    let sg = ed.new_signal_graph("main.json").unwrap();
    assert_eq!(lib, cursor("0"));
    assert_eq!(sg, cursor("1"));

    ed.add_new_object(&lib, NewObject::signal_type("s1")).unwrap();
    let test = ed
        .add_new_object(&lib, NewObject::NodeType { name: "Test".into() })
        .unwrap();
    assert_eq!(test, cursor("0:1"));
    let pin = ed.add_new_object(&test, port_type("in", Direction::In)).unwrap();
    let pout = ed.add_new_object(&test, port_type("out", Direction::Out)).unwrap();
    assert_eq!(pin, cursor("0:1:0"));
    assert_eq!(pout, cursor("0:1:1"));

    let sensor = ed
        .add_new_object(
            &sg,
            NewObject::InputNode {
                name: "sensor".into(),
                signal_type: "s1".into(),
            },
        )
        .unwrap();
    let node = ed
        .add_new_object(
            &sg,
            NewObject::Node {
                name: "test".into(),
                node_type: "Test".into(),
            },
        )
        .unwrap();
    assert_eq!(sensor, cursor("1:0"));
    assert_eq!(node, cursor("1:1"));

    // sensor.out -> test.in, addressed from the input side
    let conn = ed
        .add_new_object(
            &cursor("1:1:0"),
            NewObject::Connection {
                peer: cursor("1:0:0"),
            },
        )
        .unwrap();
    assert_eq!(conn, cursor("1:1:0:0"));
    assert!(matches!(
        ed.tree().object_at(&cursor("1:0:0:0")),
        Some(EditableObject::Connection(_))
    ));
    assert_tree_consistent(ed.model());
}

#[test]
fn test_permissions_follow_object_kind() {
    let mut ed = editor();
    let (lib_doc, graph_doc) = pipeline_documents();
    ed.open_library(&lib_doc).unwrap();
    ed.open_signal_graph(&graph_doc).unwrap();

    let perms = |s: &str| {
        let id = ed.tree().resolve(&cursor(s)).unwrap();
        ed.tree().permissions(id).unwrap()
    };
    // base.json: s1, s2, Test(in, out, impl)
    assert_eq!(perms("0"), Permissions::new(true, true, false));
    assert_eq!(perms("0:0"), Permissions::new(false, true, true));
    assert_eq!(perms("0:2"), Permissions::new(true, true, true));
    // Elementary implementations take no children
    assert_eq!(perms("0:2:2"), Permissions::new(false, true, true));
    // main.json: sensor, test, actuator
    assert_eq!(perms("1:1"), Permissions::new(false, true, true));
    assert_eq!(perms("1:1:0"), Permissions::new(true, false, false));
    assert_eq!(perms("1:1:0:0"), Permissions::new(false, false, true));
    // Expansion of Test's implementation under the node
    assert_eq!(perms("1:1:2"), Permissions::READ_ONLY);
}

#[test]
fn test_read_only_expansion_rejects_edits() {
    let mut ed = editor();
    let lib = ed.new_library("lib.json").unwrap();
    let sg = ed.new_signal_graph("g.json").unwrap();
    ed.add_new_object(&lib, NewObject::signal_type("s1")).unwrap();
    let outer = ed
        .add_new_object(&lib, NewObject::NodeType { name: "Outer".into() })
        .unwrap();
    ed.add_new_object(&outer, port_type("in", Direction::In)).unwrap();
    let imp = ed
        .add_new_object(&outer, NewObject::Implementation(NewImplementation::Graph))
        .unwrap();
    ed.add_new_object(
        &imp,
        NewObject::OutputNode {
            name: "sink".into(),
            signal_type: "s1".into(),
        },
    )
    .unwrap();
    ed.add_new_object(
        &sg,
        NewObject::Node {
            name: "o".into(),
            node_type: "Outer".into(),
        },
    )
    .unwrap();

    // g.json -> o -> [in, impl expansion -> sink]
    let expansion = cursor("1:0:1");
    let inner = cursor("1:0:1:0");
    assert!(matches!(
        ed.tree().object_at(&inner),
        Some(EditableObject::Node(_))
    ));

    let add = ed.add_new_object(
        &expansion,
        NewObject::OutputNode {
            name: "sink2".into(),
            signal_type: "s1".into(),
        },
    );
    assert!(matches!(add, Err(EditError::ReadOnly { .. })));
    assert!(matches!(
        ed.remove_object(&inner),
        Err(EditError::ReadOnly { .. })
    ));
    assert!(matches!(
        ed.rename(&inner, "renamed"),
        Err(EditError::ReadOnly { .. })
    ));

    // The same node is editable at its definition site
    ed.rename(&cursor("0:1:1:0"), "renamed").unwrap();
    let inner_object = ed.tree().object_at(&inner).unwrap();
    assert!(ed.model().describe(&inner_object).starts_with("node renamed"));
}

#[test]
fn test_remove_renumbers_siblings() {
    let mut ed = editor();
    let lib = ed.new_library("lib.json").unwrap();
    ed.add_new_object(&lib, NewObject::signal_type("s1")).unwrap();
    let s2 = ed.add_new_object(&lib, NewObject::signal_type("s2")).unwrap();
    let t = ed
        .add_new_object(&lib, NewObject::NodeType { name: "T".into() })
        .unwrap();
    assert_eq!(t, cursor("0:2"));
    let t_object = ed.tree().object_at(&t).unwrap();

    let removed = ed.remove_object(&s2).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].parent, cursor("0"));
    assert_eq!(removed[0].position, 1);
    assert_eq!(ed.tree().cursor(&t_object), Some(cursor("0:1")));

    ed.undo().unwrap();
    assert_eq!(ed.tree().cursor(&t_object), Some(cursor("0:2")));
}

#[test]
fn test_remove_node_reports_cascade() {
    let mut ed = editor();
    let (lib_doc, graph_doc) = pipeline_documents();
    ed.open_library(&lib_doc).unwrap();
    ed.open_signal_graph(&graph_doc).unwrap();
    let before = ed.tree().snapshot();

    let node = cursor("1:1");
    let node_object = ed.tree().object_at(&node).unwrap();
    let removed = ed.remove_object(&node).unwrap();

    // Two connections, then the node itself
    assert_eq!(removed.len(), 3);
    assert!(removed[..2]
        .iter()
        .all(|r| matches!(r.object, EditableObject::Connection(_))));
    let last = removed.last().unwrap();
    assert_eq!(last.object, node_object);
    assert_eq!(last.parent, cursor("1"));
    assert_eq!(last.position, 1);

    // sensor and actuator lost their connection children
    assert!(ed.tree().object_at(&cursor("1:0:0:0")).is_none());
    assert!(ed.tree().object_at(&cursor("1:1:0:0")).is_none());
    assert_tree_consistent(ed.model());

    ed.undo().unwrap();
    assert_eq!(ed.tree().snapshot(), before);
    ed.redo().unwrap();
    assert_tree_consistent(ed.model());
    assert!(ed.tree().find(&node_object).is_none());
}

#[test]
fn test_undo_redo_sequence_restores_snapshots() {
    let mut ed = editor();
    let lib = ed.new_library("lib.json").unwrap();
    let mut snapshots = vec![ed.tree().snapshot()];

    ed.add_new_object(&lib, NewObject::signal_type("s1")).unwrap();
    snapshots.push(ed.tree().snapshot());
    let t = ed
        .add_new_object(&lib, NewObject::NodeType { name: "T".into() })
        .unwrap();
    snapshots.push(ed.tree().snapshot());
    ed.add_new_object(&t, port_type("in", Direction::In)).unwrap();
    snapshots.push(ed.tree().snapshot());
    ed.rename(&t, "U").unwrap();
    snapshots.push(ed.tree().snapshot());

    for expected in snapshots.iter().rev().skip(1) {
        ed.undo().unwrap();
        assert_eq!(&ed.tree().snapshot(), expected);
    }
    assert!(!ed.can_undo());

    for expected in snapshots.iter().skip(1) {
        ed.redo().unwrap();
        assert_eq!(&ed.tree().snapshot(), expected);
    }
    assert!(!ed.can_redo());
    assert!(ed.model().registry().node_type_by_name("U").is_some());
}

#[test]
fn test_failed_edit_leaves_history_untouched() {
    let mut ed = editor();
    let lib = ed.new_library("lib.json").unwrap();
    ed.add_new_object(&lib, NewObject::signal_type("s1")).unwrap();
    let undo_len = ed.history().undo_len();

    let err = ed
        .add_new_object(&lib, NewObject::signal_type("s1"))
        .unwrap_err();
    assert!(matches!(err, EditError::DuplicateDefinition { .. }));
    assert_eq!(ed.history().undo_len(), undo_len);
    assert_tree_consistent(ed.model());
}

#[test]
fn test_close_document() {
    let mut ed = editor();
    let (lib_doc, graph_doc) = pipeline_documents();
    let lib = ed.open_library(&lib_doc).unwrap();
    let sg = ed.open_signal_graph(&graph_doc).unwrap();

    assert!(matches!(
        ed.close(&lib),
        Err(EditError::ReferentialIntegrity { .. })
    ));
    ed.close(&sg).unwrap();
    ed.close(&lib).unwrap();
    assert!(ed.tree().is_empty());
    assert!(!ed.can_undo());
}
