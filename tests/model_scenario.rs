//! Integration tests for the model edit pipeline
//!
//! These tests exercise the direct (history-free) model API:
//! - Registration and duplicate detection
//! - Connection rules and role partitions
//! - Removal cascades and referential integrity

mod common;

use common::{assert_tree_consistent, port, Pipeline};
use signalgraph_rs::model::{Direction, Edit, Model, NewImplementation, NodeRole, SignalType};
use signalgraph_rs::tree::EditableObject;
use signalgraph_rs::EditError;

#[test]
fn test_pipeline_partitions_by_role() {
    let p = Pipeline::new();
    let graph = p.model.graph(p.graph).unwrap();

    assert_eq!(graph.nodes(), &[p.sensor, p.test, p.actuator]);
    assert_eq!(graph.input_nodes(), &[p.sensor]);
    assert_eq!(graph.output_nodes(), &[p.actuator]);
    assert_eq!(graph.processing_nodes(), &[p.test]);
    assert_eq!(p.model.node(p.test).unwrap().role(), Some(NodeRole::Processing));
    assert_eq!(p.model.connection_count(), 2);
    assert_tree_consistent(&p.model);
}

#[test]
fn test_connection_is_normalized_output_to_input() {
    let mut p = Pipeline::new();
    let test_out = port(&p.model, p.test, "out");
    let actuator_in = port(&p.model, p.actuator, "in");
    let existing = p.model.port(test_out).unwrap().connections().next().unwrap();
    p.model.disconnect(existing).unwrap();

    // Given in reverse order, stored output first
    let conn = p.model.connect(actuator_in, test_out).unwrap();
    let c = p.model.connection(conn).unwrap();
    assert_eq!(c.from, test_out);
    assert_eq!(c.to, actuator_in);
    assert!(p.model.port(test_out).unwrap().is_connected_to(actuator_in));
    assert!(p.model.port(actuator_in).unwrap().is_connected_to(test_out));
}

#[test]
fn test_connect_rejects_bad_wiring() {
    let mut p = Pipeline::new();
    let s2 = p.model.add_signal_type(p.lib, SignalType::new("s2")).unwrap();
    let other = p.model.add_input_node(p.graph, "other", s2).unwrap();

    let sensor_out = port(&p.model, p.sensor, "out");
    let test_in = port(&p.model, p.test, "in");
    let test_out = port(&p.model, p.test, "out");
    let other_out = port(&p.model, other, "out");

    assert!(matches!(
        p.model.connect(other_out, test_in),
        Err(EditError::TypeMismatch { .. })
    ));
    assert!(matches!(
        p.model.connect(sensor_out, test_out),
        Err(EditError::DirectionMismatch { .. })
    ));
    assert!(matches!(
        p.model.connect(sensor_out, test_in),
        Err(EditError::InvalidConnection(_))
    ));
    assert_eq!(p.model.connection_count(), 2);
}

#[test]
fn test_connect_rejects_ports_of_different_graphs() {
    let mut p = Pipeline::new();
    let sg2 = p.model.create_signal_graph("other.json").unwrap();
    let graph2 = p.model.signal_graph(sg2).unwrap().graph;
    let far = p.model.add_output_node(graph2, "far", p.s1).unwrap();

    let sensor_out = port(&p.model, p.sensor, "out");
    let far_in = port(&p.model, far, "in");
    assert!(matches!(
        p.model.connect(sensor_out, far_in),
        Err(EditError::InvalidConnection(_))
    ));
}

#[test]
fn test_remove_node_detaches_its_connections() {
    let mut p = Pipeline::new();
    let sensor_out = port(&p.model, p.sensor, "out");
    let actuator_in = port(&p.model, p.actuator, "in");

    let record = p.model.remove_node(p.test).unwrap();
    assert_eq!(record.connections.len(), 2);
    assert_eq!(record.ports.len(), 2);
    assert!(p.model.port(sensor_out).unwrap().links().is_empty());
    assert!(p.model.port(actuator_in).unwrap().links().is_empty());
    assert_eq!(p.model.connection_count(), 0);

    let graph = p.model.graph(p.graph).unwrap();
    assert_eq!(graph.nodes(), &[p.sensor, p.actuator]);
    assert!(graph.processing_nodes().is_empty());
    assert!(p
        .model
        .registry()
        .node_type(p.test_type)
        .unwrap()
        .instances()
        .is_empty());
    assert_tree_consistent(&p.model);
}

#[test]
fn test_reattaching_removed_node_restores_link_order() {
    let mut p = Pipeline::new();
    let before = p.model.tree().snapshot();
    let sensor_out = port(&p.model, p.sensor, "out");
    let links_before = p.model.port(sensor_out).unwrap().links().to_vec();

    let record = p.model.remove_node(p.test).unwrap();
    p.model.apply(&Edit::AttachNode(record));

    assert_eq!(p.model.port(sensor_out).unwrap().links(), links_before.as_slice());
    assert_eq!(p.model.tree().snapshot(), before);
}

#[test]
fn test_duplicate_names_are_rejected() {
    let mut p = Pipeline::new();
    assert!(matches!(
        p.model.add_signal_type(p.lib, SignalType::new("s1")),
        Err(EditError::DuplicateDefinition { kind: "signal type", .. })
    ));
    assert!(matches!(
        p.model.add_node_type(p.lib, "Test"),
        Err(EditError::DuplicateDefinition { kind: "node type", .. })
    ));
    assert!(matches!(
        p.model.add_port_type(p.test_type, Direction::Out, "in", p.s1),
        Err(EditError::DuplicateDefinition { kind: "port type", .. })
    ));
    assert!(matches!(
        p.model.add_node(p.graph, "sensor", p.test_type),
        Err(EditError::DuplicateDefinition { kind: "node", .. })
    ));
}

#[test]
fn test_register_signal_type_is_idempotent_for_identical_definitions() {
    let mut model = Model::new();
    let lib = model.create_library("a.json");
    let first = model
        .register_signal_type(lib, SignalType::new("s1").with_ctype("int"))
        .unwrap();
    let again = model
        .register_signal_type(lib, SignalType::new("s1").with_ctype("int"))
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(model.registry().signal_types().count(), 1);

    let conflict = model.register_signal_type(lib, SignalType::new("s1").with_ctype("float"));
    assert!(matches!(
        conflict,
        Err(EditError::DuplicateDefinition { .. })
    ));
}

#[test]
fn test_referential_integrity() {
    let mut p = Pipeline::new();

    assert!(matches!(
        p.model.remove_signal_type(p.s1),
        Err(EditError::ReferentialIntegrity { kind: "signal type", .. })
    ));
    assert!(matches!(
        p.model.remove_node_type(p.test_type),
        Err(EditError::ReferentialIntegrity { kind: "node type", .. })
    ));
    assert!(matches!(
        p.model.rename_node_type(p.test_type, "Renamed"),
        Err(EditError::ReferentialIntegrity { .. })
    ));

    // Free once the last instance is gone
    p.model.remove_node(p.test).unwrap();
    p.model.rename_node_type(p.test_type, "Renamed").unwrap();
    assert_eq!(p.model.registry().node_type_by_name("Renamed"), Some(p.test_type));
    p.model.remove_node_type(p.test_type).unwrap();
    assert!(p.model.registry().node_type_by_name("Renamed").is_none());
    assert_tree_consistent(&p.model);
}

#[test]
fn test_last_port_of_instantiated_type_is_kept() {
    let mut model = Model::new();
    let lib = model.create_library("a.json");
    let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();
    let sink = model.add_node_type(lib, "Sink").unwrap();
    let only = model.add_port_type(sink, Direction::In, "in", s1).unwrap();
    let sg = model.create_signal_graph("g.json").unwrap();
    let graph = model.signal_graph(sg).unwrap().graph;
    model.add_node(graph, "sink", sink).unwrap();

    assert!(matches!(
        model.remove_port_type(only),
        Err(EditError::ReferentialIntegrity { kind: "port type", .. })
    ));
}

#[test]
fn test_empty_node_type_cannot_be_instantiated() {
    let mut model = Model::new();
    let lib = model.create_library("a.json");
    let empty = model.add_node_type(lib, "Empty").unwrap();
    let sg = model.create_signal_graph("g.json").unwrap();
    let graph = model.signal_graph(sg).unwrap().graph;

    assert!(matches!(
        model.add_node(graph, "e", empty),
        Err(EditError::EmptyNodeType(name)) if name == "Empty"
    ));
}

#[test]
fn test_recursive_instantiation_is_refused() {
    let mut model = Model::new();
    let lib = model.create_library("a.json");
    let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();
    let outer = model.add_node_type(lib, "Outer").unwrap();
    model.add_port_type(outer, Direction::In, "in", s1).unwrap();
    let inner = model.add_node_type(lib, "Inner").unwrap();
    model.add_port_type(inner, Direction::In, "in", s1).unwrap();

    let outer_impl = model.add_implementation(outer, NewImplementation::Graph).unwrap();
    let outer_graph = model.implementation_graph(outer_impl).unwrap();
    let inner_impl = model.add_implementation(inner, NewImplementation::Graph).unwrap();
    let inner_graph = model.implementation_graph(inner_impl).unwrap();

    // Directly recursive
    assert!(matches!(
        model.add_node(outer_graph, "self", outer),
        Err(EditError::RecursiveImplementation(_))
    ));

    // Indirectly recursive: Outer contains Inner, so Inner may not contain Outer
    model.add_node(outer_graph, "inner", inner).unwrap();
    assert!(model.type_contains(outer, inner));
    assert!(matches!(
        model.add_node(inner_graph, "outer", outer),
        Err(EditError::RecursiveImplementation(_))
    ));
}

#[test]
fn test_io_nodes_share_synthetic_types() {
    let mut p = Pipeline::new();
    let second = p.model.add_input_node(p.graph, "sensor2", p.s1).unwrap();

    let first_type = p.model.node(p.sensor).unwrap().node_type;
    assert_eq!(p.model.node(second).unwrap().node_type, first_type);
    let synthetic = p.model.registry().node_type(first_type).unwrap();
    assert!(synthetic.is_synthetic());
    assert_eq!(synthetic.instances(), &[p.sensor, second]);

    // Synthetic types belong to no library and never appear in the tree
    assert!(p.model.tree().occurrences(&EditableObject::NodeType(first_type)).is_empty());
    let lib = p.model.registry().library(p.lib).unwrap();
    assert!(!lib.node_types().contains(&first_type));
}

#[test]
fn test_unload_library_refuses_while_used() {
    let mut p = Pipeline::new();
    assert!(matches!(
        p.model.unload_library(p.lib),
        Err(EditError::ReferentialIntegrity { .. })
    ));

    p.model.unload_signal_graph(p.sg).unwrap();
    p.model.unload_library(p.lib).unwrap();
    assert!(p.model.registry().library_by_name("base.json").is_none());
    assert!(p.model.registry().signal_type_by_name("s1").is_none());
    assert!(p.model.tree().is_empty());
}

#[test]
fn test_unload_library_with_io_nodes_in_own_implementation() {
    let mut model = Model::new();
    let lib = model.create_library("lib.json");
    let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();
    let t = model.add_node_type(lib, "T").unwrap();
    model.add_port_type(t, Direction::In, "in", s1).unwrap();
    let imp = model.add_implementation(t, NewImplementation::Graph).unwrap();
    let g = model.implementation_graph(imp).unwrap();
    let src = model.add_input_node(g, "src", s1).unwrap();
    let dst = model.add_output_node(g, "dst", s1).unwrap();
    let (from, to) = (port(&model, src, "out"), port(&model, dst, "in"));
    model.connect(from, to).unwrap();

    model.unload_library(lib).unwrap();
    assert!(model.registry().library_by_name("lib.json").is_none());
    assert!(model.registry().signal_type_by_name("s1").is_none());
    assert!(model.registry().node_type_by_name("autoInputNodeType-s1").is_none());
    assert!(model.registry().node_type_by_name("autoOutputNodeType-s1").is_none());
    assert_eq!(model.registry().node_types().count(), 0);
    assert_eq!(model.connection_count(), 0);
    assert!(model.tree().is_empty());
}

#[test]
fn test_removing_signal_type_takes_unused_io_types_along() {
    let mut model = Model::new();
    let lib = model.create_library("lib.json");
    let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();
    let sg = model.create_signal_graph("g.json").unwrap();
    let graph = model.signal_graph(sg).unwrap().graph;

    let src = model.add_input_node(graph, "src", s1).unwrap();
    let dst = model.add_output_node(graph, "dst", s1).unwrap();
    model.remove_node(src).unwrap();

    // The output node still uses s1
    assert!(matches!(
        model.plan_remove_signal_type(s1),
        Err(EditError::ReferentialIntegrity { .. })
    ));

    model.remove_node(dst).unwrap();
    let before = model.tree().snapshot();
    let edit = model.plan_remove_signal_type(s1).unwrap();
    model.apply(&edit);
    assert!(model.registry().signal_type_by_name("s1").is_none());
    assert_eq!(model.registry().node_types().count(), 0);
    assert_tree_consistent(&model);

    model.apply(&edit.inverse());
    assert_eq!(model.registry().signal_type_by_name("s1"), Some(s1));
    let input_type = model.registry().node_type_by_name("autoInputNodeType-s1");
    let output_type = model.registry().node_type_by_name("autoOutputNodeType-s1");
    assert!(input_type.is_some());
    assert!(output_type.is_some());
    let order: Vec<_> = model.registry().node_types().map(|(id, _)| id).collect();
    assert_eq!(order, [input_type.unwrap(), output_type.unwrap()]);
    assert_eq!(model.tree().snapshot(), before);
}
