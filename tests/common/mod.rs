//! Common test utilities and fixtures

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use signalgraph_rs::document::NoResolver;
use signalgraph_rs::id::{GraphId, LibraryId, NodeId, NodeTypeId, PortId, SignalGraphId, SignalTypeId};
use signalgraph_rs::model::{Direction, Model, NewImplementation, SignalType};
use signalgraph_rs::{Editor, EditorConfig};

/// Editor that never touches the filesystem for library lookups
pub fn editor() -> Editor {
    Editor::with_resolver(&EditorConfig::default(), Box::new(NoResolver))
}

/// Assert the incrementally maintained tree matches a full rebuild
pub fn assert_tree_consistent(model: &Model) {
    assert_eq!(
        model.tree().snapshot(),
        model.rebuilt_tree().snapshot(),
        "incremental tree diverged from rebuilt tree"
    );
}

/// Port of `node` named `name`; panics if absent
pub fn port(model: &Model, node: NodeId, name: &str) -> PortId {
    model
        .port_by_name(node, name)
        .unwrap_or_else(|| panic!("node {} has no port '{}'", node, name))
}

/// `sensor -> test -> actuator` over signal type `s1`
pub struct Pipeline {
    pub model: Model,
    pub lib: LibraryId,
    pub s1: SignalTypeId,
    pub test_type: NodeTypeId,
    pub sg: SignalGraphId,
    pub graph: GraphId,
    pub sensor: NodeId,
    pub test: NodeId,
    pub actuator: NodeId,
}

impl Pipeline {
    pub fn new() -> Self {
        let mut model = Model::new();
        let lib = model.create_library("base.json");
        let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();
        let test_type = model.add_node_type(lib, "Test").unwrap();
        model.add_port_type(test_type, Direction::In, "in", s1).unwrap();
        model.add_port_type(test_type, Direction::Out, "out", s1).unwrap();

        let sg = model.create_signal_graph("main.json").unwrap();
        let graph = model.signal_graph(sg).unwrap().graph;
        let sensor = model.add_input_node(graph, "sensor", s1).unwrap();
        let test = model.add_node(graph, "test", test_type).unwrap();
        let actuator = model.add_output_node(graph, "actuator", s1).unwrap();

        let sensor_out = port(&model, sensor, "out");
        let test_in = port(&model, test, "in");
        let test_out = port(&model, test, "out");
        let actuator_in = port(&model, actuator, "in");
        model.connect(sensor_out, test_in).unwrap();
        model.connect(test_out, actuator_in).unwrap();

        Self {
            model,
            lib,
            s1,
            test_type,
            sg,
            graph,
            sensor,
            test,
            actuator,
        }
    }
}

/// Three levels of graph implementations:
/// `Top` contains a `Mid` node, `Mid` contains a `Leaf` node, and the
/// signal graph holds two `Top` instances.
pub struct Nested {
    pub model: Model,
    pub lib: LibraryId,
    pub s1: SignalTypeId,
    pub leaf: NodeTypeId,
    pub mid: NodeTypeId,
    pub top: NodeTypeId,
    pub leaf_node: NodeId,
    pub mid_node: NodeId,
    pub tops: [NodeId; 2],
}

impl Nested {
    pub fn new() -> Self {
        let mut model = Model::new();
        let lib = model.create_library("nested.json");
        let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();

        let node_type = |model: &mut Model, name: &str| {
            let t = model.add_node_type(lib, name).unwrap();
            model.add_port_type(t, Direction::In, "in", s1).unwrap();
            model.add_port_type(t, Direction::Out, "out", s1).unwrap();
            t
        };
        let leaf = node_type(&mut model, "Leaf");
        let mid = node_type(&mut model, "Mid");
        let top = node_type(&mut model, "Top");

        let mid_impl = model.add_implementation(mid, NewImplementation::Graph).unwrap();
        let mid_graph = model.implementation_graph(mid_impl).unwrap();
        let leaf_node = model.add_node(mid_graph, "leaf", leaf).unwrap();

        let top_impl = model.add_implementation(top, NewImplementation::Graph).unwrap();
        let top_graph = model.implementation_graph(top_impl).unwrap();
        let mid_node = model.add_node(top_graph, "mid", mid).unwrap();

        let sg = model.create_signal_graph("app.json").unwrap();
        let graph = model.signal_graph(sg).unwrap().graph;
        let a = model.add_node(graph, "a", top).unwrap();
        let b = model.add_node(graph, "b", top).unwrap();

        Self {
            model,
            lib,
            s1,
            leaf,
            mid,
            top,
            leaf_node,
            mid_node,
            tops: [a, b],
        }
    }
}
