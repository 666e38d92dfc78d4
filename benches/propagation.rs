//! Benchmarks for instance propagation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use signalgraph_rs::id::{GraphId, NodeTypeId, SignalTypeId};
use signalgraph_rs::model::{Direction, Model, NewImplementation, SignalType};

struct Setup {
    model: Model,
    s1: SignalTypeId,
    leaf: NodeTypeId,
}

/// `instances` copies of a node type whose implementation holds a `Leaf`,
/// each wired into a chain.
fn setup(instances: usize) -> Setup {
    let mut model = Model::new();
    let lib = model.create_library("bench.json");
    let s1 = model.add_signal_type(lib, SignalType::new("s1")).unwrap();

    let node_type = |model: &mut Model, name: &str| {
        let t = model.add_node_type(lib, name).unwrap();
        model.add_port_type(t, Direction::In, "in", s1).unwrap();
        model.add_port_type(t, Direction::Out, "out", s1).unwrap();
        t
    };
    let leaf = node_type(&mut model, "Leaf");
    let wrapper = node_type(&mut model, "Wrapper");
    let imp = model.add_implementation(wrapper, NewImplementation::Graph).unwrap();
    let inner: GraphId = model.implementation_graph(imp).unwrap();
    model.add_node(inner, "leaf", leaf).unwrap();

    let sg = model.create_signal_graph("bench-graph.json").unwrap();
    let graph = model.signal_graph(sg).unwrap().graph;
    let mut previous = None;
    for i in 0..instances {
        let node = model.add_node(graph, &format!("w{}", i), wrapper).unwrap();
        if let Some(prev) = previous {
            let from = model.port_by_name(prev, "out").unwrap();
            let to = model.port_by_name(node, "in").unwrap();
            model.connect(from, to).unwrap();
        }
        previous = Some(node);
    }

    Setup { model, s1, leaf }
}

fn bench_add_port_type(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_port_type");

    for instances in [10, 100, 1000].iter() {
        let mut s = setup(*instances);
        group.throughput(Throughput::Elements(*instances as u64));
        group.bench_with_input(BenchmarkId::from_parameter(instances), instances, |b, _| {
            b.iter(|| {
                let (_, edit) = s
                    .model
                    .plan_add_port_type(s.leaf, Direction::Out, "extra", s.s1)
                    .unwrap();
                s.model.apply(black_box(&edit));
                s.model.apply(&edit.inverse());
            });
        });
    }

    group.finish();
}

fn bench_remove_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_connected_node");

    for instances in [10, 100, 1000].iter() {
        let mut s = setup(*instances);
        let graph = s
            .model
            .signal_graph_by_name("bench-graph.json")
            .and_then(|sg| s.model.signal_graph(sg))
            .map(|sg| sg.graph)
            .unwrap();
        let middle = s.model.graph(graph).unwrap().nodes()[instances / 2];

        group.bench_with_input(BenchmarkId::from_parameter(instances), instances, |b, _| {
            b.iter(|| {
                let edit = s.model.plan_remove_node(middle).unwrap();
                s.model.apply(black_box(&edit));
                s.model.apply(&edit.inverse());
            });
        });
    }

    group.finish();
}

fn bench_rebuild_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild_tree");

    for instances in [10, 100, 1000].iter() {
        let s = setup(*instances);
        group.bench_with_input(BenchmarkId::from_parameter(instances), instances, |b, _| {
            b.iter(|| black_box(s.model.rebuilt_tree()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_port_type,
    bench_remove_node,
    bench_rebuild_tree
);
criterion_main!(benches);
