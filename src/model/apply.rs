//! Instance propagation.
//!
//! Each attach/detach primitive changes the canonical object and then every
//! place that mirrors it: the live ports of every instance of a node type, and
//! every occurrence in the document tree (a nested node occurs once per
//! instance of each embracing type). Mirrored slots are found from the
//! canonical position stored in the record, never from an instance's own
//! tree path.

use super::Model;
use crate::id::{GraphId, NodeId, TreeId};
use crate::model::instance::{Connection, Link, Node, SignalGraphType};
use crate::model::record::{
    ConnectionRecord, Edit, ImplRecord, NodeRecord, NodeTypeRecord, PortRecord, PortTypeRecord,
    SignalTypeRecord,
};
use crate::model::types::Direction;
use crate::tree::{EditableObject, Permissions};

/// Remove `item` from `list`, checking it sat at `expected`.
fn remove_item<T: PartialEq + std::fmt::Debug>(list: &mut Vec<T>, item: &T, expected: usize) {
    match list.iter().position(|x| x == item) {
        Some(pos) => {
            debug_assert_eq!(pos, expected, "{:?} out of place", item);
            list.remove(pos);
        }
        None => debug_assert!(false, "{:?} not in list", item),
    }
}

fn insert_item<T>(list: &mut Vec<T>, position: usize, item: T) {
    debug_assert!(position <= list.len(), "insert position {} out of range", position);
    let position = position.min(list.len());
    list.insert(position, item);
}

impl Model {
    /// Perform a planned edit. Never fails for a record produced by a `plan_*`
    /// method against the current state (or the inverse of the last applied edit).
    pub fn apply(&mut self, edit: &Edit) {
        match edit {
            Edit::AttachSignalType(r) => self.attach_signal_type(r),
            Edit::DetachSignalType(r) => self.detach_signal_type(r),
            Edit::AttachNodeType(r) => self.attach_node_type(r),
            Edit::DetachNodeType(r) => self.detach_node_type(r),
            Edit::AttachPortType(r) => {
                self.attach_port_type(r);
                self.refresh_partitions_for(r.ports.iter().map(|p| p.port.node));
            }
            Edit::DetachPortType(r) => {
                self.detach_port_type(r);
                self.refresh_partitions_for(r.ports.iter().map(|p| p.port.node));
            }
            Edit::AttachImplementation(r) => self.attach_implementation(r),
            Edit::DetachImplementation(r) => self.detach_implementation(r),
            Edit::AttachNode(r) => self.attach_node(r),
            Edit::DetachNode(r) => self.detach_node(r),
            Edit::AttachConnection(r) => self.attach_connection(r),
            Edit::DetachConnection(r) => self.detach_connection(r),
            Edit::RenameNodeType { id, from, to } => {
                self.registry.node_types.rename(*id, from, to);
                if let Some(nt) = self.registry.node_types.get_mut(*id) {
                    nt.name = to.clone();
                }
            }
            Edit::RenameNode { id, to, .. } => {
                if let Some(node) = self.nodes.get_mut(*id) {
                    node.name = to.clone();
                }
            }
            Edit::Batch(edits) => {
                for e in edits {
                    self.apply(e);
                }
                return;
            }
        }
        tracing::debug!(edit = edit.label(), "applied edit");
    }

    fn remove_occurrences(&mut self, object: EditableObject) {
        for id in self.tree.occurrences(&object).to_vec() {
            // Earlier removals may already have taken this one with them.
            self.tree.remove(id);
        }
    }

    // ==================== Signal types ====================

    fn attach_signal_type(&mut self, r: &SignalTypeRecord) {
        self.registry.signal_types.insert_at(
            r.id,
            &r.signal_type.name,
            r.signal_type.clone(),
            r.order_position,
        );
        if let Some(lib) = self.registry.libraries.get_mut(r.library) {
            insert_item(&mut lib.signal_types, r.library_position, r.id);
        }
        let object = EditableObject::SignalType(r.id);
        for slot in self.tree.occurrences(&EditableObject::Library(r.library)).to_vec() {
            self.tree.insert(
                Some(slot),
                r.library_position,
                object,
                Permissions::for_object(&object),
            );
        }
    }

    fn detach_signal_type(&mut self, r: &SignalTypeRecord) {
        self.remove_occurrences(EditableObject::SignalType(r.id));
        if let Some(lib) = self.registry.libraries.get_mut(r.library) {
            remove_item(&mut lib.signal_types, &r.id, r.library_position);
        }
        self.registry.signal_types.remove(r.id, &r.signal_type.name);
    }

    // ==================== Node types ====================

    fn attach_node_type(&mut self, r: &NodeTypeRecord) {
        debug_assert!(r.node_type.port_count() == 0 && r.node_type.implementations.is_empty());
        self.registry.node_types.insert_at(
            r.id,
            &r.node_type.name,
            r.node_type.clone(),
            r.order_position,
        );
        if let Some(lib_id) = r.library {
            let mut offset = 0;
            if let Some(lib) = self.registry.libraries.get_mut(lib_id) {
                insert_item(&mut lib.node_types, r.library_position, r.id);
                offset = lib.signal_types.len();
            }
            let slots = self.tree.occurrences(&EditableObject::Library(lib_id)).to_vec();
            self.with_tree(|model, tree| {
                for slot in slots {
                    model.build_node_type(tree, slot, offset + r.library_position, r.id);
                }
            });
        }
        for pt in &r.port_types {
            self.attach_port_type(pt);
        }
        for imp in &r.implementations {
            self.attach_implementation(imp);
        }
    }

    fn detach_node_type(&mut self, r: &NodeTypeRecord) {
        for imp in r.implementations.iter().rev() {
            self.detach_implementation(imp);
        }
        for pt in r.port_types.iter().rev() {
            self.detach_port_type(pt);
        }
        self.remove_occurrences(EditableObject::NodeType(r.id));
        if let Some(lib) = r.library.and_then(|l| self.registry.libraries.get_mut(l)) {
            remove_item(&mut lib.node_types, &r.id, r.library_position);
        }
        self.registry.node_types.remove(r.id, &r.node_type.name);
    }

    // ==================== Port types and ports ====================

    fn attach_port_type(&mut self, r: &PortTypeRecord) {
        let node_type = r.port_type.node_type;
        let direction = r.port_type.direction;
        self.port_types.insert_at(r.id, r.port_type.clone());

        let mut index = r.position;
        if let Some(nt) = self.registry.node_types.get_mut(node_type) {
            insert_item(nt.ports_mut(direction), r.position, r.id);
            if direction == Direction::Out {
                index += nt.in_ports.len();
            }
        }
        let object = EditableObject::PortType(r.id);
        for slot in self.tree.occurrences(&EditableObject::NodeType(node_type)).to_vec() {
            self.tree
                .insert(Some(slot), index, object, Permissions::for_object(&object));
        }

        for port in &r.ports {
            self.attach_port(port);
        }
        for conn in &r.connections {
            self.attach_connection(conn);
        }
    }

    fn detach_port_type(&mut self, r: &PortTypeRecord) {
        for conn in r.connections.iter().rev() {
            self.detach_connection(conn);
        }
        for port in r.ports.iter().rev() {
            self.detach_port(port);
        }
        self.remove_occurrences(EditableObject::PortType(r.id));
        if let Some(nt) = self.registry.node_types.get_mut(r.port_type.node_type) {
            remove_item(nt.ports_mut(r.port_type.direction), &r.id, r.position);
        }
        self.port_types.remove(r.id);
    }

    /// Insert the port into its node without touching the tree. Returns the
    /// port's index among all of the node's children.
    fn insert_port_model(&mut self, r: &PortRecord) -> usize {
        debug_assert!(r.port.links.is_empty(), "port records carry no links");
        self.ports.insert_at(r.id, r.port.clone());
        let mut index = r.position;
        if let Some(node) = self.nodes.get_mut(r.port.node) {
            insert_item(node.ports_mut(r.port.direction), r.position, r.id);
            if r.port.direction == Direction::Out {
                index += node.in_ports.len();
            }
        }
        index
    }

    fn remove_port_model(&mut self, r: &PortRecord) {
        if let Some(node) = self.nodes.get_mut(r.port.node) {
            remove_item(node.ports_mut(r.port.direction), &r.id, r.position);
        }
        let removed = self.ports.remove(r.id);
        debug_assert!(
            removed.map(|p| p.links.is_empty()).unwrap_or(true),
            "port {:?} removed while connected",
            r.id
        );
    }

    fn attach_port(&mut self, r: &PortRecord) {
        let index = self.insert_port_model(r);
        let slots = self.tree.occurrences(&EditableObject::Node(r.port.node)).to_vec();
        self.with_tree(|model, tree| {
            for slot in slots {
                model.build_port(tree, slot, index, r.id);
            }
        });
    }

    fn detach_port(&mut self, r: &PortRecord) {
        self.remove_occurrences(EditableObject::Port(r.id));
        self.remove_port_model(r);
    }

    // ==================== Connections ====================

    fn attach_connection(&mut self, r: &ConnectionRecord) {
        self.connections.insert_at(
            r.id,
            Connection {
                from: r.from,
                to: r.to,
            },
        );
        let sides = [(r.from, r.to, r.from_index), (r.to, r.from, r.to_index)];
        for (port, peer, index) in sides {
            if let Some(p) = self.ports.get_mut(port) {
                insert_item(
                    &mut p.links,
                    index,
                    Link {
                        peer,
                        connection: r.id,
                    },
                );
            }
            let object = EditableObject::Connection(r.id);
            for slot in self.tree.occurrences(&EditableObject::Port(port)).to_vec() {
                self.tree
                    .insert(Some(slot), index, object, Permissions::for_object(&object));
            }
        }
    }

    fn detach_connection(&mut self, r: &ConnectionRecord) {
        self.remove_occurrences(EditableObject::Connection(r.id));
        for (port, expected) in [(r.from, r.from_index), (r.to, r.to_index)] {
            if let Some(p) = self.ports.get_mut(port) {
                match p.link_index(r.id) {
                    Some(pos) => {
                        debug_assert_eq!(pos, expected, "link of {:?} out of place", r.id);
                        p.links.remove(pos);
                    }
                    None => debug_assert!(false, "{:?} not linked on {:?}", r.id, port),
                }
            }
        }
        self.connections.remove(r.id);
    }

    // ==================== Implementations ====================

    fn attach_implementation(&mut self, r: &ImplRecord) {
        let node_type = r.implementation.node_type;
        self.implementations.insert_at(r.id, r.implementation.clone());
        if let Some(g) = &r.graph {
            let mut graph = SignalGraphType::new(g.owner);
            graph.libraries = g.libraries.clone();
            self.graphs.insert_at(g.id, graph);
        }

        let mut index = r.position;
        let mut instances = Vec::new();
        if let Some(nt) = self.registry.node_types.get_mut(node_type) {
            insert_item(&mut nt.implementations, r.position, r.id);
            index += nt.port_count();
            instances = nt.instances.clone();
        }

        // Editable under the type, read-only expansion under every instance.
        let perms = self.implementation_permissions(r.id);
        let mut slots: Vec<(TreeId, Permissions)> = self
            .tree
            .occurrences(&EditableObject::NodeType(node_type))
            .iter()
            .map(|&t| (t, perms))
            .collect();
        for inst in instances {
            slots.extend(
                self.tree
                    .occurrences(&EditableObject::Node(inst))
                    .iter()
                    .map(|&t| (t, Permissions::READ_ONLY)),
            );
        }
        self.with_tree(|model, tree| {
            for (slot, perms) in slots {
                model.build_implementation(tree, slot, index, r.id, perms);
            }
        });

        if let Some(g) = &r.graph {
            for node in &g.nodes {
                self.attach_node(node);
            }
            for conn in &g.connections {
                self.attach_connection(conn);
            }
        }
    }

    fn detach_implementation(&mut self, r: &ImplRecord) {
        if let Some(g) = &r.graph {
            for conn in g.connections.iter().rev() {
                self.detach_connection(conn);
            }
            for node in g.nodes.iter().rev() {
                self.detach_node(node);
            }
        }
        self.remove_occurrences(EditableObject::Implementation(r.id));
        if let Some(nt) = self
            .registry
            .node_types
            .get_mut(r.implementation.node_type)
        {
            remove_item(&mut nt.implementations, &r.id, r.position);
        }
        if let Some(g) = &r.graph {
            let graph = self.graphs.remove(g.id);
            debug_assert!(graph.map(|g| g.nodes.is_empty()).unwrap_or(true));
        }
        self.implementations.remove(r.id);
    }

    // ==================== Nodes ====================

    fn attach_node(&mut self, r: &NodeRecord) {
        debug_assert!(r.node.port_count() == 0, "node records carry ports separately");
        let graph_id = r.node.graph;
        self.nodes.insert_at(r.id, r.node.clone());
        if let Some(graph) = self.graphs.get_mut(graph_id) {
            insert_item(&mut graph.nodes, r.position, r.id);
            if let Some(lib) = r.library_ref {
                debug_assert!(!graph.libraries.contains(&lib));
                graph.libraries.push(lib);
            }
        }
        if let Some(nt) = self.registry.node_types.get_mut(r.node.node_type) {
            insert_item(&mut nt.instances, r.instance_position, r.id);
        }
        for port in &r.ports {
            self.insert_port_model(port);
        }

        let slots = self.graph_slots(graph_id);
        self.with_tree(|model, tree| {
            for slot in slots {
                model.build_node(tree, slot, r.position, r.id);
            }
        });

        for conn in &r.connections {
            self.attach_connection(conn);
        }
        self.refresh_partitions(graph_id);
    }

    fn detach_node(&mut self, r: &NodeRecord) {
        for conn in r.connections.iter().rev() {
            self.detach_connection(conn);
        }
        self.remove_occurrences(EditableObject::Node(r.id));
        for port in r.ports.iter().rev() {
            self.remove_port_model(port);
        }

        let graph_id = r.node.graph;
        if let Some(graph) = self.graphs.get_mut(graph_id) {
            remove_item(&mut graph.nodes, &r.id, r.position);
            if let Some(lib) = r.library_ref {
                if let Some(pos) = graph.libraries.iter().rposition(|&l| l == lib) {
                    graph.libraries.remove(pos);
                }
            }
        }
        if let Some(nt) = self.registry.node_types.get_mut(r.node.node_type) {
            remove_item(&mut nt.instances, &r.id, r.instance_position);
        }
        self.nodes.remove(r.id);
        self.refresh_partitions(graph_id);
    }

    // ==================== Partitions ====================

    fn refresh_partitions(&mut self, graph: GraphId) {
        let nodes = &self.nodes;
        if let Some(g) = self.graphs.get_mut(graph) {
            g.repartition(|n| nodes.get(n).and_then(Node::role));
        }
    }

    fn refresh_partitions_for(&mut self, nodes: impl Iterator<Item = NodeId>) {
        let mut graphs: Vec<GraphId> = nodes
            .filter_map(|n| self.nodes.get(n).map(|node| node.graph))
            .collect();
        graphs.sort();
        graphs.dedup();
        for graph in graphs {
            self.refresh_partitions(graph);
        }
    }
}
