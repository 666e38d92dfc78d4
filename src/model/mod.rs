//! The signal-graph domain model.
//!
//! [`Model`] is the single context object holding every registry, arena and
//! the document tree. All structural changes go through one pipeline:
//!
//! 1. a `plan_*` method validates the request and materializes an [`Edit`]
//!    record without touching the model (IDs are reserved, nothing else);
//! 2. [`Model::apply`] performs the record on the canonical objects and
//!    propagates it to every instance and every tree occurrence. Applying a
//!    planned record cannot fail.
//!
//! Undo applies [`Edit::inverse`].

pub mod arena;
pub mod instance;
pub mod record;
pub mod registry;
pub mod types;

mod apply;
mod lifecycle;
mod plan;

pub use instance::{Connection, GraphOwner, Link, Node, NodeRole, Port, SignalGraph, SignalGraphType};
pub use plan::NewImplementation;
pub use record::Edit;
pub use registry::TypeRegistry;
pub use types::{
    Direction, Implementation, ImplementationKind, Library, Mode, NodeType, PortType, Scope,
    SignalType,
};

use crate::id::{
    ConnectionId, GraphId, ImplId, LibraryId, NodeId, NodeTypeId, PortId, PortTypeId,
    SignalGraphId, TreeId,
};
use crate::tree::{DocumentTree, EditableObject, Permissions};
use arena::{Arena, Store};

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) registry: TypeRegistry,
    pub(crate) port_types: Arena<PortTypeId, PortType>,
    pub(crate) implementations: Arena<ImplId, Implementation>,
    pub(crate) graphs: Arena<GraphId, SignalGraphType>,
    pub(crate) signal_graphs: Store<SignalGraphId, SignalGraph>,
    pub(crate) nodes: Arena<NodeId, Node>,
    pub(crate) ports: Arena<PortId, Port>,
    pub(crate) connections: Arena<ConnectionId, Connection>,
    pub(crate) tree: DocumentTree,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Accessors ====================

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn port_type(&self, id: PortTypeId) -> Option<&PortType> {
        self.port_types.get(id)
    }

    pub fn implementation(&self, id: ImplId) -> Option<&Implementation> {
        self.implementations.get(id)
    }

    pub fn graph(&self, id: GraphId) -> Option<&SignalGraphType> {
        self.graphs.get(id)
    }

    pub fn signal_graph(&self, id: SignalGraphId) -> Option<&SignalGraph> {
        self.signal_graphs.get(id)
    }

    pub fn signal_graph_by_name(&self, filename: &str) -> Option<SignalGraphId> {
        self.signal_graphs.lookup(filename)
    }

    pub fn signal_graphs(&self) -> impl Iterator<Item = (SignalGraphId, &SignalGraph)> {
        self.signal_graphs.list()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Linear scan of a graph's nodes.
    pub fn node_by_name(&self, graph: GraphId, name: &str) -> Option<NodeId> {
        self.graphs.get(graph)?.nodes.iter().copied().find(|&n| {
            self.nodes
                .get(n)
                .map(|node| node.name == name)
                .unwrap_or(false)
        })
    }

    /// Port of `node` named `name`, inputs searched first.
    pub fn port_by_name(&self, node: NodeId, name: &str) -> Option<PortId> {
        self.nodes
            .get(node)?
            .all_ports()
            .find(|&p| self.ports.get(p).map(|port| port.name == name).unwrap_or(false))
    }

    /// The graph held by an implementation, if it is a graph implementation.
    pub fn implementation_graph(&self, id: ImplId) -> Option<GraphId> {
        self.implementations.get(id).and_then(Implementation::graph)
    }

    /// One-line human readable label of a tree payload.
    pub fn describe(&self, object: &EditableObject) -> String {
        match *object {
            EditableObject::Library(id) => match self.registry.library(id) {
                Some(lib) => format!("library {}", lib.filename),
                None => format!("library {}", id),
            },
            EditableObject::SignalGraph(id) => match self.signal_graphs.get(id) {
                Some(sg) => format!("signal graph {}", sg.filename),
                None => format!("signal graph {}", id),
            },
            EditableObject::SignalType(id) => match self.registry.signal_type(id) {
                Some(st) if st.ctype.is_empty() => format!("signal type {}", st.name),
                Some(st) => format!("signal type {} ({})", st.name, st.ctype),
                None => format!("signal type {}", id),
            },
            EditableObject::NodeType(id) => {
                format!("node type {}", self.registry.node_type_name(id))
            }
            EditableObject::PortType(id) => match self.port_types.get(id) {
                Some(pt) => format!(
                    "{} port type {} : {}",
                    pt.direction,
                    pt.name,
                    self.registry.signal_type_name(pt.signal_type)
                ),
                None => format!("port type {}", id),
            },
            EditableObject::Implementation(id) => match self.implementations.get(id) {
                Some(Implementation {
                    kind: ImplementationKind::Elementary(name),
                    ..
                }) => format!("elementary implementation {}", name),
                Some(_) => "graph implementation".to_string(),
                None => format!("implementation {}", id),
            },
            EditableObject::Node(id) => match self.nodes.get(id) {
                Some(node) => format!(
                    "node {} : {}",
                    node.name,
                    self.registry.node_type_name(node.node_type)
                ),
                None => format!("node {}", id),
            },
            EditableObject::Port(id) => match self.ports.get(id) {
                Some(port) => format!(
                    "{} port {} : {}",
                    port.direction,
                    port.name,
                    self.registry.signal_type_name(port.signal_type)
                ),
                None => format!("port {}", id),
            },
            EditableObject::Connection(id) => match self.connections.get(id) {
                Some(conn) => format!(
                    "connection {} -> {}",
                    self.port_label(conn.from),
                    self.port_label(conn.to)
                ),
                None => format!("connection {}", id),
            },
        }
    }

    fn port_label(&self, id: PortId) -> String {
        let Some(port) = self.ports.get(id) else {
            return id.to_string();
        };
        let node = self
            .nodes
            .get(port.node)
            .map(|n| n.name.as_str())
            .unwrap_or("?");
        format!("{}.{}", node, port.name)
    }

    // ==================== Tree construction ====================

    /// Rebuild the whole document tree from the model, keeping root order.
    ///
    /// The incrementally maintained tree must always equal this.
    pub fn rebuilt_tree(&self) -> DocumentTree {
        let mut tree = DocumentTree::new();
        for &root in self.tree.roots() {
            match self.tree.object(root) {
                Some(EditableObject::Library(id)) => self.build_library(&mut tree, id),
                Some(EditableObject::SignalGraph(id)) => self.build_signal_graph(&mut tree, id),
                other => debug_assert!(false, "unexpected root payload {:?}", other),
            }
        }
        tree
    }

    /// Run `f` with the model borrowed immutably and the tree mutably.
    pub(crate) fn with_tree<R>(&mut self, f: impl FnOnce(&Model, &mut DocumentTree) -> R) -> R {
        let mut tree = std::mem::take(&mut self.tree);
        let result = f(self, &mut tree);
        self.tree = tree;
        result
    }

    pub(crate) fn build_library(&self, tree: &mut DocumentTree, id: LibraryId) {
        let root = tree.append(
            None,
            EditableObject::Library(id),
            Permissions::for_object(&EditableObject::Library(id)),
        );
        let Some(lib) = self.registry.library(id) else {
            return;
        };
        for &st in &lib.signal_types {
            let object = EditableObject::SignalType(st);
            tree.append(Some(root), object, Permissions::for_object(&object));
        }
        for (i, &nt) in lib.node_types.iter().enumerate() {
            self.build_node_type(tree, root, lib.signal_types.len() + i, nt);
        }
    }

    pub(crate) fn build_signal_graph(&self, tree: &mut DocumentTree, id: SignalGraphId) {
        let object = EditableObject::SignalGraph(id);
        let root = tree.append(None, object, Permissions::for_object(&object));
        let Some(sg) = self.signal_graphs.get(id) else {
            return;
        };
        if let Some(graph) = self.graphs.get(sg.graph) {
            for (i, &node) in graph.nodes.iter().enumerate() {
                self.build_node(tree, root, i, node);
            }
        }
    }

    pub(crate) fn build_node_type(
        &self,
        tree: &mut DocumentTree,
        parent: TreeId,
        index: usize,
        id: NodeTypeId,
    ) -> TreeId {
        let object = EditableObject::NodeType(id);
        let at = tree.insert(Some(parent), index, object, Permissions::for_object(&object));
        if let Some(nt) = self.registry.node_type(id) {
            for pt in nt.port_types() {
                let object = EditableObject::PortType(pt);
                tree.append(Some(at), object, Permissions::for_object(&object));
            }
            for (i, &imp) in nt.implementations.iter().enumerate() {
                let perms = self.implementation_permissions(imp);
                self.build_implementation(tree, at, nt.port_count() + i, imp, perms);
            }
        }
        at
    }

    pub(crate) fn build_implementation(
        &self,
        tree: &mut DocumentTree,
        parent: TreeId,
        index: usize,
        id: ImplId,
        permissions: Permissions,
    ) -> TreeId {
        let at = tree.insert(
            Some(parent),
            index,
            EditableObject::Implementation(id),
            permissions,
        );
        if let Some(graph) = self.implementation_graph(id).and_then(|g| self.graphs.get(g)) {
            for (i, &node) in graph.nodes.iter().enumerate() {
                self.build_node(tree, at, i, node);
            }
        }
        at
    }

    /// A node's subtree: its ports with their connections, then the read-only
    /// expansion of its type's implementations.
    pub(crate) fn build_node(
        &self,
        tree: &mut DocumentTree,
        parent: TreeId,
        index: usize,
        id: NodeId,
    ) -> TreeId {
        let object = EditableObject::Node(id);
        let at = tree.insert(Some(parent), index, object, Permissions::for_object(&object));
        let Some(node) = self.nodes.get(id) else {
            return at;
        };
        for (i, port) in node.all_ports().enumerate() {
            self.build_port(tree, at, i, port);
        }
        if let Some(nt) = self.registry.node_type(node.node_type) {
            for (i, &imp) in nt.implementations.iter().enumerate() {
                self.build_implementation(
                    tree,
                    at,
                    node.port_count() + i,
                    imp,
                    Permissions::READ_ONLY,
                );
            }
        }
        at
    }

    pub(crate) fn build_port(
        &self,
        tree: &mut DocumentTree,
        parent: TreeId,
        index: usize,
        id: PortId,
    ) -> TreeId {
        let object = EditableObject::Port(id);
        let at = tree.insert(Some(parent), index, object, Permissions::for_object(&object));
        if let Some(port) = self.ports.get(id) {
            for conn in port.connections() {
                let object = EditableObject::Connection(conn);
                tree.append(Some(at), object, Permissions::for_object(&object));
            }
        }
        at
    }

    /// Only graph implementations accept new children.
    pub(crate) fn implementation_permissions(&self, id: ImplId) -> Permissions {
        Permissions::new(self.implementation_graph(id).is_some(), true, true)
    }

    /// Tree nodes that hold the nodes of `graph` as children.
    pub(crate) fn graph_slots(&self, graph: GraphId) -> Vec<TreeId> {
        let object = match self.graphs.get(graph).map(|g| g.owner) {
            Some(GraphOwner::Document(sg)) => EditableObject::SignalGraph(sg),
            Some(GraphOwner::Implementation(imp)) => EditableObject::Implementation(imp),
            None => return Vec::new(),
        };
        self.tree.occurrences(&object).to_vec()
    }

    /// The node type whose implementation owns `graph`, if any.
    pub(crate) fn embracing_node_type(&self, graph: GraphId) -> Option<NodeTypeId> {
        match self.graphs.get(graph)?.owner {
            GraphOwner::Implementation(imp) => self.implementations.get(imp).map(|i| i.node_type),
            GraphOwner::Document(_) => None,
        }
    }
}
