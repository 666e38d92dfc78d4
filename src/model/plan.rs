//! Edit planning.
//!
//! Every `plan_*` method checks the request against the current model and
//! returns a fully materialized [`Edit`]. Validation happens before any ID is
//! reserved, and reserving is the only mutation a plan performs.
//!
//! Removal plans capture everything a later undo needs: the removed objects,
//! their positions, and every connection detached as a cascade. Connection
//! indices are computed by simulating the detach order on copies of the link
//! lists, so the recorded positions are exactly the ones valid when the
//! record is attached again.

use super::Model;
use crate::error::{EditError, Result};
use crate::id::{
    ConnectionId, GraphId, ImplId, LibraryId, NodeId, NodeTypeId, PortId, PortTypeId,
    SignalTypeId,
};
use crate::model::instance::{GraphOwner, Node, Port};
use crate::model::record::{
    ConnectionRecord, Edit, GraphRecord, ImplRecord, NodeRecord, NodeTypeRecord, PortRecord,
    PortTypeRecord, SignalTypeRecord,
};
use crate::model::types::{
    auto_node_type_name, Direction, Implementation, ImplementationKind, NodeType, PortType,
    SignalType,
};
use std::collections::{HashMap, HashSet};

/// Kind of implementation to add to a node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewImplementation {
    Elementary(String),
    Graph,
}

type InstanceLists = HashMap<NodeTypeId, Vec<NodeId>>;

/// Replays connection removals on copies of the link lists.
struct LinkSimulator<'a> {
    model: &'a Model,
    links: HashMap<PortId, Vec<ConnectionId>>,
    done: HashSet<ConnectionId>,
    records: Vec<ConnectionRecord>,
}

impl<'a> LinkSimulator<'a> {
    fn new(model: &'a Model) -> Self {
        Self {
            model,
            links: HashMap::new(),
            done: HashSet::new(),
            records: Vec::new(),
        }
    }

    fn take_index(&mut self, port: PortId, conn: ConnectionId) -> usize {
        let model = self.model;
        let list = self.links.entry(port).or_insert_with(|| {
            model
                .ports
                .get(port)
                .map(|p| p.connections().collect())
                .unwrap_or_default()
        });
        match list.iter().position(|&c| c == conn) {
            Some(pos) => {
                list.remove(pos);
                pos
            }
            None => {
                debug_assert!(false, "{:?} not linked on {:?}", conn, port);
                list.len()
            }
        }
    }

    /// Detach `conn` next. Already detached connections are skipped.
    fn detach(&mut self, conn: ConnectionId) {
        if !self.done.insert(conn) {
            return;
        }
        let Some(c) = self.model.connections.get(conn).copied() else {
            return;
        };
        let from_index = self.take_index(c.from, conn);
        let to_index = self.take_index(c.to, conn);
        self.records.push(ConnectionRecord {
            id: conn,
            from: c.from,
            to: c.to,
            from_index,
            to_index,
        });
    }

    fn detach_all_of(&mut self, port: PortId) {
        if let Some(p) = self.model.ports.get(port) {
            for conn in p.connections().collect::<Vec<_>>().into_iter().rev() {
                self.detach(conn);
            }
        }
    }

    /// Records in attach order: the reverse of the simulated detach order.
    fn into_attach_order(self) -> Vec<ConnectionRecord> {
        let mut records = self.records;
        records.reverse();
        records
    }
}

impl Model {
    // ==================== Lookups for planning ====================

    fn signal_type_checked(&self, id: SignalTypeId) -> Result<&SignalType> {
        self.registry
            .signal_type(id)
            .ok_or_else(|| EditError::not_found("signal type", id.to_string()))
    }

    fn node_type_checked(&self, id: NodeTypeId) -> Result<&NodeType> {
        self.registry
            .node_type(id)
            .ok_or_else(|| EditError::not_found("node type", id.to_string()))
    }

    fn node_checked(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| EditError::not_found("node", id.to_string()))
    }

    fn port_checked(&self, id: PortId) -> Result<&Port> {
        self.ports
            .get(id)
            .ok_or_else(|| EditError::not_found("port", id.to_string()))
    }

    fn check_node_name(&self, graph: GraphId, name: &str) -> Result<()> {
        if self.graphs.get(graph).is_none() {
            return Err(EditError::not_found("graph", graph.to_string()));
        }
        if self.node_by_name(graph, name).is_some() {
            return Err(EditError::duplicate("node", name));
        }
        Ok(())
    }

    /// Whether `outer`'s graph implementations contain `target` at any depth.
    pub fn type_contains(&self, outer: NodeTypeId, target: NodeTypeId) -> bool {
        let mut seen = HashSet::new();
        self.type_contains_inner(outer, target, &mut seen)
    }

    fn type_contains_inner(
        &self,
        outer: NodeTypeId,
        target: NodeTypeId,
        seen: &mut HashSet<NodeTypeId>,
    ) -> bool {
        if !seen.insert(outer) {
            return false;
        }
        let Some(nt) = self.registry.node_type(outer) else {
            return false;
        };
        nt.implementations
            .iter()
            .filter_map(|&imp| self.implementation_graph(imp))
            .filter_map(|g| self.graphs.get(g))
            .flat_map(|g| g.nodes.iter())
            .filter_map(|&n| self.nodes.get(n))
            .any(|n| n.node_type == target || self.type_contains_inner(n.node_type, target, seen))
    }

    // ==================== Capture helpers ====================

    fn port_records(&self, node: &Node) -> Vec<PortRecord> {
        [Direction::In, Direction::Out]
            .into_iter()
            .flat_map(move |dir| node.ports(dir).iter().enumerate())
            .filter_map(|(position, &id)| {
                self.ports.get(id).map(|port| PortRecord {
                    id,
                    position,
                    port: Port {
                        links: Vec::new(),
                        ..port.clone()
                    },
                })
            })
            .collect()
    }

    fn stripped_node(node: &Node) -> Node {
        Node {
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            ..node.clone()
        }
    }

    /// Record of a graph and everything in it, for removing it as a whole.
    ///
    /// `instances` carries the simulated instance lists across several
    /// captures that are detached one after another.
    fn capture_graph(&self, id: GraphId, instances: &mut InstanceLists) -> Result<GraphRecord> {
        let graph = self
            .graphs
            .get(id)
            .ok_or_else(|| EditError::not_found("graph", id.to_string()))?;

        let mut sim = LinkSimulator::new(self);
        for &n in graph.nodes.iter().rev() {
            if let Some(node) = self.nodes.get(n) {
                for port in node.all_ports().collect::<Vec<_>>().into_iter().rev() {
                    sim.detach_all_of(port);
                }
            }
        }

        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for (position, &n) in graph.nodes.iter().enumerate().rev() {
            let node = self.node_checked(n)?;
            let list = instances.entry(node.node_type).or_insert_with(|| {
                self.registry
                    .node_type(node.node_type)
                    .map(|nt| nt.instances.clone())
                    .unwrap_or_default()
            });
            let instance_position = list.iter().position(|&x| x == n).unwrap_or(list.len());
            if instance_position < list.len() {
                list.remove(instance_position);
            }
            nodes.push(NodeRecord {
                id: n,
                position,
                instance_position,
                node: Self::stripped_node(node),
                ports: self.port_records(node),
                connections: Vec::new(),
                library_ref: None,
            });
        }
        nodes.reverse();

        Ok(GraphRecord {
            id,
            owner: graph.owner,
            libraries: graph.libraries.clone(),
            nodes,
            connections: sim.into_attach_order(),
        })
    }

    fn capture_implementation(
        &self,
        id: ImplId,
        instances: &mut InstanceLists,
    ) -> Result<ImplRecord> {
        let implementation = self
            .implementations
            .get(id)
            .ok_or_else(|| EditError::not_found("implementation", id.to_string()))?;
        let position = self
            .node_type_checked(implementation.node_type)?
            .implementations
            .iter()
            .position(|&i| i == id)
            .ok_or_else(|| EditError::not_found("implementation", id.to_string()))?;
        let graph = match implementation.graph() {
            Some(g) => Some(self.capture_graph(g, instances)?),
            None => None,
        };
        Ok(ImplRecord {
            id,
            position,
            implementation: implementation.clone(),
            graph,
        })
    }

    // ==================== Signal types ====================

    pub fn plan_add_signal_type(
        &mut self,
        library: LibraryId,
        signal_type: SignalType,
    ) -> Result<(SignalTypeId, Edit)> {
        let lib = self
            .registry
            .library(library)
            .ok_or_else(|| EditError::not_found("library", library.to_string()))?;
        if self.registry.signal_type_by_name(&signal_type.name).is_some() {
            return Err(EditError::duplicate("signal type", &signal_type.name));
        }
        let library_position = lib.signal_types.len();
        let signal_type = signal_type.defined_at(lib.filename.clone());

        let id = self.registry.signal_types.reserve();
        let record = SignalTypeRecord {
            id,
            library,
            library_position,
            order_position: self.registry.signal_types.len(),
            signal_type,
        };
        Ok((id, Edit::AttachSignalType(record)))
    }

    pub fn plan_remove_signal_type(&self, id: SignalTypeId) -> Result<Edit> {
        let signal_type = self.signal_type_checked(id)?;
        // Unused synthetic types carrying it are detached along with it.
        let mut synthetic = Vec::new();
        for (_, pt) in self.port_types.iter().filter(|(_, pt)| pt.signal_type == id) {
            let unused_synthetic = self
                .registry
                .node_type(pt.node_type)
                .map(|nt| nt.is_synthetic() && nt.instances.is_empty())
                .unwrap_or(false);
            if !unused_synthetic {
                return Err(EditError::in_use(
                    "signal type",
                    &signal_type.name,
                    format!(
                        "carried by port '{}' of node type '{}'",
                        pt.name,
                        self.registry.node_type_name(pt.node_type)
                    ),
                ));
            }
            if !synthetic.contains(&pt.node_type) {
                synthetic.push(pt.node_type);
            }
        }
        let library = self
            .registry
            .library_by_name(&signal_type.defined_at)
            .ok_or_else(|| EditError::not_found("library", &signal_type.defined_at))?;
        let library_position = self
            .registry
            .library(library)
            .and_then(|lib| lib.signal_types.iter().position(|&s| s == id))
            .ok_or_else(|| EditError::not_found("signal type", &signal_type.name))?;

        let detach = Edit::DetachSignalType(SignalTypeRecord {
            id,
            library,
            library_position,
            order_position: self.registry.signal_types.position(id).unwrap_or(0),
            signal_type: signal_type.clone(),
        });
        if synthetic.is_empty() {
            return Ok(detach);
        }

        // Back to front, so every recorded position holds when reattached.
        synthetic.sort_by_key(|&t| std::cmp::Reverse(self.registry.node_types.position(t)));
        let mut edits = synthetic
            .into_iter()
            .map(|t| self.plan_remove_node_type(t))
            .collect::<Result<Vec<_>>>()?;
        edits.push(detach);
        Ok(Edit::Batch(edits))
    }

    // ==================== Node types ====================

    pub fn plan_add_node_type(
        &mut self,
        library: LibraryId,
        name: &str,
    ) -> Result<(NodeTypeId, Edit)> {
        let lib = self
            .registry
            .library(library)
            .ok_or_else(|| EditError::not_found("library", library.to_string()))?;
        if self.registry.node_type_by_name(name).is_some() {
            return Err(EditError::duplicate("node type", name));
        }
        let node_type = NodeType::new(name, lib.filename.clone());
        let library_position = lib.node_types.len();

        let id = self.registry.node_types.reserve();
        let record = NodeTypeRecord {
            id,
            library: Some(library),
            library_position,
            order_position: self.registry.node_types.len(),
            node_type,
            port_types: Vec::new(),
            implementations: Vec::new(),
        };
        Ok((id, Edit::AttachNodeType(record)))
    }

    pub fn plan_remove_node_type(&self, id: NodeTypeId) -> Result<Edit> {
        let nt = self.node_type_checked(id)?;
        if !nt.instances.is_empty() {
            tracing::warn!(node_type = %nt.name, instances = nt.instances.len(), "refusing to remove node type in use");
            return Err(EditError::in_use(
                "node type",
                &nt.name,
                format!("{} instance(s) exist", nt.instances.len()),
            ));
        }

        let mut port_types = Vec::with_capacity(nt.port_count());
        for dir in [Direction::In, Direction::Out] {
            for (position, &pt) in nt.ports(dir).iter().enumerate() {
                if let Some(port_type) = self.port_types.get(pt) {
                    port_types.push(PortTypeRecord {
                        id: pt,
                        position,
                        port_type: port_type.clone(),
                        ports: Vec::new(),
                        connections: Vec::new(),
                    });
                }
            }
        }
        // Implementations detach last to first.
        let mut instances = InstanceLists::new();
        let mut implementations = nt
            .implementations
            .iter()
            .rev()
            .map(|&imp| self.capture_implementation(imp, &mut instances))
            .collect::<Result<Vec<_>>>()?;
        implementations.reverse();

        let library = if nt.is_synthetic() {
            None
        } else {
            self.registry.library_by_name(&nt.defined_at)
        };
        let library_position = library
            .and_then(|l| self.registry.library(l))
            .and_then(|lib| lib.node_types.iter().position(|&t| t == id))
            .unwrap_or(0);

        Ok(Edit::DetachNodeType(NodeTypeRecord {
            id,
            library,
            library_position,
            order_position: self.registry.node_types.position(id).unwrap_or(0),
            node_type: NodeType::new(nt.name.clone(), nt.defined_at.clone()),
            port_types,
            implementations,
        }))
    }

    pub fn plan_rename_node_type(&self, id: NodeTypeId, name: &str) -> Result<Edit> {
        let nt = self.node_type_checked(id)?;
        if !nt.instances.is_empty() {
            tracing::warn!(node_type = %nt.name, new_name = name, "refusing to rename node type with instances");
            return Err(EditError::in_use(
                "node type",
                &nt.name,
                format!("cannot rename while {} instance(s) exist", nt.instances.len()),
            ));
        }
        if nt.name != name && self.registry.node_type_by_name(name).is_some() {
            return Err(EditError::duplicate("node type", name));
        }
        Ok(Edit::RenameNodeType {
            id,
            from: nt.name.clone(),
            to: name.to_string(),
        })
    }

    // ==================== Port types ====================

    pub fn plan_add_port_type(
        &mut self,
        node_type: NodeTypeId,
        direction: Direction,
        name: &str,
        signal_type: SignalTypeId,
    ) -> Result<(PortTypeId, Edit)> {
        self.signal_type_checked(signal_type)?;
        let nt = self.node_type_checked(node_type)?;
        let taken = nt
            .port_types()
            .filter_map(|pt| self.port_types.get(pt))
            .any(|pt| pt.name == name);
        if taken {
            return Err(EditError::duplicate("port type", name));
        }
        let position = nt.ports(direction).len();
        let instances = nt.instances.clone();

        let id = self.port_types.reserve();
        let mut ports = Vec::with_capacity(instances.len());
        for node in instances {
            let port_position = self
                .nodes
                .get(node)
                .map(|n| n.ports(direction).len())
                .unwrap_or(position);
            debug_assert_eq!(port_position, position, "instance ports out of sync");
            ports.push(PortRecord {
                id: self.ports.reserve(),
                position: port_position,
                port: Port {
                    name: name.to_string(),
                    direction,
                    signal_type,
                    port_type: id,
                    node,
                    links: Vec::new(),
                },
            });
        }

        let record = PortTypeRecord {
            id,
            position,
            port_type: PortType {
                name: name.to_string(),
                direction,
                signal_type,
                node_type,
            },
            ports,
            connections: Vec::new(),
        };
        Ok((id, Edit::AttachPortType(record)))
    }

    pub fn plan_remove_port_type(&self, id: PortTypeId) -> Result<Edit> {
        Ok(Edit::DetachPortType(self.port_type_removal(id)?))
    }

    fn port_type_removal(&self, id: PortTypeId) -> Result<PortTypeRecord> {
        let port_type = self
            .port_types
            .get(id)
            .ok_or_else(|| EditError::not_found("port type", id.to_string()))?;
        let nt = self.node_type_checked(port_type.node_type)?;
        if nt.port_count() == 1 && !nt.instances.is_empty() {
            tracing::warn!(node_type = %nt.name, port = %port_type.name, "refusing to remove last port");
            return Err(EditError::in_use(
                "port type",
                &port_type.name,
                format!(
                    "last port of node type '{}' with {} instance(s)",
                    nt.name,
                    nt.instances.len()
                ),
            ));
        }
        let position = nt
            .ports(port_type.direction)
            .iter()
            .position(|&p| p == id)
            .ok_or_else(|| EditError::not_found("port type", &port_type.name))?;

        let mut sim = LinkSimulator::new(self);
        let mut ports = Vec::with_capacity(nt.instances.len());
        for &inst in &nt.instances {
            let node = self.node_checked(inst)?;
            let found = node
                .ports(port_type.direction)
                .iter()
                .enumerate()
                .find_map(|(pos, &p)| {
                    (self.ports.get(p).map(|port| port.port_type) == Some(id)).then_some((pos, p))
                });
            let Some((pos, pid)) = found else {
                debug_assert!(false, "instance {:?} lacks port of {:?}", inst, id);
                continue;
            };
            sim.detach_all_of(pid);
            let port = self.port_checked(pid)?;
            ports.push(PortRecord {
                id: pid,
                position: pos,
                port: Port {
                    links: Vec::new(),
                    ..port.clone()
                },
            });
        }

        Ok(PortTypeRecord {
            id,
            position,
            port_type: port_type.clone(),
            ports,
            connections: sim.into_attach_order(),
        })
    }

    // ==================== Implementations ====================

    pub fn plan_add_implementation(
        &mut self,
        node_type: NodeTypeId,
        kind: NewImplementation,
    ) -> Result<(ImplId, Edit)> {
        let position = self.node_type_checked(node_type)?.implementations.len();
        let id = self.implementations.reserve();
        let (kind, graph) = match kind {
            NewImplementation::Elementary(name) => (ImplementationKind::Elementary(name), None),
            NewImplementation::Graph => {
                let graph_id = self.graphs.reserve();
                let graph = GraphRecord {
                    id: graph_id,
                    owner: GraphOwner::Implementation(id),
                    libraries: Vec::new(),
                    nodes: Vec::new(),
                    connections: Vec::new(),
                };
                (ImplementationKind::Graph(graph_id), Some(graph))
            }
        };
        let record = ImplRecord {
            id,
            position,
            implementation: Implementation { node_type, kind },
            graph,
        };
        Ok((id, Edit::AttachImplementation(record)))
    }

    pub fn plan_remove_implementation(&self, id: ImplId) -> Result<Edit> {
        let record = self.capture_implementation(id, &mut InstanceLists::new())?;
        Ok(Edit::DetachImplementation(record))
    }

    // ==================== Nodes ====================

    pub fn plan_add_node(
        &mut self,
        graph: GraphId,
        name: &str,
        node_type: NodeTypeId,
    ) -> Result<(NodeId, Edit)> {
        self.check_node_name(graph, name)?;
        let nt = self.node_type_checked(node_type)?;
        if nt.port_count() == 0 {
            return Err(EditError::EmptyNodeType(nt.name.clone()));
        }

        let library_ref = if nt.is_synthetic() {
            None
        } else {
            let lib = self
                .registry
                .library_by_name(&nt.defined_at)
                .ok_or_else(|| EditError::not_found("library", &nt.defined_at))?;
            let referenced = self
                .graphs
                .get(graph)
                .map(|g| g.libraries.contains(&lib))
                .unwrap_or(false);
            (!referenced).then_some(lib)
        };

        if let Some(embracing) = self.embracing_node_type(graph) {
            if node_type == embracing || self.type_contains(node_type, embracing) {
                tracing::warn!(node_type = %nt.name, "refusing recursive instantiation");
                return Err(EditError::RecursiveImplementation(nt.name.clone()));
            }
        }

        let port_types: Vec<(Direction, usize, PortTypeId)> = [Direction::In, Direction::Out]
            .into_iter()
            .flat_map(move |dir| {
                nt.ports(dir)
                    .iter()
                    .enumerate()
                    .map(move |(pos, &pt)| (dir, pos, pt))
            })
            .collect();
        let instance_position = nt.instances.len();
        let position = self.graphs.get(graph).map(|g| g.nodes.len()).unwrap_or(0);

        let id = self.nodes.reserve();
        let mut ports = Vec::with_capacity(port_types.len());
        for (direction, position, pt) in port_types {
            let Some(port_type) = self.port_types.get(pt).cloned() else {
                continue;
            };
            ports.push(PortRecord {
                id: self.ports.reserve(),
                position,
                port: Port {
                    name: port_type.name,
                    direction,
                    signal_type: port_type.signal_type,
                    port_type: pt,
                    node: id,
                    links: Vec::new(),
                },
            });
        }

        let record = NodeRecord {
            id,
            position,
            instance_position,
            node: Node::new(name, node_type, graph),
            ports,
            connections: Vec::new(),
            library_ref,
        };
        Ok((id, Edit::AttachNode(record)))
    }

    /// Input (`port_direction == Out`) or output (`In`) node of one signal
    /// type. The synthetic node type is created on first use.
    pub fn plan_add_io_node(
        &mut self,
        graph: GraphId,
        name: &str,
        signal_type: SignalTypeId,
        port_direction: Direction,
    ) -> Result<(NodeId, Edit)> {
        self.check_node_name(graph, name)?;
        let st_name = self.signal_type_checked(signal_type)?.name.clone();
        let type_name = auto_node_type_name(port_direction, &st_name);
        if let Some(existing) = self.registry.node_type_by_name(&type_name) {
            return self.plan_add_node(graph, name, existing);
        }

        let port_name = match port_direction {
            Direction::Out => "out",
            Direction::In => "in",
        };
        let order_position = self.registry.node_types.len();
        let position = self.graphs.get(graph).map(|g| g.nodes.len()).unwrap_or(0);

        let type_id = self.registry.node_types.reserve();
        let port_type_id = self.port_types.reserve();
        let node_id = self.nodes.reserve();
        let port_id = self.ports.reserve();

        let node_type = NodeTypeRecord {
            id: type_id,
            library: None,
            library_position: 0,
            order_position,
            node_type: NodeType::new(type_name, ""),
            port_types: vec![PortTypeRecord {
                id: port_type_id,
                position: 0,
                port_type: PortType {
                    name: port_name.to_string(),
                    direction: port_direction,
                    signal_type,
                    node_type: type_id,
                },
                ports: Vec::new(),
                connections: Vec::new(),
            }],
            implementations: Vec::new(),
        };
        let node = NodeRecord {
            id: node_id,
            position,
            instance_position: 0,
            node: Node::new(name, type_id, graph),
            ports: vec![PortRecord {
                id: port_id,
                position: 0,
                port: Port {
                    name: port_name.to_string(),
                    direction: port_direction,
                    signal_type,
                    port_type: port_type_id,
                    node: node_id,
                    links: Vec::new(),
                },
            }],
            connections: Vec::new(),
            library_ref: None,
        };
        Ok((
            node_id,
            Edit::Batch(vec![Edit::AttachNodeType(node_type), Edit::AttachNode(node)]),
        ))
    }

    pub fn plan_remove_node(&self, id: NodeId) -> Result<Edit> {
        Ok(Edit::DetachNode(self.node_removal(id)?))
    }

    fn node_removal(&self, id: NodeId) -> Result<NodeRecord> {
        let node = self.node_checked(id)?;
        let position = self
            .graphs
            .get(node.graph)
            .and_then(|g| g.position(id))
            .ok_or_else(|| EditError::not_found("node", &node.name))?;
        let instance_position = self
            .node_type_checked(node.node_type)?
            .instances
            .iter()
            .position(|&n| n == id)
            .unwrap_or(0);

        let mut sim = LinkSimulator::new(self);
        for port in node.all_ports() {
            sim.detach_all_of(port);
        }

        Ok(NodeRecord {
            id,
            position,
            instance_position,
            node: Self::stripped_node(node),
            ports: self.port_records(node),
            connections: sim.into_attach_order(),
            library_ref: None,
        })
    }

    pub fn plan_rename_node(&self, id: NodeId, name: &str) -> Result<Edit> {
        let node = self.node_checked(id)?;
        if node.name != name {
            self.check_node_name(node.graph, name)?;
        }
        Ok(Edit::RenameNode {
            id,
            from: node.name.clone(),
            to: name.to_string(),
        })
    }

    // ==================== Connections ====================

    /// Connect two ports in either order; the output side becomes `from`.
    pub fn plan_connect(&mut self, a: PortId, b: PortId) -> Result<(ConnectionId, Edit)> {
        let pa = self.port_checked(a)?;
        let pb = self.port_checked(b)?;
        if pa.signal_type != pb.signal_type {
            return Err(EditError::TypeMismatch {
                from: self.registry.signal_type_name(pa.signal_type),
                to: self.registry.signal_type_name(pb.signal_type),
            });
        }
        if pa.direction == pb.direction {
            return Err(EditError::DirectionMismatch {
                direction: pa.direction.to_string(),
            });
        }
        let graph_a = self.node_checked(pa.node)?.graph;
        let graph_b = self.node_checked(pb.node)?.graph;
        if graph_a != graph_b {
            return Err(EditError::InvalidConnection(
                "ports belong to different graphs".to_string(),
            ));
        }
        if pa.is_connected_to(b) {
            return Err(EditError::InvalidConnection(format!(
                "'{}' and '{}' are already connected",
                self.port_label(a),
                self.port_label(b)
            )));
        }

        let (from, to) = if pa.direction == Direction::Out {
            (a, b)
        } else {
            (b, a)
        };
        let from_index = self.port_checked(from)?.links.len();
        let to_index = self.port_checked(to)?.links.len();

        let id = self.connections.reserve();
        Ok((
            id,
            Edit::AttachConnection(ConnectionRecord {
                id,
                from,
                to,
                from_index,
                to_index,
            }),
        ))
    }

    pub fn plan_disconnect(&self, id: ConnectionId) -> Result<Edit> {
        if self.connections.get(id).is_none() {
            return Err(EditError::not_found("connection", id.to_string()));
        }
        let mut sim = LinkSimulator::new(self);
        sim.detach(id);
        let record = sim
            .into_attach_order()
            .pop()
            .ok_or_else(|| EditError::not_found("connection", id.to_string()))?;
        Ok(Edit::DetachConnection(record))
    }
}

// ==================== Direct edits ====================
//
// Plan and apply in one step, without history. Removals hand back the record
// so callers can inspect what went with the removed object.

impl Model {
    /// Register a signal type with load semantics: an identical definition
    /// returns the existing entity, a differing one is an error.
    pub fn register_signal_type(
        &mut self,
        library: LibraryId,
        signal_type: SignalType,
    ) -> Result<SignalTypeId> {
        if let Some(existing) = self.registry.check_signal_type(&signal_type)? {
            return Ok(existing);
        }
        self.add_signal_type(library, signal_type)
    }

    pub fn add_signal_type(
        &mut self,
        library: LibraryId,
        signal_type: SignalType,
    ) -> Result<SignalTypeId> {
        let (id, edit) = self.plan_add_signal_type(library, signal_type)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn remove_signal_type(&mut self, id: SignalTypeId) -> Result<()> {
        let edit = self.plan_remove_signal_type(id)?;
        self.apply(&edit);
        Ok(())
    }

    pub fn add_node_type(&mut self, library: LibraryId, name: &str) -> Result<NodeTypeId> {
        let (id, edit) = self.plan_add_node_type(library, name)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn remove_node_type(&mut self, id: NodeTypeId) -> Result<()> {
        let edit = self.plan_remove_node_type(id)?;
        self.apply(&edit);
        Ok(())
    }

    pub fn add_port_type(
        &mut self,
        node_type: NodeTypeId,
        direction: Direction,
        name: &str,
        signal_type: SignalTypeId,
    ) -> Result<PortTypeId> {
        let (id, edit) = self.plan_add_port_type(node_type, direction, name, signal_type)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn remove_port_type(&mut self, id: PortTypeId) -> Result<PortTypeRecord> {
        let record = self.port_type_removal(id)?;
        self.apply(&Edit::DetachPortType(record.clone()));
        Ok(record)
    }

    pub fn add_implementation(
        &mut self,
        node_type: NodeTypeId,
        kind: NewImplementation,
    ) -> Result<ImplId> {
        let (id, edit) = self.plan_add_implementation(node_type, kind)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn remove_implementation(&mut self, id: ImplId) -> Result<()> {
        let edit = self.plan_remove_implementation(id)?;
        self.apply(&edit);
        Ok(())
    }

    pub fn add_node(&mut self, graph: GraphId, name: &str, node_type: NodeTypeId) -> Result<NodeId> {
        let (id, edit) = self.plan_add_node(graph, name, node_type)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn add_input_node(
        &mut self,
        graph: GraphId,
        name: &str,
        signal_type: SignalTypeId,
    ) -> Result<NodeId> {
        let (id, edit) = self.plan_add_io_node(graph, name, signal_type, Direction::Out)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn add_output_node(
        &mut self,
        graph: GraphId,
        name: &str,
        signal_type: SignalTypeId,
    ) -> Result<NodeId> {
        let (id, edit) = self.plan_add_io_node(graph, name, signal_type, Direction::In)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeRecord> {
        let record = self.node_removal(id)?;
        self.apply(&Edit::DetachNode(record.clone()));
        Ok(record)
    }

    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<ConnectionId> {
        let (id, edit) = self.plan_connect(a, b)?;
        self.apply(&edit);
        Ok(id)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> Result<()> {
        let edit = self.plan_disconnect(id)?;
        self.apply(&edit);
        Ok(())
    }

    pub fn rename_node_type(&mut self, id: NodeTypeId, name: &str) -> Result<()> {
        let edit = self.plan_rename_node_type(id, name)?;
        self.apply(&edit);
        Ok(())
    }

    pub fn rename_node(&mut self, id: NodeId, name: &str) -> Result<()> {
        let edit = self.plan_rename_node(id, name)?;
        self.apply(&edit);
        Ok(())
    }
}
