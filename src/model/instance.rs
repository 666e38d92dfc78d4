//! Instance layer: nodes, ports, connections and the graphs that hold them.

use crate::id::{ConnectionId, GraphId, ImplId, LibraryId, NodeId, NodeTypeId, PortId, PortTypeId, SignalGraphId, SignalTypeId};
use crate::model::types::Direction;

/// One entry of a port's connection list: the peer port and the connection
/// object joining them. Keeping both in one entry keeps them index-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub peer: PortId,
    pub connection: ConnectionId,
}

/// A live port: a snapshot of its port type plus its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    pub signal_type: SignalTypeId,
    pub port_type: PortTypeId,
    pub node: NodeId,
    pub(crate) links: Vec<Link>,
}

impl Port {
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn connected_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.links.iter().map(|l| l.peer)
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.links.iter().map(|l| l.connection)
    }

    pub fn is_connected_to(&self, peer: PortId) -> bool {
        self.links.iter().any(|l| l.peer == peer)
    }

    pub(crate) fn link_index(&self, connection: ConnectionId) -> Option<usize> {
        self.links.iter().position(|l| l.connection == connection)
    }
}

/// An edge from an output port to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: PortId,
    pub to: PortId,
}

/// Role of a node inside its graph, derived from its live port counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Input,
    Output,
    Processing,
}

impl NodeRole {
    /// `None` for a node without ports, which no graph may hold.
    pub fn classify(in_ports: usize, out_ports: usize) -> Option<Self> {
        match (in_ports > 0, out_ports > 0) {
            (false, true) => Some(NodeRole::Input),
            (true, false) => Some(NodeRole::Output),
            (true, true) => Some(NodeRole::Processing),
            (false, false) => None,
        }
    }
}

/// A live instance of a node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub node_type: NodeTypeId,
    pub graph: GraphId,
    pub(crate) in_ports: Vec<PortId>,
    pub(crate) out_ports: Vec<PortId>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, node_type: NodeTypeId, graph: GraphId) -> Self {
        Self {
            name: name.into(),
            node_type,
            graph,
            in_ports: Vec::new(),
            out_ports: Vec::new(),
        }
    }

    pub fn in_ports(&self) -> &[PortId] {
        &self.in_ports
    }

    pub fn out_ports(&self) -> &[PortId] {
        &self.out_ports
    }

    pub fn ports(&self, direction: Direction) -> &[PortId] {
        match direction {
            Direction::In => &self.in_ports,
            Direction::Out => &self.out_ports,
        }
    }

    pub(crate) fn ports_mut(&mut self, direction: Direction) -> &mut Vec<PortId> {
        match direction {
            Direction::In => &mut self.in_ports,
            Direction::Out => &mut self.out_ports,
        }
    }

    /// Ports in document order: inputs first, then outputs.
    pub fn all_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.in_ports.iter().chain(self.out_ports.iter()).copied()
    }

    pub fn port_count(&self) -> usize {
        self.in_ports.len() + self.out_ports.len()
    }

    pub fn role(&self) -> Option<NodeRole> {
        NodeRole::classify(self.in_ports.len(), self.out_ports.len())
    }
}

/// Who owns a signal graph type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOwner {
    /// A top-level signal graph document.
    Document(SignalGraphId),
    /// The graph implementation of a node type.
    Implementation(ImplId),
}

/// Node container partitioned by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalGraphType {
    pub owner: GraphOwner,
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) input_nodes: Vec<NodeId>,
    pub(crate) output_nodes: Vec<NodeId>,
    pub(crate) processing_nodes: Vec<NodeId>,
    pub(crate) libraries: Vec<LibraryId>,
}

impl SignalGraphType {
    pub fn new(owner: GraphOwner) -> Self {
        Self {
            owner,
            nodes: Vec::new(),
            input_nodes: Vec::new(),
            output_nodes: Vec::new(),
            processing_nodes: Vec::new(),
            libraries: Vec::new(),
        }
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn input_nodes(&self) -> &[NodeId] {
        &self.input_nodes
    }

    pub fn output_nodes(&self) -> &[NodeId] {
        &self.output_nodes
    }

    pub fn processing_nodes(&self) -> &[NodeId] {
        &self.processing_nodes
    }

    pub fn nodes_with_role(&self, role: NodeRole) -> &[NodeId] {
        match role {
            NodeRole::Input => &self.input_nodes,
            NodeRole::Output => &self.output_nodes,
            NodeRole::Processing => &self.processing_nodes,
        }
    }

    /// Libraries referenced by the node types used in this graph.
    pub fn libraries(&self) -> &[LibraryId] {
        &self.libraries
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    /// Rebuild the role partitions from document order and live roles.
    pub(crate) fn repartition<F>(&mut self, role_of: F)
    where
        F: Fn(NodeId) -> Option<NodeRole>,
    {
        self.input_nodes.clear();
        self.output_nodes.clear();
        self.processing_nodes.clear();
        for &node in &self.nodes {
            match role_of(node) {
                Some(NodeRole::Input) => self.input_nodes.push(node),
                Some(NodeRole::Output) => self.output_nodes.push(node),
                Some(NodeRole::Processing) => self.processing_nodes.push(node),
                None => debug_assert!(false, "node {:?} has no ports", node),
            }
        }
    }
}

/// A top-level signal graph document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalGraph {
    pub filename: String,
    pub graph: GraphId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(NodeRole::classify(0, 1), Some(NodeRole::Input));
        assert_eq!(NodeRole::classify(2, 0), Some(NodeRole::Output));
        assert_eq!(NodeRole::classify(1, 1), Some(NodeRole::Processing));
        assert_eq!(NodeRole::classify(0, 0), None);
    }

    #[test]
    fn test_repartition_follows_document_order() {
        let mut graph = SignalGraphType::new(GraphOwner::Document(SignalGraphId(0)));
        graph.nodes = vec![NodeId(2), NodeId(0), NodeId(1)];
        graph.repartition(|n| match n.0 {
            0 => Some(NodeRole::Input),
            1 => Some(NodeRole::Output),
            _ => Some(NodeRole::Input),
        });
        assert_eq!(graph.input_nodes(), &[NodeId(2), NodeId(0)]);
        assert_eq!(graph.output_nodes(), &[NodeId(1)]);
        assert!(graph.processing_nodes().is_empty());
    }
}
