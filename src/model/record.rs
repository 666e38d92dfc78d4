//! Edit records.
//!
//! A record is the fully materialized description of one structural change:
//! every ID is already reserved and every position is the one valid at the
//! moment the record is attached. Attaching a record and then detaching the
//! same record leaves the model exactly as it was, which is all undo needs.
//!
//! Lists inside a record are stored in attach order. Detaching walks them in
//! reverse.

use crate::id::{
    ConnectionId, GraphId, ImplId, LibraryId, NodeId, NodeTypeId, PortId, PortTypeId,
    SignalTypeId,
};
use crate::model::instance::{GraphOwner, Node, Port};
use crate::model::types::{Implementation, NodeType, PortType, SignalType};
use crate::tree::EditableObject;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub from: PortId,
    pub to: PortId,
    /// Index in `from`'s link list.
    pub from_index: usize,
    /// Index in `to`'s link list.
    pub to_index: usize,
}

/// A live port without links. Connections are recorded separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRecord {
    pub id: PortId,
    /// Position within the node's port list of the same direction.
    pub position: usize,
    pub port: Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortTypeRecord {
    pub id: PortTypeId,
    /// Position within the node type's port list of the same direction.
    pub position: usize,
    pub port_type: PortType,
    /// One mirrored port per instance.
    pub ports: Vec<PortRecord>,
    pub connections: Vec<ConnectionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Position in the owning graph's node list.
    pub position: usize,
    /// Position in the node type's instance list.
    pub instance_position: usize,
    /// The node with empty port lists.
    pub node: Node,
    pub ports: Vec<PortRecord>,
    pub connections: Vec<ConnectionRecord>,
    /// Library reference this node added to its graph.
    pub library_ref: Option<LibraryId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRecord {
    pub id: GraphId,
    pub owner: GraphOwner,
    pub libraries: Vec<LibraryId>,
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<ConnectionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplRecord {
    pub id: ImplId,
    pub position: usize,
    pub implementation: Implementation,
    /// Present for graph implementations.
    pub graph: Option<GraphRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeRecord {
    pub id: NodeTypeId,
    /// `None` for synthetic types.
    pub library: Option<LibraryId>,
    pub library_position: usize,
    pub order_position: usize,
    /// The node type with empty port, implementation and instance lists.
    pub node_type: NodeType,
    pub port_types: Vec<PortTypeRecord>,
    pub implementations: Vec<ImplRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalTypeRecord {
    pub id: SignalTypeId,
    pub library: LibraryId,
    pub library_position: usize,
    pub order_position: usize,
    pub signal_type: SignalType,
}

/// One undoable unit of change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    AttachSignalType(SignalTypeRecord),
    DetachSignalType(SignalTypeRecord),
    AttachNodeType(NodeTypeRecord),
    DetachNodeType(NodeTypeRecord),
    AttachPortType(PortTypeRecord),
    DetachPortType(PortTypeRecord),
    AttachImplementation(ImplRecord),
    DetachImplementation(ImplRecord),
    AttachNode(NodeRecord),
    DetachNode(NodeRecord),
    AttachConnection(ConnectionRecord),
    DetachConnection(ConnectionRecord),
    RenameNodeType {
        id: NodeTypeId,
        from: String,
        to: String,
    },
    RenameNode {
        id: NodeId,
        from: String,
        to: String,
    },
    /// Applied front to back.
    Batch(Vec<Edit>),
}

impl Edit {
    /// The edit that reverts this one.
    pub fn inverse(&self) -> Edit {
        match self {
            Edit::AttachSignalType(r) => Edit::DetachSignalType(r.clone()),
            Edit::DetachSignalType(r) => Edit::AttachSignalType(r.clone()),
            Edit::AttachNodeType(r) => Edit::DetachNodeType(r.clone()),
            Edit::DetachNodeType(r) => Edit::AttachNodeType(r.clone()),
            Edit::AttachPortType(r) => Edit::DetachPortType(r.clone()),
            Edit::DetachPortType(r) => Edit::AttachPortType(r.clone()),
            Edit::AttachImplementation(r) => Edit::DetachImplementation(r.clone()),
            Edit::DetachImplementation(r) => Edit::AttachImplementation(r.clone()),
            Edit::AttachNode(r) => Edit::DetachNode(r.clone()),
            Edit::DetachNode(r) => Edit::AttachNode(r.clone()),
            Edit::AttachConnection(r) => Edit::DetachConnection(r.clone()),
            Edit::DetachConnection(r) => Edit::AttachConnection(r.clone()),
            Edit::RenameNodeType { id, from, to } => Edit::RenameNodeType {
                id: *id,
                from: to.clone(),
                to: from.clone(),
            },
            Edit::RenameNode { id, from, to } => Edit::RenameNode {
                id: *id,
                from: to.clone(),
                to: from.clone(),
            },
            Edit::Batch(edits) => Edit::Batch(edits.iter().rev().map(Edit::inverse).collect()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Edit::AttachSignalType(_) => "add signal type",
            Edit::DetachSignalType(_) => "remove signal type",
            Edit::AttachNodeType(_) => "add node type",
            Edit::DetachNodeType(_) => "remove node type",
            Edit::AttachPortType(_) => "add port type",
            Edit::DetachPortType(_) => "remove port type",
            Edit::AttachImplementation(_) => "add implementation",
            Edit::DetachImplementation(_) => "remove implementation",
            Edit::AttachNode(_) => "add node",
            Edit::DetachNode(_) => "remove node",
            Edit::AttachConnection(_) => "connect",
            Edit::DetachConnection(_) => "disconnect",
            Edit::RenameNodeType { .. } => "rename node type",
            Edit::RenameNode { .. } => "rename node",
            Edit::Batch(_) => "batch",
        }
    }

    /// Objects this edit removes from the model, in removal order.
    ///
    /// Cascaded children (connections of a removed port, nodes of a removed
    /// graph) come before their parent.
    pub fn removed_objects(&self) -> Vec<EditableObject> {
        let mut out = Vec::new();
        match self {
            Edit::DetachSignalType(r) => out.push(EditableObject::SignalType(r.id)),
            Edit::DetachNodeType(r) => node_type_objects(r, &mut out),
            Edit::DetachPortType(r) => port_type_objects(r, &mut out),
            Edit::DetachImplementation(r) => impl_objects(r, &mut out),
            Edit::DetachNode(r) => node_objects(r, &mut out),
            Edit::DetachConnection(r) => out.push(EditableObject::Connection(r.id)),
            Edit::Batch(edits) => {
                for edit in edits {
                    out.extend(edit.removed_objects());
                }
            }
            _ => {}
        }
        out
    }
}

fn connection_objects(records: &[ConnectionRecord], out: &mut Vec<EditableObject>) {
    out.extend(
        records
            .iter()
            .rev()
            .map(|c| EditableObject::Connection(c.id)),
    );
}

fn node_objects(r: &NodeRecord, out: &mut Vec<EditableObject>) {
    connection_objects(&r.connections, out);
    out.push(EditableObject::Node(r.id));
}

fn port_type_objects(r: &PortTypeRecord, out: &mut Vec<EditableObject>) {
    connection_objects(&r.connections, out);
    out.extend(r.ports.iter().rev().map(|p| EditableObject::Port(p.id)));
    out.push(EditableObject::PortType(r.id));
}

fn impl_objects(r: &ImplRecord, out: &mut Vec<EditableObject>) {
    if let Some(graph) = &r.graph {
        connection_objects(&graph.connections, out);
        for node in graph.nodes.iter().rev() {
            node_objects(node, out);
        }
    }
    out.push(EditableObject::Implementation(r.id));
}

fn node_type_objects(r: &NodeTypeRecord, out: &mut Vec<EditableObject>) {
    for imp in r.implementations.iter().rev() {
        impl_objects(imp, out);
    }
    for pt in r.port_types.iter().rev() {
        port_type_objects(pt, out);
    }
    out.push(EditableObject::NodeType(r.id));
}
