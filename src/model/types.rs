//! Type layer: signal types, port types, node types and their implementations.
//!
//! A node type is a template. It declares ordered input and output port types
//! and zero or more implementations. Nodes instantiate it and get snapshot
//! copies of the port types as live ports.

use crate::id::{GraphId, ImplId, NodeId, NodeTypeId, PortTypeId, SignalTypeId};
use serde::{Deserialize, Serialize};

/// Name prefix of the synthetic type created for input nodes.
pub const AUTO_INPUT_NODE_TYPE: &str = "autoInputNodeType-";
/// Name prefix of the synthetic type created for output nodes.
pub const AUTO_OUTPUT_NODE_TYPE: &str = "autoOutputNodeType-";

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => write!(f, "input"),
            Direction::Out => write!(f, "output"),
        }
    }
}

/// Visibility of a signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    Local,
    #[default]
    Global,
}

impl Scope {
    /// Parse the document attribute: `"local"` or empty.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Scope::Local),
            "" => Some(Scope::Global),
            _ => None,
        }
    }

    pub fn as_attr(self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "",
        }
    }
}

/// Transfer mode of a signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Sync,
    #[default]
    Async,
}

impl Mode {
    /// Parse the document attribute: `"sync"` or empty.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "sync" => Some(Mode::Sync),
            "" => Some(Mode::Async),
            _ => None,
        }
    }

    pub fn as_attr(self) -> &'static str {
        match self {
            Mode::Sync => "sync",
            Mode::Async => "",
        }
    }
}

/// Named value/stream type carried on ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalType {
    pub name: String,
    pub ctype: String,
    pub channel_id: String,
    pub scope: Scope,
    pub mode: Mode,
    /// Filename of the defining library.
    pub defined_at: String,
}

impl SignalType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ctype: String::new(),
            channel_id: String::new(),
            scope: Scope::Global,
            mode: Mode::Async,
            defined_at: String::new(),
        }
    }

    pub fn with_ctype(mut self, ctype: impl Into<String>) -> Self {
        self.ctype = ctype.into();
        self
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn defined_at(mut self, filename: impl Into<String>) -> Self {
        self.defined_at = filename.into();
        self
    }

    /// Two definitions are compatible when every content field matches.
    /// `defined_at` is provenance and not compared.
    pub fn is_compatible(&self, other: &SignalType) -> bool {
        self.name == other.name
            && self.ctype == other.ctype
            && self.channel_id == other.channel_id
            && self.scope == other.scope
            && self.mode == other.mode
    }
}

/// A port declaration on a node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortType {
    pub name: String,
    pub direction: Direction,
    pub signal_type: SignalTypeId,
    pub node_type: NodeTypeId,
}

/// How a node type is realized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImplementationKind {
    /// Opaque implementation, identified by name only.
    Elementary(String),
    /// Nested signal graph.
    Graph(GraphId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implementation {
    pub node_type: NodeTypeId,
    pub kind: ImplementationKind,
}

impl Implementation {
    pub fn graph(&self) -> Option<GraphId> {
        match self.kind {
            ImplementationKind::Graph(g) => Some(g),
            ImplementationKind::Elementary(_) => None,
        }
    }
}

/// Reusable node template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    pub name: String,
    /// Filename of the defining library; empty for synthetic types.
    pub defined_at: String,
    pub(crate) in_ports: Vec<PortTypeId>,
    pub(crate) out_ports: Vec<PortTypeId>,
    pub(crate) implementations: Vec<ImplId>,
    pub(crate) instances: Vec<NodeId>,
}

impl NodeType {
    pub fn new(name: impl Into<String>, defined_at: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defined_at: defined_at.into(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            implementations: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn in_ports(&self) -> &[PortTypeId] {
        &self.in_ports
    }

    pub fn out_ports(&self) -> &[PortTypeId] {
        &self.out_ports
    }

    pub fn ports(&self, direction: Direction) -> &[PortTypeId] {
        match direction {
            Direction::In => &self.in_ports,
            Direction::Out => &self.out_ports,
        }
    }

    pub(crate) fn ports_mut(&mut self, direction: Direction) -> &mut Vec<PortTypeId> {
        match direction {
            Direction::In => &mut self.in_ports,
            Direction::Out => &mut self.out_ports,
        }
    }

    /// Port types in document order: inputs first, then outputs.
    pub fn port_types(&self) -> impl Iterator<Item = PortTypeId> + '_ {
        self.in_ports.iter().chain(self.out_ports.iter()).copied()
    }

    pub fn port_count(&self) -> usize {
        self.in_ports.len() + self.out_ports.len()
    }

    pub fn implementations(&self) -> &[ImplId] {
        &self.implementations
    }

    pub fn instances(&self) -> &[NodeId] {
        &self.instances
    }

    /// Synthetic types back input/output nodes and belong to no library.
    pub fn is_synthetic(&self) -> bool {
        self.defined_at.is_empty()
    }
}

/// A library file: the signal types and node types it defines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Library {
    pub filename: String,
    pub(crate) signal_types: Vec<SignalTypeId>,
    pub(crate) node_types: Vec<NodeTypeId>,
}

impl Library {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            signal_types: Vec::new(),
            node_types: Vec::new(),
        }
    }

    pub fn signal_types(&self) -> &[SignalTypeId] {
        &self.signal_types
    }

    pub fn node_types(&self) -> &[NodeTypeId] {
        &self.node_types
    }
}

/// Name of the synthetic type whose single port has `port_direction`.
pub fn auto_node_type_name(port_direction: Direction, signal_type: &str) -> String {
    match port_direction {
        // An input node feeds the graph, so its single port is an output.
        Direction::Out => format!("{}{}", AUTO_INPUT_NODE_TYPE, signal_type),
        Direction::In => format!("{}{}", AUTO_OUTPUT_NODE_TYPE, signal_type),
    }
}
