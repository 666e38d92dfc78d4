//! Document snapshots of libraries and signal graphs.
//!
//! The on-disk format is plain JSON through serde. A document only names
//! things (signal types, node types, nodes and ports are referenced by name);
//! loading resolves those names against the registry and builds the live
//! model through the regular edit pipeline, so every invariant the editor
//! enforces also holds for loaded documents.
//!
//! Loads are all-or-nothing: on error the model is restored to the state it
//! had before the call. A missing referenced library is the one soft failure:
//! it is logged and the load continues without it.

pub mod resolver;

pub use resolver::{FsLibraryResolver, LibraryResolver, MemoryResolver, NoResolver};

use crate::error::{EditError, Result, ResultExt};
use crate::id::{GraphId, LibraryId, NodeTypeId, SignalGraphId};
use crate::model::types::{AUTO_INPUT_NODE_TYPE, AUTO_OUTPUT_NODE_TYPE};
use crate::model::{
    Direction, ImplementationKind, Mode, Model, NewImplementation, Scope, SignalType,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ==================== Document types ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTypeDocument {
    pub name: String,
    #[serde(default)]
    pub ctype: String,
    #[serde(default)]
    pub channel_id: String,
    /// `"local"` or empty for global.
    #[serde(default)]
    pub scope: String,
    /// `"sync"` or empty for async.
    #[serde(default)]
    pub mode: String,
}

impl SignalTypeDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ctype: String::new(),
            channel_id: String::new(),
            scope: String::new(),
            mode: String::new(),
        }
    }

    pub fn to_signal_type(&self) -> Result<SignalType> {
        let scope = Scope::from_attr(&self.scope).ok_or_else(|| {
            EditError::Serialization(format!(
                "signal type '{}': invalid scope '{}'",
                self.name, self.scope
            ))
        })?;
        let mode = Mode::from_attr(&self.mode).ok_or_else(|| {
            EditError::Serialization(format!(
                "signal type '{}': invalid mode '{}'",
                self.name, self.mode
            ))
        })?;
        Ok(SignalType::new(&self.name)
            .with_ctype(&self.ctype)
            .with_channel_id(&self.channel_id)
            .with_scope(scope)
            .with_mode(mode))
    }
}

impl From<&SignalType> for SignalTypeDocument {
    fn from(st: &SignalType) -> Self {
        Self {
            name: st.name.clone(),
            ctype: st.ctype.clone(),
            channel_id: st.channel_id.clone(),
            scope: st.scope.as_attr().to_string(),
            mode: st.mode.as_attr().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTypeDocument {
    pub name: String,
    pub signal_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImplementationDocument {
    Elementary { name: String },
    Graph { graph: GraphDocument },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeDocument {
    pub name: String,
    #[serde(default)]
    pub in_ports: Vec<PortTypeDocument>,
    #[serde(default)]
    pub out_ports: Vec<PortTypeDocument>,
    #[serde(default)]
    pub implementations: Vec<ImplementationDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeDocument {
    Input { name: String, signal_type: String },
    Output { name: String, signal_type: String },
    Node { name: String, node_type: String },
}

impl NodeDocument {
    pub fn name(&self) -> &str {
        match self {
            NodeDocument::Input { name, .. }
            | NodeDocument::Output { name, .. }
            | NodeDocument::Node { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub node: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDocument {
    pub from: PortRef,
    pub to: PortRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDocument {
    pub filename: String,
    #[serde(default)]
    pub signal_types: Vec<SignalTypeDocument>,
    #[serde(default)]
    pub node_types: Vec<NodeTypeDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalGraphDocument {
    pub filename: String,
    pub graph: GraphDocument,
}

/// Either kind of document, as found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyDocument {
    // Tried first: a library document has no `graph` field.
    SignalGraph(SignalGraphDocument),
    Library(LibraryDocument),
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(EditError::from)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(EditError::from)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)
        .map_err(EditError::from)
        .with_context(|| format!("Failed to write {}", path.display()))
}

macro_rules! json_document {
    ($ty:ty) => {
        impl $ty {
            pub fn from_json(json: &str) -> Result<Self> {
                Ok(serde_json::from_str(json)?)
            }

            pub fn to_json(&self) -> Result<String> {
                Ok(serde_json::to_string_pretty(self)?)
            }

            pub fn load(path: impl AsRef<Path>) -> Result<Self> {
                read_json(path.as_ref())
            }

            pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
                write_json(self, path.as_ref())
            }
        }
    };
}

json_document!(LibraryDocument);
json_document!(SignalGraphDocument);
json_document!(AnyDocument);

impl AnyDocument {
    pub fn filename(&self) -> &str {
        match self {
            AnyDocument::SignalGraph(doc) => &doc.filename,
            AnyDocument::Library(doc) => &doc.filename,
        }
    }
}

// ==================== Loading ====================

impl Model {
    /// Load a library document. A library that is already loaded is returned
    /// as is.
    pub fn load_library(
        &mut self,
        doc: &LibraryDocument,
        resolver: &mut dyn LibraryResolver,
    ) -> Result<LibraryId> {
        if let Some(existing) = self.registry().library_by_name(&doc.filename) {
            tracing::debug!(library = %doc.filename, "library already loaded");
            return Ok(existing);
        }
        let backup = self.clone();
        match self.populate_library(doc, resolver) {
            Ok(id) => {
                tracing::info!(
                    library = %doc.filename,
                    signal_types = doc.signal_types.len(),
                    node_types = doc.node_types.len(),
                    "loaded library"
                );
                Ok(id)
            }
            Err(e) => {
                *self = backup;
                tracing::warn!(library = %doc.filename, error = %e, "library load failed");
                Err(e.with_context(format!("Failed to load library '{}'", doc.filename)))
            }
        }
    }

    /// Load a signal graph document. A graph that is already open is returned
    /// as is.
    pub fn load_signal_graph(
        &mut self,
        doc: &SignalGraphDocument,
        resolver: &mut dyn LibraryResolver,
    ) -> Result<SignalGraphId> {
        if let Some(existing) = self.signal_graph_by_name(&doc.filename) {
            tracing::debug!(signal_graph = %doc.filename, "signal graph already open");
            return Ok(existing);
        }
        let backup = self.clone();
        let result = self.create_signal_graph(&doc.filename).and_then(|id| {
            let graph = self
                .signal_graph(id)
                .map(|sg| sg.graph)
                .ok_or_else(|| EditError::not_found("signal graph", &doc.filename))?;
            self.populate_graph(graph, &doc.graph, resolver)?;
            Ok(id)
        });
        match result {
            Ok(id) => {
                tracing::info!(
                    signal_graph = %doc.filename,
                    nodes = doc.graph.nodes.len(),
                    connections = doc.graph.connections.len(),
                    "loaded signal graph"
                );
                Ok(id)
            }
            Err(e) => {
                *self = backup;
                tracing::warn!(signal_graph = %doc.filename, error = %e, "signal graph load failed");
                Err(e.with_context(format!("Failed to load signal graph '{}'", doc.filename)))
            }
        }
    }

    /// Make sure `filename` is loaded, asking the resolver if it is not.
    pub fn ensure_library(
        &mut self,
        filename: &str,
        resolver: &mut dyn LibraryResolver,
    ) -> Result<LibraryId> {
        if let Some(id) = self.registry().library_by_name(filename) {
            return Ok(id);
        }
        let doc = resolver.access(filename)?;
        self.load_library(&doc, resolver)
    }

    fn populate_library(
        &mut self,
        doc: &LibraryDocument,
        resolver: &mut dyn LibraryResolver,
    ) -> Result<LibraryId> {
        Self::check_unique_names(doc)?;
        let lib = self.create_library(&doc.filename);
        for st in &doc.signal_types {
            let signal_type = st.to_signal_type()?;
            self.register_signal_type(lib, signal_type)?;
        }

        // Types and ports first so implementations may use any type of the file.
        let mut created = Vec::new();
        for nt in &doc.node_types {
            if let Some(existing) = self.registry().node_type_by_name(&nt.name) {
                if self.node_type_matches(existing, nt) {
                    let owner = self
                        .registry()
                        .node_type(existing)
                        .map(|t| t.defined_at.clone())
                        .unwrap_or_default();
                    tracing::warn!(
                        library = %doc.filename,
                        node_type = %nt.name,
                        defined_at = %owner,
                        "reusing identical node type from another library; it is not exported with this one"
                    );
                    continue;
                }
                return Err(EditError::duplicate("node type", &nt.name));
            }
            let id = self.add_node_type(lib, &nt.name)?;
            for (direction, ports) in [(Direction::In, &nt.in_ports), (Direction::Out, &nt.out_ports)]
            {
                for port in ports {
                    let signal_type = self
                        .registry()
                        .signal_type_by_name(&port.signal_type)
                        .ok_or_else(|| EditError::not_found("signal type", &port.signal_type))?;
                    self.add_port_type(id, direction, &port.name, signal_type)
                        .with_context(|| format!("node type '{}'", nt.name))?;
                }
            }
            created.push((id, nt));
        }

        for (id, nt) in created {
            for imp in &nt.implementations {
                match imp {
                    ImplementationDocument::Elementary { name } => {
                        self.add_implementation(id, NewImplementation::Elementary(name.clone()))?;
                    }
                    ImplementationDocument::Graph { graph } => {
                        let imp_id = self.add_implementation(id, NewImplementation::Graph)?;
                        let graph_id = self
                            .implementation_graph(imp_id)
                            .ok_or_else(|| EditError::not_found("graph", imp_id.to_string()))?;
                        self.populate_graph(graph_id, graph, resolver)
                            .with_context(|| format!("implementation of '{}'", nt.name))?;
                    }
                }
            }
        }
        Ok(lib)
    }

    /// A library lists each signal type and node type name once.
    fn check_unique_names(doc: &LibraryDocument) -> Result<()> {
        let mut seen = HashSet::new();
        for name in doc.signal_types.iter().map(|st| &st.name) {
            if !seen.insert(name) {
                return Err(EditError::duplicate("signal type", name));
            }
        }
        seen.clear();
        for name in doc.node_types.iter().map(|nt| &nt.name) {
            if !seen.insert(name) {
                return Err(EditError::duplicate("node type", name));
            }
        }
        Ok(())
    }

    /// Same name and same ports (names, directions, signal types).
    fn node_type_matches(&self, id: NodeTypeId, doc: &NodeTypeDocument) -> bool {
        let Some(nt) = self.registry().node_type(id) else {
            return false;
        };
        let same = |direction: Direction, ports: &[PortTypeDocument]| {
            let current = nt.ports(direction);
            current.len() == ports.len()
                && current.iter().zip(ports).all(|(&pt, doc)| {
                    self.port_type(pt)
                        .map(|pt| {
                            pt.name == doc.name
                                && self.registry().signal_type_name(pt.signal_type)
                                    == doc.signal_type
                        })
                        .unwrap_or(false)
                })
        };
        same(Direction::In, &doc.in_ports) && same(Direction::Out, &doc.out_ports)
    }

    fn populate_graph(
        &mut self,
        graph: GraphId,
        doc: &GraphDocument,
        resolver: &mut dyn LibraryResolver,
    ) -> Result<()> {
        for filename in &doc.libraries {
            if let Err(e) = self.ensure_library(filename, resolver) {
                tracing::warn!(library = %filename, error = %e, "referenced library unavailable, continuing without it");
            }
        }

        for node in &doc.nodes {
            match node {
                NodeDocument::Node { name, node_type } => {
                    match self.registry().node_type_by_name(node_type) {
                        Some(t) => {
                            self.add_node(graph, name, t)?;
                        }
                        None => {
                            tracing::warn!(node = %name, node_type = %node_type, "skipping node of unknown type");
                        }
                    }
                }
                NodeDocument::Input { name, signal_type }
                | NodeDocument::Output { name, signal_type } => {
                    let Some(st) = self.registry().signal_type_by_name(signal_type) else {
                        tracing::warn!(node = %name, signal_type = %signal_type, "skipping node of unknown signal type");
                        continue;
                    };
                    if matches!(node, NodeDocument::Input { .. }) {
                        self.add_input_node(graph, name, st)?;
                    } else {
                        self.add_output_node(graph, name, st)?;
                    }
                }
            }
        }

        for conn in &doc.connections {
            let from = self
                .node_by_name(graph, &conn.from.node)
                .and_then(|n| self.port_by_name(n, &conn.from.port));
            let to = self
                .node_by_name(graph, &conn.to.node)
                .and_then(|n| self.port_by_name(n, &conn.to.port));
            match (from, to) {
                (Some(a), Some(b)) => {
                    self.connect(a, b).with_context(|| {
                        format!(
                            "connection {}.{} -> {}.{}",
                            conn.from.node, conn.from.port, conn.to.node, conn.to.port
                        )
                    })?;
                }
                _ => {
                    tracing::warn!(
                        from = %format!("{}.{}", conn.from.node, conn.from.port),
                        to = %format!("{}.{}", conn.to.node, conn.to.port),
                        "skipping connection with unresolved endpoint"
                    );
                }
            }
        }
        Ok(())
    }

    // ==================== Export ====================

    pub fn export_library(&self, id: LibraryId) -> Result<LibraryDocument> {
        let lib = self
            .registry()
            .library(id)
            .ok_or_else(|| EditError::not_found("library", id.to_string()))?;

        let signal_types = lib
            .signal_types()
            .iter()
            .filter_map(|&st| self.registry().signal_type(st))
            .map(SignalTypeDocument::from)
            .collect();

        let mut node_types = Vec::with_capacity(lib.node_types().len());
        for &t in lib.node_types() {
            let Some(nt) = self.registry().node_type(t) else {
                continue;
            };
            let ports = |direction: Direction| -> Vec<PortTypeDocument> {
                nt.ports(direction)
                    .iter()
                    .filter_map(|&pt| self.port_type(pt))
                    .map(|pt| PortTypeDocument {
                        name: pt.name.clone(),
                        signal_type: self.registry().signal_type_name(pt.signal_type),
                    })
                    .collect()
            };
            let mut implementations = Vec::with_capacity(nt.implementations().len());
            for &imp in nt.implementations() {
                let Some(implementation) = self.implementation(imp) else {
                    continue;
                };
                implementations.push(match &implementation.kind {
                    ImplementationKind::Elementary(name) => {
                        ImplementationDocument::Elementary { name: name.clone() }
                    }
                    ImplementationKind::Graph(g) => ImplementationDocument::Graph {
                        graph: self.export_graph(*g)?,
                    },
                });
            }
            node_types.push(NodeTypeDocument {
                name: nt.name.clone(),
                in_ports: ports(Direction::In),
                out_ports: ports(Direction::Out),
                implementations,
            });
        }

        Ok(LibraryDocument {
            filename: lib.filename.clone(),
            signal_types,
            node_types,
        })
    }

    pub fn export_signal_graph(&self, id: SignalGraphId) -> Result<SignalGraphDocument> {
        let sg = self
            .signal_graph(id)
            .ok_or_else(|| EditError::not_found("signal graph", id.to_string()))?;
        Ok(SignalGraphDocument {
            filename: sg.filename.clone(),
            graph: self.export_graph(sg.graph)?,
        })
    }

    pub fn export_graph(&self, id: GraphId) -> Result<GraphDocument> {
        let graph = self
            .graph(id)
            .ok_or_else(|| EditError::not_found("graph", id.to_string()))?;

        let libraries = graph
            .libraries()
            .iter()
            .filter_map(|&l| self.registry().library(l))
            .map(|lib| lib.filename.clone())
            .collect();

        let mut nodes = Vec::with_capacity(graph.nodes().len());
        let mut connections = Vec::new();
        for &n in graph.nodes() {
            let Some(node) = self.node(n) else {
                continue;
            };
            let type_name = self.registry().node_type_name(node.node_type);
            let single_signal = || {
                node.all_ports()
                    .next()
                    .and_then(|p| self.port(p))
                    .map(|p| self.registry().signal_type_name(p.signal_type))
                    .unwrap_or_default()
            };
            nodes.push(if type_name.starts_with(AUTO_INPUT_NODE_TYPE) {
                NodeDocument::Input {
                    name: node.name.clone(),
                    signal_type: single_signal(),
                }
            } else if type_name.starts_with(AUTO_OUTPUT_NODE_TYPE) {
                NodeDocument::Output {
                    name: node.name.clone(),
                    signal_type: single_signal(),
                }
            } else {
                NodeDocument::Node {
                    name: node.name.clone(),
                    node_type: type_name,
                }
            });

            // Each connection is written once, from its output side.
            for &p in node.out_ports() {
                let Some(port) = self.port(p) else {
                    continue;
                };
                for peer in port.connected_ports() {
                    let Some(peer_port) = self.port(peer) else {
                        continue;
                    };
                    let peer_node = self
                        .node(peer_port.node)
                        .map(|pn| pn.name.clone())
                        .unwrap_or_default();
                    connections.push(ConnectionDocument {
                        from: PortRef {
                            node: node.name.clone(),
                            port: port.name.clone(),
                        },
                        to: PortRef {
                            node: peer_node,
                            port: peer_port.name.clone(),
                        },
                    });
                }
            }
        }

        Ok(GraphDocument {
            libraries,
            nodes,
            connections,
        })
    }
}
