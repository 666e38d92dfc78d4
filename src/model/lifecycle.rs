//! Opening and closing whole documents.
//!
//! Documents are the tree roots. Opening one creates an empty library or
//! signal graph root that loading then fills through the regular edit
//! pipeline. Closing tears the contents down through the same pipeline and
//! drops the root. Neither is undoable.

use super::Model;
use crate::error::{EditError, Result};
use crate::id::{GraphId, LibraryId, NodeId, NodeTypeId, SignalGraphId, SignalTypeId};
use crate::model::instance::{GraphOwner, SignalGraph, SignalGraphType};
use crate::model::types::Library;
use crate::tree::EditableObject;
use std::collections::HashSet;

impl Model {
    /// Create an empty library root, or return the loaded one.
    pub fn create_library(&mut self, filename: &str) -> LibraryId {
        if let Some(existing) = self.registry.library_by_name(filename) {
            return existing;
        }
        let id = self.registry.libraries.reserve();
        let order = self.registry.libraries.len();
        self.registry
            .libraries
            .insert_at(id, filename, Library::new(filename), order);
        self.with_tree(|model, tree| model.build_library(tree, id));
        tracing::debug!(library = filename, "created library");
        id
    }

    /// Create an empty signal graph root.
    pub fn create_signal_graph(&mut self, filename: &str) -> Result<SignalGraphId> {
        if self.signal_graphs.lookup(filename).is_some() {
            return Err(EditError::duplicate("signal graph", filename));
        }
        let id = self.signal_graphs.reserve();
        let graph = self.graphs.reserve();
        self.graphs
            .insert_at(graph, SignalGraphType::new(GraphOwner::Document(id)));
        let order = self.signal_graphs.len();
        self.signal_graphs.insert_at(
            id,
            filename,
            SignalGraph {
                filename: filename.to_string(),
                graph,
            },
            order,
        );
        self.with_tree(|model, tree| model.build_signal_graph(tree, id));
        tracing::debug!(signal_graph = filename, "created signal graph");
        Ok(id)
    }

    /// Remove a signal graph document with all of its nodes.
    pub fn unload_signal_graph(&mut self, id: SignalGraphId) -> Result<()> {
        let sg = self
            .signal_graphs
            .get(id)
            .cloned()
            .ok_or_else(|| EditError::not_found("signal graph", id.to_string()))?;
        let nodes = self
            .graphs
            .get(sg.graph)
            .map(|g| g.nodes.clone())
            .unwrap_or_default();
        for node in nodes.into_iter().rev() {
            self.remove_node(node)?;
        }
        self.remove_root(EditableObject::SignalGraph(id));
        self.graphs.remove(sg.graph);
        self.signal_graphs.remove(id, &sg.filename);
        tracing::info!(signal_graph = %sg.filename, "unloaded signal graph");
        Ok(())
    }

    /// Remove a library and everything it defines.
    ///
    /// Refused while any of its node types is instantiated outside the
    /// library itself, or any of its signal types is carried by a port of a
    /// foreign node type. Input and output nodes inside the library's own
    /// implementations do not count.
    pub fn unload_library(&mut self, id: LibraryId) -> Result<()> {
        let lib = self
            .registry
            .library(id)
            .cloned()
            .ok_or_else(|| EditError::not_found("library", id.to_string()))?;
        let own_types: HashSet<NodeTypeId> = lib.node_types.iter().copied().collect();
        let own_signals: HashSet<SignalTypeId> = lib.signal_types.iter().copied().collect();

        for &t in &lib.node_types {
            let Some(nt) = self.registry.node_type(t) else {
                continue;
            };
            let outside = nt
                .instances
                .iter()
                .filter_map(|&inst| self.nodes.get(inst))
                .find(|node| !self.graph_within(node.graph, &own_types));
            if let Some(node) = outside {
                tracing::warn!(library = %lib.filename, node = %node.name, "refusing to unload library in use");
                return Err(EditError::in_use(
                    "library",
                    &lib.filename,
                    format!("node type '{}' is used by node '{}'", nt.name, node.name),
                ));
            }
        }

        for (_, pt) in self.port_types.iter() {
            if !own_signals.contains(&pt.signal_type) || own_types.contains(&pt.node_type) {
                continue;
            }
            let Some(nt) = self.registry.node_type(pt.node_type) else {
                continue;
            };
            // Synthetic types used only inside this library go with its signal types.
            if nt.is_synthetic() && self.used_only_within(&nt.instances, &own_types) {
                continue;
            }
            tracing::warn!(library = %lib.filename, node_type = %nt.name, "refusing to unload library in use");
            return Err(EditError::in_use(
                "library",
                &lib.filename,
                format!(
                    "signal type '{}' is carried by node type '{}'",
                    self.registry.signal_type_name(pt.signal_type),
                    nt.name
                ),
            ));
        }

        for &t in &lib.node_types {
            let implementations = self
                .registry
                .node_type(t)
                .map(|nt| nt.implementations.clone())
                .unwrap_or_default();
            for imp in implementations.into_iter().rev() {
                self.remove_implementation(imp)?;
            }
        }
        for &t in lib.node_types.iter().rev() {
            self.remove_node_type(t)?;
        }
        for &st in lib.signal_types.iter().rev() {
            self.remove_signal_type(st)?;
        }

        for (_, graph) in self.graphs.iter_mut() {
            graph.libraries.retain(|&l| l != id);
        }
        self.remove_root(EditableObject::Library(id));
        self.registry.libraries.remove(id, &lib.filename);
        tracing::info!(library = %lib.filename, "unloaded library");
        Ok(())
    }

    /// Whether `graph` is the implementation of one of `types`.
    fn graph_within(&self, graph: GraphId, types: &HashSet<NodeTypeId>) -> bool {
        self.embracing_node_type(graph)
            .map(|t| types.contains(&t))
            .unwrap_or(false)
    }

    fn used_only_within(&self, instances: &[NodeId], types: &HashSet<NodeTypeId>) -> bool {
        instances.iter().all(|&inst| {
            self.nodes
                .get(inst)
                .map(|node| self.graph_within(node.graph, types))
                .unwrap_or(true)
        })
    }

    fn remove_root(&mut self, object: EditableObject) {
        for root in self.tree.occurrences(&object).to_vec() {
            self.tree.remove(root);
        }
    }
}
