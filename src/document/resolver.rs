//! Library lookup for cross-file references.
//!
//! When a graph names a library that is not loaded yet, the loader asks a
//! [`LibraryResolver`] for the full document.

use super::LibraryDocument;
use crate::config::LibraryConfig;
use crate::error::{EditError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Source of library documents by filename.
#[cfg_attr(test, mockall::automock)]
pub trait LibraryResolver {
    fn access(&mut self, filename: &str) -> Result<LibraryDocument>;
}

/// Resolves nothing. Every reference to an unloaded library is reported missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl LibraryResolver for NoResolver {
    fn access(&mut self, filename: &str) -> Result<LibraryDocument> {
        Err(EditError::not_found("library", filename))
    }
}

/// Looks libraries up in a list of directories, first match wins.
#[derive(Debug, Clone, Default)]
pub struct FsLibraryResolver {
    search_paths: Vec<PathBuf>,
}

impl FsLibraryResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(config.search_paths.clone())
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn locate(&self, filename: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.is_file())
    }
}

impl LibraryResolver for FsLibraryResolver {
    fn access(&mut self, filename: &str) -> Result<LibraryDocument> {
        let path = self
            .locate(filename)
            .ok_or_else(|| EditError::not_found("library", filename))?;
        tracing::debug!(library = filename, path = %path.display(), "resolved library");
        LibraryDocument::load(&path)
    }
}

/// In-memory set of library documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    libraries: HashMap<String, LibraryDocument>,
    accessed: Vec<String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, doc: LibraryDocument) -> Self {
        self.insert(doc);
        self
    }

    pub fn insert(&mut self, doc: LibraryDocument) {
        self.libraries.insert(doc.filename.clone(), doc);
    }

    /// Filenames requested so far, in request order.
    pub fn accessed(&self) -> &[String] {
        &self.accessed
    }
}

impl LibraryResolver for MemoryResolver {
    fn access(&mut self, filename: &str) -> Result<LibraryDocument> {
        self.accessed.push(filename.to_string());
        self.libraries
            .get(filename)
            .cloned()
            .ok_or_else(|| EditError::not_found("library", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        GraphDocument, NodeDocument, NodeTypeDocument, PortTypeDocument, SignalGraphDocument,
        SignalTypeDocument,
    };
    use crate::model::Model;
    use mockall::predicate::eq;

    fn filter_library() -> LibraryDocument {
        LibraryDocument {
            filename: "filters.json".into(),
            signal_types: vec![SignalTypeDocument::new("sample")],
            node_types: vec![NodeTypeDocument {
                name: "LowPass".into(),
                in_ports: vec![PortTypeDocument {
                    name: "x".into(),
                    signal_type: "sample".into(),
                }],
                out_ports: vec![PortTypeDocument {
                    name: "y".into(),
                    signal_type: "sample".into(),
                }],
                implementations: Vec::new(),
            }],
        }
    }

    fn graph_using_filters() -> SignalGraphDocument {
        SignalGraphDocument {
            filename: "main.json".into(),
            graph: GraphDocument {
                libraries: vec!["filters.json".into()],
                nodes: vec![NodeDocument::Node {
                    name: "lp".into(),
                    node_type: "LowPass".into(),
                }],
                connections: Vec::new(),
            },
        }
    }

    #[test]
    fn test_graph_load_asks_resolver_once() {
        let mut resolver = MockLibraryResolver::new();
        resolver
            .expect_access()
            .with(eq("filters.json"))
            .times(1)
            .returning(|_| Ok(filter_library()));

        let mut model = Model::new();
        let id = model
            .load_signal_graph(&graph_using_filters(), &mut resolver)
            .unwrap();
        let graph = model.signal_graph(id).unwrap().graph;
        assert_eq!(model.graph(graph).unwrap().nodes().len(), 1);
        assert!(model.registry().library_by_name("filters.json").is_some());
    }

    #[test]
    fn test_resolver_failure_does_not_abort_load() {
        let mut resolver = MockLibraryResolver::new();
        resolver
            .expect_access()
            .returning(|name| Err(EditError::not_found("library", name)));

        let mut model = Model::new();
        let id = model
            .load_signal_graph(&graph_using_filters(), &mut resolver)
            .unwrap();
        let graph = model.signal_graph(id).unwrap().graph;
        assert!(model.graph(graph).unwrap().nodes().is_empty());
    }

    #[test]
    fn test_memory_resolver_records_requests() {
        let mut resolver = MemoryResolver::new().with(filter_library());
        assert!(resolver.access("filters.json").is_ok());
        assert!(resolver.access("other.json").is_err());
        assert_eq!(resolver.accessed(), &["filters.json", "other.json"]);
    }

    #[test]
    fn test_fs_resolver_searches_paths_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        filter_library()
            .save(second.path().join("filters.json"))
            .unwrap();

        let mut resolver =
            FsLibraryResolver::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let doc = resolver.access("filters.json").unwrap();
        assert_eq!(doc.node_types[0].name, "LowPass");
        assert!(resolver.access("missing.json").is_err());
    }
}
