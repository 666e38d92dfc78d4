//! Test data builders for documents

use signalgraph_rs::document::{
    ConnectionDocument, GraphDocument, ImplementationDocument, LibraryDocument, NodeDocument,
    NodeTypeDocument, PortRef, PortTypeDocument, SignalGraphDocument, SignalTypeDocument,
};

/// Builder for library documents
pub struct LibraryBuilder {
    doc: LibraryDocument,
}

impl LibraryBuilder {
    pub fn new(filename: &str) -> Self {
        Self {
            doc: LibraryDocument {
                filename: filename.to_string(),
                signal_types: Vec::new(),
                node_types: Vec::new(),
            },
        }
    }

    pub fn signal_type(mut self, name: &str) -> Self {
        self.doc.signal_types.push(SignalTypeDocument::new(name));
        self
    }

    pub fn signal_type_doc(mut self, doc: SignalTypeDocument) -> Self {
        self.doc.signal_types.push(doc);
        self
    }

    /// Node type with `(port, signal type)` pairs per direction
    pub fn node_type(mut self, name: &str, inputs: &[(&str, &str)], outputs: &[(&str, &str)]) -> Self {
        self.doc.node_types.push(NodeTypeDocument {
            name: name.to_string(),
            in_ports: port_docs(inputs),
            out_ports: port_docs(outputs),
            implementations: Vec::new(),
        });
        self
    }

    /// Attach an implementation to the most recently added node type
    pub fn implementation(mut self, implementation: ImplementationDocument) -> Self {
        if let Some(last) = self.doc.node_types.last_mut() {
            last.implementations.push(implementation);
        }
        self
    }

    pub fn build(self) -> LibraryDocument {
        self.doc
    }
}

fn port_docs(ports: &[(&str, &str)]) -> Vec<PortTypeDocument> {
    ports
        .iter()
        .map(|(name, st)| PortTypeDocument {
            name: name.to_string(),
            signal_type: st.to_string(),
        })
        .collect()
}

/// Builder for graph bodies, used for signal graphs and implementations
#[derive(Default)]
pub struct GraphBuilder {
    doc: GraphDocument,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn library(mut self, filename: &str) -> Self {
        self.doc.libraries.push(filename.to_string());
        self
    }

    pub fn input(mut self, name: &str, signal_type: &str) -> Self {
        self.doc.nodes.push(NodeDocument::Input {
            name: name.to_string(),
            signal_type: signal_type.to_string(),
        });
        self
    }

    pub fn output(mut self, name: &str, signal_type: &str) -> Self {
        self.doc.nodes.push(NodeDocument::Output {
            name: name.to_string(),
            signal_type: signal_type.to_string(),
        });
        self
    }

    pub fn node(mut self, name: &str, node_type: &str) -> Self {
        self.doc.nodes.push(NodeDocument::Node {
            name: name.to_string(),
            node_type: node_type.to_string(),
        });
        self
    }

    /// Connect `(node, port)` to `(node, port)`
    pub fn connect(mut self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.doc.connections.push(ConnectionDocument {
            from: PortRef {
                node: from.0.to_string(),
                port: from.1.to_string(),
            },
            to: PortRef {
                node: to.0.to_string(),
                port: to.1.to_string(),
            },
        });
        self
    }

    pub fn build(self) -> GraphDocument {
        self.doc
    }

    pub fn into_implementation(self) -> ImplementationDocument {
        ImplementationDocument::Graph { graph: self.doc }
    }

    pub fn into_signal_graph(self, filename: &str) -> SignalGraphDocument {
        SignalGraphDocument {
            filename: filename.to_string(),
            graph: self.doc,
        }
    }
}

/// `base.json` with `s1`, `s2` and a `Test` type, plus `main.json` wiring
/// `sensor -> test -> actuator`
pub fn pipeline_documents() -> (LibraryDocument, SignalGraphDocument) {
    let library = LibraryBuilder::new("base.json")
        .signal_type("s1")
        .signal_type("s2")
        .node_type("Test", &[("in", "s1")], &[("out", "s1")])
        .implementation(ImplementationDocument::Elementary {
            name: "test_impl".to_string(),
        })
        .build();
    let graph = GraphBuilder::new()
        .library("base.json")
        .input("sensor", "s1")
        .node("test", "Test")
        .output("actuator", "s1")
        .connect(("sensor", "out"), ("test", "in"))
        .connect(("test", "out"), ("actuator", "in"))
        .into_signal_graph("main.json");
    (library, graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_builder() {
        let doc = LibraryBuilder::new("lib.json")
            .signal_type("s1")
            .node_type("T", &[("a", "s1")], &[])
            .build();

        assert_eq!(doc.filename, "lib.json");
        assert_eq!(doc.signal_types.len(), 1);
        assert_eq!(doc.node_types[0].in_ports[0].name, "a");
        assert!(doc.node_types[0].out_ports.is_empty());
    }
}
