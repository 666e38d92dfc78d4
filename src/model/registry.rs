//! Named-entity registries: signal types, node types and libraries.
//!
//! Every store keeps its registration order, so `list()`-style enumeration is
//! stable across removals and an undone removal lands back at its old place.

use crate::error::{EditError, Result};
use crate::id::{LibraryId, NodeTypeId, SignalTypeId};
use crate::model::arena::Store;
use crate::model::types::{Library, NodeType, SignalType};

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    pub(crate) signal_types: Store<SignalTypeId, SignalType>,
    pub(crate) node_types: Store<NodeTypeId, NodeType>,
    pub(crate) libraries: Store<LibraryId, Library>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_type(&self, id: SignalTypeId) -> Option<&SignalType> {
        self.signal_types.get(id)
    }

    pub fn node_type(&self, id: NodeTypeId) -> Option<&NodeType> {
        self.node_types.get(id)
    }

    pub fn library(&self, id: LibraryId) -> Option<&Library> {
        self.libraries.get(id)
    }

    pub fn signal_type_by_name(&self, name: &str) -> Option<SignalTypeId> {
        self.signal_types.lookup(name)
    }

    pub fn node_type_by_name(&self, name: &str) -> Option<NodeTypeId> {
        self.node_types.lookup(name)
    }

    pub fn library_by_name(&self, filename: &str) -> Option<LibraryId> {
        self.libraries.lookup(filename)
    }

    /// Signal types in registration order.
    pub fn signal_types(&self) -> impl Iterator<Item = (SignalTypeId, &SignalType)> {
        self.signal_types.list()
    }

    /// Node types in registration order.
    pub fn node_types(&self) -> impl Iterator<Item = (NodeTypeId, &NodeType)> {
        self.node_types.list()
    }

    /// Libraries in load order.
    pub fn libraries(&self) -> impl Iterator<Item = (LibraryId, &Library)> {
        self.libraries.list()
    }

    /// Collision check for registering `signal_type`.
    ///
    /// Returns the existing entity for an identical definition, `None` when the
    /// name is free, and `DuplicateDefinition` when the contents differ.
    pub fn check_signal_type(&self, signal_type: &SignalType) -> Result<Option<SignalTypeId>> {
        let Some(existing) = self.signal_types.lookup(&signal_type.name) else {
            return Ok(None);
        };
        match self.signal_types.get(existing) {
            Some(current) if current.is_compatible(signal_type) => Ok(Some(existing)),
            _ => Err(EditError::duplicate("signal type", &signal_type.name)),
        }
    }

    pub(crate) fn signal_type_name(&self, id: SignalTypeId) -> String {
        self.signal_types
            .get(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub(crate) fn node_type_name(&self, id: NodeTypeId) -> String {
        self.node_types
            .get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
