//! Error handling for the signal-graph model
//!
//! User-triggered failures (bad names, incompatible wiring, blocked removals)
//! surface as [`EditError`] values. Internal invariants are checked with
//! `debug_assert!` and never reach this type.

use thiserror::Error;

/// Main error type for model, editor and document operations
#[derive(Error, Debug)]
pub enum EditError {
    /// A name is already registered with different content
    #[error("Duplicate definition of {kind} '{name}'")]
    DuplicateDefinition { kind: &'static str, name: String },

    /// Two ports carry different signal types
    #[error("Signal type mismatch: '{from}' cannot connect to '{to}'")]
    TypeMismatch { from: String, to: String },

    /// Two ports have the same direction
    #[error("Direction mismatch: both ports are {direction} ports")]
    DirectionMismatch { direction: String },

    /// A connection is structurally impossible (different graphs, duplicate)
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    /// The entity is still referenced and cannot be removed or renamed
    #[error("{kind} '{name}' is still in use: {reason}")]
    ReferentialIntegrity {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// A node type would end up containing itself
    #[error("Node type '{0}' cannot be instantiated inside its own implementation")]
    RecursiveImplementation(String),

    /// A node type without any port cannot be instantiated
    #[error("Node type '{0}' has no ports")]
    EmptyNodeType(String),

    /// A name lookup failed
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The tree position does not permit the requested edit
    #[error("Tree element {path} is read-only for this operation")]
    ReadOnly { path: String },

    /// The new object cannot live under the given parent
    #[error("A {child} cannot be added to a {parent}")]
    InvalidChild {
        parent: &'static str,
        child: &'static str,
    },

    /// A cursor does not address an existing tree element
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// The undo stack is empty
    #[error("Nothing to undo")]
    NothingToUndo,

    /// The redo stack is empty
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EditError>,
    },
}

impl EditError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EditError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        EditError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        EditError::DuplicateDefinition {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn in_use(
        kind: &'static str,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EditError::ReferentialIntegrity {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Strip any `WithContext` wrappers and return the underlying error
    pub fn root(&self) -> &EditError {
        match self {
            EditError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for EditError {
    fn from(err: serde_json::Error) -> Self {
        EditError::Serialization(err.to_string())
    }
}

/// Result type alias for signal-graph operations
pub type Result<T> = std::result::Result<T, EditError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
