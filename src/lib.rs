//! # signalgraph-rs: typed signal-graph model with instance propagation
//!
//! A domain model for dataflow "signal graphs": typed signals flow between the
//! ports of nodes, each node instantiates a reusable node type, and a node
//! type may itself be implemented by a nested graph. Editing a node type
//! (adding a port, a nested node, a connection inside its implementation)
//! is replicated to every live instance, at any nesting depth, and every
//! structural edit is undoable.
//!
//! ## Architecture
//!
//! - **Model**: registries, arenas and the plan/apply edit pipeline ([`model`])
//! - **Tree**: the path-addressed document tree with permissions ([`tree`])
//! - **Editor**: cursor-based add/remove/rename with undo/redo ([`editor`])
//! - **Documents**: JSON snapshots of libraries and signal graphs ([`document`])
//!
//! ## Configuration
//!
//! Editor settings (history depth, library search paths, logging) are read
//! from `config.toml` in the platform configuration directory under
//! `dev.signalgraph.signalgraph-rs`. See [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use signalgraph_rs::{Editor, EditorConfig, NewObject, Direction};
//!
//! let mut editor = Editor::new(&EditorConfig::default());
//! let lib = editor.new_library("base.json")?;
//! editor.add_new_object(&lib, NewObject::signal_type("s1"))?;
//! let test = editor.add_new_object(&lib, NewObject::NodeType { name: "Test".into() })?;
//! editor.add_new_object(&test, NewObject::PortType {
//!     name: "in".into(),
//!     direction: Direction::In,
//!     signal_type: "s1".into(),
//! })?;
//! editor.undo()?;
//! ```

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod id;
pub mod logging;
pub mod model;
pub mod tree;

// Re-export commonly used types
pub use config::EditorConfig;
pub use document::{AnyDocument, LibraryDocument, LibraryResolver, SignalGraphDocument};
pub use editor::{Editor, NewObject, Removed};
pub use error::{EditError, Result, ResultExt};
pub use model::{Direction, Edit, Mode, Model, NewImplementation, Scope, SignalType};
pub use tree::{Cursor, DocumentTree, EditableObject, Permissions};
