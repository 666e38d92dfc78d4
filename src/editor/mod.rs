//! Path-addressed structural editing with undo/redo.
//!
//! The [`Editor`] is the only mutation surface a front end needs: objects are
//! addressed by [`Cursor`] into the document tree, added with
//! [`Editor::add_new_object`], removed with [`Editor::remove_object`], and
//! every such edit can be undone and redone. Permission flags on the tree
//! decide what may happen where.

pub mod history;

pub use history::History;

use crate::config::EditorConfig;
use crate::document::{
    AnyDocument, FsLibraryResolver, LibraryDocument, LibraryResolver, NoResolver,
    SignalGraphDocument,
};
use crate::error::{EditError, Result};
use crate::id::{GraphId, SignalTypeId, TreeId};
use crate::model::{Direction, Edit, Mode, Model, NewImplementation, Scope, SignalType};
use crate::tree::{Cursor, DocumentTree, EditableObject, Permissions};
use std::path::Path;

/// Description of an object to create under a tree element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewObject {
    SignalType {
        name: String,
        ctype: String,
        channel_id: String,
        scope: Scope,
        mode: Mode,
    },
    NodeType {
        name: String,
    },
    PortType {
        name: String,
        direction: Direction,
        signal_type: String,
    },
    Implementation(NewImplementation),
    Node {
        name: String,
        node_type: String,
    },
    InputNode {
        name: String,
        signal_type: String,
    },
    OutputNode {
        name: String,
        signal_type: String,
    },
    /// Connect the port under the cursor to the port at `peer`.
    Connection {
        peer: Cursor,
    },
}

impl NewObject {
    /// Signal type with default attributes.
    pub fn signal_type(name: impl Into<String>) -> Self {
        NewObject::SignalType {
            name: name.into(),
            ctype: String::new(),
            channel_id: String::new(),
            scope: Scope::Global,
            mode: Mode::Async,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NewObject::SignalType { .. } => "signal type",
            NewObject::NodeType { .. } => "node type",
            NewObject::PortType { .. } => "port type",
            NewObject::Implementation(_) => "implementation",
            NewObject::Node { .. } => "node",
            NewObject::InputNode { .. } => "input node",
            NewObject::OutputNode { .. } => "output node",
            NewObject::Connection { .. } => "connection",
        }
    }
}

/// One object taken out of the tree by a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    /// Path of the parent before the removal.
    pub parent: Cursor,
    /// Index under that parent before the removal.
    pub position: usize,
    pub object: EditableObject,
}

pub struct Editor {
    model: Model,
    history: History,
    resolver: Box<dyn LibraryResolver>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("model", &self.model)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(config: &EditorConfig) -> Self {
        let resolver: Box<dyn LibraryResolver> = if config.libraries.auto_resolve {
            Box::new(FsLibraryResolver::from_config(&config.libraries))
        } else {
            Box::new(NoResolver)
        };
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(config: &EditorConfig, resolver: Box<dyn LibraryResolver>) -> Self {
        Self {
            model: Model::new(),
            history: History::new(config.history.max_depth),
            resolver,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn tree(&self) -> &DocumentTree {
        self.model.tree()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // ==================== Documents ====================

    /// Open a library document as a new tree root.
    pub fn open_library(&mut self, doc: &LibraryDocument) -> Result<Cursor> {
        let id = self.model.load_library(doc, self.resolver.as_mut())?;
        self.history.clear();
        self.root_cursor(EditableObject::Library(id))
    }

    /// Open a signal graph document as a new tree root.
    pub fn open_signal_graph(&mut self, doc: &SignalGraphDocument) -> Result<Cursor> {
        let id = self.model.load_signal_graph(doc, self.resolver.as_mut())?;
        self.history.clear();
        self.root_cursor(EditableObject::SignalGraph(id))
    }

    /// Open a document file of either kind.
    pub fn open_path(&mut self, path: impl AsRef<Path>) -> Result<Cursor> {
        match AnyDocument::load(path)? {
            AnyDocument::Library(doc) => self.open_library(&doc),
            AnyDocument::SignalGraph(doc) => self.open_signal_graph(&doc),
        }
    }

    /// Create an empty library root.
    pub fn new_library(&mut self, filename: &str) -> Result<Cursor> {
        if self.model.registry().library_by_name(filename).is_some() {
            return Err(EditError::duplicate("library", filename));
        }
        let id = self.model.create_library(filename);
        self.history.clear();
        self.root_cursor(EditableObject::Library(id))
    }

    /// Create an empty signal graph root.
    pub fn new_signal_graph(&mut self, filename: &str) -> Result<Cursor> {
        let id = self.model.create_signal_graph(filename)?;
        self.history.clear();
        self.root_cursor(EditableObject::SignalGraph(id))
    }

    /// Close the document whose root is at `cursor`.
    pub fn close(&mut self, cursor: &Cursor) -> Result<()> {
        let (_, object) = self.resolve(cursor)?;
        match object {
            EditableObject::Library(id) => self.model.unload_library(id)?,
            EditableObject::SignalGraph(id) => self.model.unload_signal_graph(id)?,
            _ => {
                return Err(EditError::InvalidCursor(format!(
                    "{} is not a document root",
                    cursor
                )))
            }
        }
        self.history.clear();
        Ok(())
    }

    pub fn export(&self, cursor: &Cursor) -> Result<AnyDocument> {
        let (_, object) = self.resolve(cursor)?;
        match object {
            EditableObject::Library(id) => Ok(AnyDocument::Library(self.model.export_library(id)?)),
            EditableObject::SignalGraph(id) => Ok(AnyDocument::SignalGraph(
                self.model.export_signal_graph(id)?,
            )),
            _ => Err(EditError::InvalidCursor(format!(
                "{} is not a document root",
                cursor
            ))),
        }
    }

    fn root_cursor(&self, object: EditableObject) -> Result<Cursor> {
        self.tree()
            .cursor(&object)
            .ok_or_else(|| EditError::InvalidCursor(format!("no root for {:?}", object)))
    }

    // ==================== Structural edits ====================

    /// Resolve a cursor. A cursor that addresses nothing is a caller bug.
    fn resolve(&self, cursor: &Cursor) -> Result<(TreeId, EditableObject)> {
        let found = self
            .tree()
            .resolve(cursor)
            .and_then(|id| self.tree().object(id).map(|obj| (id, obj)));
        debug_assert!(found.is_some(), "cursor {} does not address a tree node", cursor);
        found.ok_or_else(|| EditError::InvalidCursor(cursor.to_string()))
    }

    fn permissions(&self, id: TreeId) -> Permissions {
        self.tree()
            .permissions(id)
            .unwrap_or(Permissions::READ_ONLY)
    }

    fn signal_type_named(&self, name: &str) -> Result<SignalTypeId> {
        self.model
            .registry()
            .signal_type_by_name(name)
            .ok_or_else(|| EditError::not_found("signal type", name))
    }

    fn graph_of(&self, parent: EditableObject) -> Option<GraphId> {
        match parent {
            EditableObject::SignalGraph(id) => self.model.signal_graph(id).map(|sg| sg.graph),
            EditableObject::Implementation(id) => self.model.implementation_graph(id),
            _ => None,
        }
    }

    /// Plan, apply and record an edit.
    fn execute<T>(
        &mut self,
        plan: impl FnOnce(&mut Model) -> Result<(T, Edit)>,
    ) -> Result<T> {
        let (value, edit) = plan(&mut self.model)?;
        self.model.apply(&edit);
        tracing::debug!(edit = edit.label(), undo_depth = self.history.undo_len() + 1, "recorded edit");
        self.history.push(edit);
        Ok(value)
    }

    /// Create `new` under the element at `cursor` and return the new
    /// element's path.
    pub fn add_new_object(&mut self, cursor: &Cursor, new: NewObject) -> Result<Cursor> {
        let (tree_id, parent) = self.resolve(cursor)?;
        if !self.permissions(tree_id).addable {
            return Err(EditError::ReadOnly {
                path: cursor.to_string(),
            });
        }
        let invalid = EditError::InvalidChild {
            parent: parent.kind_name(),
            child: new.kind_name(),
        };

        let created = match (parent, new) {
            (
                EditableObject::Library(lib),
                NewObject::SignalType {
                    name,
                    ctype,
                    channel_id,
                    scope,
                    mode,
                },
            ) => {
                let signal_type = SignalType::new(name)
                    .with_ctype(ctype)
                    .with_channel_id(channel_id)
                    .with_scope(scope)
                    .with_mode(mode);
                let id = self.execute(|m| m.plan_add_signal_type(lib, signal_type))?;
                EditableObject::SignalType(id)
            }
            (EditableObject::Library(lib), NewObject::NodeType { name }) => {
                let id = self.execute(|m| m.plan_add_node_type(lib, &name))?;
                EditableObject::NodeType(id)
            }
            (
                EditableObject::NodeType(t),
                NewObject::PortType {
                    name,
                    direction,
                    signal_type,
                },
            ) => {
                let st = self.signal_type_named(&signal_type)?;
                let id = self.execute(|m| m.plan_add_port_type(t, direction, &name, st))?;
                EditableObject::PortType(id)
            }
            (EditableObject::NodeType(t), NewObject::Implementation(kind)) => {
                let id = self.execute(|m| m.plan_add_implementation(t, kind))?;
                EditableObject::Implementation(id)
            }
            (
                parent @ (EditableObject::SignalGraph(_) | EditableObject::Implementation(_)),
                new @ (NewObject::Node { .. } | NewObject::InputNode { .. } | NewObject::OutputNode { .. }),
            ) => {
                let graph = self.graph_of(parent).ok_or(invalid)?;
                let id = match new {
                    NewObject::Node { name, node_type } => {
                        let t = self
                            .model
                            .registry()
                            .node_type_by_name(&node_type)
                            .ok_or_else(|| EditError::not_found("node type", &node_type))?;
                        self.execute(|m| m.plan_add_node(graph, &name, t))?
                    }
                    NewObject::InputNode { name, signal_type } => {
                        let st = self.signal_type_named(&signal_type)?;
                        self.execute(|m| m.plan_add_io_node(graph, &name, st, Direction::Out))?
                    }
                    NewObject::OutputNode { name, signal_type } => {
                        let st = self.signal_type_named(&signal_type)?;
                        self.execute(|m| m.plan_add_io_node(graph, &name, st, Direction::In))?
                    }
                    _ => return Err(EditError::InvalidCursor(cursor.to_string())),
                };
                EditableObject::Node(id)
            }
            (EditableObject::Port(port), NewObject::Connection { peer }) => {
                let (_, peer_object) = self.resolve(&peer)?;
                let EditableObject::Port(peer_port) = peer_object else {
                    return Err(EditError::InvalidChild {
                        parent: peer_object.kind_name(),
                        child: "connection",
                    });
                };
                let id = self.execute(|m| m.plan_connect(port, peer_port))?;
                EditableObject::Connection(id)
            }
            _ => return Err(invalid),
        };

        self.tree()
            .cursor_at(cursor, &created)
            .or_else(|| self.tree().cursor(&created))
            .ok_or_else(|| EditError::InvalidCursor(format!("{:?} not in tree", created)))
    }

    /// Remove the element at `cursor` and everything that goes with it.
    ///
    /// Returns where each removed object sat before the removal, cascaded
    /// children first.
    pub fn remove_object(&mut self, cursor: &Cursor) -> Result<Vec<Removed>> {
        let (tree_id, object) = self.resolve(cursor)?;
        if !self.permissions(tree_id).removable {
            return Err(EditError::ReadOnly {
                path: cursor.to_string(),
            });
        }

        let edit = match object {
            EditableObject::SignalType(id) => self.model.plan_remove_signal_type(id)?,
            EditableObject::NodeType(id) => self.model.plan_remove_node_type(id)?,
            EditableObject::PortType(id) => self.model.plan_remove_port_type(id)?,
            EditableObject::Implementation(id) => self.model.plan_remove_implementation(id)?,
            EditableObject::Node(id) => self.model.plan_remove_node(id)?,
            EditableObject::Connection(id) => self.model.plan_disconnect(id)?,
            EditableObject::Library(_) | EditableObject::SignalGraph(_) | EditableObject::Port(_) => {
                return Err(EditError::ReadOnly {
                    path: cursor.to_string(),
                })
            }
        };

        let removed: Vec<Removed> = edit
            .removed_objects()
            .into_iter()
            .filter_map(|obj| {
                let path = if obj == object {
                    cursor.clone()
                } else {
                    self.tree()
                        .cursor_at(cursor, &obj)
                        .or_else(|| self.tree().cursor(&obj))?
                };
                Some(Removed {
                    parent: path.parent().unwrap_or_default(),
                    position: path.last_index().unwrap_or(0),
                    object: obj,
                })
            })
            .collect();

        self.execute(move |_| Ok(((), edit)))?;
        Ok(removed)
    }

    /// Rename the node type or node at `cursor`.
    pub fn rename(&mut self, cursor: &Cursor, name: &str) -> Result<()> {
        let (tree_id, object) = self.resolve(cursor)?;
        if !self.permissions(tree_id).editable {
            return Err(EditError::ReadOnly {
                path: cursor.to_string(),
            });
        }
        match object {
            EditableObject::NodeType(id) => {
                self.execute(|m| Ok(((), m.plan_rename_node_type(id, name)?)))
            }
            EditableObject::Node(id) => self.execute(|m| Ok(((), m.plan_rename_node(id, name)?))),
            other => Err(EditError::InvalidChild {
                parent: other.kind_name(),
                child: "name",
            }),
        }
    }

    // ==================== History ====================

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<()> {
        let edit = self.history.undo().ok_or(EditError::NothingToUndo)?;
        let inverse = edit.inverse();
        tracing::debug!(edit = edit.label(), "undo");
        self.model.apply(&inverse);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let edit = self.history.redo().ok_or(EditError::NothingToRedo)?.clone();
        tracing::debug!(edit = edit.label(), "redo");
        self.model.apply(&edit);
        Ok(())
    }
}
