//! Document tree: the path-addressed ordered forest over the model.
//!
//! Every structural element of every open document appears as a tree node
//! whose payload is an [`EditableObject`]. The tree is used to locate the same
//! sub-element in each instance during propagation and is the surface the GUI
//! edits through.
//!
//! ```text
//! Library           -> SignalType*, NodeType*
//! SignalGraph       -> Node*
//! NodeType          -> PortType* (in, then out), Implementation*
//! Implementation    -> Node*                       (graph kind only)
//! Node              -> Port* (in, then out), Implementation*   (read-only expansion)
//! Port              -> Connection*
//! ```
//!
//! Storage is a flat `Vec` indexed by [`TreeId`], like the other arenas. A
//! payload may occur many times (a nested node is shown under every instance
//! of the embracing type), so lookups go through an occurrence index and
//! return the first occurrence in pre-order.

pub mod cursor;

pub use cursor::Cursor;

use crate::id::{
    ConnectionId, ImplId, LibraryId, NodeId, NodeTypeId, PortId, PortTypeId, SignalGraphId,
    SignalTypeId, TreeId,
};
use std::collections::HashMap;
use std::fmt;

/// Payload of a tree node. One variant per kind of editable model element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableObject {
    Library(LibraryId),
    SignalGraph(SignalGraphId),
    SignalType(SignalTypeId),
    NodeType(NodeTypeId),
    PortType(PortTypeId),
    Implementation(ImplId),
    Node(NodeId),
    Port(PortId),
    Connection(ConnectionId),
}

impl EditableObject {
    pub fn kind_name(&self) -> &'static str {
        match self {
            EditableObject::Library(_) => "library",
            EditableObject::SignalGraph(_) => "signal graph",
            EditableObject::SignalType(_) => "signal type",
            EditableObject::NodeType(_) => "node type",
            EditableObject::PortType(_) => "port type",
            EditableObject::Implementation(_) => "implementation",
            EditableObject::Node(_) => "node",
            EditableObject::Port(_) => "port",
            EditableObject::Connection(_) => "connection",
        }
    }
}

/// What the GUI may do with a tree element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permissions {
    pub addable: bool,
    pub editable: bool,
    pub removable: bool,
}

impl Permissions {
    pub const READ_ONLY: Permissions = Permissions {
        addable: false,
        editable: false,
        removable: false,
    };

    pub const fn new(addable: bool, editable: bool, removable: bool) -> Self {
        Self {
            addable,
            editable,
            removable,
        }
    }

    pub fn is_read_only(&self) -> bool {
        *self == Self::READ_ONLY
    }

    /// Default permissions of an element in an editable context.
    pub fn for_object(object: &EditableObject) -> Self {
        match object {
            EditableObject::Library(_) | EditableObject::SignalGraph(_) => {
                Permissions::new(true, true, false)
            }
            EditableObject::SignalType(_) | EditableObject::PortType(_) => {
                Permissions::new(false, true, true)
            }
            EditableObject::NodeType(_) | EditableObject::Implementation(_) => {
                Permissions::new(true, true, true)
            }
            EditableObject::Node(_) => Permissions::new(false, true, true),
            // Connections are added on ports; ports follow their type.
            EditableObject::Port(_) => Permissions::new(true, false, false),
            EditableObject::Connection(_) => Permissions::new(false, false, true),
        }
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.addable, 'a'),
            flag(self.editable, 'e'),
            flag(self.removable, 'r')
        )
    }
}

/// A single node in the document tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: TreeId,
    pub object: EditableObject,
    /// Parent node (TreeId::INVALID for roots).
    pub parent: TreeId,
    pub children: Vec<TreeId>,
    pub permissions: Permissions,
    /// Depth in the tree (0 for roots).
    pub depth: u16,
}

/// Where a removed subtree used to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// Path of the former parent; empty for a removed root.
    pub parent_path: Cursor,
    pub index: usize,
    /// Every handle freed by the removal, subtree root first.
    pub removed: Vec<TreeId>,
}

#[derive(Debug, Default, Clone)]
pub struct DocumentTree {
    nodes: Vec<Option<TreeNode>>,
    roots: Vec<TreeId>,
    occurrences: HashMap<EditableObject, Vec<TreeId>>,
    /// Slots freed by `remove`, reused before `nodes` grows.
    free: Vec<TreeId>,
    live: usize,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tree nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn roots(&self) -> &[TreeId] {
        &self.roots
    }

    /// Add a trailing child under `parent`, or a trailing root for `None`.
    pub fn append(
        &mut self,
        parent: Option<TreeId>,
        object: EditableObject,
        permissions: Permissions,
    ) -> TreeId {
        let index = match parent {
            Some(p) => self.get(p).map(|n| n.children.len()).unwrap_or(0),
            None => self.roots.len(),
        };
        self.insert(parent, index, object, permissions)
    }

    /// Insert a child at `index`; later siblings shift by one.
    ///
    /// A child of a read-only parent is read-only regardless of `permissions`.
    pub fn insert(
        &mut self,
        parent: Option<TreeId>,
        index: usize,
        object: EditableObject,
        permissions: Permissions,
    ) -> TreeId {
        let id = self
            .free
            .pop()
            .unwrap_or(TreeId(self.nodes.len() as u32));
        let (parent_id, depth, permissions) = match parent {
            Some(p) => {
                let parent_node = self.get(p);
                debug_assert!(parent_node.is_some(), "insert under missing {:?}", p);
                let inherited = match parent_node {
                    Some(n) if n.permissions.is_read_only() => Permissions::READ_ONLY,
                    _ => permissions,
                };
                (p, parent_node.map(|n| n.depth + 1).unwrap_or(0), inherited)
            }
            None => (TreeId::INVALID, 0, permissions),
        };

        let node = Some(TreeNode {
            id,
            object,
            parent: parent_id,
            children: Vec::new(),
            permissions,
            depth,
        });
        match self.nodes.get_mut(id.index()) {
            Some(slot) => *slot = node,
            None => self.nodes.push(node),
        }
        self.live += 1;
        self.occurrences.entry(object).or_default().push(id);

        let siblings = match parent {
            Some(p) => match self.get_mut(p) {
                Some(n) => &mut n.children,
                None => return id,
            },
            None => &mut self.roots,
        };
        debug_assert!(index <= siblings.len(), "insert index {} out of range", index);
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        id
    }

    /// Detach the subtree rooted at `id`; later siblings shift back by one.
    pub fn remove(&mut self, id: TreeId) -> Option<Detached> {
        let node = self.get(id)?;
        let parent = node.parent;
        let parent_path = if parent.is_valid() {
            self.path(parent)
        } else {
            Cursor::default()
        };

        let siblings = if parent.is_valid() {
            &mut self.nodes[parent.index()].as_mut()?.children
        } else {
            &mut self.roots
        };
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.remove(index);

        let mut removed = Vec::new();
        self.collect_subtree(id, &mut removed);
        for &rid in &removed {
            if let Some(node) = self.nodes[rid.index()].take() {
                self.live -= 1;
                self.free.push(rid);
                if let Some(list) = self.occurrences.get_mut(&node.object) {
                    list.retain(|&t| t != rid);
                    if list.is_empty() {
                        self.occurrences.remove(&node.object);
                    }
                }
            }
        }

        Some(Detached {
            parent_path,
            index,
            removed,
        })
    }

    fn collect_subtree(&self, id: TreeId, out: &mut Vec<TreeId>) {
        let Some(node) = self.get(id) else {
            return;
        };
        out.push(id);
        for &child in &node.children {
            self.collect_subtree(child, out);
        }
    }

    #[inline]
    pub fn get(&self, id: TreeId) -> Option<&TreeNode> {
        if id.is_valid() {
            self.nodes.get(id.index()).and_then(Option::as_ref)
        } else {
            None
        }
    }

    #[inline]
    fn get_mut(&mut self, id: TreeId) -> Option<&mut TreeNode> {
        if id.is_valid() {
            self.nodes.get_mut(id.index()).and_then(Option::as_mut)
        } else {
            None
        }
    }

    pub fn object(&self, id: TreeId) -> Option<EditableObject> {
        self.get(id).map(|n| n.object)
    }

    pub fn permissions(&self, id: TreeId) -> Option<Permissions> {
        self.get(id).map(|n| n.permissions)
    }

    pub fn children(&self, id: TreeId) -> impl Iterator<Item = &TreeNode> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |&c| self.get(c))
    }

    /// Direct child of `parent` carrying `object`.
    pub fn child_with(&self, parent: TreeId, object: EditableObject) -> Option<TreeId> {
        self.children(parent)
            .find(|n| n.object == object)
            .map(|n| n.id)
    }

    /// Position of `id` among its siblings.
    pub fn sibling_index(&self, id: TreeId) -> Option<usize> {
        let node = self.get(id)?;
        let siblings = if node.parent.is_valid() {
            &self.get(node.parent)?.children
        } else {
            &self.roots
        };
        siblings.iter().position(|&c| c == id)
    }

    /// Derive the current path of a handle.
    pub fn path(&self, id: TreeId) -> Cursor {
        let mut indices = Vec::new();
        let mut cur = id;
        while let Some(node) = self.get(cur) {
            match self.sibling_index(cur) {
                Some(i) => indices.push(i),
                None => break,
            }
            cur = node.parent;
        }
        indices.reverse();
        Cursor::new(indices)
    }

    /// Resolve a path to a handle.
    pub fn resolve(&self, cursor: &Cursor) -> Option<TreeId> {
        let (first, rest) = cursor.indices().split_first()?;
        let mut cur = *self.roots.get(*first)?;
        for &idx in rest {
            cur = *self.get(cur)?.children.get(idx)?;
        }
        Some(cur)
    }

    /// Payload at a path.
    pub fn object_at(&self, cursor: &Cursor) -> Option<EditableObject> {
        self.resolve(cursor).and_then(|id| self.object(id))
    }

    /// Every handle carrying `object`, in no particular order.
    pub fn occurrences(&self, object: &EditableObject) -> &[TreeId] {
        self.occurrences
            .get(object)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First occurrence of `object` in pre-order.
    pub fn find(&self, object: &EditableObject) -> Option<TreeId> {
        self.occurrences(object)
            .iter()
            .map(|&id| (self.path(id), id))
            .min()
            .map(|(_, id)| id)
    }

    /// Path of the first occurrence of `object`.
    pub fn cursor(&self, object: &EditableObject) -> Option<Cursor> {
        self.find(object).map(|id| self.path(id))
    }

    /// Paths of every occurrence of `object`, in pre-order.
    pub fn cursors(&self, object: &EditableObject) -> Vec<Cursor> {
        let mut paths: Vec<_> = self
            .occurrences(object)
            .iter()
            .map(|&id| self.path(id))
            .collect();
        paths.sort();
        paths
    }

    /// Search the subtree at `start` (inclusive) for `object`.
    pub fn cursor_at(&self, start: &Cursor, object: &EditableObject) -> Option<Cursor> {
        let start_id = self.resolve(start)?;
        self.find_below(start_id, object).map(|id| self.path(id))
    }

    fn find_below(&self, id: TreeId, object: &EditableObject) -> Option<TreeId> {
        let node = self.get(id)?;
        if node.object == *object {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_below(child, object))
    }

    /// Handles in pre-order.
    pub fn preorder(&self) -> Vec<TreeId> {
        let mut out = Vec::with_capacity(self.live);
        for &root in &self.roots {
            self.collect_subtree(root, &mut out);
        }
        out
    }

    /// Pre-order listing of (path, payload, permissions) for comparisons and display.
    pub fn snapshot(&self) -> Vec<(Cursor, EditableObject, Permissions)> {
        self.preorder()
            .into_iter()
            .filter_map(|id| {
                self.get(id)
                    .map(|n| (self.path(id), n.object, n.permissions))
            })
            .collect()
    }
}
