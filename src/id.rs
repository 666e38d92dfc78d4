//! Identity types for the signal-graph model.
//!
//! All IDs are newtypes over `u32` that serve as direct array indices into
//! their respective arenas. Slots are never reused, so an ID stays valid
//! across a remove/undo cycle and a restored entity gets its old ID back.

use std::fmt;

/// Implemented by every ID newtype so arenas can be generic over them.
pub trait ArenaId: Copy + Eq + std::hash::Hash + fmt::Debug {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const INVALID: $name = $name(u32::MAX);

            #[inline]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ArenaId for $name {
            #[inline]
            fn from_index(index: usize) -> Self {
                debug_assert!(index < u32::MAX as usize);
                $name(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if *self == Self::INVALID {
                    write!(f, concat!(stringify!($name), "(INVALID)"))
                } else {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

define_id!(
    /// Index into the registry's signal type store.
    SignalTypeId
);
define_id!(
    /// Index into the registry's node type store.
    NodeTypeId
);
define_id!(
    /// Index into the registry's library store.
    LibraryId
);
define_id!(
    /// Index into `Model::port_types`.
    PortTypeId
);
define_id!(
    /// Index into `Model::implementations`.
    ImplId
);
define_id!(
    /// Index into `Model::graphs` (top-level and nested signal graph types).
    GraphId
);
define_id!(
    /// Index into the store of top-level signal graph documents.
    SignalGraphId
);
define_id!(
    /// Index into `Model::nodes`.
    NodeId
);
define_id!(
    /// Index into `Model::ports`.
    PortId
);
define_id!(
    /// Index into `Model::connections`.
    ConnectionId
);
define_id!(
    /// Stable handle of a document-tree node. Paths are derived from it on demand.
    TreeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId(42);
        assert!(id.is_valid());
        assert_eq!(id.index(), 42);
        assert!(!NodeId::INVALID.is_valid());
    }

    #[test]
    fn test_arena_id_from_index() {
        let id = PortId::from_index(7);
        assert_eq!(id, PortId(7));
        assert_eq!(ArenaId::index(id), 7);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", ConnectionId(3)), "ConnectionId(3)");
        assert_eq!(format!("{:?}", TreeId::INVALID), "TreeId(INVALID)");
        assert_eq!(NodeTypeId(1).to_string(), "NodeTypeId(1)");
    }
}
