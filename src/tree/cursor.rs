//! Colon-joined sibling-index paths (`"3:1:0"`).
//!
//! Paths are not identities: inserting or removing a sibling renumbers
//! everything after it. They are derived from stable [`TreeId`] handles on
//! demand and resolved back through [`DocumentTree::resolve`].
//!
//! [`TreeId`]: crate::id::TreeId
//! [`DocumentTree::resolve`]: super::DocumentTree::resolve

use crate::error::EditError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cursor(Vec<usize>);

impl Cursor {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Cursor of the `index`-th root.
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// `None` for roots.
    pub fn parent(&self) -> Option<Cursor> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Position among the siblings.
    pub fn last_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_ancestor_of(&self, other: &Cursor) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{}", idx)?;
        }
        Ok(())
    }
}

impl FromStr for Cursor {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(EditError::InvalidCursor("empty path".to_string()));
        }
        s.split(':')
            .map(|part| {
                part.parse::<usize>()
                    .map_err(|_| EditError::InvalidCursor(format!("'{}' in path '{}'", part, s)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Cursor)
    }
}
