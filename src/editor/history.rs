//! Bounded undo/redo stacks.

use crate::model::Edit;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Edit>,
    redo: Vec<Edit>,
    max_depth: usize,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record a fresh edit. Clears the redo stack; the oldest entry is
    /// dropped once the depth limit is reached.
    pub fn push(&mut self, edit: Edit) {
        self.redo.clear();
        self.push_undo(edit);
    }

    fn push_undo(&mut self, edit: Edit) {
        self.undo.push_back(edit);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    /// Take the most recent edit for undoing; it moves to the redo stack.
    pub fn undo(&mut self) -> Option<&Edit> {
        let edit = self.undo.pop_back()?;
        self.redo.push(edit);
        self.redo.last()
    }

    /// Take the most recently undone edit for redoing; it moves back to the
    /// undo stack.
    pub fn redo(&mut self) -> Option<&Edit> {
        let edit = self.redo.pop()?;
        self.push_undo(edit);
        self.undo.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
