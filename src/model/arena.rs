//! Slot storage for model entities.
//!
//! [`Arena`] is a flat `Vec` indexed by an ID newtype. Removed entries leave an
//! empty slot behind so IDs stay stable and undo can put an entity back under
//! its original ID. [`Store`] adds the name index and registration order used
//! by the registries.

use crate::id::ArenaId;
use std::collections::HashMap;
use std::marker::PhantomData;

#[derive(Debug, Clone)]
pub struct Arena<I, T> {
    slots: Vec<Option<T>>,
    live: usize,
    _id: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            _id: PhantomData,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocate a fresh, still empty slot.
    pub fn reserve(&mut self) -> I {
        let id = I::from_index(self.slots.len());
        self.slots.push(None);
        id
    }

    /// Fill the slot for `id`. The slot must be empty.
    pub fn insert_at(&mut self, id: I, value: T) {
        let idx = id.index();
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        debug_assert!(self.slots[idx].is_none(), "slot {:?} already occupied", id);
        if self.slots[idx].is_none() {
            self.live += 1;
        }
        self.slots[idx] = Some(value);
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        let taken = self.slots.get_mut(id.index()).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    #[inline]
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (I::from_index(i), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (I::from_index(i), v)))
    }
}

/// Named entity store with stable registration order.
#[derive(Debug, Clone)]
pub struct Store<I, T> {
    arena: Arena<I, T>,
    by_name: HashMap<String, I>,
    order: Vec<I>,
}

impl<I: ArenaId, T> Default for Store<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Store<I, T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            by_name: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn reserve(&mut self) -> I {
        self.arena.reserve()
    }

    pub fn lookup(&self, name: &str) -> Option<I> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.arena.get_mut(id)
    }

    /// Insert under `name` at `order_position` of the enumeration order.
    pub fn insert_at(&mut self, id: I, name: &str, value: T, order_position: usize) {
        debug_assert!(!self.by_name.contains_key(name), "name '{}' taken", name);
        self.arena.insert_at(id, value);
        self.by_name.insert(name.to_string(), id);
        let pos = order_position.min(self.order.len());
        self.order.insert(pos, id);
    }

    /// Remove the entry. Returns it together with its enumeration position.
    pub fn remove(&mut self, id: I, name: &str) -> Option<(T, usize)> {
        let value = self.arena.remove(id)?;
        self.by_name.remove(name);
        let pos = self.position(id).unwrap_or(self.order.len());
        if pos < self.order.len() {
            self.order.remove(pos);
        }
        Some((value, pos))
    }

    pub fn rename(&mut self, id: I, old: &str, new: &str) {
        debug_assert_eq!(self.by_name.get(old), Some(&id));
        self.by_name.remove(old);
        self.by_name.insert(new.to_string(), id);
    }

    /// Position of `id` in registration order.
    pub fn position(&self, id: I) -> Option<usize> {
        self.order.iter().position(|&x| x == id)
    }

    /// IDs in registration order, preserved across removals.
    pub fn ids(&self) -> &[I] {
        &self.order
    }

    /// Entries in registration order.
    pub fn list(&self) -> impl Iterator<Item = (I, &T)> {
        self.order
            .iter()
            .filter_map(move |&id| self.arena.get(id).map(|v| (id, v)))
    }
}
