//! Fixed-capacity entry pool.
//!
//! Slots are handed out by index and stay put until freed, so other queues
//! and scheduled events can refer to an entry by its slot. Live entries are
//! also kept on an allocation-ordered list, which is the order every
//! scheduling pass walks them in.

use std::collections::VecDeque;
use std::fmt;

/// Bounded pool of entries with allocation-order iteration.
pub struct BoundedQueue<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    order: VecDeque<usize>,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty pool with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).rev().collect(),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Stores `entry` in a free slot.
    ///
    /// Returns `None` without consuming anything visible when the pool is full.
    pub fn alloc(&mut self, entry: T) -> Option<usize> {
        let slot = self.free.pop()?;
        self.slots[slot] = Some(entry);
        self.order.push_back(slot);
        Some(slot)
    }

    /// Releases a slot and returns its entry.
    pub fn free(&mut self, slot: usize) -> Option<T> {
        let entry = self.slots.get_mut(slot)?.take()?;
        if let Some(pos) = self.order.iter().position(|&s| s == slot) {
            self.order.remove(pos);
        }
        self.free.push(slot);
        Some(entry)
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)?.as_ref()
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Live slots, oldest allocation first.
    ///
    /// A snapshot, so callers may free entries while walking it.
    pub fn slots(&self) -> Vec<usize> {
        self.order.iter().copied().collect()
    }

    /// Live entries with their slots, oldest allocation first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |&slot| self.slots[slot].as_ref().map(|entry| (slot, entry)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T: fmt::Display> fmt::Display for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.len(), self.capacity())?;
        for (slot, entry) in self.iter() {
            write!(f, "\n  {:>3}: {}", slot, entry)?;
        }
        Ok(())
    }
}
