//! Simulator Event Queue.
//!
//! A min-heap of callbacks keyed by the host cycle they fire on. Events
//! scheduled for the same cycle fire in the order they were scheduled.

use crate::soc::memory::MemEvent;
use crate::soc::traits::EventScheduler;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Scheduled<E> {
    time: u64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// Timer queue owned by the enclosing simulator.
pub struct EventQueue<E> {
    now: u64,
    seq: u64,
    heap: BinaryHeap<Reverse<Scheduled<E>>>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            now: 0,
            seq: 0,
            heap: BinaryHeap::new(),
        }
    }

    /// Current host cycle.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Moves to the next host cycle.
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Schedules `event` to fire at absolute cycle `time`.
    pub fn schedule_at(&mut self, time: u64, event: E) {
        self.heap.push(Reverse(Scheduled {
            time,
            seq: self.seq,
            event,
        }));
        self.seq += 1;
    }

    /// Removes and returns the next event due at or before the current cycle.
    pub fn pop_due(&mut self) -> Option<E> {
        if self.heap.peek()?.0.time > self.now {
            return None;
        }
        self.heap.pop().map(|Reverse(scheduled)| scheduled.event)
    }

    /// Cycle of the earliest pending event.
    pub fn next_time(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(scheduled)| scheduled.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl EventScheduler for EventQueue<MemEvent> {
    fn schedule(&mut self, delay: u64, event: MemEvent) {
        self.schedule_at(self.now + delay, event);
    }
}
