//! DRAM memory controller.
//!
//! A [`MemoryControllerHub`] fronts one [`MemoryController`] per channel.
//! The hub talks to the interconnect and converts host cycles to memory
//! cycles; each controller runs the scheduling policy for its channel.

/// Per-channel queues and scheduling policy.
pub mod controller;

/// Multi-channel front end, clocking and interconnect handshake.
pub mod hub;

/// Fixed-capacity entry pool.
pub mod queue;

pub use controller::{
    CommandEntry, IssuedCommand, MemoryController, RequestEntry, TransactionEntry,
};
pub use hub::MemoryControllerHub;
pub use queue::BoundedQueue;

/// Names one request entry: its channel and its slot in that channel's
/// request queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    pub channel: usize,
    pub slot: usize,
}

/// Deferred callbacks the hub schedules on the simulator's event system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemEvent {
    /// The column command of a request has completed.
    AccessCompleted(EntryHandle),
    /// Retry delivering a response the interconnect rejected.
    WaitInterconnect(EntryHandle),
}
