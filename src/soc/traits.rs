//! Collaborator Interfaces.
//!
//! The memory controller never owns the world around it. This module defines
//! the two seams it calls out through: the upstream interconnect that
//! receives responses and backpressure, and the enclosing simulator's event
//! system that runs deferred callbacks.

use crate::common::Message;
use crate::soc::memory::MemEvent;

/// Upstream interconnect towards the cache hierarchy.
pub trait Interconnect {
    /// Delivers a response to `message.origin`.
    ///
    /// # Returns
    ///
    /// `false` if the receiver cannot accept the message this cycle; the
    /// controller retries one cycle later.
    fn send_response(&mut self, message: &Message) -> bool;

    /// Raises or clears the controller-full backpressure signal.
    fn set_controller_full(&mut self, full: bool);
}

/// Event system of the enclosing simulator.
pub trait EventScheduler {
    /// Schedules `event` to be delivered back to the hub after `delay` cycles.
    fn schedule(&mut self, delay: u64, event: MemEvent);
}
