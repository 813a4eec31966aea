//! Recording Interconnect.
//!
//! A stand-in for the cache-side interconnect. It accepts responses into a
//! log, can be told to reject the next few deliveries to exercise the retry
//! path, and mirrors the backpressure line.

use super::traits::Interconnect;
use crate::common::Message;

/// Upstream collaborator that records everything the controller sends.
#[derive(Debug, Default)]
pub struct RecordingInterconnect {
    /// Responses accepted so far, in delivery order.
    pub responses: Vec<Message>,
    /// Number of delivery attempts, accepted or not.
    pub attempts: u64,
    /// Current state of the controller-full line.
    pub controller_full: bool,
    /// Every transition of the controller-full line.
    pub full_transitions: Vec<bool>,
    reject_next: u32,
}

impl RecordingInterconnect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the next `count` delivery attempts.
    pub fn reject_next(&mut self, count: u32) {
        self.reject_next = count;
    }
}

impl Interconnect for RecordingInterconnect {
    fn send_response(&mut self, message: &Message) -> bool {
        self.attempts += 1;
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return false;
        }
        self.responses.push(message.clone());
        true
    }

    fn set_controller_full(&mut self, full: bool) {
        self.controller_full = full;
        self.full_transitions.push(full);
    }
}
