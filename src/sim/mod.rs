//! Simulation Harness.
//!
//! Wires a [`MemoryControllerHub`] to an event queue and an upstream
//! interconnect, and drives them one host cycle at a time. Each tick first
//! fires the events due this cycle, then clocks the hub.

/// Priority-queue timer used to run deferred hub callbacks.
pub mod event;

/// Text trace loader.
pub mod trace;

pub use event::EventQueue;
pub use trace::{load_trace, parse_trace, TraceError, TraceRecord};

use crate::common::{ConfigError, MemoryOp, MemoryRequest, Message, SourceId};
use crate::config::Config;
use crate::soc::memory::{MemEvent, MemoryControllerHub};
use crate::soc::traits::Interconnect;
use crate::soc::RecordingInterconnect;
use crate::stats::ReplayStats;
use std::collections::{HashMap, VecDeque};

/// Origin used for requests injected by trace replay.
pub const REPLAY_SOURCE: SourceId = SourceId(0);

/// A hub, its event queue and its upstream collaborator.
pub struct Simulation<I: Interconnect> {
    pub hub: MemoryControllerHub,
    pub upstream: I,
    events: EventQueue<MemEvent>,
}

impl<I: Interconnect> Simulation<I> {
    /// Builds the hub described by `config`.
    pub fn new(config: &Config, upstream: I) -> Result<Self, ConfigError> {
        Ok(Self {
            hub: MemoryControllerHub::new(config)?,
            upstream,
            events: EventQueue::new(),
        })
    }

    /// Current host cycle.
    pub fn cycle(&self) -> u64 {
        self.events.now()
    }

    /// Events still waiting to fire.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Offers a request message to the hub.
    ///
    /// # Returns
    ///
    /// `false` if the target channel's request queue is full.
    pub fn submit(&mut self, message: &Message) -> bool {
        self.hub.handle_request(message, &mut self.upstream)
    }

    /// Cancels a previously submitted request.
    pub fn annul(&mut self, request: &MemoryRequest) {
        self.hub.annul_request(request, &mut self.upstream);
    }

    /// Advances one host cycle.
    pub fn tick(&mut self) {
        while let Some(event) = self.events.pop_due() {
            self.hub
                .handle_event(event, &mut self.events, &mut self.upstream);
        }
        self.hub.clock(&mut self.events);
        self.events.advance();
    }

    /// Returns `true` when the hub holds no work and no event is pending.
    pub fn is_idle(&self) -> bool {
        self.hub.is_idle() && self.events.is_empty()
    }

    /// Ticks until idle, or until `max_cycles` more cycles have elapsed.
    ///
    /// # Returns
    ///
    /// `true` if the simulation drained.
    pub fn run_until_idle(&mut self, max_cycles: u64) -> bool {
        let limit = self.cycle() + max_cycles;
        while !self.is_idle() {
            if self.cycle() >= limit {
                return false;
            }
            self.tick();
        }
        true
    }
}

impl Simulation<RecordingInterconnect> {
    /// Replays a trace, offering each record on or after its cycle.
    ///
    /// Records refused by a full queue are offered again on the next cycle,
    /// in trace order. Replay stops once everything drained or after
    /// `max_cycles` host cycles.
    pub fn replay(&mut self, records: &[TraceRecord], max_cycles: u64) -> ReplayStats {
        let mut stats = ReplayStats::default();
        let mut waiting: VecDeque<Message> = VecDeque::new();
        let mut in_flight: HashMap<u64, u64> = HashMap::new();
        let mut next = 0;

        loop {
            let now = self.cycle();

            while next < records.len() && records[next].cycle <= now {
                let record = &records[next];
                waiting.push_back(Message {
                    request: MemoryRequest::new(next as u64, 0, record.address, record.op),
                    has_data: record.op == MemoryOp::Update,
                    origin: REPLAY_SOURCE,
                });
                next += 1;
            }

            while let Some(message) = waiting.front() {
                if !self.submit(message) {
                    stats.rejected_submissions += 1;
                    break;
                }
                if message.request.is_update() {
                    stats.writes += 1;
                } else {
                    stats.reads += 1;
                    in_flight.insert(message.request.id, now);
                }
                waiting.pop_front();
            }

            self.tick();

            for response in self.upstream.responses.drain(..) {
                if let Some(start) = in_flight.remove(&response.request.id) {
                    stats.record_response(self.events.now() - start);
                }
            }

            let drained = next == records.len() && waiting.is_empty() && self.is_idle();
            if drained || self.cycle() >= max_cycles {
                break;
            }
        }

        stats.cycles = self.cycle();
        stats.memory_cycles = self.hub.memory_clock();
        stats
    }
}
