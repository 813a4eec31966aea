//! Memory Controller Hub.
//!
//! The hub is the controller as the rest of the system sees it. It accepts
//! requests from the interconnect, routes them to the controller of their
//! channel, delivers responses (retrying on rejection), handles annulment,
//! and converts the host clock into memory cycles with an exact rational
//! accumulator.

use super::controller::{MemoryController, RequestEntry};
use super::{EntryHandle, MemEvent};
use crate::common::{Clock, ConfigError, MemoryOp, MemoryRequest, Message};
use crate::config::{ClockRatio, Config, DramType, Topology};
use crate::dram::AddressMapping;
use crate::soc::traits::{EventScheduler, Interconnect};
use log::{debug, warn};
use serde_json::{json, Map, Value};
use std::fmt;

/// Multi-channel DRAM controller front end.
pub struct MemoryControllerHub {
    name: String,
    dram_type: DramType,
    ram_size: u64,
    topology: Topology,
    mapping: AddressMapping,
    controllers: Vec<MemoryController>,

    clock_ratio: ClockRatio,
    clock_rem: u64,
    clock_mem: Clock,

    /// Backpressure currently asserted upstream.
    full: bool,
}

impl MemoryControllerHub {
    /// Builds the hub and one controller per channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the timing tables, topology or clock ratio
    /// cannot be derived from `config`.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let dram = config.dram_config()?;
        let controller = &config.controller;
        let topology = Topology::new(&dram, controller.channels, controller.ram_size)?;
        let mapping = AddressMapping::new(&topology);
        let clock_ratio = ClockRatio::new(dram.clock, config.general.host_freq_hz)?;

        let controllers = (0..topology.channels)
            .map(|id| {
                MemoryController::new(
                    id,
                    &dram,
                    &topology,
                    mapping,
                    controller,
                    config.general.trace_commands,
                )
            })
            .collect();

        debug!(
            "[{}] {} x{} channels, {} ranks, {} banks, {} rows, mapping {:?}",
            controller.name,
            controller.dram_type.tag(),
            topology.channels,
            topology.ranks,
            topology.banks,
            topology.rows,
            mapping
        );

        Ok(Self {
            name: controller.name.clone(),
            dram_type: controller.dram_type,
            ram_size: controller.ram_size,
            topology,
            mapping,
            controllers,
            clock_ratio,
            clock_rem: 0,
            clock_mem: 0,
            full: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn mapping(&self) -> &AddressMapping {
        &self.mapping
    }

    pub fn controllers(&self) -> &[MemoryController] {
        &self.controllers
    }

    pub fn controller(&self, channel: usize) -> &MemoryController {
        &self.controllers[channel]
    }

    /// Memory cycles elapsed so far.
    pub fn memory_clock(&self) -> Clock {
        self.clock_mem
    }

    /// Whether backpressure is currently asserted upstream.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Returns `true` when every channel has drained all its queues.
    pub fn is_idle(&self) -> bool {
        self.controllers.iter().all(MemoryController::is_idle)
    }

    fn channel_of(&self, request: &MemoryRequest) -> usize {
        self.mapping.channel.value(request.physical_address)
    }

    /// Accepts a request message from the interconnect.
    ///
    /// Data-carrying non-updates and evictions are acknowledged without
    /// queuing. An update is merged into a queued, not yet issued update to
    /// the same line; the backward scan stops at the newest entry for that
    /// line so per-address ordering is kept.
    ///
    /// # Returns
    ///
    /// `false` if the channel's request queue is full.
    pub fn handle_request(&mut self, message: &Message, upstream: &mut dyn Interconnect) -> bool {
        let request = &message.request;

        if message.has_data && request.op != MemoryOp::Update {
            return true;
        }
        if request.op == MemoryOp::Evict {
            return true;
        }

        let channel = self.channel_of(request);
        let controller = &mut self.controllers[channel];

        if request.op == MemoryOp::Update {
            let newest = controller
                .requests()
                .iter()
                .rev()
                .find(|(_, entry)| entry.request.physical_address == request.physical_address);
            if let Some((_, entry)) = newest {
                if !entry.issued && entry.request.is_update() {
                    return true;
                }
            }
        }

        let entry = RequestEntry::new(request.clone(), message.origin);
        if controller.requests_mut().alloc(entry).is_none() {
            return false;
        }

        if controller.requests().is_full() && !self.full {
            self.full = true;
            debug!("[{}] channel {} request queue full", self.name, channel);
            upstream.set_controller_full(true);
        }
        true
    }

    /// Advances the host clock by one cycle.
    ///
    /// Runs every channel once for each memory cycle that elapses.
    pub fn clock(&mut self, events: &mut dyn EventScheduler) {
        self.clock_rem += self.clock_ratio.numerator;
        while self.clock_rem >= self.clock_ratio.denominator {
            for controller in &mut self.controllers {
                controller.cycle(self.clock_mem);
                controller.do_scheduling(self.clock_mem, events);
            }
            self.clock_mem += 1;
            self.clock_rem -= self.clock_ratio.denominator;
        }
    }

    /// Dispatches an event previously scheduled by this hub.
    pub fn handle_event(
        &mut self,
        event: MemEvent,
        events: &mut dyn EventScheduler,
        upstream: &mut dyn Interconnect,
    ) {
        match event {
            MemEvent::AccessCompleted(handle) => self.access_completed(handle, events, upstream),
            MemEvent::WaitInterconnect(handle) => self.wait_interconnect(handle, events, upstream),
        }
    }

    /// Completion of a request's column command.
    ///
    /// Annulled requests are released silently; all others go on to
    /// response delivery.
    pub fn access_completed(
        &mut self,
        handle: EntryHandle,
        events: &mut dyn EventScheduler,
        upstream: &mut dyn Interconnect,
    ) {
        let Some(entry) = self.controllers[handle.channel].requests().get(handle.slot) else {
            return;
        };

        if entry.annulled {
            self.release(handle, upstream);
        } else {
            self.wait_interconnect(handle, events, upstream);
        }
    }

    /// Attempts to deliver the response of a completed request.
    ///
    /// Updates are released without a response. A rejected delivery is
    /// retried one cycle later.
    pub fn wait_interconnect(
        &mut self,
        handle: EntryHandle,
        events: &mut dyn EventScheduler,
        upstream: &mut dyn Interconnect,
    ) {
        let Some(entry) = self.controllers[handle.channel].requests().get(handle.slot) else {
            return;
        };

        if entry.request.is_update() {
            self.release(handle, upstream);
            return;
        }

        let message = Message {
            request: entry.request.clone(),
            has_data: true,
            origin: entry.source,
        };

        if upstream.send_response(&message) {
            self.release(handle, upstream);
        } else {
            warn!(
                "[{}] response for {} rejected, retrying",
                self.name, message.request
            );
            events.schedule(1, MemEvent::WaitInterconnect(handle));
        }
    }

    /// Cancels a request on behalf of the requester.
    ///
    /// Entries not yet promoted to a transaction are freed at once; promoted
    /// ones are marked and dropped without a response on completion.
    pub fn annul_request(&mut self, request: &MemoryRequest, upstream: &mut dyn Interconnect) {
        let channel = self.channel_of(request);
        let controller = &mut self.controllers[channel];

        let mut freed = false;
        for slot in controller.requests().slots() {
            let Some(entry) = controller.requests_mut().get_mut(slot) else {
                continue;
            };
            if !entry.request.is_same(request) {
                continue;
            }
            entry.annulled = true;
            if !entry.issued {
                controller.requests_mut().free(slot);
                freed = true;
            }
        }

        if freed {
            self.update_backpressure(upstream);
        }
    }

    /// Number of queued requests that belong to `core_id`, across channels.
    pub fn pending_requests_for(&self, core_id: u8) -> usize {
        self.controllers
            .iter()
            .flat_map(|controller| controller.requests().iter())
            .filter(|(_, entry)| entry.request.core_id == core_id)
            .count()
    }

    /// Read-only configuration snapshot.
    pub fn dump_configuration(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            self.name.clone(),
            json!({
                "type": "dram_module",
                "RAM_size": self.ram_size,
                "dram_type": self.dram_type.tag(),
                "channels": self.topology.channels,
                "ranks": self.topology.ranks,
            }),
        );
        Value::Object(map)
    }

    /// Frees a request entry, dropping the controller's share of the request.
    fn release(&mut self, handle: EntryHandle, upstream: &mut dyn Interconnect) {
        self.controllers[handle.channel]
            .requests_mut()
            .free(handle.slot);
        self.update_backpressure(upstream);
    }

    fn update_backpressure(&mut self, upstream: &mut dyn Interconnect) {
        let any_full = self
            .controllers
            .iter()
            .any(|controller| controller.requests().is_full());
        if self.full && !any_full {
            self.full = false;
            debug!("[{}] backpressure cleared", self.name);
            upstream.set_controller_full(false);
        }
    }
}

impl fmt::Display for MemoryControllerHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---Memory-Controller: {}", self.name)?;
        for controller in &self.controllers {
            writeln!(f, "Queue {}: {}", controller.id(), controller.requests())?;
        }
        write!(f, "---End Memory-Controller: {}", self.name)
    }
}
