//! Per-channel DRAM Memory Controller.
//!
//! This module owns the three bounded queues of one channel (requests,
//! transactions, commands) and the scheduling policy that turns queued
//! requests into timed DRAM commands once per memory cycle.
//!
//! The policy is open-row with row-hit favoring: a row stays open while
//! queued transactions still need it, up to `max_row_hits` consecutive hits.
//! Refresh pre-empts demand traffic, idle rows are closed, and idle ranks are
//! powered down.

use super::queue::BoundedQueue;
use super::{EntryHandle, MemEvent};
use crate::common::{Clock, MemoryRequest, SourceId};
use crate::config::{ControllerConfig, DramConfig, Policy, Topology};
use crate::dram::{AddressMapping, Channel, CommandType, Coordinates};
use crate::soc::traits::EventScheduler;
use log::{debug, trace};
use std::fmt;
use std::rc::Rc;

/// A request admitted from the interconnect.
#[derive(Debug, Clone)]
pub struct RequestEntry {
    /// The shared request; holding it keeps the request alive.
    pub request: Rc<MemoryRequest>,
    /// Controller the response goes back to.
    pub source: SourceId,
    /// Promoted to a transaction.
    pub issued: bool,
    /// Cancelled by the requester after promotion.
    pub annulled: bool,
}

impl RequestEntry {
    pub fn new(request: Rc<MemoryRequest>, source: SourceId) -> Self {
        Self {
            request,
            source,
            issued: false,
            annulled: false,
        }
    }
}

impl fmt::Display for RequestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {:?}{}{}",
            self.request,
            self.source,
            if self.issued { " issued" } else { "" },
            if self.annulled { " annulled" } else { "" }
        )
    }
}

/// A request with its decoded coordinates, waiting for its column command.
#[derive(Debug, Clone, Copy)]
pub struct TransactionEntry {
    /// Slot of the owning request entry.
    pub request: usize,
    pub coordinates: Coordinates,
}

/// A command accepted by the timing model, waiting to retire.
#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    /// Slot of the request served, `None` for housekeeping commands.
    pub request: Option<usize>,
    pub command: CommandType,
    pub coordinates: Coordinates,
    pub issue_time: Clock,
    pub finish_time: Clock,
}

/// Record of an accepted command, kept when command tracing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedCommand {
    pub command: CommandType,
    pub coordinates: Coordinates,
    pub issue_time: Clock,
    pub finish_time: Clock,
}

/// Scheduling engine for one DRAM channel.
pub struct MemoryController {
    id: usize,
    channel: Channel,
    mapping: AddressMapping,
    policy: Policy,
    refresh_interval: Clock,

    requests: BoundedQueue<RequestEntry>,
    transactions: BoundedQueue<TransactionEntry>,
    commands: BoundedQueue<CommandEntry>,

    command_log: Option<Vec<IssuedCommand>>,
}

impl MemoryController {
    /// Creates the controller of channel `id`.
    ///
    /// Refreshes are staggered so rank `r` is first due at
    /// `(refresh_interval / ranks) * (r + 1)`.
    pub fn new(
        id: usize,
        dram: &DramConfig,
        topology: &Topology,
        mapping: AddressMapping,
        config: &ControllerConfig,
        trace_commands: bool,
    ) -> Self {
        let mut channel = Channel::new(dram, topology);
        let refresh_interval = dram.rank_timing.refresh_interval;
        let refresh_step = refresh_interval / topology.ranks as Clock;

        for rank in 0..topology.ranks {
            let coordinates = Coordinates {
                channel: id,
                rank,
                ..Coordinates::default()
            };
            let data = channel.rank_data_mut(&coordinates);
            data.refresh_time = refresh_step * (rank as Clock + 1);
        }

        let trace_commands = trace_commands || cfg!(feature = "always-trace");

        Self {
            id,
            channel,
            mapping,
            policy: Policy::from(config),
            refresh_interval,
            requests: BoundedQueue::new(config.request_queue_size),
            transactions: BoundedQueue::new(config.transaction_queue_size),
            commands: BoundedQueue::new(config.command_queue_size),
            command_log: trace_commands.then(Vec::new),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn requests(&self) -> &BoundedQueue<RequestEntry> {
        &self.requests
    }

    pub fn requests_mut(&mut self) -> &mut BoundedQueue<RequestEntry> {
        &mut self.requests
    }

    pub fn transactions(&self) -> &BoundedQueue<TransactionEntry> {
        &self.transactions
    }

    pub fn commands(&self) -> &BoundedQueue<CommandEntry> {
        &self.commands
    }

    /// Commands accepted so far, if tracing is enabled.
    pub fn command_log(&self) -> &[IssuedCommand] {
        self.command_log.as_deref().unwrap_or(&[])
    }

    /// Redirects accesses to `coordinates.row` of one bank to `physical`.
    ///
    /// Applies to transactions promoted from now on.
    pub fn remap_row(&mut self, coordinates: &Coordinates, physical: usize) {
        self.channel
            .bank_data_mut(coordinates)
            .set_row_mapping(coordinates.row, physical);
    }

    /// Returns `true` when no request, transaction or command is queued.
    pub fn is_idle(&self) -> bool {
        self.requests.is_empty() && self.transactions.is_empty() && self.commands.is_empty()
    }

    /// Lets the channel's timing windows advance to `clock`.
    pub fn cycle(&mut self, clock: Clock) {
        self.channel.cycle(clock);
    }

    /// Promotes a queued request to a transaction.
    ///
    /// Decodes the request's coordinates, charges the rank and bank demand
    /// counters and, if the target row is already open, its supply counter.
    /// Returns `false` when the transaction queue is full.
    pub fn add_transaction(&mut self, _clock: Clock, request: usize) -> bool {
        if self.transactions.is_full() {
            return false;
        }

        let address = self.request(request).request.physical_address;
        let mut coordinates = self.mapping.decode(address);
        coordinates.row = self.channel.bank_data(&coordinates).remap(coordinates.row);

        if self
            .transactions
            .alloc(TransactionEntry {
                request,
                coordinates,
            })
            .is_none()
        {
            return false;
        }

        self.channel.rank_data_mut(&coordinates).demand_count += 1;
        let bank = self.channel.bank_data_mut(&coordinates);
        bank.demand_count += 1;
        if bank.row_buffer == Some(coordinates.row) {
            bank.supply_count += 1;
        }
        true
    }

    /// Queues `command` for issue at `clock` if the timing model allows it.
    ///
    /// Refuses without side effects when the command is not yet legal or the
    /// command queue is full; the caller retries on a later cycle.
    pub fn add_command(
        &mut self,
        clock: Clock,
        command: CommandType,
        coordinates: &Coordinates,
        request: Option<usize>,
    ) -> bool {
        if self.channel.ready_time(command, coordinates) > clock {
            return false;
        }
        if self.commands.is_full() {
            return false;
        }

        let finish_time = self.channel.finish_time(clock, command, coordinates);
        let entry = CommandEntry {
            request,
            command,
            coordinates: *coordinates,
            issue_time: clock,
            finish_time,
        };

        trace!(
            "[MC{}] {:?} {} issue={} finish={}",
            self.id,
            command,
            coordinates,
            clock,
            finish_time
        );
        if let Some(log) = self.command_log.as_mut() {
            log.push(IssuedCommand {
                command,
                coordinates: *coordinates,
                issue_time: clock,
                finish_time,
            });
        }

        self.commands.alloc(entry).is_some()
    }

    /// Runs one memory cycle of the scheduling policy.
    ///
    /// Passes run in a fixed order: admission, refresh, transaction
    /// scheduling, idle-row precharge, power-down, retirement. Completed
    /// column commands schedule an [`MemEvent::AccessCompleted`] on `events`.
    pub fn do_scheduling(&mut self, clock: Clock, events: &mut dyn EventScheduler) {
        self.admit_requests(clock);
        self.schedule_refresh(clock);
        self.schedule_transactions(clock);
        self.close_idle_rows(clock);
        self.power_down_idle_ranks(clock);
        self.retire_commands(clock, events);

        if cfg!(debug_assertions) {
            self.check_invariants();
        }
    }

    fn admit_requests(&mut self, clock: Clock) {
        for slot in self.requests.slots() {
            if self.request(slot).issued {
                continue;
            }
            // in-order: a blocked request holds back every later one
            if !self.add_transaction(clock, slot) {
                break;
            }
            if let Some(entry) = self.requests.get_mut(slot) {
                entry.issued = true;
            }
        }
    }

    fn schedule_refresh(&mut self, clock: Clock) {
        for rank in 0..self.channel.rank_count() {
            let mut coordinates = Coordinates {
                channel: self.id,
                rank,
                ..Coordinates::default()
            };

            if clock < self.channel.rank_data(&coordinates).refresh_time {
                continue;
            }

            if self.channel.rank_data(&coordinates).is_sleeping {
                if !self.add_command(clock, CommandType::Powerup, &coordinates, None) {
                    continue;
                }
                self.channel.rank_data_mut(&coordinates).is_sleeping = false;
                debug!("[MC{}] rank {} powered up for refresh", self.id, rank);
            }

            for bank in 0..self.channel.bank_count() {
                coordinates.bank = bank;
                if !self.channel.bank_data(&coordinates).is_open() {
                    continue;
                }
                if !self.add_command(clock, CommandType::Precharge, &coordinates, None) {
                    continue;
                }
                self.close_bank(&coordinates);
            }

            if self.channel.rank_data(&coordinates).active_count > 0 {
                continue;
            }

            coordinates.bank = 0;
            if !self.add_command(clock, CommandType::Refresh, &coordinates, None) {
                continue;
            }
            let data = self.channel.rank_data_mut(&coordinates);
            data.refresh_time += self.refresh_interval;
            debug!(
                "[MC{}] rank {} refreshed at {}, next due {}",
                self.id, rank, clock, data.refresh_time
            );
        }
    }

    fn schedule_transactions(&mut self, clock: Clock) {
        for slot in self.transactions.slots() {
            let Some(&transaction) = self.transactions.get(slot) else {
                continue;
            };
            let coordinates = transaction.coordinates;

            // refresh has priority
            if clock >= self.channel.rank_data(&coordinates).refresh_time {
                continue;
            }

            if self.channel.rank_data(&coordinates).is_sleeping {
                if !self.add_command(clock, CommandType::Powerup, &coordinates, None) {
                    continue;
                }
                self.channel.rank_data_mut(&coordinates).is_sleeping = false;
            }

            let bank = self.channel.bank_data(&coordinates);
            if let Some(open_row) = bank.row_buffer {
                let conflict = open_row != coordinates.row;
                if conflict || bank.hit_count >= self.policy.max_row_hits {
                    // keep the row while queued transactions still need it
                    if conflict && bank.supply_count > 0 {
                        continue;
                    }
                    if !self.add_command(clock, CommandType::Precharge, &coordinates, None) {
                        continue;
                    }
                    self.close_bank(&coordinates);
                }
            }

            if !self.channel.bank_data(&coordinates).is_open() {
                if !self.add_command(clock, CommandType::Activate, &coordinates, None) {
                    continue;
                }
                self.open_bank(&coordinates);
            }

            let bank = self.channel.bank_data(&coordinates);
            assert_eq!(
                bank.row_buffer,
                Some(coordinates.row),
                "column command against a bank with a different open row"
            );
            assert!(
                bank.supply_count > 0,
                "column command against a row with no outstanding supply"
            );

            let command = if self.request(transaction.request).request.is_update() {
                CommandType::Write
            } else {
                CommandType::Read
            };
            if !self.add_command(clock, command, &coordinates, Some(transaction.request)) {
                continue;
            }

            self.channel.rank_data_mut(&coordinates).demand_count -= 1;
            let bank = self.channel.bank_data_mut(&coordinates);
            bank.demand_count -= 1;
            bank.supply_count -= 1;
            bank.hit_count += 1;

            self.transactions.free(slot);
        }
    }

    /// Closes rows that no queued transaction needs.
    ///
    /// The precharge is requested `max_row_idle` cycles in the past.
    fn close_idle_rows(&mut self, clock: Clock) {
        let idle_time = clock - self.policy.max_row_idle;

        for rank in 0..self.channel.rank_count() {
            for bank in 0..self.channel.bank_count() {
                let coordinates = Coordinates {
                    channel: self.id,
                    rank,
                    bank,
                    ..Coordinates::default()
                };
                let data = self.channel.bank_data(&coordinates);
                if !data.is_open() || data.demand_count > 0 {
                    continue;
                }
                if !self.add_command(idle_time, CommandType::Precharge, &coordinates, None) {
                    continue;
                }
                self.close_bank(&coordinates);
            }
        }
    }

    fn power_down_idle_ranks(&mut self, clock: Clock) {
        for rank in 0..self.channel.rank_count() {
            let coordinates = Coordinates {
                channel: self.id,
                rank,
                ..Coordinates::default()
            };
            let data = self.channel.rank_data(&coordinates);

            if data.is_sleeping
                || data.demand_count > 0
                || data.active_count > 0
                || clock >= data.refresh_time
            {
                continue;
            }

            if !self.add_command(clock, CommandType::Powerdown, &coordinates, None) {
                continue;
            }
            self.channel.rank_data_mut(&coordinates).is_sleeping = true;
            debug!("[MC{}] rank {} powered down at {}", self.id, rank, clock);
        }
    }

    fn retire_commands(&mut self, clock: Clock, events: &mut dyn EventScheduler) {
        for slot in self.commands.slots() {
            let Some(&entry) = self.commands.get(slot) else {
                continue;
            };
            if clock < entry.issue_time {
                continue;
            }

            if entry.command.is_data() {
                if let Some(request) = entry.request {
                    let delay = (entry.finish_time - clock).max(0) as u64;
                    events.schedule(
                        delay,
                        MemEvent::AccessCompleted(EntryHandle {
                            channel: self.id,
                            slot: request,
                        }),
                    );
                }
            }

            self.commands.free(slot);
        }
    }

    fn open_bank(&mut self, coordinates: &Coordinates) {
        let supply = self
            .transactions
            .iter()
            .filter(|(_, t)| {
                t.coordinates.rank == coordinates.rank
                    && t.coordinates.bank == coordinates.bank
                    && t.coordinates.row == coordinates.row
            })
            .count();

        self.channel.rank_data_mut(coordinates).active_count += 1;
        let bank = self.channel.bank_data_mut(coordinates);
        bank.open(coordinates.row);
        bank.supply_count = supply;
    }

    fn close_bank(&mut self, coordinates: &Coordinates) {
        self.channel.rank_data_mut(coordinates).active_count -= 1;
        self.channel.bank_data_mut(coordinates).close();
    }

    fn request(&self, slot: usize) -> &RequestEntry {
        match self.requests.get(slot) {
            Some(entry) => entry,
            None => panic!("[MC{}] request slot {} is not live", self.id, slot),
        }
    }

    /// Asserts the bookkeeping invariants of every rank and bank.
    ///
    /// A rank's active count equals its open banks, and a closed bank has no
    /// hit or supply count.
    pub fn check_invariants(&self) {
        for rank in 0..self.channel.rank_count() {
            let mut coordinates = Coordinates {
                channel: self.id,
                rank,
                ..Coordinates::default()
            };
            let mut open = 0;
            for bank in 0..self.channel.bank_count() {
                coordinates.bank = bank;
                let data = self.channel.bank_data(&coordinates);
                if data.is_open() {
                    open += 1;
                } else {
                    assert!(
                        data.hit_count == 0 && data.supply_count == 0,
                        "closed bank {} with stale row counters",
                        coordinates
                    );
                }
            }
            assert_eq!(
                self.channel.rank_data(&coordinates).active_count,
                open,
                "rank {} active count out of sync",
                rank
            );
        }
    }
}
