//! DRAM Bank.
//!
//! A bank tracks the earliest time each command class may next issue against
//! it, and carries the scheduler's row-buffer bookkeeping.

use super::CommandType;
use crate::common::Clock;
use crate::config::BankTiming;

/// Scheduler-owned state of one bank.
#[derive(Debug, Clone)]
pub struct BankData {
    /// Transactions queued for this bank.
    pub demand_count: usize,
    /// Row currently latched in the row buffer, `None` when precharged.
    pub row_buffer: Option<usize>,
    /// Accesses served since the open row was activated.
    pub hit_count: u32,
    /// Queued transactions the open row can still serve.
    pub supply_count: usize,
    /// Logical-to-physical row translation, one entry per row.
    row_map: Box<[usize]>,
}

impl BankData {
    /// Creates a closed bank with an identity row map.
    pub fn new(rows: usize) -> Self {
        Self {
            demand_count: 0,
            row_buffer: None,
            hit_count: 0,
            supply_count: 0,
            row_map: (0..rows).collect(),
        }
    }

    /// Returns `true` if a row is open.
    pub fn is_open(&self) -> bool {
        self.row_buffer.is_some()
    }

    /// Translates a decoded row through the bank's row map.
    ///
    /// Rows outside the table pass through unchanged.
    pub fn remap(&self, row: usize) -> usize {
        self.row_map.get(row).copied().unwrap_or(row)
    }

    /// Redirects one logical row to another physical row.
    pub fn set_row_mapping(&mut self, row: usize, physical: usize) {
        if let Some(slot) = self.row_map.get_mut(row) {
            *slot = physical;
        }
    }

    /// Latches `row` and resets the per-row counters.
    pub fn open(&mut self, row: usize) {
        self.row_buffer = Some(row);
        self.hit_count = 0;
        self.supply_count = 0;
    }

    /// Precharges the row buffer.
    pub fn close(&mut self) {
        self.row_buffer = None;
        self.hit_count = 0;
        self.supply_count = 0;
    }
}

/// Timing state machine of one bank.
#[derive(Debug, Clone)]
pub struct Bank {
    timing: BankTiming,
    data: BankData,

    act_ready: Clock,
    pre_ready: Clock,
    read_ready: Clock,
    write_ready: Clock,
}

impl Bank {
    /// Creates an idle bank with `rows` rows.
    pub fn new(timing: BankTiming, rows: usize) -> Self {
        Self {
            timing,
            data: BankData::new(rows),
            act_ready: 0,
            pre_ready: 0,
            read_ready: 0,
            write_ready: 0,
        }
    }

    pub fn data(&self) -> &BankData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut BankData {
        &mut self.data
    }

    /// Earliest clock at which `command` may issue against this bank.
    ///
    /// Rank-level commands are only constrained by the bank being fully
    /// precharged.
    pub fn ready_time(&self, command: CommandType) -> Clock {
        match command {
            CommandType::Activate => self.act_ready,
            CommandType::Precharge => self.pre_ready,
            CommandType::Read | CommandType::ReadPrecharge => self.read_ready,
            CommandType::Write | CommandType::WritePrecharge => self.write_ready,
            CommandType::Refresh | CommandType::Powerdown => self.act_ready,
            CommandType::Powerup => Clock::MIN,
        }
    }

    /// Records `command` issued at `clock` and returns when it completes.
    ///
    /// For auto-precharge variants the returned time covers the implicit
    /// precharge as well as the data transfer.
    pub fn finish_time(&mut self, clock: Clock, command: CommandType) -> Clock {
        let t = self.timing;
        match command {
            CommandType::Activate => {
                self.read_ready = self.read_ready.max(clock + t.act_to_read);
                self.write_ready = self.write_ready.max(clock + t.act_to_write);
                self.pre_ready = self.pre_ready.max(clock + t.act_to_pre);
                clock + t.act_to_read
            }
            CommandType::Precharge => {
                self.act_ready = self.act_ready.max(clock + t.pre_to_act);
                clock + t.pre_to_act
            }
            CommandType::Read => {
                self.pre_ready = self.pre_ready.max(clock + t.read_to_pre);
                clock + t.read_to_data
            }
            CommandType::Write => {
                self.pre_ready = self.pre_ready.max(clock + t.write_to_pre);
                clock + t.write_to_data
            }
            CommandType::ReadPrecharge => {
                let closed = self.implicit_precharge(clock + t.read_to_pre);
                closed.max(clock + t.read_to_data)
            }
            CommandType::WritePrecharge => {
                let closed = self.implicit_precharge(clock + t.write_to_pre);
                closed.max(clock + t.write_to_data)
            }
            CommandType::Refresh | CommandType::Powerdown | CommandType::Powerup => clock,
        }
    }

    /// Schedules the precharge that follows an auto-precharge column access.
    fn implicit_precharge(&mut self, earliest: Clock) -> Clock {
        let issue = self.pre_ready.max(earliest);
        self.pre_ready = issue;
        self.act_ready = self.act_ready.max(issue + self.timing.pre_to_act);
        issue + self.timing.pre_to_act
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> BankTiming {
        BankTiming {
            act_to_read: 9,
            act_to_write: 9,
            act_to_pre: 24,
            read_to_pre: 5,
            write_to_pre: 21,
            pre_to_act: 9,
            read_to_data: 9,
            write_to_data: 7,
        }
    }

    #[test]
    fn activate_gates_column_and_precharge() {
        let mut bank = Bank::new(timing(), 16);
        assert_eq!(bank.finish_time(100, CommandType::Activate), 109);
        assert_eq!(bank.ready_time(CommandType::Read), 109);
        assert_eq!(bank.ready_time(CommandType::Write), 109);
        assert_eq!(bank.ready_time(CommandType::Precharge), 124);
    }

    #[test]
    fn read_precharge_covers_implicit_precharge() {
        let mut bank = Bank::new(timing(), 16);
        bank.finish_time(0, CommandType::Activate);
        let finish = bank.finish_time(9, CommandType::ReadPrecharge);
        // precharge waits for tRAS (24), then tRP
        assert_eq!(finish, 24 + 9);
        assert_eq!(bank.ready_time(CommandType::Activate), 33);
    }

    #[test]
    fn close_clears_counters() {
        let mut data = BankData::new(4);
        data.open(2);
        data.hit_count = 3;
        data.supply_count = 1;
        data.close();
        assert!(!data.is_open());
        assert_eq!(data.hit_count, 0);
        assert_eq!(data.supply_count, 0);
    }

    #[test]
    fn row_map_starts_as_identity() {
        let mut data = BankData::new(8);
        assert_eq!(data.remap(5), 5);
        data.set_row_mapping(5, 1);
        assert_eq!(data.remap(5), 1);
        assert_eq!(data.remap(100), 100);
    }
}
