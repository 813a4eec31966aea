//! DRAM Rank.
//!
//! A rank adds constraints shared by all of its banks: activate-to-activate
//! spacing, the four-activate window, column turnaround within the rank, and
//! the blocking latencies of refresh and power-state transitions.

use super::{Bank, BankData, CommandType, Coordinates};
use crate::common::Clock;
use crate::config::{BankTiming, RankTiming};
use std::collections::VecDeque;

/// Activates tracked by the four-activate window.
const FAW_DEPTH: usize = 4;

/// Scheduler-owned state of one rank.
#[derive(Debug, Clone, Default)]
pub struct RankData {
    /// Transactions queued for this rank.
    pub demand_count: usize,
    /// Banks with an open row.
    pub active_count: usize,
    /// Clock at which the next refresh becomes due.
    pub refresh_time: Clock,
    /// Whether the rank is powered down.
    pub is_sleeping: bool,
}

/// Timing state machine of one rank.
#[derive(Debug, Clone)]
pub struct Rank {
    timing: RankTiming,
    banks: Vec<Bank>,
    data: RankData,

    act_ready: Clock,
    /// Issue times of the most recent activates, oldest first.
    faw_window: VecDeque<Clock>,
    read_ready: Clock,
    write_ready: Clock,
    /// Blocks every command while a refresh or power-up completes.
    busy_until: Clock,
    powerup_ready: Clock,
    powerdown_ready: Clock,
}

impl Rank {
    /// Creates a rank of `bank_count` idle banks.
    pub fn new(
        timing: RankTiming,
        bank_timing: BankTiming,
        bank_count: usize,
        rows: usize,
    ) -> Self {
        Self {
            timing,
            banks: (0..bank_count).map(|_| Bank::new(bank_timing, rows)).collect(),
            data: RankData::default(),
            act_ready: 0,
            faw_window: VecDeque::with_capacity(FAW_DEPTH),
            read_ready: 0,
            write_ready: 0,
            busy_until: 0,
            powerup_ready: 0,
            powerdown_ready: 0,
        }
    }

    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    pub fn bank_data(&self, coordinates: &Coordinates) -> &BankData {
        self.banks[coordinates.bank].data()
    }

    pub fn bank_data_mut(&mut self, coordinates: &Coordinates) -> &mut BankData {
        self.banks[coordinates.bank].data_mut()
    }

    pub fn data(&self) -> &RankData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut RankData {
        &mut self.data
    }

    /// Earliest clock at which `command` may issue on this rank.
    pub fn ready_time(&self, command: CommandType, coordinates: &Coordinates) -> Clock {
        let bank = &self.banks[coordinates.bank];
        let rank_ready = match command {
            CommandType::Activate => self.act_ready.max(self.faw_ready()),
            CommandType::Read | CommandType::ReadPrecharge => self.read_ready,
            CommandType::Write | CommandType::WritePrecharge => self.write_ready,
            CommandType::Precharge => Clock::MIN,
            CommandType::Refresh => self.all_banks_ready(command),
            CommandType::Powerdown => self.powerdown_ready.max(self.all_banks_ready(command)),
            CommandType::Powerup => return self.busy_until.max(self.powerup_ready),
        };
        self.busy_until
            .max(rank_ready)
            .max(bank.ready_time(command))
    }

    /// Records `command` issued at `clock` and returns when it completes.
    pub fn finish_time(
        &mut self,
        clock: Clock,
        command: CommandType,
        coordinates: &Coordinates,
    ) -> Clock {
        let t = self.timing;
        match command {
            CommandType::Activate => {
                self.act_ready = self.act_ready.max(clock + t.act_to_act);
                if self.faw_window.len() == FAW_DEPTH {
                    self.faw_window.pop_front();
                }
                self.faw_window.push_back(clock);
            }
            CommandType::Read | CommandType::ReadPrecharge => {
                self.read_ready = self.read_ready.max(clock + t.read_to_read);
                self.write_ready = self.write_ready.max(clock + t.read_to_write);
            }
            CommandType::Write | CommandType::WritePrecharge => {
                self.read_ready = self.read_ready.max(clock + t.write_to_read);
                self.write_ready = self.write_ready.max(clock + t.write_to_write);
            }
            CommandType::Precharge => {}
            CommandType::Refresh => {
                self.busy_until = self.busy_until.max(clock + t.refresh_latency);
                return clock + t.refresh_latency;
            }
            CommandType::Powerdown => {
                self.powerup_ready = self.powerup_ready.max(clock + t.powerdown_latency);
                return clock + t.powerdown_latency;
            }
            CommandType::Powerup => {
                self.busy_until = self.busy_until.max(clock + t.powerup_latency);
                self.powerdown_ready = self.powerdown_ready.max(clock + t.powerdown_latency);
                return clock + t.powerup_latency;
            }
        }
        self.banks[coordinates.bank].finish_time(clock, command)
    }

    /// Drops activates that have left the four-activate window.
    pub fn cycle(&mut self, clock: Clock) {
        let window = self.timing.act_to_faw;
        while self
            .faw_window
            .front()
            .is_some_and(|&issued| issued + window <= clock)
        {
            self.faw_window.pop_front();
        }
    }

    /// Earliest activate allowed by the four-activate window.
    fn faw_ready(&self) -> Clock {
        if self.faw_window.len() < FAW_DEPTH {
            Clock::MIN
        } else {
            self.faw_window[0] + self.timing.act_to_faw
        }
    }

    fn all_banks_ready(&self, command: CommandType) -> Clock {
        self.banks
            .iter()
            .map(|bank| bank.ready_time(command))
            .max()
            .unwrap_or(Clock::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank() -> Rank {
        let timing = RankTiming {
            act_to_act: 4,
            act_to_faw: 20,
            read_to_read: 4,
            read_to_write: 7,
            write_to_read: 16,
            write_to_write: 4,
            refresh_latency: 107,
            refresh_interval: 5200,
            powerdown_latency: 4,
            powerup_latency: 5,
        };
        let bank_timing = BankTiming {
            act_to_read: 9,
            act_to_write: 9,
            act_to_pre: 24,
            read_to_pre: 5,
            write_to_pre: 21,
            pre_to_act: 9,
            read_to_data: 9,
            write_to_data: 7,
        };
        Rank::new(timing, bank_timing, 8, 16)
    }

    fn bank(bank: usize) -> Coordinates {
        Coordinates {
            bank,
            ..Coordinates::default()
        }
    }

    #[test]
    fn four_activate_window_limits_fifth_activate() {
        let mut rank = rank();
        for (i, clock) in [0, 4, 8, 12].into_iter().enumerate() {
            assert!(rank.ready_time(CommandType::Activate, &bank(i)) <= clock);
            rank.finish_time(clock, CommandType::Activate, &bank(i));
        }
        // tRRD alone would allow 16; the window holds it until 0 + tFAW
        assert_eq!(rank.ready_time(CommandType::Activate, &bank(4)), 20);
    }

    #[test]
    fn cycle_expires_old_activates() {
        let mut rank = rank();
        for (i, clock) in [0, 4, 8, 12].into_iter().enumerate() {
            rank.finish_time(clock, CommandType::Activate, &bank(i));
        }
        rank.cycle(20);
        assert_eq!(rank.ready_time(CommandType::Activate, &bank(4)), 16);
    }

    #[test]
    fn refresh_blocks_rank() {
        let mut rank = rank();
        let finish = rank.finish_time(10, CommandType::Refresh, &bank(0));
        assert_eq!(finish, 117);
        assert_eq!(rank.ready_time(CommandType::Activate, &bank(3)), 117);
    }

    #[test]
    fn refresh_waits_for_every_bank_to_precharge() {
        let mut rank = rank();
        rank.finish_time(0, CommandType::Activate, &bank(2));
        rank.finish_time(30, CommandType::Precharge, &bank(2));
        assert_eq!(rank.ready_time(CommandType::Refresh, &bank(0)), 39);
    }

    #[test]
    fn powerup_respects_minimum_powerdown_time() {
        let mut rank = rank();
        assert_eq!(rank.finish_time(50, CommandType::Powerdown, &bank(0)), 54);
        assert_eq!(rank.ready_time(CommandType::Powerup, &bank(0)), 54);
        rank.finish_time(60, CommandType::Powerup, &bank(0));
        assert_eq!(rank.ready_time(CommandType::Read, &bank(0)), 65);
    }
}
