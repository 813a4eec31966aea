//! DRAM Channel.
//!
//! The channel owns the command/address bus and the data bus shared by all
//! of its ranks. Every command occupies the command bus; column commands
//! that switch the data bus to a different rank additionally pay the
//! rank-to-rank turnaround.

use super::{BankData, CommandType, Coordinates, Rank, RankData};
use crate::common::Clock;
use crate::config::{ChannelTiming, DramConfig, Topology};

/// Timing state machine of one channel.
#[derive(Debug, Clone)]
pub struct Channel {
    timing: ChannelTiming,
    ranks: Vec<Rank>,

    /// Rank that last drove the data bus.
    rank_select: Option<usize>,

    any_ready: Clock,
    read_ready: Clock,
    write_ready: Clock,
}

impl Channel {
    /// Builds a channel with the ranks and banks described by `topology`.
    pub fn new(config: &DramConfig, topology: &Topology) -> Self {
        let ranks = (0..topology.ranks)
            .map(|_| {
                Rank::new(
                    config.rank_timing,
                    config.bank_timing,
                    topology.banks,
                    topology.rows,
                )
            })
            .collect();

        Self {
            timing: config.channel_timing,
            ranks,
            rank_select: None,
            any_ready: 0,
            read_ready: 0,
            write_ready: 0,
        }
    }

    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn bank_count(&self) -> usize {
        self.ranks.first().map_or(0, Rank::bank_count)
    }

    pub fn bank_data(&self, coordinates: &Coordinates) -> &BankData {
        self.ranks[coordinates.rank].bank_data(coordinates)
    }

    pub fn bank_data_mut(&mut self, coordinates: &Coordinates) -> &mut BankData {
        self.ranks[coordinates.rank].bank_data_mut(coordinates)
    }

    pub fn rank_data(&self, coordinates: &Coordinates) -> &RankData {
        self.ranks[coordinates.rank].data()
    }

    pub fn rank_data_mut(&mut self, coordinates: &Coordinates) -> &mut RankData {
        self.ranks[coordinates.rank].data_mut()
    }

    /// Earliest clock at which `command` may issue, combining channel, rank
    /// and bank constraints.
    pub fn ready_time(&self, command: CommandType, coordinates: &Coordinates) -> Clock {
        let mut ready = self.any_ready;

        if self.switches_rank(command, coordinates) {
            if command.is_read() {
                ready = ready.max(self.read_ready);
            } else {
                ready = ready.max(self.write_ready);
            }
        }

        ready.max(self.ranks[coordinates.rank].ready_time(command, coordinates))
    }

    /// Records `command` issued at `clock` and returns when it completes.
    pub fn finish_time(
        &mut self,
        clock: Clock,
        command: CommandType,
        coordinates: &Coordinates,
    ) -> Clock {
        let t = self.timing;
        let bus = if command == CommandType::Activate {
            t.act_to_any
        } else {
            t.any_to_any
        };
        self.any_ready = self.any_ready.max(clock + bus);

        if command.is_read() {
            self.read_ready = self.read_ready.max(clock + t.read_to_read);
            self.write_ready = self.write_ready.max(clock + t.read_to_write);
            self.rank_select = Some(coordinates.rank);
        } else if command.is_write() {
            self.read_ready = self.read_ready.max(clock + t.write_to_read);
            self.write_ready = self.write_ready.max(clock + t.write_to_write);
            self.rank_select = Some(coordinates.rank);
        }

        self.ranks[coordinates.rank].finish_time(clock, command, coordinates)
    }

    /// Advances per-rank tracking windows to `clock`.
    pub fn cycle(&mut self, clock: Clock) {
        for rank in &mut self.ranks {
            rank.cycle(clock);
        }
    }

    fn switches_rank(&self, command: CommandType, coordinates: &Coordinates) -> bool {
        command.is_data() && self.rank_select.is_some_and(|rank| rank != coordinates.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{get_dram_config, DramType};

    fn channel(ranks: usize) -> Channel {
        let params = get_dram_config(DramType::Ddr3_1333).unwrap();
        let dram = DramConfig::new(&params).unwrap();
        let topology = Topology {
            channels: 1,
            ranks,
            banks: 8,
            rows: 16,
            columns: 128,
        };
        Channel::new(&dram, &topology)
    }

    fn at(rank: usize, bank: usize) -> Coordinates {
        Coordinates {
            rank,
            bank,
            ..Coordinates::default()
        }
    }

    #[test]
    fn command_bus_serialises_commands() {
        let mut channel = channel(1);
        channel.finish_time(0, CommandType::Activate, &at(0, 0));
        // different bank, different rank constraints aside, the bus is busy for tCMD
        assert!(channel.ready_time(CommandType::Precharge, &at(0, 1)) >= 1);
    }

    #[test]
    fn rank_switch_pays_turnaround() {
        let mut channel = channel(2);
        channel.finish_time(0, CommandType::Activate, &at(0, 0));
        channel.finish_time(1, CommandType::Activate, &at(1, 0));
        channel.finish_time(9, CommandType::Read, &at(0, 0));
        // same rank: tCCD = 4, other rank: tBL + tRTRS = 5
        assert_eq!(channel.ready_time(CommandType::Read, &at(0, 0)), 13);
        assert_eq!(channel.ready_time(CommandType::Read, &at(1, 0)), 14);
    }

    #[test]
    fn read_finishes_after_cas_latency() {
        let mut channel = channel(1);
        channel.finish_time(0, CommandType::Activate, &at(0, 0));
        assert_eq!(channel.finish_time(9, CommandType::Read, &at(0, 0)), 18);
    }
}
