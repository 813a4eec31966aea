//! DRAM device model.
//!
//! The hierarchy mirrors the hardware: a [`Channel`] owns its ranks and the
//! shared command/data buses, a [`Rank`] owns its banks and the rank-wide
//! activate and refresh constraints, and a [`Bank`] owns a row buffer. Each
//! level answers two questions for a command: when it may legally issue
//! (`ready_time`) and when its effect completes (`finish_time`, which also
//! records the command). Row-buffer and power state live in [`BankData`] and
//! [`RankData`] and are only mutated by the scheduler.

/// Per-bank timing state and row-buffer bookkeeping.
pub mod bank;

/// Channel-wide bus constraints.
pub mod channel;

/// Physical address to DRAM coordinate decoding.
pub mod mapping;

/// Rank-wide constraints and bank aggregation.
pub mod rank;

pub use bank::{Bank, BankData};
pub use channel::Channel;
pub use mapping::{AddressField, AddressMapping};
pub use rank::{Rank, RankData};

use std::fmt;

/// Physical location targeted by a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub channel: usize,
    pub rank: usize,
    pub bank: usize,
    pub row: usize,
    pub column: usize,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ch{}/rk{}/bk{}/row{:#x}/col{:#x}",
            self.channel, self.rank, self.bank, self.row, self.column
        )
    }
}

/// A concrete DRAM operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// Open a row into the bank's row buffer.
    Activate,
    /// Close the bank's open row.
    Precharge,
    /// Column read from the open row.
    Read,
    /// Column read followed by an implicit precharge.
    ReadPrecharge,
    /// Column write to the open row.
    Write,
    /// Column write followed by an implicit precharge.
    WritePrecharge,
    /// Rank-wide refresh; all banks must be closed.
    Refresh,
    /// Enter the low-power state.
    Powerdown,
    /// Leave the low-power state.
    Powerup,
}

impl CommandType {
    /// Returns `true` for commands that move data and complete a request.
    pub fn is_data(&self) -> bool {
        self.is_read() || self.is_write()
    }

    /// Returns `true` for read variants.
    pub fn is_read(&self) -> bool {
        matches!(self, CommandType::Read | CommandType::ReadPrecharge)
    }

    /// Returns `true` for write variants.
    pub fn is_write(&self) -> bool {
        matches!(self, CommandType::Write | CommandType::WritePrecharge)
    }
}
