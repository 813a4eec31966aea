//! Controller configuration and DRAM timing tables.
//!
//! The configuration is loaded from TOML. DRAM technologies are selected by
//! tag through [`get_dram_config`], which returns the canonical timing
//! parameters; [`DramConfig::new`] then derives the cross-command latency
//! tables used by the bank/rank/channel timing model. Everything here is
//! resolved once at construction and injected into the controller.

use crate::common::ConfigError;
use serde::Deserialize;
use std::fs;

/// Default values for every optional configuration key.
pub mod defaults {
    /// Host core frequency (2 GHz).
    pub const HOST_FREQ_HZ: u64 = 2_000_000_000;

    /// Controller name used in the configuration dump.
    pub const NAME: &str = "MEM0";

    /// Number of independent channels.
    pub const CHANNELS: usize = 1;

    /// Consecutive row hits served before a row is forcibly closed.
    pub const MAX_ROW_HITS: u32 = 4;

    /// Cycles an idle row is back-dated by when closed.
    pub const MAX_ROW_IDLE: i64 = 0;

    /// Total memory capacity (2 GiB).
    pub const RAM_SIZE: u64 = 2 * 1024 * 1024 * 1024;

    /// Capacity of each of the three controller queues.
    pub const QUEUE_SIZE: usize = 64;

    /// Bytes per cache line; the low address bits below it are not decoded.
    pub const LINE_OFFSET_BITS: u32 = 6;

    /// Column bits covered by one cache line burst (8 bytes x 8 beats).
    pub const BURST_COLUMN_BITS: u32 = 3;
}

/// DRAM technology selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DramType {
    /// DDR2-800, 5-5-5.
    #[serde(rename = "DDR2_800", alias = "Ddr2_800")]
    Ddr2_800,
    /// DDR3-1066, 7-7-7.
    #[serde(rename = "DDR3_1066", alias = "Ddr3_1066")]
    Ddr3_1066,
    /// DDR3-1333, 9-9-9.
    #[default]
    #[serde(rename = "DDR3_1333", alias = "Ddr3_1333")]
    Ddr3_1333,
    /// DDR3-1600, 11-11-11.
    #[serde(rename = "DDR3_1600", alias = "Ddr3_1600")]
    Ddr3_1600,
    /// User-supplied `[timing]` table.
    Custom,
}

impl DramType {
    /// Returns the tag used in diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            DramType::Ddr2_800 => "DDR2_800",
            DramType::Ddr3_1066 => "DDR3_1066",
            DramType::Ddr3_1333 => "DDR3_1333",
            DramType::Ddr3_1600 => "DDR3_1600",
            DramType::Custom => "Custom",
        }
    }
}

/// Canonical DRAM timing parameters, in memory clock cycles unless noted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingParams {
    /// Devices per rank.
    pub devices: u32,
    /// Banks per rank.
    pub banks: u32,
    /// Columns per row.
    pub columns: u32,
    /// Rank capacity in MiB.
    pub rank_size_mb: u64,
    /// Clock period in nanoseconds.
    pub t_ck: f64,
    pub t_cmd: i64,
    pub t_cl: i64,
    pub t_cwl: i64,
    pub t_al: i64,
    pub t_bl: i64,
    pub t_ras: i64,
    pub t_rcd: i64,
    pub t_rp: i64,
    pub t_rrd: i64,
    pub t_ccd: i64,
    pub t_faw: i64,
    pub t_rtp: i64,
    pub t_wtr: i64,
    pub t_wr: i64,
    pub t_rtrs: i64,
    pub t_rfc: i64,
    pub t_refi: i64,
    pub t_cke: i64,
    pub t_xp: i64,
}

/// Returns the canonical timing table for a DRAM technology.
///
/// Pure lookup; `Custom` has no canonical table and yields `None`.
pub fn get_dram_config(dram_type: DramType) -> Option<TimingParams> {
    let params = match dram_type {
        DramType::Ddr2_800 => TimingParams {
            devices: 8,
            banks: 8,
            columns: 1024,
            rank_size_mb: 1024,
            t_ck: 2.5,
            t_cmd: 1,
            t_cl: 5,
            t_cwl: 4,
            t_al: 0,
            t_bl: 4,
            t_ras: 18,
            t_rcd: 5,
            t_rp: 5,
            t_rrd: 3,
            t_ccd: 2,
            t_faw: 14,
            t_rtp: 3,
            t_wtr: 3,
            t_wr: 6,
            t_rtrs: 1,
            t_rfc: 51,
            t_refi: 3120,
            t_cke: 3,
            t_xp: 2,
        },
        DramType::Ddr3_1066 => TimingParams {
            devices: 8,
            banks: 8,
            columns: 1024,
            rank_size_mb: 1024,
            t_ck: 1.875,
            t_cmd: 1,
            t_cl: 7,
            t_cwl: 6,
            t_al: 0,
            t_bl: 4,
            t_ras: 20,
            t_rcd: 7,
            t_rp: 7,
            t_rrd: 4,
            t_ccd: 4,
            t_faw: 20,
            t_rtp: 4,
            t_wtr: 4,
            t_wr: 8,
            t_rtrs: 1,
            t_rfc: 59,
            t_refi: 4160,
            t_cke: 3,
            t_xp: 4,
        },
        DramType::Ddr3_1333 => TimingParams {
            devices: 8,
            banks: 8,
            columns: 1024,
            rank_size_mb: 2048,
            t_ck: 1.5,
            t_cmd: 1,
            t_cl: 9,
            t_cwl: 7,
            t_al: 0,
            t_bl: 4,
            t_ras: 24,
            t_rcd: 9,
            t_rp: 9,
            t_rrd: 4,
            t_ccd: 4,
            t_faw: 20,
            t_rtp: 5,
            t_wtr: 5,
            t_wr: 10,
            t_rtrs: 1,
            t_rfc: 107,
            t_refi: 5200,
            t_cke: 4,
            t_xp: 5,
        },
        DramType::Ddr3_1600 => TimingParams {
            devices: 8,
            banks: 8,
            columns: 1024,
            rank_size_mb: 2048,
            t_ck: 1.25,
            t_cmd: 1,
            t_cl: 11,
            t_cwl: 8,
            t_al: 0,
            t_bl: 4,
            t_ras: 28,
            t_rcd: 11,
            t_rp: 11,
            t_rrd: 5,
            t_ccd: 4,
            t_faw: 24,
            t_rtp: 6,
            t_wtr: 6,
            t_wr: 12,
            t_rtrs: 1,
            t_rfc: 128,
            t_refi: 6240,
            t_cke: 4,
            t_xp: 5,
        },
        DramType::Custom => return None,
    };
    Some(params)
}

/// Channel-wide bus constraints, applied when the data bus changes rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTiming {
    pub any_to_any: i64,
    pub act_to_any: i64,
    pub read_to_read: i64,
    pub read_to_write: i64,
    pub write_to_read: i64,
    pub write_to_write: i64,
}

/// Rank-wide constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankTiming {
    pub act_to_act: i64,
    pub act_to_faw: i64,
    pub read_to_read: i64,
    pub read_to_write: i64,
    pub write_to_read: i64,
    pub write_to_write: i64,
    pub refresh_latency: i64,
    pub refresh_interval: i64,
    pub powerdown_latency: i64,
    pub powerup_latency: i64,
}

/// Same-bank constraints and data latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankTiming {
    pub act_to_read: i64,
    pub act_to_write: i64,
    pub act_to_pre: i64,
    pub read_to_pre: i64,
    pub write_to_pre: i64,
    pub pre_to_act: i64,
    pub read_to_data: i64,
    pub write_to_data: i64,
}

/// Derived timing tables and device geometry for one DRAM technology.
#[derive(Debug, Clone, PartialEq)]
pub struct DramConfig {
    /// Memory clock period in nanoseconds.
    pub clock: f64,
    pub channel_timing: ChannelTiming,
    pub rank_timing: RankTiming,
    pub bank_timing: BankTiming,
    pub device_count: u32,
    pub bank_count: u32,
    pub column_count: u32,
    /// Rank capacity in bytes.
    pub rank_size: u64,
}

impl DramConfig {
    /// Derives the timing tables from canonical parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any derived latency is negative or the
    /// geometry is degenerate.
    pub fn new(p: &TimingParams) -> Result<Self, ConfigError> {
        let channel_timing = ChannelTiming {
            any_to_any: p.t_cmd,
            act_to_any: p.t_cmd,
            read_to_read: p.t_bl + p.t_rtrs,
            read_to_write: p.t_cl + p.t_bl + p.t_rtrs - p.t_cwl,
            write_to_read: p.t_cwl + p.t_bl + p.t_rtrs - p.t_cl,
            write_to_write: p.t_bl + p.t_rtrs,
        };

        let rank_timing = RankTiming {
            act_to_act: p.t_rrd,
            act_to_faw: p.t_faw,
            read_to_read: p.t_bl.max(p.t_ccd),
            read_to_write: p.t_cl + p.t_bl + p.t_rtrs - p.t_cwl,
            write_to_read: p.t_cwl + p.t_bl + p.t_wtr,
            write_to_write: p.t_bl.max(p.t_ccd),
            refresh_latency: p.t_rfc,
            refresh_interval: p.t_refi,
            powerdown_latency: p.t_cke,
            powerup_latency: p.t_xp,
        };

        let bank_timing = BankTiming {
            act_to_read: p.t_rcd - p.t_al,
            act_to_write: p.t_rcd - p.t_al,
            act_to_pre: p.t_ras,
            read_to_pre: p.t_al + p.t_bl + p.t_rtp.max(p.t_ccd) - p.t_ccd,
            write_to_pre: p.t_al + p.t_cwl + p.t_bl + p.t_wr,
            pre_to_act: p.t_rp,
            read_to_data: p.t_al + p.t_cl,
            write_to_data: p.t_al + p.t_cwl,
        };

        if p.banks == 0 || p.columns < 8 || p.rank_size_mb == 0 {
            return Err(ConfigError::Topology(format!(
                "degenerate geometry: {} banks, {} columns, {} MiB ranks",
                p.banks, p.columns, p.rank_size_mb
            )));
        }
        let rank_size = p.rank_size_mb.checked_mul(1 << 20).ok_or_else(|| {
            ConfigError::Topology(format!("rank of {} MiB is too large", p.rank_size_mb))
        })?;

        let config = Self {
            clock: p.t_ck,
            channel_timing,
            rank_timing,
            bank_timing,
            device_count: p.devices,
            bank_count: p.banks,
            column_count: p.columns,
            rank_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every derived latency is non-negative and that the
    /// refresh interval is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.channel_timing;
        let r = &self.rank_timing;
        let b = &self.bank_timing;
        let derived = [
            ("channel.any_to_any", c.any_to_any),
            ("channel.act_to_any", c.act_to_any),
            ("channel.read_to_read", c.read_to_read),
            ("channel.read_to_write", c.read_to_write),
            ("channel.write_to_read", c.write_to_read),
            ("channel.write_to_write", c.write_to_write),
            ("rank.act_to_act", r.act_to_act),
            ("rank.act_to_faw", r.act_to_faw),
            ("rank.read_to_read", r.read_to_read),
            ("rank.read_to_write", r.read_to_write),
            ("rank.write_to_read", r.write_to_read),
            ("rank.write_to_write", r.write_to_write),
            ("rank.refresh_latency", r.refresh_latency),
            ("rank.powerdown_latency", r.powerdown_latency),
            ("rank.powerup_latency", r.powerup_latency),
            ("bank.act_to_read", b.act_to_read),
            ("bank.act_to_write", b.act_to_write),
            ("bank.act_to_pre", b.act_to_pre),
            ("bank.read_to_pre", b.read_to_pre),
            ("bank.write_to_pre", b.write_to_pre),
            ("bank.pre_to_act", b.pre_to_act),
            ("bank.read_to_data", b.read_to_data),
            ("bank.write_to_data", b.write_to_data),
        ];
        for (name, value) in derived {
            if value < 0 {
                return Err(ConfigError::NegativeLatency { name, value });
            }
        }

        if r.refresh_interval <= 0 {
            return Err(ConfigError::Topology(
                "refresh interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Host clock and tracing settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Controller topology and policy.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Timing table for `dram_type = "Custom"`.
    #[serde(default)]
    pub timing: Option<TimingParams>,
}

impl Config {
    /// Loads a configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolves the selected technology into derived timing tables.
    pub fn dram_config(&self) -> Result<DramConfig, ConfigError> {
        let params = match self.controller.dram_type {
            DramType::Custom => self
                .timing
                .clone()
                .ok_or(ConfigError::MissingCustomTiming)?,
            preset => get_dram_config(preset).ok_or(ConfigError::MissingCustomTiming)?,
        };
        DramConfig::new(&params)
    }
}

/// Host clock and tracing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Frequency of the host simulation clock.
    #[serde(default = "default_host_freq")]
    pub host_freq_hz: u64,

    /// Record every accepted DRAM command.
    #[serde(default)]
    pub trace_commands: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host_freq_hz: defaults::HOST_FREQ_HZ,
            trace_commands: false,
        }
    }
}

/// Controller topology and scheduling policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_channels")]
    pub channels: usize,

    #[serde(default = "default_max_row_hits")]
    pub max_row_hits: u32,

    #[serde(default = "default_max_row_idle")]
    pub max_row_idle: i64,

    #[serde(default)]
    pub dram_type: DramType,

    /// Total capacity in bytes across all channels.
    #[serde(default = "default_ram_size")]
    pub ram_size: u64,

    #[serde(default = "default_queue_size")]
    pub request_queue_size: usize,

    #[serde(default = "default_queue_size")]
    pub transaction_queue_size: usize,

    #[serde(default = "default_queue_size")]
    pub command_queue_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            channels: defaults::CHANNELS,
            max_row_hits: defaults::MAX_ROW_HITS,
            max_row_idle: defaults::MAX_ROW_IDLE,
            dram_type: DramType::default(),
            ram_size: defaults::RAM_SIZE,
            request_queue_size: defaults::QUEUE_SIZE,
            transaction_queue_size: defaults::QUEUE_SIZE,
            command_queue_size: defaults::QUEUE_SIZE,
        }
    }
}

fn default_host_freq() -> u64 {
    defaults::HOST_FREQ_HZ
}

fn default_name() -> String {
    defaults::NAME.to_string()
}

fn default_channels() -> usize {
    defaults::CHANNELS
}

fn default_max_row_hits() -> u32 {
    defaults::MAX_ROW_HITS
}

fn default_max_row_idle() -> i64 {
    defaults::MAX_ROW_IDLE
}

fn default_ram_size() -> u64 {
    defaults::RAM_SIZE
}

fn default_queue_size() -> usize {
    defaults::QUEUE_SIZE
}

/// Row-buffer management policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Hits served from one open row before it is forcibly closed.
    pub max_row_hits: u32,
    /// Back-dating applied to idle-close precharges.
    pub max_row_idle: i64,
}

impl From<&ControllerConfig> for Policy {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            max_row_hits: config.max_row_hits,
            max_row_idle: config.max_row_idle,
        }
    }
}

/// Rank/bank/row/column counts of one channel, plus the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub channels: usize,
    pub ranks: usize,
    pub banks: usize,
    pub rows: usize,
    pub columns: usize,
}

impl Topology {
    /// Derives the topology from total capacity.
    ///
    /// Rank count is `ram_size / rank_size / channels`; rows per bank fill
    /// the rank once line, column and bank bits are accounted for.
    pub fn new(dram: &DramConfig, channels: usize, ram_size: u64) -> Result<Self, ConfigError> {
        if !channels.is_power_of_two() {
            return Err(ConfigError::Topology(format!(
                "channel count {} is not a power of two",
                channels
            )));
        }
        let ranks = ram_size / dram.rank_size / channels as u64;
        if ranks == 0 {
            return Err(ConfigError::Topology(format!(
                "{} bytes cannot hold one {}-byte rank per channel",
                ram_size, dram.rank_size
            )));
        }
        if !ranks.is_power_of_two() {
            return Err(ConfigError::Topology(format!(
                "rank count {} is not a power of two",
                ranks
            )));
        }
        if !dram.bank_count.is_power_of_two() || !dram.column_count.is_power_of_two() {
            return Err(ConfigError::Topology(format!(
                "bank count {} and column count {} must be powers of two",
                dram.bank_count, dram.column_count
            )));
        }

        let column_bits = log2_ceil(dram.column_count as u64) - defaults::BURST_COLUMN_BITS;
        let bank_bits = log2_ceil(dram.bank_count as u64);
        let used = defaults::LINE_OFFSET_BITS + column_bits + bank_bits;
        let rank_bits = log2_ceil(dram.rank_size);
        if rank_bits <= used {
            return Err(ConfigError::Topology(format!(
                "rank of {} bytes leaves no row bits",
                dram.rank_size
            )));
        }

        Ok(Self {
            channels,
            ranks: ranks as usize,
            banks: dram.bank_count as usize,
            rows: 1usize << (rank_bits - used),
            columns: 1usize << column_bits,
        })
    }
}

/// Smallest `n` with `1 << n >= value`.
pub fn log2_ceil(value: u64) -> u32 {
    if value <= 1 {
        0
    } else {
        u64::BITS - (value - 1).leading_zeros()
    }
}

/// Exact host-to-memory clock ratio.
///
/// One memory cycle elapses each time `numerator` accumulates past
/// `denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRatio {
    pub numerator: u64,
    pub denominator: u64,
}

impl ClockRatio {
    /// Builds the ratio from the memory clock period and host frequency.
    pub fn new(t_ck_ns: f64, host_freq_hz: u64) -> Result<Self, ConfigError> {
        let denominator = ((8.0 * t_ck_ns) as u64) * host_freq_hz;
        if denominator == 0 {
            return Err(ConfigError::Topology(
                "memory clock ratio has a zero denominator".to_string(),
            ));
        }
        Ok(Self {
            numerator: 8 * 1_000_000_000,
            denominator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddr3_1333_derivation() {
        let params = get_dram_config(DramType::Ddr3_1333).unwrap();
        let dram = DramConfig::new(&params).unwrap();
        assert_eq!(dram.channel_timing.read_to_write, 9 + 4 + 1 - 7);
        assert_eq!(dram.channel_timing.write_to_read, 7 + 4 + 1 - 9);
        assert_eq!(dram.rank_timing.read_to_read, 4);
        assert_eq!(dram.bank_timing.read_to_pre, 4 + 5 - 4);
        assert_eq!(dram.bank_timing.write_to_pre, 7 + 4 + 10);
        assert_eq!(dram.rank_size, 2048 << 20);
    }

    #[test]
    fn negative_latency_is_rejected() {
        let mut params = get_dram_config(DramType::Ddr3_1333).unwrap();
        params.t_al = 20;
        match DramConfig::new(&params) {
            Err(ConfigError::NegativeLatency { name, .. }) => assert_eq!(name, "bank.act_to_read"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn log2_ceil_rounds_up() {
        assert_eq!(log2_ceil(1), 0);
        assert_eq!(log2_ceil(2), 1);
        assert_eq!(log2_ceil(3), 2);
        assert_eq!(log2_ceil(1024), 10);
        assert_eq!(log2_ceil(1 << 63), 63);
        assert_eq!(log2_ceil((1 << 63) + 1), 64);
        assert_eq!(log2_ceil(u64::MAX), 64);
    }

    #[test]
    fn every_latency_is_checked() {
        let base = DramConfig::new(&get_dram_config(DramType::Ddr3_1333).unwrap()).unwrap();
        let fields: [(&str, fn(&mut DramConfig)); 23] = [
            ("channel.any_to_any", |d| d.channel_timing.any_to_any = -1),
            ("channel.act_to_any", |d| d.channel_timing.act_to_any = -1),
            ("channel.read_to_read", |d| d.channel_timing.read_to_read = -1),
            ("channel.read_to_write", |d| d.channel_timing.read_to_write = -1),
            ("channel.write_to_read", |d| d.channel_timing.write_to_read = -1),
            ("channel.write_to_write", |d| d.channel_timing.write_to_write = -1),
            ("rank.act_to_act", |d| d.rank_timing.act_to_act = -1),
            ("rank.act_to_faw", |d| d.rank_timing.act_to_faw = -1),
            ("rank.read_to_read", |d| d.rank_timing.read_to_read = -1),
            ("rank.read_to_write", |d| d.rank_timing.read_to_write = -1),
            ("rank.write_to_read", |d| d.rank_timing.write_to_read = -1),
            ("rank.write_to_write", |d| d.rank_timing.write_to_write = -1),
            ("rank.refresh_latency", |d| d.rank_timing.refresh_latency = -1),
            ("rank.powerdown_latency", |d| d.rank_timing.powerdown_latency = -1),
            ("rank.powerup_latency", |d| d.rank_timing.powerup_latency = -1),
            ("bank.act_to_read", |d| d.bank_timing.act_to_read = -1),
            ("bank.act_to_write", |d| d.bank_timing.act_to_write = -1),
            ("bank.act_to_pre", |d| d.bank_timing.act_to_pre = -1),
            ("bank.read_to_pre", |d| d.bank_timing.read_to_pre = -1),
            ("bank.write_to_pre", |d| d.bank_timing.write_to_pre = -1),
            ("bank.pre_to_act", |d| d.bank_timing.pre_to_act = -1),
            ("bank.read_to_data", |d| d.bank_timing.read_to_data = -1),
            ("bank.write_to_data", |d| d.bank_timing.write_to_data = -1),
        ];

        assert!(base.validate().is_ok());
        for (expected, corrupt) in fields {
            let mut dram = base.clone();
            corrupt(&mut dram);
            match dram.validate() {
                Err(ConfigError::NegativeLatency { name, value }) => {
                    assert_eq!(name, expected);
                    assert_eq!(value, -1);
                }
                other => panic!("{} accepted: {:?}", expected, other),
            }
        }

        let mut dram = base;
        dram.rank_timing.refresh_interval = 0;
        assert!(matches!(dram.validate(), Err(ConfigError::Topology(_))));
    }
}
