//! Integration tests for configuration loading and timing derivation.

use dram_controller::common::ConfigError;
use dram_controller::config::{
    get_dram_config, ClockRatio, Config, DramConfig, DramType, Topology,
};
use rstest::rstest;

const GIB: u64 = 1024 * 1024 * 1024;

/// Tests that an empty configuration falls back to the defaults.
#[test]
fn test_default_config() {
    let config = Config::from_toml("").unwrap();

    assert_eq!(config.general.host_freq_hz, 2_000_000_000);
    assert!(!config.general.trace_commands);
    assert_eq!(config.controller.name, "MEM0");
    assert_eq!(config.controller.channels, 1);
    assert_eq!(config.controller.max_row_hits, 4);
    assert_eq!(config.controller.max_row_idle, 0);
    assert_eq!(config.controller.dram_type, DramType::Ddr3_1333);
    assert_eq!(config.controller.ram_size, 2 * GIB);
    assert_eq!(config.controller.request_queue_size, 64);
    assert!(config.timing.is_none());
}

/// Tests that every key of the TOML file overrides its default.
#[test]
fn test_toml_overrides() {
    let config = Config::from_toml(
        r#"
        [general]
        host_freq_hz = 3000000000
        trace_commands = true

        [controller]
        name = "MEM1"
        channels = 2
        max_row_hits = 8
        max_row_idle = 16
        dram_type = "DDR3_1600"
        ram_size = 8589934592
        request_queue_size = 32
        transaction_queue_size = 16
        command_queue_size = 8
        "#,
    )
    .unwrap();

    assert_eq!(config.general.host_freq_hz, 3_000_000_000);
    assert!(config.general.trace_commands);
    assert_eq!(config.controller.name, "MEM1");
    assert_eq!(config.controller.channels, 2);
    assert_eq!(config.controller.max_row_hits, 8);
    assert_eq!(config.controller.max_row_idle, 16);
    assert_eq!(config.controller.dram_type, DramType::Ddr3_1600);
    assert_eq!(config.controller.ram_size, 8 * GIB);
    assert_eq!(config.controller.request_queue_size, 32);
    assert_eq!(config.controller.transaction_queue_size, 16);
    assert_eq!(config.controller.command_queue_size, 8);
}

/// Tests that an unknown DRAM tag is a parse error.
#[test]
fn test_unknown_dram_type() {
    let result = Config::from_toml("[controller]\ndram_type = \"DDR5_4800\"\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

/// Tests that a missing configuration file reports its path.
#[test]
fn test_missing_file() {
    match Config::from_file("/nonexistent/dram.toml") {
        Err(ConfigError::Io { path, .. }) => assert_eq!(path, "/nonexistent/dram.toml"),
        other => panic!("unexpected result: {:?}", other),
    }
}

/// Tests that selecting the custom type requires a timing table.
#[test]
fn test_custom_requires_timing() {
    let config = Config::from_toml("[controller]\ndram_type = \"Custom\"\n").unwrap();
    assert!(matches!(
        config.dram_config(),
        Err(ConfigError::MissingCustomTiming)
    ));
}

/// Tests that a custom timing table derives like the preset it copies.
#[test]
fn test_custom_timing_table() {
    let config = Config::from_toml(
        r#"
        [controller]
        dram_type = "Custom"

        [timing]
        devices = 8
        banks = 8
        columns = 1024
        rank_size_mb = 2048
        t_ck = 1.5
        t_cmd = 1
        t_cl = 9
        t_cwl = 7
        t_al = 0
        t_bl = 4
        t_ras = 24
        t_rcd = 9
        t_rp = 9
        t_rrd = 4
        t_ccd = 4
        t_faw = 20
        t_rtp = 5
        t_wtr = 5
        t_wr = 10
        t_rtrs = 1
        t_rfc = 107
        t_refi = 5200
        t_cke = 4
        t_xp = 5
        "#,
    )
    .unwrap();

    let preset = DramConfig::new(&get_dram_config(DramType::Ddr3_1333).unwrap()).unwrap();
    assert_eq!(config.dram_config().unwrap(), preset);
}

/// Tests that every preset derives non-negative tables and a usable topology.
#[rstest]
#[case(DramType::Ddr2_800)]
#[case(DramType::Ddr3_1066)]
#[case(DramType::Ddr3_1333)]
#[case(DramType::Ddr3_1600)]
fn test_preset_tables(#[case] dram_type: DramType) {
    let params = get_dram_config(dram_type).unwrap();
    let dram = DramConfig::new(&params).unwrap();

    let bank = dram.bank_timing;
    assert_eq!(bank.act_to_read, params.t_rcd - params.t_al);
    assert_eq!(bank.act_to_pre, params.t_ras);
    assert_eq!(bank.pre_to_act, params.t_rp);
    assert_eq!(bank.read_to_data, params.t_al + params.t_cl);
    assert_eq!(bank.write_to_data, params.t_al + params.t_cwl);
    assert!(bank.read_to_pre >= 0);

    let rank = dram.rank_timing;
    assert_eq!(rank.act_to_act, params.t_rrd);
    assert_eq!(rank.refresh_latency, params.t_rfc);
    assert_eq!(rank.refresh_interval, params.t_refi);
    assert_eq!(rank.write_to_read, params.t_cwl + params.t_bl + params.t_wtr);

    let channel = dram.channel_timing;
    assert_eq!(channel.read_to_read, params.t_bl + params.t_rtrs);
    assert!(channel.read_to_write >= 0);
    assert!(channel.write_to_read >= 0);

    let topology = Topology::new(&dram, 1, dram.rank_size).unwrap();
    assert_eq!(topology.ranks, 1);
    assert_eq!(topology.columns, params.columns as usize / 8);
}

/// Tests that the custom type has no canonical table.
#[test]
fn test_custom_has_no_preset() {
    assert!(get_dram_config(DramType::Custom).is_none());
}

/// Tests rank and row derivation from capacity.
#[test]
fn test_topology_derivation() {
    let dram = DramConfig::new(&get_dram_config(DramType::Ddr3_1333).unwrap()).unwrap();

    let single = Topology::new(&dram, 1, 2 * GIB).unwrap();
    assert_eq!(single.ranks, 1);
    assert_eq!(single.banks, 8);
    assert_eq!(single.columns, 128);
    assert_eq!(single.rows, 1 << 15);

    let dual = Topology::new(&dram, 2, 8 * GIB).unwrap();
    assert_eq!(dual.channels, 2);
    assert_eq!(dual.ranks, 2);
}

/// Tests that a capacity below one rank per channel is rejected.
#[test]
fn test_topology_too_small() {
    let dram = DramConfig::new(&get_dram_config(DramType::Ddr3_1333).unwrap()).unwrap();
    assert!(matches!(
        Topology::new(&dram, 1, GIB),
        Err(ConfigError::Topology(_))
    ));
    assert!(matches!(
        Topology::new(&dram, 3, 6 * GIB),
        Err(ConfigError::Topology(_))
    ));
}

/// Tests the host-to-memory clock ratio.
#[test]
fn test_clock_ratio() {
    let ratio = ClockRatio::new(1.5, 2_000_000_000).unwrap();
    assert_eq!(ratio.numerator, 8_000_000_000);
    assert_eq!(ratio.denominator, 12 * 2_000_000_000);

    assert!(ClockRatio::new(0.1, 2_000_000_000).is_err());
}

/// Tests that a timing table producing a negative latency is rejected.
#[test]
fn test_negative_latency_rejected() {
    let mut params = get_dram_config(DramType::Ddr3_1333).unwrap();
    params.t_cwl = 20;
    assert!(matches!(
        DramConfig::new(&params),
        Err(ConfigError::NegativeLatency { .. })
    ));
}

/// Tests that a negative canonical parameter is reported by the first
/// derived latency it drives below zero.
#[rstest]
#[case::command("t_cmd", -1, "channel.any_to_any")]
#[case::rank_switch("t_rtrs", -10, "channel.read_to_read")]
#[case::cas("t_cl", -10, "channel.read_to_write")]
#[case::write_cas("t_cwl", -10, "channel.write_to_read")]
#[case::activate_spacing("t_rrd", -3, "rank.act_to_act")]
#[case::four_activate_window("t_faw", -1, "rank.act_to_faw")]
#[case::write_to_read("t_wtr", -20, "rank.write_to_read")]
#[case::refresh("t_rfc", -1, "rank.refresh_latency")]
#[case::powerdown("t_cke", -1, "rank.powerdown_latency")]
#[case::powerup("t_xp", -1, "rank.powerup_latency")]
#[case::row_to_column("t_rcd", -1, "bank.act_to_read")]
#[case::row_active("t_ras", -1, "bank.act_to_pre")]
#[case::write_recovery("t_wr", -30, "bank.write_to_pre")]
#[case::precharge("t_rp", -1, "bank.pre_to_act")]
fn test_negative_parameter_names_latency(
    #[case] parameter: &str,
    #[case] value: i64,
    #[case] expected: &str,
) {
    let mut params = get_dram_config(DramType::Ddr3_1333).unwrap();
    let field = match parameter {
        "t_cmd" => &mut params.t_cmd,
        "t_rtrs" => &mut params.t_rtrs,
        "t_cl" => &mut params.t_cl,
        "t_cwl" => &mut params.t_cwl,
        "t_rrd" => &mut params.t_rrd,
        "t_faw" => &mut params.t_faw,
        "t_wtr" => &mut params.t_wtr,
        "t_rfc" => &mut params.t_rfc,
        "t_cke" => &mut params.t_cke,
        "t_xp" => &mut params.t_xp,
        "t_rcd" => &mut params.t_rcd,
        "t_ras" => &mut params.t_ras,
        "t_wr" => &mut params.t_wr,
        "t_rp" => &mut params.t_rp,
        other => panic!("unknown parameter {}", other),
    };
    *field = value;

    match DramConfig::new(&params) {
        Err(ConfigError::NegativeLatency { name, value }) => {
            assert_eq!(name, expected);
            assert!(value < 0);
        }
        other => panic!("{} = {} accepted: {:?}", parameter, value, other),
    }
}

/// Tests that a rank too large to address in bytes is rejected.
#[test]
fn test_oversized_rank_rejected() {
    let mut params = get_dram_config(DramType::Ddr3_1333).unwrap();
    params.rank_size_mb = u64::MAX >> 20;
    assert!(DramConfig::new(&params).is_ok());

    params.rank_size_mb = (u64::MAX >> 20) + 1;
    assert!(matches!(
        DramConfig::new(&params),
        Err(ConfigError::Topology(_))
    ));
}
