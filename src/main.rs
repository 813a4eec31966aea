//! DRAM Controller Simulator CLI.
//!
//! The main executable. It parses command-line arguments, builds the memory
//! controller hub from a configuration file, and replays a request trace
//! through it.
//!
//! # Usage
//!
//! * `--trace <file>` replays a `<cycle> <R|W> <address>` trace.
//! * `--dump` prints the controller's configuration snapshot as JSON.

use clap::Parser;
use std::process;

extern crate dram_controller;

use dram_controller::config::Config;
use dram_controller::sim::{self, Simulation};
use dram_controller::soc::RecordingInterconnect;

/// Command-line arguments for the DRAM controller simulator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle-Accurate DRAM Controller Simulator")]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    trace: Option<String>,

    #[arg(long, default_value_t = 10_000_000)]
    max_cycles: u64,

    #[arg(long)]
    dump: bool,
}

/// Main entry point for the DRAM controller simulator.
///
/// # Behavior
///
/// 1. **Configuration**: Loads the TOML file given by `--config`, or the defaults.
/// 2. **Initialization**: Builds the hub and its channels; invalid timing or
///    topology is fatal.
/// 3. **Replay**: Feeds the trace through the controller until it drains or
///    `--max-cycles` elapse, then prints statistics.
fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
    .unwrap_or_else(|e| {
        eprintln!("\n[!] FATAL: {}", e);
        process::exit(1);
    });

    let mut simulation = Simulation::new(&config, RecordingInterconnect::new())
        .unwrap_or_else(|e| {
            eprintln!("\n[!] FATAL: {}", e);
            process::exit(1);
        });

    let topology = simulation.hub.topology();
    println!("Global Configuration");
    println!("--------------------");
    println!("Controller:");
    println!("  Name:               {}", config.controller.name);
    println!("  DRAM Type:          {}", config.controller.dram_type.tag());
    println!(
        "  RAM Size:           {} MB",
        config.controller.ram_size / 1024 / 1024
    );
    println!("  Host Frequency:     {} Hz", config.general.host_freq_hz);
    println!("  Max Row Hits:       {}", config.controller.max_row_hits);
    println!("  Max Row Idle:       {}", config.controller.max_row_idle);
    println!("Topology:");
    println!("  Channels:           {}", topology.channels);
    println!("  Ranks:              {}", topology.ranks);
    println!("  Banks:              {}", topology.banks);
    println!("  Rows:               {}", topology.rows);
    println!("  Columns:            {}", topology.columns);
    println!("--------------------");

    if args.dump {
        match serde_json::to_string_pretty(&simulation.hub.dump_configuration()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("[!] Could not serialize configuration: {}", e),
        }
    }

    let Some(trace_path) = args.trace else {
        if args.dump {
            return;
        }
        eprintln!("Error: No trace specified.");
        eprintln!("Usage:");
        eprintln!("  Replay:  --trace <trace.txt> [--config <config.toml>]");
        eprintln!("  Dump:    --dump [--config <config.toml>]");
        process::exit(1);
    };

    let records = sim::load_trace(&trace_path).unwrap_or_else(|e| {
        eprintln!("\n[!] FATAL: {}", e);
        process::exit(1);
    });
    println!("[*] Replaying {} requests from {}", records.len(), trace_path);

    let stats = simulation.replay(&records, args.max_cycles);
    if !simulation.is_idle() {
        println!(
            "\n[*] Stopped after {} cycles with work outstanding",
            stats.cycles
        );
        println!("{}", simulation.hub);
    }
    stats.print();
}
