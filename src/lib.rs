//! Cycle-Accurate DRAM Memory Controller Library.
//!
//! This crate models the DRAM side of a cycle-accurate system simulator: a
//! multi-channel memory controller that accepts cache-line requests from an
//! interconnect, schedules DRAM commands against per-bank, per-rank and
//! per-channel timing constraints, and returns responses.
//!
//! # Architecture
//!
//! * **Hub**: converts host cycles to memory cycles and runs the interconnect
//!   handshake (coalescing, annulment, backpressure, retry).
//! * **Controller**: one per channel; request, transaction and command queues
//!   driven by a per-cycle scheduling policy.
//! * **Timing model**: bank, rank and channel state machines that answer when a
//!   command may issue and when it completes.
//!
//! # Modules
//!
//! * `common`: Request types and error handling.
//! * `config`: Configuration loading, DRAM presets and derived timing tables.
//! * `dram`: Address mapping and the DRAM timing model.
//! * `sim`: Simulation harness, event queue and trace loader.
//! * `soc`: Memory controller and its collaborator interfaces.
//! * `stats`: Replay statistics.

/// Shared request types and error handling.
///
/// Defines the requests and messages exchanged with the cache hierarchy
/// and the configuration error type.
pub mod common;

/// Configuration system for the controller and DRAM technology.
///
/// Loads TOML configuration files and derives the timing tables, topology
/// and clock ratio the controller runs with.
pub mod config;

/// DRAM address mapping and timing model.
///
/// Implements physical address decoding and the bank, rank and channel
/// state machines that gate command issue.
pub mod dram;

/// Simulation harness, event queue and trace loader.
///
/// Drives the controller hub cycle by cycle and replays request traces.
pub mod sim;

/// Memory controller hub, per-channel controllers and collaborator traits.
pub mod soc;

/// Replay statistics collection and reporting.
pub mod stats;
