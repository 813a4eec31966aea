//! Common types shared across the memory controller model.
//!
//! This module provides the request and message types exchanged with the
//! cache hierarchy, and the configuration error type.

/// Memory request and interconnect message definitions.
pub mod data;

/// Error types.
pub mod error;

pub use data::{MemoryOp, MemoryRequest, Message, SourceId};
pub use error::ConfigError;

/// A point in simulated time, counted in clock cycles.
///
/// Signed because idle-close precharges may be back-dated before cycle zero.
pub type Clock = i64;
