//! Configuration error types.
//!
//! Queue exhaustion and timing refusals are not errors: they are plain
//! `bool`/`Option` returns retried on a later cycle. Only construction-time
//! defects are reported here.

use thiserror::Error;

/// Errors raised while loading or deriving the controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::config::Config`].
    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    /// `dram_type = "Custom"` was selected without a `[timing]` table.
    #[error("custom DRAM type selected but no [timing] table was given")]
    MissingCustomTiming,

    /// A derived cross-command latency came out negative.
    #[error("derived latency '{name}' is negative ({value})")]
    NegativeLatency {
        /// Name of the derived latency.
        name: &'static str,
        /// The offending value.
        value: i64,
    },

    /// The topology cannot be built from the given sizes.
    #[error("invalid topology: {0}")]
    Topology(String),
}
