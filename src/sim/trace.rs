//! Memory Trace Loader.
//!
//! Reads request traces for replay through the controller. Each line is
//! `<cycle> <R|W> <address>`, with the address in hex (`0x` optional).
//! Blank lines and lines starting with `#` are skipped.

use crate::common::MemoryOp;
use std::fs;
use thiserror::Error;

/// One request of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Host cycle at which the request is offered to the controller.
    pub cycle: u64,
    pub op: MemoryOp,
    pub address: u64,
}

/// Errors raised while reading a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot read trace '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Loads and parses a trace file.
pub fn load_trace(path: &str) -> Result<Vec<TraceRecord>, TraceError> {
    let content = fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_trace(&content)
}

/// Parses trace text, sorted by cycle.
pub fn parse_trace(content: &str) -> Result<Vec<TraceRecord>, TraceError> {
    let mut records = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let malformed = |message: String| TraceError::Malformed {
            line: index + 1,
            message,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [cycle, op, address] = fields[..] else {
            return Err(malformed(format!("expected 3 fields, found {}", fields.len())));
        };

        let cycle = cycle
            .parse::<u64>()
            .map_err(|e| malformed(format!("bad cycle '{}': {}", cycle, e)))?;
        let op = match op {
            "R" | "r" => MemoryOp::Read,
            "W" | "w" => MemoryOp::Update,
            other => return Err(malformed(format!("unknown operation '{}'", other))),
        };
        let digits = address.trim_start_matches("0x").trim_start_matches("0X");
        let address = u64::from_str_radix(digits, 16)
            .map_err(|e| malformed(format!("bad address '{}': {}", address, e)))?;

        records.push(TraceRecord { cycle, op, address });
    }

    records.sort_by_key(|record| record.cycle);
    Ok(records)
}
