//! Memory-side System-on-Chip components.
//!
//! Hosts the DRAM memory controller and the interfaces through which it
//! talks to the rest of the simulated system.

/// Interconnect collaborator used by the harness and tests.
pub mod interconnect;

/// DRAM memory controller hub and per-channel controllers.
pub mod memory;

/// Collaborator traits (interconnect, event scheduling).
pub mod traits;

pub use interconnect::RecordingInterconnect;
pub use memory::{MemoryController, MemoryControllerHub};
pub use traits::{EventScheduler, Interconnect};
