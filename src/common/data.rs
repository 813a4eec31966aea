//! Memory Request Types.
//!
//! This module defines the requests the cache hierarchy hands to the memory
//! controller and the messages exchanged with the upstream interconnect.
//! Requests are shared with the issuing collaborator, so the controller only
//! ever holds them through `Rc` handles.

use std::fmt;
use std::rc::Rc;

/// Type of memory operation carried by a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryOp {
    /// Demand read of a cache line.
    Read,

    /// Write-back of a dirty cache line.
    ///
    /// Updates are fire-and-forget: the controller never answers them.
    Update,

    /// Eviction notice for a clean line.
    ///
    /// Carries no work for DRAM and is dropped on arrival.
    Evict,
}

/// Opaque handle of the controller that sent a request.
///
/// Responses are routed back to this handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(pub usize);

/// A memory request owned by the cache hierarchy.
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryRequest {
    /// Unique identity of the request, used by annulment.
    pub id: u64,
    /// Core that originated the request.
    pub core_id: u8,
    /// Physical address of the accessed line.
    pub physical_address: u64,
    /// Operation type.
    pub op: MemoryOp,
}

impl MemoryRequest {
    /// Creates a new shared request.
    pub fn new(id: u64, core_id: u8, physical_address: u64, op: MemoryOp) -> Rc<Self> {
        Rc::new(Self {
            id,
            core_id,
            physical_address,
            op,
        })
    }

    /// Returns `true` if both handles name the same request.
    pub fn is_same(&self, other: &MemoryRequest) -> bool {
        self.id == other.id
    }

    /// Returns `true` for write-back requests.
    pub fn is_update(&self) -> bool {
        self.op == MemoryOp::Update
    }
}

impl fmt::Display for MemoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "req#{} core{} {:?} @ {:#x}",
            self.id, self.core_id, self.op, self.physical_address
        )
    }
}

/// A message travelling over the interconnect.
#[derive(Clone, Debug)]
pub struct Message {
    /// The request this message is about.
    pub request: Rc<MemoryRequest>,
    /// Whether the message carries line data.
    pub has_data: bool,
    /// Sender of a request, or destination of a response.
    pub origin: SourceId,
}
