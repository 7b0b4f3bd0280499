//! # Frame Pool Errors
//!
//! All fallible operations return [`FramePoolError`]. The variants fall into two
//! classes:
//!
//! * **Caller conditions** such as [`FramePoolError::OutOfContiguousMemory`] or
//!   [`FramePoolError::InvalidRelease`]. These are recoverable; a memory manager
//!   may fall back to single-frame allocation, evict, or report a bug upstream.
//! * **Defects** ([`FramePoolError::Configuration`] and
//!   [`FramePoolError::InvalidEncoding`]) mean the allocator's own invariants are
//!   broken. See [`FramePoolError::is_defect`].

use crate::state::FrameState;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramePoolError {
    #[error("invalid pool configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("zero frames requested")]
    EmptyRequest,
    #[error("no run of {requested} contiguous free frames ({free} frames free)")]
    OutOfContiguousMemory { requested: u64, free: u64 },
    #[error("cannot reserve {count} frames at {base:#x}: {reason}")]
    InvalidReservation {
        base: u64,
        count: u64,
        reason: ReservationFault,
    },
    #[error("frame {frame:#x} is not owned by any live pool")]
    UnknownFrame { frame: u64 },
    #[error("pool handle does not belong to this registry")]
    UnknownPool,
    #[error("frame {frame:#x} does not start an allocated run (state: {state:?})")]
    InvalidRelease { frame: u64, state: FrameState },
    #[error("frame {frame:#x} carries an invalid state encoding")]
    InvalidEncoding { frame: u64 },
}

impl FramePoolError {
    /// Whether the error indicates broken allocator invariants rather than
    /// a condition the caller can handle.
    #[inline]
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidEncoding { .. })
    }
}

/// Reasons a pool cannot be constructed or registered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("pool spans no frames")]
    EmptyPool,
    #[error("bitmap needs {needed} bytes but the info frames provide {available}")]
    BitmapTooSmall { needed: u64, available: u64 },
    #[error("pool registry is full ({capacity} pools)")]
    RegistryFull { capacity: usize },
}

/// Why a [`reserve`](crate::FramePool::reserve) request was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationFault {
    #[error("empty range")]
    Empty,
    #[error("range leaves the pool")]
    OutOfBounds,
    #[error("frame {frame:#x} is {state:?}")]
    NotFree { frame: u64, state: FrameState },
}
