//! Error types for map, cursor and handle operations.
//!
//! Absent keys are not errors: lookups report them with `Option` or a flag.
//! Everything here is caller misuse or resource exhaustion.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The handle was never issued by this registry, or names the wrong kind
    /// of resource.
    #[error("invalid handle {0:#018x}")]
    InvalidHandle(u64),

    /// The handle was issued but its resource has been destroyed.
    #[error("stale handle {0:#018x}: resource was already destroyed")]
    StaleHandle(u64),

    /// A cursor was advanced against a map it was not created from.
    #[error("cursor {cursor:#018x} belongs to map {owner:#018x}, not {given:#018x}")]
    CursorMapMismatch { cursor: u64, owner: u64, given: u64 },

    /// Key exceeds the map's configured maximum length.
    #[error("key of {len} bytes exceeds limit of {max} bytes")]
    KeyTooLong { len: usize, max: usize },

    /// Allocation for a key buffer failed.
    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// A required pointer argument was null.
    #[error("null pointer passed for {0}")]
    NullPointer(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
