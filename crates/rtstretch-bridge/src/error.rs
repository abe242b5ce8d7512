//! Error types for the shared-memory bridge.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Ring descriptor violates the ring invariants (capacity, channels,
    /// cursor range, alignment).
    #[error("Invalid ring: {0}")]
    InvalidRing(String),

    /// Shared memory can be registered once per stream.
    #[error("Shared memory already registered")]
    AlreadyRegistered,

    #[error(transparent)]
    Core(#[from] rtstretch_core::Error),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
