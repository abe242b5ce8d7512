//! Error types.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A construction or live parameter is out of range.
    #[error("Invalid parameter '{name}': {value} (must be greater than 0)")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The engine cannot run with this many channels.
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(usize),

    /// Requested engine is not compiled in.
    #[error("Engine not available: {0}")]
    EngineUnavailable(&'static str),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
