//! Error types for the streaming core.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Sample rate, channel count, tempo, pitch or formant scale out of range.
    #[error("Invalid parameter '{name}': {value} (must be greater than 0)")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Engine channel count does not match the stream configuration.
    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    /// A sample slice is not exactly `channels × frames` long.
    #[error("Buffer size mismatch: expected {expected} samples, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error(transparent)]
    Engine(#[from] rtstretch_engine::Error),
}

impl Error {
    /// Reject anything that is not a finite, strictly positive value.
    pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Error::InvalidParameter { name, value })
        }
    }
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
