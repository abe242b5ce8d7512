//! Stream configuration.

use rtstretch_engine::EngineOptions;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Block size used when a caller passes 0.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Ring reserve beyond one block, in frames.
pub const RESERVE_FRAMES: usize = 8192;

/// Fixed headroom on top of the reserve, in frames.
pub const HEADROOM_FRAMES: usize = 8192;

/// Drain iterations allowed per push or service call.
pub const DEFAULT_MAX_DRAIN_PASSES: usize = 16;

/// Configuration for one stretching stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: usize,
    /// Frames per engine feed. 0 selects [`DEFAULT_BLOCK_SIZE`].
    pub block_size: usize,
    pub options: EngineOptions,
    /// Upper bound on drain iterations per call. Leftover engine output is
    /// picked up on the next call.
    pub max_drain_passes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            block_size: DEFAULT_BLOCK_SIZE,
            options: EngineOptions::default(),
            max_drain_passes: DEFAULT_MAX_DRAIN_PASSES,
        }
    }
}

impl StreamConfig {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter {
                name: "sample_rate",
                value: 0.0,
            });
        }
        if self.channels == 0 {
            return Err(Error::InvalidParameter {
                name: "channels",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Block size with 0 mapped to [`DEFAULT_BLOCK_SIZE`].
    pub fn effective_block_size(&self) -> usize {
        if self.block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            self.block_size
        }
    }

    /// Drain pass bound, never below 1.
    pub fn effective_drain_passes(&self) -> usize {
        self.max_drain_passes.max(1)
    }

    /// Per-channel ring capacity in frames.
    ///
    /// Large enough that slower-than-real-time tempos do not overflow within
    /// a couple of seconds of audio, and never smaller than one block of
    /// every channel.
    pub fn ring_capacity(&self) -> usize {
        let block = self.effective_block_size();
        (block + RESERVE_FRAMES + HEADROOM_FRAMES)
            .max(self.sample_rate as usize * 2)
            .max(self.channels.saturating_mul(block))
    }
}
