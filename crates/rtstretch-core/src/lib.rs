//! Real-time streaming core around a stretch engine.
//!
//! Turns an engine's irregular, buffered output into a fixed-latency,
//! overflow-safe block stream.
//!
//! # Components
//!
//! - **[`LatencyCompensator`]**: feeds the engine's start pad and discards
//!   its start delay
//! - **[`StretchEngineAdapter`]**: owns the engine; drain-before-change
//!   mutators, block-wise feed, bounded drain-or-drop into a [`DrainSink`]
//! - **[`LocalRingBufferPipeline`]**: per-channel rings between the adapter
//!   and a caller pulling fixed-size blocks
//! - **[`ParameterHandle`]**: lock-free tempo/pitch/formant targets for
//!   control threads
//! - **[`StreamStats`]**: overflow, underrun and drain counters
//!
//! # Example
//!
//! ```ignore
//! use rtstretch_core::{LocalRingBufferPipeline, StreamConfig};
//! use rtstretch_engine::{create_engine, EngineKind};
//!
//! let config = StreamConfig::new(44100, 2);
//! let engine = create_engine(EngineKind::Granular, 44100, 2, config.options)?;
//! let mut pipeline = LocalRingBufferPipeline::new(engine, &config)?;
//!
//! pipeline.set_tempo(1.1)?;
//! pipeline.push(&input, 512)?;       // channel-major, 2 × 512 samples
//! pipeline.pull(&mut output, 512)?;  // zero-filled on underrun
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{
    StreamConfig, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_DRAIN_PASSES, HEADROOM_FRAMES, RESERVE_FRAMES,
};

pub mod layout;
pub use layout::{ChannelMajor, ChannelMajorMut};

mod latency;
pub use latency::LatencyCompensator;

mod stats;
pub use stats::{StatsSnapshot, StreamStats};

mod params;
pub use params::{ParameterHandle, PendingChanges};

mod adapter;
pub use adapter::{DrainSink, StretchEngineAdapter, IDENTITY_TOLERANCE};

mod pipeline;
pub use pipeline::{LocalRingBufferPipeline, LocalRings};
