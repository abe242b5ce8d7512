//! # rtstretch - Real-time Time/Pitch Stretching Streams
//!
//! Hides a stretch engine's irregular, buffered output behind a steady,
//! block-synchronous interface usable from a real-time audio thread.
//!
//! ## Architecture
//!
//! rtstretch is an umbrella crate that coordinates:
//! - **rtstretch-engine** - Engine interface, option presets, built-in engines
//! - **rtstretch-core** - Latency compensation, engine adapter, local ring pipeline
//! - **rtstretch-bridge** - Lock-free shared-memory rings and the stream bridge
//!
//! ## Quick Start
//!
//! ```ignore
//! use rtstretch::prelude::*;
//!
//! let mut stretcher = RealtimeStretcher::builder()
//!     .sample_rate(44100)
//!     .channels(2)
//!     .build()?;
//!
//! // Local mode: push channel-major blocks, pull fixed-size blocks
//! stretcher.set_tempo(1.25)?;
//! stretcher.push(&input, 512)?;
//! stretcher.pull(&mut output, 512)?;
//!
//! // Bridge mode: register shared rings once, then service on a cadence
//! let (producer, inbound) = SharedRing::new(2, 4096)?.split();
//! let (outbound, consumer) = SharedRing::new(2, 4096)?.split();
//! stretcher.register_shared_memory(inbound, outbound)?;
//! stretcher.service();
//! ```
//!
//! ## Feature Flags
//!
//! - `signalsmith` - `signalsmith-stretch` engine (`EngineKind::Signalsmith`)

/// Re-export of rtstretch-engine for direct access
pub use rtstretch_engine as engine;

/// Re-export of rtstretch-core for direct access
pub use rtstretch_core as core;

/// Re-export of rtstretch-bridge for direct access
pub use rtstretch_bridge as bridge;

// Engine types
pub use rtstretch_engine::{
    create_engine, Detector, EngineKind, EngineOptions, EnginePreset, Formant, GranularStretcher,
    Quality, ScriptedEngine, StretchEngine, Transients,
};

// Streaming core
pub use rtstretch_core::{
    DrainSink, LatencyCompensator, LocalRingBufferPipeline, ParameterHandle, StatsSnapshot,
    StreamConfig, StreamStats, StretchEngineAdapter,
};

// Shared memory
pub use rtstretch_bridge::{
    RingConsumer, RingCursors, RingProducer, ServiceReport, SharedMemoryStreamBridge, SharedRing,
};

// Error handling
mod error;
pub use error::{Error, Result};

// Stream facade
mod stretcher;
pub use stretcher::RealtimeStretcher;

mod builder;
pub use builder::RealtimeStretcherBuilder;

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        Detector, EngineKind, EngineOptions, Error, ParameterHandle, Quality, RealtimeStretcher,
        RealtimeStretcherBuilder, Result, ServiceReport, SharedRing, StreamConfig, StretchEngine,
        Transients,
    };
}
