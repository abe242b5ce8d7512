//! Time/pitch stretch engines.
//!
//! Defines the [`StretchEngine`] interface the streaming layer drives, the
//! option set engines are configured with, and the built-in engines:
//!
//! - **[`GranularStretcher`]**: Hann-windowed overlap-add, always available
//! - **`SignalsmithEngine`**: `signalsmith-stretch` adapter (`signalsmith` feature)
//! - **[`ScriptedEngine`]**: deterministic engine with scriptable latency and
//!   output bursts, for exercising buffering code
//!
//! # Example
//!
//! ```ignore
//! use rtstretch_engine::{create_engine, EngineKind, EngineOptions, StretchEngine};
//!
//! let mut engine = create_engine(EngineKind::Granular, 44100, 2, EngineOptions::default())?;
//! engine.set_time_ratio(1.25);
//! engine.process(&[&left[..], &right[..]], 512);
//! let ready = engine.available();
//! ```

pub mod error;
pub use error::{Error, Result};

mod engine;
pub use engine::{create_engine, EngineKind, StretchEngine};

pub mod options;
pub use options::{Detector, EngineOptions, EnginePreset, Formant, Quality, Transients};

mod granular;
pub use granular::{GranularStretcher, GRANULAR_ENGINE_VERSION};

mod scripted;
pub use scripted::{ScriptedEngine, SCRIPTED_ENGINE_VERSION};

#[cfg(feature = "signalsmith")]
mod signalsmith;
#[cfg(feature = "signalsmith")]
pub use signalsmith::{SignalsmithEngine, SIGNALSMITH_ENGINE_VERSION};
