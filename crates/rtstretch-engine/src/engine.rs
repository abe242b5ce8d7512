//! The stretch engine interface.
//!
//! An engine is a stateful block transform. It accepts planar blocks of
//! samples, buffers a variable, input-dependent amount of output, and hands
//! that output back through `available` / `retrieve`. Output cadence is not
//! tied to input cadence, and the first output frame is not aligned with the
//! first input frame: the engine reports how much silence it would like to
//! see first (`preferred_start_pad`) and how many output frames precede the
//! first valid one (`start_delay`).
//!
//! Engines are not thread-safe across concurrent callers. All calls for one
//! instance must come from a single processing context.

use crate::error::{Error, Result};
use crate::granular::GranularStretcher;
use crate::options::EngineOptions;

/// Opaque time/pitch stretching engine.
pub trait StretchEngine: Send {
    /// Fixed channel count
    fn channels(&self) -> usize;

    /// Fixed sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Output duration / input duration (>1 produces more output than input)
    fn time_ratio(&self) -> f64;
    fn set_time_ratio(&mut self, ratio: f64);

    /// Frequency multiplier (1.0 = unchanged)
    fn pitch_scale(&self) -> f64;
    fn set_pitch_scale(&mut self, scale: f64);

    /// Spectral envelope multiplier (1.0 = unchanged)
    fn formant_scale(&self) -> f64;
    fn set_formant_scale(&mut self, scale: f64);

    /// Hint: no `process` call will pass more than `frames` frames.
    ///
    /// May allocate. Callers re-apply it after every parameter change.
    fn set_max_process_size(&mut self, frames: usize);

    /// Frames of silence the engine wants before the first real input.
    fn preferred_start_pad(&self) -> usize;

    /// Output frames produced before the first valid output frame.
    fn start_delay(&self) -> usize;

    /// Feed one block. `input` holds one slice per channel, each at least
    /// `frames` long.
    fn process(&mut self, input: &[&[f32]], frames: usize);

    /// Frames ready for retrieval.
    fn available(&self) -> usize;

    /// Move up to `frames` ready frames into `output` (one slice per channel).
    ///
    /// Returns the number of frames actually written.
    fn retrieve(&mut self, output: &mut [&mut [f32]], frames: usize) -> usize;

    /// Engine implementation version.
    fn version(&self) -> u32;
}

impl<E: StretchEngine + ?Sized> StretchEngine for Box<E> {
    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn time_ratio(&self) -> f64 {
        (**self).time_ratio()
    }

    fn set_time_ratio(&mut self, ratio: f64) {
        (**self).set_time_ratio(ratio)
    }

    fn pitch_scale(&self) -> f64 {
        (**self).pitch_scale()
    }

    fn set_pitch_scale(&mut self, scale: f64) {
        (**self).set_pitch_scale(scale)
    }

    fn formant_scale(&self) -> f64 {
        (**self).formant_scale()
    }

    fn set_formant_scale(&mut self, scale: f64) {
        (**self).set_formant_scale(scale)
    }

    fn set_max_process_size(&mut self, frames: usize) {
        (**self).set_max_process_size(frames)
    }

    fn preferred_start_pad(&self) -> usize {
        (**self).preferred_start_pad()
    }

    fn start_delay(&self) -> usize {
        (**self).start_delay()
    }

    fn process(&mut self, input: &[&[f32]], frames: usize) {
        (**self).process(input, frames)
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn retrieve(&mut self, output: &mut [&mut [f32]], frames: usize) -> usize {
        (**self).retrieve(output, frames)
    }

    fn version(&self) -> u32 {
        (**self).version()
    }
}

/// Built-in engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Overlap-add granular stretcher, always available
    #[default]
    Granular,
    /// signalsmith-stretch (requires the `signalsmith` feature)
    Signalsmith,
}

/// Construct a built-in engine.
pub fn create_engine(
    kind: EngineKind,
    sample_rate: u32,
    channels: usize,
    options: EngineOptions,
) -> Result<Box<dyn StretchEngine>> {
    if sample_rate == 0 {
        return Err(Error::InvalidParameter {
            name: "sample_rate",
            value: 0.0,
        });
    }
    if channels == 0 {
        return Err(Error::InvalidParameter {
            name: "channels",
            value: 0.0,
        });
    }

    match kind {
        EngineKind::Granular => Ok(Box::new(GranularStretcher::new(
            sample_rate,
            channels,
            options,
        ))),
        #[cfg(feature = "signalsmith")]
        EngineKind::Signalsmith => Ok(Box::new(crate::signalsmith::SignalsmithEngine::new(
            sample_rate,
            channels,
            options,
        )?)),
        #[cfg(not(feature = "signalsmith"))]
        EngineKind::Signalsmith => Err(Error::EngineUnavailable("signalsmith")),
    }
}
