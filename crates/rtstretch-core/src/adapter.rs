//! Stretch engine adapter.
//!
//! Owns one engine instance and wraps it with the buffering discipline the
//! streaming modes rely on:
//!
//! - **Feed**: pending start pad goes in first, then input in chunks of at
//!   most one block (the engine's max process size).
//! - **Drain**: retrieve whatever the engine has ready into a [`DrainSink`].
//!   Start delay is discarded first. If the sink is full, output is
//!   retrieved and dropped rather than left inside the engine.
//! - **Mutators**: tempo, pitch and formant changes drain pending output
//!   into the active sink before the engine sees the new value.
//!
//! All methods must be called from the single processing context that owns
//! the adapter. Other threads go through [`ParameterHandle`].

use std::sync::Arc;

use rtstretch_engine::StretchEngine;
use smallvec::SmallVec;

use crate::config::{StreamConfig, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_DRAIN_PASSES};
use crate::latency::LatencyCompensator;
use crate::params::ParameterHandle;
use crate::stats::StreamStats;
use crate::{Error, Result};

/// Tempo and pitch within this distance of 1.0 count as identity.
pub const IDENTITY_TOLERANCE: f64 = 0.001;

/// Destination for drained engine output.
pub trait DrainSink {
    /// Frames that can be written right now.
    fn write_space(&self) -> usize;

    /// Append the first `frames` frames of every channel in `channels`.
    ///
    /// Called with `frames <= write_space()`.
    fn write(&mut self, channels: &[Vec<f32>], frames: usize);
}

/// Engine wrapper with latency compensation and drain-or-drop backpressure.
pub struct StretchEngineAdapter<E: StretchEngine = Box<dyn StretchEngine>> {
    engine: E,
    channels: usize,
    block_size: usize,
    max_drain_passes: usize,
    latency: LatencyCompensator,

    /// Per-channel drain staging, `scratch_capacity` frames each
    scratch: Vec<Vec<f32>>,
    scratch_capacity: usize,
    /// Per-channel staging for one input block (interleaved sources)
    input_scratch: Vec<Vec<f32>>,
    /// One block of silence for the start pad
    silence: Vec<f32>,

    params: ParameterHandle,
    stats: Arc<StreamStats>,
    /// Set while the sink is full; cleared by the next successful write
    overflowing: bool,
}

impl<E: StretchEngine> StretchEngineAdapter<E> {
    /// Wrap `engine`. A `block_size` of 0 selects the default block size.
    ///
    /// `scratch_capacity` bounds the frames retrieved per drain pass and is
    /// raised to at least one block.
    pub fn new(
        mut engine: E,
        block_size: usize,
        scratch_capacity: usize,
        max_drain_passes: usize,
    ) -> Result<Self> {
        let channels = engine.channels();
        if channels == 0 {
            return Err(Error::InvalidParameter {
                name: "channels",
                value: 0.0,
            });
        }
        if engine.sample_rate() == 0 {
            return Err(Error::InvalidParameter {
                name: "sample_rate",
                value: 0.0,
            });
        }

        let block_size = if block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            block_size
        };
        let scratch_capacity = scratch_capacity.max(block_size);
        let max_drain_passes = if max_drain_passes == 0 {
            DEFAULT_MAX_DRAIN_PASSES
        } else {
            max_drain_passes
        };

        engine.set_max_process_size(block_size);
        let latency = LatencyCompensator::from_engine(&engine);
        let params = ParameterHandle::new(
            engine.time_ratio(),
            engine.pitch_scale(),
            engine.formant_scale(),
        );

        tracing::info!(
            "Stretch engine v{} ready: {} Hz, {} channels, block {}, start pad {}, start delay {}",
            engine.version(),
            engine.sample_rate(),
            channels,
            block_size,
            latency.pending_pad(),
            latency.pending_delay()
        );

        Ok(Self {
            engine,
            channels,
            block_size,
            max_drain_passes,
            latency,
            scratch: vec![vec![0.0; scratch_capacity]; channels],
            scratch_capacity,
            input_scratch: vec![vec![0.0; block_size]; channels],
            silence: vec![0.0; block_size],
            params,
            stats: Arc::new(StreamStats::new()),
            overflowing: false,
        })
    }

    /// Wrap `engine` using the block size, ring capacity and drain bound of
    /// `config`. The engine's channel count must match.
    pub fn from_config(engine: E, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        if engine.channels() != config.channels {
            return Err(Error::ChannelMismatch {
                expected: config.channels,
                actual: engine.channels(),
            });
        }
        Self::new(
            engine,
            config.effective_block_size(),
            config.ring_capacity(),
            config.effective_drain_passes(),
        )
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn scratch_capacity(&self) -> usize {
        self.scratch_capacity
    }

    pub fn max_drain_passes(&self) -> usize {
        self.max_drain_passes
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Direct engine access. Changing live parameters here bypasses the
    /// drain and latency bookkeeping; use the adapter's mutators instead.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn latency(&self) -> LatencyCompensator {
        self.latency
    }

    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.stats
    }

    pub fn parameter_handle(&self) -> ParameterHandle {
        self.params.clone()
    }

    pub fn version(&self) -> u32 {
        self.engine.version()
    }

    /// True when tempo and pitch are both within [`IDENTITY_TOLERANCE`] of 1.0.
    pub fn is_identity(&self) -> bool {
        (self.engine.time_ratio() - 1.0).abs() < IDENTITY_TOLERANCE
            && (self.engine.pitch_scale() - 1.0).abs() < IDENTITY_TOLERANCE
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Change the tempo ratio.
    ///
    /// Pending output is drained into `sink` first. Both latency counters
    /// are cleared so the change is gapless.
    pub fn set_tempo<S: DrainSink + ?Sized>(&mut self, ratio: f64, sink: &mut S) -> Result<()> {
        let ratio = Error::check_positive("tempo", ratio)?;
        if ratio == self.engine.time_ratio() {
            return Ok(());
        }

        self.drain_all(sink);
        self.engine.set_time_ratio(ratio);
        self.engine.set_max_process_size(self.block_size);
        self.latency.clear();

        tracing::debug!("Tempo set to {}", ratio);
        Ok(())
    }

    /// Change the pitch scale.
    ///
    /// Pending output is drained into `sink` first. Latency counters are
    /// re-armed from the engine afterwards.
    pub fn set_pitch<S: DrainSink + ?Sized>(&mut self, scale: f64, sink: &mut S) -> Result<()> {
        let scale = Error::check_positive("pitch", scale)?;
        if scale == self.engine.pitch_scale() {
            return Ok(());
        }

        self.drain_all(sink);
        self.engine.set_pitch_scale(scale);
        self.engine.set_max_process_size(self.block_size);
        self.latency.rearm(&self.engine);

        tracing::debug!(
            "Pitch set to {} (start pad {}, start delay {})",
            scale,
            self.latency.pending_pad(),
            self.latency.pending_delay()
        );
        Ok(())
    }

    /// Change the formant scale. Same discipline as [`Self::set_pitch`].
    pub fn set_formant_scale<S: DrainSink + ?Sized>(
        &mut self,
        scale: f64,
        sink: &mut S,
    ) -> Result<()> {
        let scale = Error::check_positive("formant_scale", scale)?;
        if scale == self.engine.formant_scale() {
            return Ok(());
        }

        self.drain_all(sink);
        self.engine.set_formant_scale(scale);
        self.engine.set_max_process_size(self.block_size);
        self.latency.rearm(&self.engine);

        tracing::debug!(
            "Formant scale set to {} (start pad {}, start delay {})",
            scale,
            self.latency.pending_pad(),
            self.latency.pending_delay()
        );
        Ok(())
    }

    /// Apply targets written through the [`ParameterHandle`] since the last
    /// call. Returns true if anything changed.
    pub fn apply_pending<S: DrainSink + ?Sized>(&mut self, sink: &mut S) -> Result<bool> {
        let pending = self.params.take_pending();
        if pending.is_empty() {
            return Ok(false);
        }
        if let Some(tempo) = pending.tempo {
            self.set_tempo(tempo, sink)?;
        }
        if let Some(pitch) = pending.pitch {
            self.set_pitch(pitch, sink)?;
        }
        if let Some(formant) = pending.formant {
            self.set_formant_scale(formant, sink)?;
        }
        Ok(true)
    }

    // =========================================================================
    // Feed
    // =========================================================================

    /// Feed `frames` frames of planar input (one slice per channel).
    ///
    /// Any pending start pad is fed as silence first. Input is split into
    /// chunks of at most one block.
    pub fn feed(&mut self, input: &[&[f32]], frames: usize) -> Result<()> {
        if input.len() != self.channels {
            return Err(Error::ChannelMismatch {
                expected: self.channels,
                actual: input.len(),
            });
        }
        if let Some(short) = input.iter().find(|channel| channel.len() < frames) {
            return Err(Error::BufferSize {
                expected: frames,
                actual: short.len(),
            });
        }

        self.feed_start_pad();

        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.block_size);
            let views: SmallVec<[&[f32]; 8]> = input
                .iter()
                .map(|channel| &channel[offset..offset + n])
                .collect();
            self.engine.process(&views, n);
            offset += n;
        }
        self.stats.record_fed(frames);
        Ok(())
    }

    /// Per-channel staging buffers, one block long each. Fill the first
    /// `frames` of every channel, then call [`Self::feed_input_scratch`].
    pub fn input_scratch_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.input_scratch
    }

    /// Feed the first `frames` frames (at most one block) of the staging
    /// buffers.
    pub fn feed_input_scratch(&mut self, frames: usize) {
        let frames = frames.min(self.block_size);
        self.feed_start_pad();

        let views: SmallVec<[&[f32]; 8]> = self
            .input_scratch
            .iter()
            .map(|channel| &channel[..frames])
            .collect();
        self.engine.process(&views, frames);
        self.stats.record_fed(frames);
    }

    fn feed_start_pad(&mut self) {
        let mut remaining = self.latency.take_pad();
        if remaining == 0 {
            return;
        }
        self.stats.record_fed(remaining);

        while remaining > 0 {
            let n = remaining.min(self.block_size);
            let views: SmallVec<[&[f32]; 8]> =
                (0..self.channels).map(|_| &self.silence[..n]).collect();
            self.engine.process(&views, n);
            remaining -= n;
        }
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Drain ready engine output into `sink`, for at most
    /// `max_drain_passes` retrieve calls. Returns the frames written to
    /// `sink`. Used by the shared-memory bridge, which picks up leftovers
    /// on its next service call.
    pub fn drain_available<S: DrainSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        self.drain(sink, self.max_drain_passes)
    }

    /// Drain until the engine reports nothing available. Returns the frames
    /// written to `sink`.
    pub fn drain_all<S: DrainSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        self.drain(sink, usize::MAX)
    }

    fn drain<S: DrainSink + ?Sized>(&mut self, sink: &mut S, max_passes: usize) -> usize {
        let mut surfaced = 0;
        let mut passes = 0;

        loop {
            let available = self.engine.available();
            if available == 0 {
                break;
            }
            if passes == max_passes {
                self.stats.record_drain_bound_hit();
                break;
            }
            passes += 1;

            // Start delay: retrieve and discard
            let pending_delay = self.latency.pending_delay();
            if pending_delay > 0 {
                let got = self.retrieve(available.min(pending_delay));
                self.latency.consume_delay(got);
                self.stats.record_delay_discarded(got);
                if got == 0 {
                    break;
                }
                continue;
            }

            // Sink full: retrieve and drop rather than leave it in the engine
            let space = sink.write_space();
            if space == 0 {
                let got = self.retrieve(available);
                self.stats.record_dropped(got);
                if !self.overflowing {
                    self.overflowing = true;
                    tracing::warn!("Output buffer full, dropping stretched audio");
                }
                if got == 0 {
                    break;
                }
                continue;
            }

            let got = self.retrieve(available.min(space));
            if got == 0 {
                break;
            }
            sink.write(&self.scratch, got);
            self.stats.record_surfaced(got);
            self.overflowing = false;
            surfaced += got;
        }

        surfaced
    }

    /// Retrieve up to `frames` (bounded by scratch capacity) into scratch.
    fn retrieve(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.scratch_capacity);
        let mut views: SmallVec<[&mut [f32]; 8]> = self
            .scratch
            .iter_mut()
            .map(|channel| &mut channel[..frames])
            .collect();
        self.engine.retrieve(&mut views, frames)
    }
}
