//! Granular overlap-add stretcher.
//!
//! Time-stretches by extracting Hann-windowed grains from the input at an
//! analysis hop of `hop / time_ratio` and overlap-adding them at a fixed
//! synthesis hop. Pitch is shifted inside each grain by reading the input at
//! `pitch_scale` frames per output frame (linear interpolation), so grain
//! placement alone decides duration.
//!
//! ## Latency
//!
//! The first grain starts at input frame 0, so a real frame only reaches
//! full window weight once half a grain span of input precedes it. The
//! engine asks for that much silence up front (`preferred_start_pad`), and
//! the matching half window of output that precedes the first real frame is
//! reported as `start_delay`.
//!
//! ## RT-Safety
//!
//! Buffers are sized by `set_max_process_size`. `process` and `retrieve` do
//! not allocate as long as callers respect that bound and keep draining.

use std::collections::VecDeque;
use std::f32::consts::PI;

use crate::engine::StretchEngine;
use crate::options::{EngineOptions, EnginePreset};

/// Version reported by [`GranularStretcher::version`].
pub const GRANULAR_ENGINE_VERSION: u32 = 1;

/// Ratios and scales outside this range are clamped for processing.
/// The requested value is still reported back unchanged.
const MIN_SCALE: f64 = 0.125;
const MAX_SCALE: f64 = 8.0;

/// Granular time/pitch stretcher.
pub struct GranularStretcher {
    sample_rate: u32,
    channels: usize,
    options: EngineOptions,
    preset: EnginePreset,

    time_ratio: f64,
    pitch_scale: f64,
    formant_scale: f64,
    max_process_size: usize,

    window: Vec<f32>,
    /// Overlap-add normalisation for the periodic Hann window
    gain: f32,

    /// Unconsumed input, one buffer per channel (all the same length)
    input: Vec<Vec<f32>>,
    /// Fractional start of the next grain within `input`. May run past the
    /// end of `input` at fast tempos; the overshoot skips future input.
    read_pos: f64,

    /// Overlap-add accumulator, one window per channel
    accum: Vec<Vec<f32>>,
    output: Vec<VecDeque<f32>>,
}

impl GranularStretcher {
    pub fn new(sample_rate: u32, channels: usize, options: EngineOptions) -> Self {
        let preset = options.preset(sample_rate);
        let window = Self::create_hann_window(preset.window);
        let gain = 2.0 * preset.hop as f32 / preset.window as f32;

        let mut stretcher = Self {
            sample_rate,
            channels,
            options,
            preset,
            time_ratio: 1.0,
            pitch_scale: 1.0,
            formant_scale: 1.0,
            max_process_size: 0,
            window,
            gain,
            input: vec![Vec::new(); channels],
            read_pos: 0.0,
            accum: vec![vec![0.0; preset.window]; channels],
            output: vec![VecDeque::new(); channels],
        };
        stretcher.set_max_process_size(preset.hop);

        tracing::debug!(
            "Granular stretcher: {} Hz, {} channels, window {}, hop {}",
            sample_rate,
            channels,
            preset.window,
            preset.hop
        );
        stretcher
    }

    /// Periodic Hann window (sums to a constant at hop = window / 2^k)
    fn create_hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
            .collect()
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn preset(&self) -> EnginePreset {
        self.preset
    }

    fn effective_pitch(&self) -> f64 {
        self.pitch_scale.clamp(MIN_SCALE, MAX_SCALE)
    }

    fn effective_ratio(&self) -> f64 {
        self.time_ratio.clamp(MIN_SCALE, MAX_SCALE)
    }

    /// Input frames one grain reads, past its start
    fn grain_span(&self) -> f64 {
        (self.preset.window - 1) as f64 * self.effective_pitch()
    }

    /// Run every grain that the buffered input can fully cover.
    fn run_grains(&mut self) {
        let window = self.preset.window;
        let hop = self.preset.hop;
        let pitch = self.effective_pitch();
        let analysis_hop = hop as f64 / self.effective_ratio();
        let span = self.grain_span();

        loop {
            let base = self.read_pos;
            // +2: interpolation reads one frame past the last grain position
            let needed = (base + span).floor() as usize + 2;
            if self.input[0].len() < needed {
                break;
            }

            for ch in 0..self.channels {
                let source = &self.input[ch];
                let accum = &mut self.accum[ch];

                for (i, slot) in accum.iter_mut().enumerate() {
                    let position = base + i as f64 * pitch;
                    let index = position as usize;
                    let frac = (position - index as f64) as f32;
                    let sample = source[index] + (source[index + 1] - source[index]) * frac;
                    *slot += sample * self.window[i] * self.gain;
                }

                self.output[ch].extend(accum[..hop].iter().copied());
                accum.copy_within(hop.., 0);
                accum[window - hop..].fill(0.0);
            }

            self.read_pos += analysis_hop;
            let consumed = (self.read_pos.floor() as usize).min(self.input[0].len());
            if consumed > 0 {
                for buffer in &mut self.input {
                    buffer.drain(..consumed);
                }
                self.read_pos -= consumed as f64;
            }
        }
    }
}

impl StretchEngine for GranularStretcher {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn time_ratio(&self) -> f64 {
        self.time_ratio
    }

    fn set_time_ratio(&mut self, ratio: f64) {
        self.time_ratio = ratio;
    }

    fn pitch_scale(&self) -> f64 {
        self.pitch_scale
    }

    fn set_pitch_scale(&mut self, scale: f64) {
        self.pitch_scale = scale;
    }

    fn formant_scale(&self) -> f64 {
        self.formant_scale
    }

    /// Stored and reported only; grains carry no separate spectral envelope.
    fn set_formant_scale(&mut self, scale: f64) {
        self.formant_scale = scale;
    }

    fn set_max_process_size(&mut self, frames: usize) {
        self.max_process_size = frames;

        let max_span = (self.preset.window as f64 * MAX_SCALE).ceil() as usize;
        let max_hop = (self.preset.hop as f64 / MIN_SCALE).ceil() as usize;
        let input_capacity = frames + max_span + max_hop + 2;
        for buffer in &mut self.input {
            buffer.reserve(input_capacity.saturating_sub(buffer.len()));
        }

        // One block can release at most (block / min analysis hop) grains.
        let grains = frames / ((self.preset.hop as f64 * MIN_SCALE) as usize).max(1) + 2;
        let output_capacity = grains * self.preset.hop + self.preset.window;
        for queue in &mut self.output {
            queue.reserve(output_capacity.saturating_sub(queue.len()));
        }
    }

    fn preferred_start_pad(&self) -> usize {
        (self.preset.window as f64 * self.effective_pitch() / 2.0).round() as usize
    }

    fn start_delay(&self) -> usize {
        self.preset.window / 2
    }

    fn process(&mut self, input: &[&[f32]], frames: usize) {
        debug_assert_eq!(input.len(), self.channels);
        for (buffer, source) in self.input.iter_mut().zip(input) {
            buffer.extend_from_slice(&source[..frames]);
        }
        self.run_grains();
    }

    fn available(&self) -> usize {
        self.output[0].len()
    }

    fn retrieve(&mut self, output: &mut [&mut [f32]], frames: usize) -> usize {
        let count = output
            .iter()
            .map(|channel| channel.len())
            .fold(frames.min(self.available()), usize::min);

        for (queue, destination) in self.output.iter_mut().zip(output.iter_mut()) {
            for (dst, src) in destination[..count].iter_mut().zip(queue.drain(..count)) {
                *dst = src;
            }
        }
        count
    }

    fn version(&self) -> u32 {
        GRANULAR_ENGINE_VERSION
    }
}
