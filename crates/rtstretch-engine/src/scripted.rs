//! Deterministic engine with scriptable output timing.
//!
//! Stands in for a real stretcher when testing buffering logic. Output is
//! the input stream resampled by sample-and-hold at the time ratio: every
//! input frame is emitted `floor(acc + ratio)` times. Reported start pad and
//! start delay are plain values the test sets. Output can be released in
//! fixed-size bursts to model an engine that buffers irregularly.

use std::collections::VecDeque;

use crate::engine::StretchEngine;

/// Version reported by [`ScriptedEngine::version`].
pub const SCRIPTED_ENGINE_VERSION: u32 = 0;

/// Scriptable test double implementing [`StretchEngine`].
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    sample_rate: u32,
    channels: usize,
    time_ratio: f64,
    pitch_scale: f64,
    formant_scale: f64,
    start_pad: usize,
    start_delay: usize,
    /// Release output only in multiples of this many frames
    burst: usize,
    /// Fractional emission accumulator for the time ratio
    phase: f64,
    output: Vec<VecDeque<f32>>,

    max_process_size: usize,
    /// Frame count of every `process` call, in order
    process_log: Vec<usize>,
    total_processed: usize,
    total_retrieved: usize,
}

impl ScriptedEngine {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            time_ratio: 1.0,
            pitch_scale: 1.0,
            formant_scale: 1.0,
            start_pad: 0,
            start_delay: 0,
            burst: 1,
            phase: 0.0,
            output: vec![VecDeque::new(); channels],
            max_process_size: 0,
            process_log: Vec::new(),
            total_processed: 0,
            total_retrieved: 0,
        }
    }

    /// Report `pad` and `delay` as the engine's start latency.
    pub fn with_latency(mut self, pad: usize, delay: usize) -> Self {
        self.set_reported_latency(pad, delay);
        self
    }

    /// Release output only once `frames` frames have accumulated.
    pub fn with_burst(mut self, frames: usize) -> Self {
        self.burst = frames.max(1);
        self
    }

    /// Change what `preferred_start_pad` and `start_delay` report.
    pub fn set_reported_latency(&mut self, pad: usize, delay: usize) {
        self.start_pad = pad;
        self.start_delay = delay;
    }

    /// Frames buffered internally, including any held back by the burst size.
    pub fn buffered(&self) -> usize {
        self.output[0].len()
    }

    pub fn max_process_size(&self) -> usize {
        self.max_process_size
    }

    pub fn process_log(&self) -> &[usize] {
        &self.process_log
    }

    pub fn total_processed(&self) -> usize {
        self.total_processed
    }

    pub fn total_retrieved(&self) -> usize {
        self.total_retrieved
    }
}

impl StretchEngine for ScriptedEngine {
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

    fn set_formant_scale(&mut self, scale: f64) {
        self.formant_scale = scale;
    }

    fn set_max_process_size(&mut self, frames: usize) {
        self.max_process_size = frames;
    }

    fn preferred_start_pad(&self) -> usize {
        self.start_pad
    }

    fn start_delay(&self) -> usize {
        self.start_delay
    }

    fn process(&mut self, input: &[&[f32]], frames: usize) {
        self.process_log.push(frames);
        self.total_processed += frames;

        for frame in 0..frames {
            self.phase += self.time_ratio;
            let repeats = self.phase.floor();
            self.phase -= repeats;
            for (queue, source) in self.output.iter_mut().zip(input) {
                for _ in 0..repeats as usize {
                    queue.push_back(source[frame]);
                }
            }
        }
    }

    fn available(&self) -> usize {
        let buffered = self.buffered();
        buffered - buffered % self.burst
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
        self.total_retrieved += count;
        count
    }

    fn version(&self) -> u32 {
        SCRIPTED_ENGINE_VERSION
    }
}
