//! Adapter for `signalsmith-stretch`.
//!
//! signalsmith processes fixed-size interleaved blocks: every call consumes
//! N input frames and produces exactly M output frames. The adapter picks M
//! from the time ratio (carrying the fractional remainder between calls) and
//! queues the result, so callers see the same buffered `available/retrieve`
//! contract as any other engine.

use std::collections::VecDeque;

use signalsmith_stretch::Stretch;

use crate::engine::StretchEngine;
use crate::error::{Error, Result};
use crate::options::{EngineOptions, Quality};

/// Version reported by [`SignalsmithEngine::version`].
pub const SIGNALSMITH_ENGINE_VERSION: u32 = 100;

/// `signalsmith-stretch` behind the [`StretchEngine`] interface.
pub struct SignalsmithEngine {
    stretch: Stretch,
    sample_rate: u32,
    channels: usize,
    options: EngineOptions,

    time_ratio: f64,
    pitch_scale: f64,
    formant_scale: f64,
    /// Output frames owed from earlier calls (fractional part of ratio × frames)
    output_carry: f64,

    interleaved_in: Vec<f32>,
    interleaved_out: Vec<f32>,
    output: Vec<VecDeque<f32>>,
}

impl SignalsmithEngine {
    pub fn new(sample_rate: u32, channels: usize, options: EngineOptions) -> Result<Self> {
        let channel_count =
            u32::try_from(channels).map_err(|_| Error::UnsupportedChannelCount(channels))?;

        let stretch = match options.quality {
            Quality::HighQuality => Stretch::preset_default(channel_count, sample_rate),
            Quality::Standard => Stretch::preset_cheaper(channel_count, sample_rate),
        };

        tracing::debug!(
            "signalsmith engine: {} Hz, {} channels, {:?}, latency in={} out={}",
            sample_rate,
            channels,
            options.quality,
            stretch.input_latency(),
            stretch.output_latency()
        );

        Ok(Self {
            stretch,
            sample_rate,
            channels,
            options,
            time_ratio: 1.0,
            pitch_scale: 1.0,
            formant_scale: 1.0,
            output_carry: 0.0,
            interleaved_in: Vec::new(),
            interleaved_out: Vec::new(),
            output: vec![VecDeque::new(); channels],
        })
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }
}

impl StretchEngine for SignalsmithEngine {
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
        let semitones = 12.0 * scale.log2();
        self.stretch
            .set_transpose_factor_semitones(semitones as f32, None);
    }

    fn formant_scale(&self) -> f64 {
        self.formant_scale
    }

    fn set_formant_scale(&mut self, scale: f64) {
        self.formant_scale = scale;
    }

    fn set_max_process_size(&mut self, frames: usize) {
        let max_out = (frames as f64 * self.time_ratio).ceil() as usize + 1;
        self.interleaved_in.resize(frames * self.channels, 0.0);
        self.interleaved_out.resize(max_out * self.channels, 0.0);
        for queue in &mut self.output {
            queue.reserve(max_out.saturating_sub(queue.len()));
        }
    }

    fn preferred_start_pad(&self) -> usize {
        self.stretch.input_latency()
    }

    fn start_delay(&self) -> usize {
        self.stretch.output_latency()
    }

    fn process(&mut self, input: &[&[f32]], frames: usize) {
        let wanted = frames as f64 * self.time_ratio + self.output_carry;
        let out_frames = wanted.floor() as usize;
        self.output_carry = wanted - out_frames as f64;

        let channels = self.channels;
        if self.interleaved_in.len() < frames * channels {
            self.interleaved_in.resize(frames * channels, 0.0);
        }
        if self.interleaved_out.len() < out_frames * channels {
            self.interleaved_out.resize(out_frames * channels, 0.0);
        }

        for (ch, source) in input.iter().enumerate().take(channels) {
            for (frame, sample) in source[..frames].iter().enumerate() {
                self.interleaved_in[frame * channels + ch] = *sample;
            }
        }

        let out = &mut self.interleaved_out[..out_frames * channels];
        out.fill(0.0);
        self.stretch
            .process(&self.interleaved_in[..frames * channels], &mut *out);

        for frame in out.chunks_exact(channels) {
            for (queue, sample) in self.output.iter_mut().zip(frame) {
                queue.push_back(*sample);
            }
        }
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
        SIGNALSMITH_ENGINE_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signalsmith_creation() {
        let engine = SignalsmithEngine::new(44100, 2, EngineOptions::default()).unwrap();
        assert_eq!(engine.channels(), 2);
        assert!(engine.preferred_start_pad() > 0);
        assert!(engine.start_delay() > 0);
    }

    #[test]
    fn test_output_follows_ratio() {
        let mut engine = SignalsmithEngine::new(44100, 1, EngineOptions::default()).unwrap();
        engine.set_time_ratio(1.5);
        engine.set_max_process_size(512);

        let block = vec![0.0f32; 512];
        for _ in 0..4 {
            engine.process(&[&block[..]], 512);
        }
        assert_eq!(engine.available(), 3072);
    }
}
