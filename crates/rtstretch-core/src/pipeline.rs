//! Local ring-buffer pipeline.
//!
//! Synchronous, single-threaded streaming: `push` feeds the engine and
//! drains everything it has ready into one ring buffer per channel; `pull`
//! reads fixed-size blocks back out, zero-filling on underrun. Channels are
//! written and read in lock-step, so channel 0 speaks for all of them.

use rtstretch_engine::StretchEngine;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use crate::adapter::{DrainSink, StretchEngineAdapter};
use crate::config::StreamConfig;
use crate::layout::{ChannelMajor, ChannelMajorMut};
use crate::Result;

/// One SPSC ring per channel, all the same capacity.
pub struct LocalRings {
    producers: Vec<HeapProd<f32>>,
    consumers: Vec<HeapCons<f32>>,
    capacity: usize,
}

impl LocalRings {
    pub fn new(channels: usize, capacity: usize) -> Self {
        let (producers, consumers) = (0..channels)
            .map(|_| HeapRb::<f32>::new(capacity).split())
            .unzip();
        Self {
            producers,
            consumers,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames readable on channel 0.
    pub fn occupied(&self) -> usize {
        self.consumers.first().map_or(0, |c| c.occupied_len())
    }

    /// Read up to `output.frames()` frames per channel, zero-filling the rest.
    /// Returns the frames read from channel 0.
    fn read_into(&mut self, output: &mut ChannelMajorMut<'_>) -> usize {
        let mut read = 0;
        for (ch, consumer) in self.consumers.iter_mut().enumerate() {
            let destination = output.channel_mut(ch);
            let n = consumer.pop_slice(destination);
            destination[n..].fill(0.0);
            if ch == 0 {
                read = n;
            }
        }
        read
    }
}

impl DrainSink for LocalRings {
    fn write_space(&self) -> usize {
        self.producers
            .iter()
            .map(|p| p.vacant_len())
            .min()
            .unwrap_or(0)
    }

    fn write(&mut self, channels: &[Vec<f32>], frames: usize) {
        for (producer, source) in self.producers.iter_mut().zip(channels) {
            producer.push_slice(&source[..frames]);
        }
    }
}

/// Engine adapter plus per-channel output rings.
pub struct LocalRingBufferPipeline<E: StretchEngine = Box<dyn StretchEngine>> {
    adapter: StretchEngineAdapter<E>,
    rings: LocalRings,
}

impl<E: StretchEngine> LocalRingBufferPipeline<E> {
    /// Build a pipeline around `engine` with rings sized by
    /// [`StreamConfig::ring_capacity`].
    pub fn new(engine: E, config: &StreamConfig) -> Result<Self> {
        let adapter = StretchEngineAdapter::from_config(engine, config)?;
        let rings = LocalRings::new(config.channels, config.ring_capacity());
        Ok(Self { adapter, rings })
    }

    /// Build a pipeline around an existing adapter.
    pub fn with_adapter(adapter: StretchEngineAdapter<E>, ring_capacity: usize) -> Self {
        let rings = LocalRings::new(adapter.channels(), ring_capacity);
        Self { adapter, rings }
    }

    pub fn channels(&self) -> usize {
        self.adapter.channels()
    }

    pub fn capacity(&self) -> usize {
        self.rings.capacity()
    }

    pub fn adapter(&self) -> &StretchEngineAdapter<E> {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut StretchEngineAdapter<E> {
        &mut self.adapter
    }

    /// Feed `frames` frames of channel-major input and drain the engine
    /// into the rings until it reports nothing available. Output that does
    /// not fit is dropped.
    ///
    /// `input` must hold exactly `channels × frames` samples.
    pub fn push(&mut self, input: &[f32], frames: usize) -> Result<()> {
        let input = ChannelMajor::new(input, self.adapter.channels(), frames)?;
        self.adapter.apply_pending(&mut self.rings)?;
        self.adapter.feed(&input.slices(), frames)?;
        self.adapter.drain_all(&mut self.rings);
        Ok(())
    }

    /// Read `frames` frames per channel into channel-major `output`.
    ///
    /// Never blocks. Frames the rings cannot supply are zero.
    pub fn pull(&mut self, output: &mut [f32], frames: usize) -> Result<()> {
        let mut output = ChannelMajorMut::new(output, self.adapter.channels(), frames)?;
        let read = self.rings.read_into(&mut output);

        let missing = frames - read;
        if missing > 0 {
            self.adapter.stats().record_underrun(missing);
            tracing::trace!("Pipeline underrun: {} of {} frames", missing, frames);
        }
        Ok(())
    }

    /// Frames ready to pull (channel 0).
    pub fn samples_available(&self) -> usize {
        self.rings.occupied()
    }

    pub fn set_tempo(&mut self, ratio: f64) -> Result<()> {
        self.adapter.set_tempo(ratio, &mut self.rings)
    }

    pub fn set_pitch(&mut self, scale: f64) -> Result<()> {
        self.adapter.set_pitch(scale, &mut self.rings)
    }

    pub fn set_formant_scale(&mut self, scale: f64) -> Result<()> {
        self.adapter.set_formant_scale(scale, &mut self.rings)
    }

    /// Split into the adapter and the rings (mutators drain into the rings).
    pub fn parts_mut(&mut self) -> (&mut StretchEngineAdapter<E>, &mut LocalRings) {
        (&mut self.adapter, &mut self.rings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use proptest::prelude::*;
    use rtstretch_engine::ScriptedEngine;

    fn config(channels: usize) -> StreamConfig {
        StreamConfig {
            block_size: 64,
            ..StreamConfig::new(8000, channels)
        }
    }

    /// Channel-major block where channel `c`, frame `f` = c * 1000 + f
    fn block(channels: usize, frames: usize) -> Vec<f32> {
        (0..channels)
            .flat_map(|c| (0..frames).map(move |f| (c * 1000 + f) as f32))
            .collect()
    }

    #[test]
    fn test_push_pull_identity() {
        let mut pipeline = LocalRingBufferPipeline::new(ScriptedEngine::new(8000, 2), &config(2))
            .unwrap();
        let input = block(2, 100);
        pipeline.push(&input, 100).unwrap();
        assert_eq!(pipeline.samples_available(), 100);

        let mut output = vec![0.0; 200];
        pipeline.pull(&mut output, 100).unwrap();
        assert_eq!(output, input);
        assert_eq!(pipeline.samples_available(), 0);
    }

    #[test]
    fn test_pull_underrun_zero_fills() {
        let mut pipeline = LocalRingBufferPipeline::new(ScriptedEngine::new(8000, 2), &config(2))
            .unwrap();
        pipeline.push(&vec![1.0; 20], 10).unwrap();

        let mut output = vec![-1.0; 32];
        pipeline.pull(&mut output, 16).unwrap();
        assert_eq!(&output[..10], &[1.0; 10]);
        assert_eq!(&output[10..16], &[0.0; 6]);
        assert_eq!(&output[16..26], &[1.0; 10]);
        assert_eq!(&output[26..], &[0.0; 6]);
        assert_eq!(pipeline.adapter().stats().snapshot().underrun_frames, 6);
    }

    #[test]
    fn test_pull_empty_is_silence() {
        let mut pipeline = LocalRingBufferPipeline::new(ScriptedEngine::new(8000, 1), &config(1))
            .unwrap();
        let mut output = vec![0.5; 64];
        pipeline.pull(&mut output, 64).unwrap();
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_push_leaves_engine_empty() {
        let engine = ScriptedEngine::new(8000, 1).with_latency(100, 40);
        let mut pipeline = LocalRingBufferPipeline::new(engine, &config(1)).unwrap();
        pipeline.set_tempo(2.0).unwrap();

        for _ in 0..10 {
            pipeline.push(&block(1, 64), 64).unwrap();
            assert_eq!(pipeline.adapter().engine().available(), 0);
        }
        assert_eq!(pipeline.samples_available(), 1280);
    }

    #[test]
    fn test_start_latency_stripped() {
        let engine = ScriptedEngine::new(8000, 1).with_latency(16, 16);
        let mut pipeline = LocalRingBufferPipeline::new(engine, &config(1)).unwrap();

        let input = block(1, 48);
        pipeline.push(&input, 48).unwrap();
        // 16 pad + 48 input in, 16 delay discarded: the pad comes out first
        assert_eq!(pipeline.samples_available(), 48);

        let mut output = vec![0.0; 48];
        pipeline.pull(&mut output, 48).unwrap();
        assert_eq!(&output[..], &input[..]);
    }

    #[test]
    fn test_overflow_drops_and_keeps_engine_drained() {
        let mut pipeline =
            LocalRingBufferPipeline::with_adapter(
                StretchEngineAdapter::new(ScriptedEngine::new(8000, 1), 64, 1024, 16).unwrap(),
                100,
            );

        pipeline.push(&block(1, 64), 64).unwrap();
        pipeline.push(&block(1, 64), 64).unwrap();

        assert_eq!(pipeline.samples_available(), 100);
        assert_eq!(pipeline.adapter().engine().available(), 0);
        assert_eq!(pipeline.adapter().stats().frames_dropped(), 28);
    }

    #[test]
    fn test_push_rejects_wrong_length() {
        let mut pipeline = LocalRingBufferPipeline::new(ScriptedEngine::new(8000, 2), &config(2))
            .unwrap();
        assert!(matches!(
            pipeline.push(&[0.0; 10], 10),
            Err(Error::BufferSize {
                expected: 20,
                actual: 10
            })
        ));
        let mut output = [0.0; 3];
        assert!(pipeline.pull(&mut output, 2).is_err());
    }

    #[test]
    fn test_burst_output_is_collected_later() {
        let engine = ScriptedEngine::new(8000, 1).with_burst(100);
        let mut pipeline = LocalRingBufferPipeline::new(engine, &config(1)).unwrap();

        pipeline.push(&block(1, 64), 64).unwrap();
        assert_eq!(pipeline.samples_available(), 0);

        pipeline.push(&block(1, 64), 64).unwrap();
        assert_eq!(pipeline.samples_available(), 100);
    }

    #[test]
    fn test_ring_capacity_from_config() {
        let pipeline = LocalRingBufferPipeline::new(ScriptedEngine::new(8000, 2), &config(2))
            .unwrap();
        assert_eq!(pipeline.capacity(), 64 + 8192 + 8192);
    }

    /// One push worth more than `max_drain_passes` scratch loads: the ring
    /// fills, the rest is dropped, and the engine still ends up empty.
    #[test]
    fn test_large_push_leaves_engine_empty() {
        let config = StreamConfig::new(8000, 1);
        let mut pipeline =
            LocalRingBufferPipeline::new(ScriptedEngine::new(8000, 1), &config).unwrap();
        let capacity = pipeline.capacity();
        assert_eq!(capacity, 512 + 8192 + 8192);
        assert!(300_000 > config.max_drain_passes * pipeline.adapter().scratch_capacity());

        pipeline.push(&vec![0.0; 300_000], 300_000).unwrap();

        assert_eq!(pipeline.adapter().engine().available(), 0);
        assert_eq!(pipeline.samples_available(), capacity);
        assert_eq!(
            pipeline.adapter().stats().frames_dropped(),
            (300_000 - capacity) as u64
        );
        assert_eq!(pipeline.adapter().stats().snapshot().drain_bound_hits, 0);
    }

    /// Discarding the start delay takes a pass of its own; push keeps going
    /// past the configured bound.
    #[test]
    fn test_single_drain_pass_still_empties_engine() {
        let config = StreamConfig {
            max_drain_passes: 1,
            ..config(1)
        };
        let engine = ScriptedEngine::new(8000, 1).with_latency(0, 10);
        let mut pipeline = LocalRingBufferPipeline::new(engine, &config).unwrap();

        let input = block(1, 64);
        pipeline.push(&input, 64).unwrap();
        assert_eq!(pipeline.adapter().engine().available(), 0);
        assert_eq!(pipeline.samples_available(), 54);

        let mut output = vec![0.0; 54];
        pipeline.pull(&mut output, 54).unwrap();
        assert_eq!(&output[..], &input[10..]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The rings and the retrieve scratch always hold a full block on
        /// every channel.
        #[test]
        fn prop_ring_holds_block_on_every_channel(
            sample_rate in 1u32..192_000,
            block_size in 0usize..=16384,
            channels in 1usize..=8,
        ) {
            let config = StreamConfig {
                block_size,
                ..StreamConfig::new(sample_rate, channels)
            };
            let pipeline =
                LocalRingBufferPipeline::new(ScriptedEngine::new(sample_rate, channels), &config)
                    .unwrap();
            prop_assert!(channels * config.effective_block_size() <= pipeline.capacity());
            prop_assert_eq!(pipeline.adapter().scratch_capacity(), pipeline.capacity());
        }
    }
}
