//! Local pipeline integration tests
//!
//! Push/pull streaming through `RealtimeStretcher` in local mode, with the
//! built-in granular engine and the deterministic scripted engine.
//!
//! Run with:
//! ```bash
//! cargo test -p rtstretch --test local_pipeline_tests
//! ```

#[path = "helpers/mod.rs"]
mod helpers;

use helpers::tolerances::*;
use helpers::{
    assert_constant, assert_has_audio, assert_silence, channel_major, generate_dc,
    generate_integer_staircase, generate_silence, generate_sine, init_tracing, test_config,
    TEST_BLOCK_SIZE, TEST_SAMPLE_RATE,
};
use approx::assert_relative_eq;
use proptest::prelude::*;
use rtstretch::prelude::*;
use rtstretch::{LatencyCompensator, ScriptedEngine};
use std::collections::VecDeque;

fn scripted(channels: usize, block: usize) -> RealtimeStretcher<ScriptedEngine> {
    let config = StreamConfig {
        block_size: block,
        ..StreamConfig::new(8000, channels)
    };
    RealtimeStretcher::with_engine(ScriptedEngine::new(8000, channels), config).unwrap()
}

/// Push `blocks` blocks of a constant value on every channel.
fn push_dc(stretcher: &mut RealtimeStretcher, value: f32, blocks: usize) {
    let channels = stretcher.channels();
    let block = generate_dc(value, TEST_BLOCK_SIZE * channels);
    for _ in 0..blocks {
        stretcher.push(&block, TEST_BLOCK_SIZE).unwrap();
    }
}

// =============================================================================
// Granular engine
// =============================================================================

/// 44.1 kHz stereo, 512-frame blocks, one silent block in: the engine has not
/// produced a grain yet, so the pull underruns and returns silence.
#[test]
fn test_first_silent_block_pulls_silence() {
    init_tracing();
    let mut stretcher = RealtimeStretcher::new(test_config(2)).unwrap();
    assert_eq!(stretcher.ring_capacity(), 88200);

    let input = generate_silence(2 * TEST_BLOCK_SIZE);
    stretcher.push(&input, TEST_BLOCK_SIZE).unwrap();

    let mut output = vec![1.0_f32; 2 * TEST_BLOCK_SIZE];
    stretcher.pull(&mut output, TEST_BLOCK_SIZE).unwrap();
    assert_silence(&output, 0.0);

    let stats = stretcher.stats();
    assert_eq!(stats.frames_fed, 1024 + 512);
    assert_eq!(stats.underrun_frames, 512);
}

/// At unity, compensated output lines up with the input from the very first
/// pulled frame: no leading silence from the engine's window.
#[test]
fn test_unity_output_aligned_after_compensation() {
    init_tracing();
    let mut stretcher = RealtimeStretcher::new(test_config(2)).unwrap();
    let latency = stretcher.latency();
    assert_eq!(latency, LatencyCompensator::new(1024, 1024));

    push_dc(&mut stretcher, 0.5, 16);
    assert!(stretcher.latency().is_settled());
    assert!(stretcher.samples_available() >= 4096);

    let frames = 4096;
    let mut output = vec![0.0_f32; 2 * frames];
    stretcher.pull(&mut output, frames).unwrap();

    assert_constant(&output[..frames], 0.5, DSP_EPSILON, "left");
    assert_constant(&output[frames..], 0.5, DSP_EPSILON, "right");
    assert_eq!(stretcher.stats().delay_discarded, 1024);
}

#[test]
fn test_sine_survives_unity_pipeline() {
    let mut stretcher = RealtimeStretcher::new(test_config(1)).unwrap();
    let sine = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BLOCK_SIZE * 32);
    for block in sine.chunks(TEST_BLOCK_SIZE) {
        stretcher.push(block, TEST_BLOCK_SIZE).unwrap();
    }

    let frames = 8192;
    let mut output = vec![0.0_f32; frames];
    stretcher.pull(&mut output, frames).unwrap();
    assert_has_audio(&output, 0.5);

    // Latency is fully compensated: output tracks the input sample for sample
    let max_error = output
        .iter()
        .zip(&sine)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f32, f32::max);
    assert!(max_error < DSP_EPSILON, "max error {}", max_error);
}

#[test]
fn test_slower_tempo_produces_more_output() {
    let mut unity = RealtimeStretcher::new(test_config(2)).unwrap();
    let mut slow = RealtimeStretcher::new(test_config(2)).unwrap();
    slow.set_tempo(2.0).unwrap();
    assert!(slow.latency().is_settled());

    push_dc(&mut unity, 0.5, 16);
    push_dc(&mut slow, 0.5, 16);

    let unity_len = unity.samples_available();
    let slow_len = slow.samples_available();
    assert!(
        slow_len > unity_len * 3 / 2,
        "2x stretch should produce about twice the output ({} vs {})",
        slow_len,
        unity_len
    );
}

#[test]
fn test_pitch_change_rearms_latency() {
    let mut stretcher = RealtimeStretcher::new(test_config(2)).unwrap();
    push_dc(&mut stretcher, 0.25, 8);
    assert!(stretcher.latency().is_settled());

    stretcher.set_pitch(2.0).unwrap();
    assert_eq!(stretcher.latency(), LatencyCompensator::new(2048, 1024));

    stretcher.set_tempo(1.5).unwrap();
    assert!(stretcher.latency().is_settled());
}

#[test]
fn test_underrun_zero_fills_whole_request() {
    let mut stretcher = RealtimeStretcher::new(test_config(2)).unwrap();
    let mut output = vec![0.7_f32; 2 * 256];
    stretcher.pull(&mut output, 256).unwrap();
    assert_silence(&output, SILENCE_THRESHOLD);
    assert_eq!(stretcher.stats().underrun_frames, 256);
}

#[test]
fn test_wrong_buffer_length_rejected() {
    let mut stretcher = RealtimeStretcher::new(test_config(2)).unwrap();
    assert!(stretcher.push(&[0.0; 100], 64).is_err());

    let mut output = vec![0.0_f32; 100];
    assert!(stretcher.pull(&mut output, 64).is_err());
}

// =============================================================================
// Scripted engine
// =============================================================================

#[test]
fn test_scripted_stretch_repeats_frames() {
    let mut stretcher = scripted(2, 64);
    stretcher.set_tempo(2.0).unwrap();

    let left = generate_integer_staircase(64);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    stretcher
        .push(&channel_major(&[left.clone(), right.clone()]), 64)
        .unwrap();
    assert_eq!(stretcher.samples_available(), 128);

    let mut output = vec![0.0_f32; 2 * 128];
    stretcher.pull(&mut output, 128).unwrap();
    for i in 0..64 {
        assert_eq!(output[2 * i], left[i]);
        assert_eq!(output[2 * i + 1], left[i]);
        assert_eq!(output[128 + 2 * i], right[i]);
    }
}

#[test]
fn test_scripted_latency_rearmed_by_pitch_not_tempo() {
    let config = StreamConfig {
        block_size: 64,
        ..StreamConfig::new(8000, 1)
    };
    let engine = ScriptedEngine::new(8000, 1).with_latency(100, 40);
    let mut stretcher = RealtimeStretcher::with_engine(engine, config).unwrap();

    stretcher.push(&generate_dc(1.0, 64), 64).unwrap();
    // Pad 100 + 64 real frames in, first 40 frames of output discarded
    assert_eq!(stretcher.samples_available(), 124);
    assert!(stretcher.latency().is_settled());

    stretcher.set_tempo(1.5).unwrap();
    assert!(stretcher.latency().is_settled());

    stretcher.set_formant_scale(0.8).unwrap();
    assert_eq!(stretcher.latency(), LatencyCompensator::new(100, 40));
    assert_relative_eq!(stretcher.formant_scale(), 0.8);
}

#[test]
fn test_parameter_handle_from_control_thread() {
    let mut stretcher = scripted(1, 64);
    let handle = stretcher.parameter_handle();

    std::thread::spawn(move || {
        handle.set_tempo(2.0).unwrap();
        handle.set_pitch(0.5).unwrap();
    })
    .join()
    .unwrap();

    // Targets land at the start of the next push
    assert_eq!(stretcher.tempo(), 1.0);
    stretcher.push(&generate_dc(0.1, 64), 64).unwrap();
    assert_eq!(stretcher.tempo(), 2.0);
    assert_eq!(stretcher.pitch(), 0.5);
    assert_eq!(stretcher.samples_available(), 128);
}

proptest! {
    /// Unity scripted stream behaves as a FIFO: whatever is pulled is the
    /// next unread input, and underruns are zero-filled.
    #[test]
    fn prop_unity_stream_is_fifo(
        ops in proptest::collection::vec((any::<bool>(), 0usize..200), 0..50),
    ) {
        let mut stretcher = scripted(1, 64);
        let mut model: VecDeque<f32> = VecDeque::new();
        let mut next = 0.0_f32;

        for (is_push, frames) in ops {
            if is_push {
                let input: Vec<f32> = (0..frames).map(|i| next + i as f32).collect();
                next += frames as f32;
                stretcher.push(&input, frames).unwrap();
                model.extend(input);
            } else {
                let mut output = vec![-1.0_f32; frames];
                stretcher.pull(&mut output, frames).unwrap();
                for sample in output {
                    prop_assert_eq!(sample, model.pop_front().unwrap_or(0.0));
                }
            }
            prop_assert_eq!(stretcher.samples_available(), model.len());
        }
    }
}
