//! Test helpers and fixtures for rtstretch integration tests
//!
//! Signal generators, buffer layout conversion and assertions shared by the
//! local pipeline and shared-memory tests.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, bypass copies)
//! - `DSP_EPSILON` (1e-4): Engine processing (overlap-add, interpolation)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use rtstretch::prelude::*;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Standard block size for deterministic testing
pub const TEST_BLOCK_SIZE: usize = 512;

/// Route `tracing` output through the test harness. Safe to call from every
/// test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Stream config at the test sample rate with `channels` channels.
pub fn test_config(channels: usize) -> StreamConfig {
    StreamConfig {
        block_size: TEST_BLOCK_SIZE,
        ..StreamConfig::new(TEST_SAMPLE_RATE, channels)
    }
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Generate a DC offset signal (constant value).
pub fn generate_dc(value: f32, num_samples: usize) -> Vec<f32> {
    vec![value; num_samples]
}

/// Generate an integer staircase signal [0, 1, 2, ..., n-1] as f32.
///
/// Each sample equals its index, so reordering or dropped frames show up
/// as exact mismatches.
pub fn generate_integer_staircase(num_samples: usize) -> Vec<f32> {
    (0..num_samples).map(|i| i as f32).collect()
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

// =============================================================================
// Buffer Layout
// =============================================================================

/// Concatenate per-channel signals into one channel-major buffer.
pub fn channel_major(channels: &[Vec<f32>]) -> Vec<f32> {
    channels.iter().flatten().copied().collect()
}

/// Interleave per-channel signals frame by frame.
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * channels.len());
    for frame in 0..frames {
        for channel in channels {
            out.push(channel[frame]);
        }
    }
    out
}

/// Split an interleaved buffer into per-channel signals.
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    (0..channels)
        .map(|ch| samples.iter().skip(ch).step_by(channels).copied().collect())
        .collect()
}

// =============================================================================
// Measurements and Assertions
// =============================================================================

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Assert every sample is within `epsilon` of `value`, reporting the first
/// offender.
pub fn assert_constant(samples: &[f32], value: f32, epsilon: f32, context: &str) {
    if let Some((i, sample)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| (**s - value).abs() > epsilon)
    {
        panic!(
            "{}: sample {} = {} (expected {} ± {})",
            context, i, sample, value, epsilon
        );
    }
}
