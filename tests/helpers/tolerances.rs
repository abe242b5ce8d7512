//! Tolerance constants for stream testing.
//!
//! Different paths require different precision levels: bypass and
//! sample-and-hold engines are exact, overlap-add is not.

/// Floating point rounding errors (for passthrough, exact copies).
/// Use for operations that should be mathematically exact.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Engine processing tolerance (window overlap-add, interpolation).
pub const DSP_EPSILON: f32 = 1e-4;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;
