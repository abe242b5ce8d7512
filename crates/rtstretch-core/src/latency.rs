//! Start-up latency compensation.
//!
//! A stretch engine wants some silence before the first real input (start
//! pad) and produces some output before the first valid output frame (start
//! delay). The compensator holds both as pending counts:
//!
//! - The pad is fed as silence once, ahead of the next real input.
//! - The delay is discarded from drained output before anything surfaces.
//!
//! Pitch and formant changes move the engine's analysis window, so they
//! re-arm both counts from the engine. Tempo changes must stay gapless and
//! clear both instead.

use rtstretch_engine::StretchEngine;

/// Pending start pad and start delay, in frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyCompensator {
    pending_pad: usize,
    pending_delay: usize,
}

impl LatencyCompensator {
    pub fn new(pad: usize, delay: usize) -> Self {
        Self {
            pending_pad: pad,
            pending_delay: delay,
        }
    }

    /// Armed with the engine's currently reported pad and delay.
    pub fn from_engine<E: StretchEngine + ?Sized>(engine: &E) -> Self {
        Self::new(engine.preferred_start_pad(), engine.start_delay())
    }

    /// Re-arm both counters from the engine (pitch or formant change).
    pub fn rearm<E: StretchEngine + ?Sized>(&mut self, engine: &E) {
        *self = Self::from_engine(engine);
    }

    /// Zero both counters (tempo change).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn pending_pad(&self) -> usize {
        self.pending_pad
    }

    pub fn pending_delay(&self) -> usize {
        self.pending_delay
    }

    /// Take the whole pending pad. The pad is fed exactly once.
    pub fn take_pad(&mut self) -> usize {
        std::mem::take(&mut self.pending_pad)
    }

    /// Discard up to `frames` of pending delay. Returns the frames consumed.
    pub fn consume_delay(&mut self, frames: usize) -> usize {
        let consumed = frames.min(self.pending_delay);
        self.pending_delay -= consumed;
        consumed
    }

    pub fn is_settled(&self) -> bool {
        self.pending_pad == 0 && self.pending_delay == 0
    }
}
