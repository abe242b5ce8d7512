//! Stream statistics.
//!
//! Degraded-service events (overflow drops, underruns, bounded drains) are
//! not errors. They are counted here so hosts can see them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Relaxed counters updated from the processing context.
#[derive(Debug, Default)]
pub struct StreamStats {
    /// Frames fed to the engine (including start pad)
    frames_fed: AtomicU64,
    /// Frames written to a ring for the caller
    frames_surfaced: AtomicU64,
    /// Frames retrieved and dropped because the destination was full
    frames_dropped: AtomicU64,
    /// Frames retrieved and discarded as start delay
    delay_discarded: AtomicU64,
    /// Frames zero-filled by `pull`
    underrun_frames: AtomicU64,
    /// Frames copied through the bypass path
    bypass_frames: AtomicU64,
    /// Service calls that found less than one block of input
    starved_calls: AtomicU64,
    /// Drain loops stopped by the pass bound with output still pending
    drain_bound_hits: AtomicU64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_fed(&self, frames: usize) {
        self.frames_fed.fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_surfaced(&self, frames: usize) {
        self.frames_surfaced
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self, frames: usize) {
        self.frames_dropped.fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delay_discarded(&self, frames: usize) {
        self.delay_discarded
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_underrun(&self, frames: usize) {
        self.underrun_frames
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_bypass(&self, frames: usize) {
        self.bypass_frames.fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_starved(&self) {
        self.starved_calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_drain_bound_hit(&self) {
        self.drain_bound_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_fed: self.frames_fed.load(Ordering::Relaxed),
            frames_surfaced: self.frames_surfaced.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            delay_discarded: self.delay_discarded.load(Ordering::Relaxed),
            underrun_frames: self.underrun_frames.load(Ordering::Relaxed),
            bypass_frames: self.bypass_frames.load(Ordering::Relaxed),
            starved_calls: self.starved_calls.load(Ordering::Relaxed),
            drain_bound_hits: self.drain_bound_hits.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.frames_fed.store(0, Ordering::Relaxed);
        self.frames_surfaced.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.delay_discarded.store(0, Ordering::Relaxed);
        self.underrun_frames.store(0, Ordering::Relaxed);
        self.bypass_frames.store(0, Ordering::Relaxed);
        self.starved_calls.store(0, Ordering::Relaxed);
        self.drain_bound_hits.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_fed: u64,
    pub frames_surfaced: u64,
    pub frames_dropped: u64,
    pub delay_discarded: u64,
    pub underrun_frames: u64,
    pub bypass_frames: u64,
    pub starved_calls: u64,
    pub drain_bound_hits: u64,
}
