//! Ring cursor pair and cursor arithmetic.
//!
//! The control region of a shared ring is two 32-bit slots: index 0 holds
//! the write cursor, index 1 the read cursor. Both are frame indices in
//! `[0, capacity)`. Each cursor has exactly one writer (the producer owns
//! the write cursor, the consumer owns the read cursor). Loads are
//! `Acquire` and stores are `Release`, so a published cursor also publishes
//! the samples written before it.
//!
//! One slot is always left empty: `write == read` means empty, and the ring
//! is full at `capacity - 1` frames.

use std::sync::atomic::{AtomicU32, Ordering};

/// Control slot of the write cursor.
pub const WRITE_SLOT: usize = 0;
/// Control slot of the read cursor.
pub const READ_SLOT: usize = 1;

/// Two-slot atomic control region, layout-compatible with `[u32; 2]`.
#[derive(Debug, Default)]
#[repr(C)]
pub struct RingCursors {
    slots: [AtomicU32; 2],
}

impl RingCursors {
    pub fn new(write: u32, read: u32) -> Self {
        Self {
            slots: [AtomicU32::new(write), AtomicU32::new(read)],
        }
    }

    #[inline]
    pub fn load_write(&self) -> usize {
        self.slots[WRITE_SLOT].load(Ordering::Acquire) as usize
    }

    #[inline]
    pub fn load_read(&self) -> usize {
        self.slots[READ_SLOT].load(Ordering::Acquire) as usize
    }

    #[inline]
    pub fn store_write(&self, cursor: usize) {
        self.slots[WRITE_SLOT].store(cursor as u32, Ordering::Release);
    }

    #[inline]
    pub fn store_read(&self, cursor: usize) {
        self.slots[READ_SLOT].store(cursor as u32, Ordering::Release);
    }
}

/// Frames readable: `(write - read) mod capacity`.
#[inline]
pub fn available(write: usize, read: usize, capacity: usize) -> usize {
    (write + capacity - read) % capacity
}

/// Frames writable: `capacity - available - 1`.
#[inline]
pub fn free(write: usize, read: usize, capacity: usize) -> usize {
    capacity - available(write, read, capacity) - 1
}

/// Cursor moved forward by `frames`, wrapped to `[0, capacity)`.
#[inline]
pub fn advance(cursor: usize, frames: usize, capacity: usize) -> usize {
    (cursor + frames) % capacity
}

/// Split `frames` starting at `start` into the run before the wrap point
/// and the run after it.
#[inline]
pub(crate) fn runs(start: usize, frames: usize, capacity: usize) -> (usize, usize) {
    let first = frames.min(capacity - start);
    (first, frames - first)
}
