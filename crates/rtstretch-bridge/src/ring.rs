//! Lock-free SPSC rings over shared memory.
//!
//! A ring is an interleaved `f32` sample region of `capacity × channels`
//! samples plus a [`RingCursors`] control region. [`SharedRing::new`]
//! allocates both; [`SharedRing::from_raw_parts`] wraps caller-owned memory
//! (for hosts that hand over foreign shared memory). Either way the ring is
//! split into one [`RingProducer`] and one [`RingConsumer`], which may live
//! on different threads.

use std::ptr::NonNull;
use std::sync::Arc;

use rtstretch_core::DrainSink;

use crate::cursor::{self, RingCursors};
use crate::error::{Error, Result};

struct RingRegion {
    samples: NonNull<f32>,
    cursors: NonNull<RingCursors>,
    channels: usize,
    capacity: usize,
    /// Allocated by `SharedRing::new` and freed on drop
    owned: bool,
}

// SAFETY: The region is only touched through RingProducer / RingConsumer.
// Cursors are atomics. Sample frames in [read, write) belong to the consumer
// and the remaining frames to the producer; each side only touches frames it
// owns and hands them over with a Release store of its cursor, observed by
// the other side with an Acquire load.
unsafe impl Send for RingRegion {}
unsafe impl Sync for RingRegion {}

impl Drop for RingRegion {
    fn drop(&mut self) {
        if self.owned {
            let len = self.capacity * self.channels;
            // SAFETY: Both pointers came from Box::leak in SharedRing::new with
            // exactly this length, and no endpoint is left to use them.
            unsafe {
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    self.samples.as_ptr(),
                    len,
                )));
                drop(Box::from_raw(self.cursors.as_ptr()));
            }
        }
    }
}

impl RingRegion {
    fn cursors(&self) -> &RingCursors {
        // SAFETY: Points into memory the region owns, or into caller memory
        // the `from_raw_parts` contract keeps valid for the region's lifetime.
        unsafe { self.cursors.as_ref() }
    }

    /// Samples of `frames` frames starting at frame `start`.
    ///
    /// # Safety
    ///
    /// The frames must be owned by the caller's side of the ring and lie
    /// within `[0, capacity)`.
    unsafe fn frames(&self, start: usize, frames: usize) -> &[f32] {
        debug_assert!(start + frames <= self.capacity);
        std::slice::from_raw_parts(
            self.samples.as_ptr().add(start * self.channels),
            frames * self.channels,
        )
    }

    /// Mutable samples of `frames` frames starting at frame `start`.
    ///
    /// # Safety
    ///
    /// As [`Self::frames`], and no other reference to these frames may exist.
    #[allow(clippy::mut_from_ref)]
    unsafe fn frames_mut(&self, start: usize, frames: usize) -> &mut [f32] {
        debug_assert!(start + frames <= self.capacity);
        std::slice::from_raw_parts_mut(
            self.samples.as_ptr().add(start * self.channels),
            frames * self.channels,
        )
    }
}

fn check_descriptor(channels: usize, capacity: usize) -> Result<()> {
    if channels == 0 {
        return Err(Error::InvalidRing("channel count must be greater than 0".into()));
    }
    if capacity < 2 {
        return Err(Error::InvalidRing(format!(
            "capacity {} too small (one slot is always kept empty)",
            capacity
        )));
    }
    if capacity > i32::MAX as usize {
        return Err(Error::InvalidRing(format!(
            "capacity {} exceeds {}",
            capacity,
            i32::MAX
        )));
    }
    if capacity.checked_mul(channels).is_none() {
        return Err(Error::InvalidRing(format!(
            "{} frames × {} channels overflows",
            capacity, channels
        )));
    }
    Ok(())
}

/// Shared ring before it is split into producer and consumer.
pub struct SharedRing {
    region: Arc<RingRegion>,
}

impl SharedRing {
    /// Allocate a zeroed ring with both cursors at 0.
    ///
    /// `capacity` is in frames; at most `capacity - 1` are readable at once.
    pub fn new(channels: usize, capacity: usize) -> Result<Self> {
        check_descriptor(channels, capacity)?;

        let samples: Box<[f32]> = vec![0.0; capacity * channels].into_boxed_slice();
        let cursors = Box::new(RingCursors::default());

        Ok(Self {
            region: Arc::new(RingRegion {
                samples: NonNull::from(Box::leak(samples)).cast::<f32>(),
                cursors: NonNull::from(Box::leak(cursors)),
                channels,
                capacity,
                owned: true,
            }),
        })
    }

    /// Wrap caller-owned memory.
    ///
    /// `samples` is an interleaved region of `capacity × channels` `f32`s.
    /// `control` is a two-slot `u32` array: index 0 = write cursor, index 1
    /// = read cursor, both frame indices. Existing cursor values are kept.
    ///
    /// # Safety
    ///
    /// - `samples` must be valid for reads and writes of
    ///   `capacity × channels` `f32`s, and `control` for two `u32`s, for
    ///   as long as any endpoint of this ring exists.
    /// - The control slots must only be accessed atomically by anything else
    ///   that shares them.
    /// - At most one producer and one consumer may operate on the memory in
    ///   total, including foreign ones.
    pub unsafe fn from_raw_parts(
        samples: *mut f32,
        control: *mut u32,
        channels: usize,
        capacity: usize,
    ) -> Result<Self> {
        check_descriptor(channels, capacity)?;

        let samples = NonNull::new(samples)
            .ok_or_else(|| Error::InvalidRing("null sample region".into()))?;
        let cursors = NonNull::new(control as *mut RingCursors)
            .ok_or_else(|| Error::InvalidRing("null control region".into()))?;
        if samples.as_ptr().align_offset(std::mem::align_of::<f32>()) != 0
            || cursors
                .as_ptr()
                .align_offset(std::mem::align_of::<RingCursors>())
                != 0
        {
            return Err(Error::InvalidRing("misaligned region".into()));
        }

        let region = RingRegion {
            samples,
            cursors,
            channels,
            capacity,
            owned: false,
        };

        let write = region.cursors().load_write();
        let read = region.cursors().load_read();
        if write >= capacity || read >= capacity {
            return Err(Error::InvalidRing(format!(
                "cursors (write {}, read {}) outside capacity {}",
                write, read, capacity
            )));
        }

        Ok(Self {
            region: Arc::new(region),
        })
    }

    pub fn channels(&self) -> usize {
        self.region.channels
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity
    }

    pub fn split(self) -> (RingProducer, RingConsumer) {
        (
            RingProducer {
                region: Arc::clone(&self.region),
            },
            RingConsumer {
                region: self.region,
            },
        )
    }
}

/// Writing end of a shared ring. Owns the write cursor.
pub struct RingProducer {
    region: Arc<RingRegion>,
}

impl RingProducer {
    pub fn channels(&self) -> usize {
        self.region.channels
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity
    }

    /// Current write cursor.
    pub fn write_cursor(&self) -> usize {
        self.region.cursors().load_write()
    }

    /// Frames that can be written now.
    pub fn write_space(&self) -> usize {
        let cursors = self.region.cursors();
        cursor::free(cursors.load_write(), cursors.load_read(), self.region.capacity)
    }

    /// Write whole interleaved frames from `samples`. Returns frames written.
    pub fn write_interleaved(&mut self, samples: &[f32]) -> usize {
        let channels = self.region.channels;
        let frames = (samples.len() / channels).min(self.write_space());
        if frames == 0 {
            return 0;
        }

        let write = self.write_cursor();
        let (first, second) = cursor::runs(write, frames, self.region.capacity);
        // SAFETY: frames [write, write + frames) are free, so owned by the producer.
        unsafe {
            self.region
                .frames_mut(write, first)
                .copy_from_slice(&samples[..first * channels]);
            self.region
                .frames_mut(0, second)
                .copy_from_slice(&samples[first * channels..frames * channels]);
        }
        self.publish(frames);
        frames
    }

    /// Interleave and write `frames` frames from per-channel `channels`.
    /// Returns frames written.
    pub fn write_planar<C: AsRef<[f32]>>(&mut self, channels: &[C], frames: usize) -> usize {
        let channel_count = self.region.channels;
        let frames = frames.min(self.write_space());
        if frames == 0 {
            return 0;
        }

        let write = self.write_cursor();
        let (first, second) = cursor::runs(write, frames, self.region.capacity);
        for (start, offset, run) in [(write, 0, first), (0, first, second)] {
            // SAFETY: as in write_interleaved.
            let destination = unsafe { self.region.frames_mut(start, run) };
            for (ch, source) in channels.iter().enumerate().take(channel_count) {
                let source = &source.as_ref()[offset..offset + run];
                for (frame, sample) in source.iter().enumerate() {
                    destination[frame * channel_count + ch] = *sample;
                }
            }
        }
        self.publish(frames);
        frames
    }

    fn publish(&self, frames: usize) {
        let cursors = self.region.cursors();
        let next = cursor::advance(cursors.load_write(), frames, self.region.capacity);
        cursors.store_write(next);
    }
}

impl DrainSink for RingProducer {
    fn write_space(&self) -> usize {
        RingProducer::write_space(self)
    }

    fn write(&mut self, channels: &[Vec<f32>], frames: usize) {
        self.write_planar(channels, frames);
    }
}

/// Reading end of a shared ring. Owns the read cursor.
pub struct RingConsumer {
    region: Arc<RingRegion>,
}

impl RingConsumer {
    pub fn channels(&self) -> usize {
        self.region.channels
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity
    }

    /// Current read cursor.
    pub fn read_cursor(&self) -> usize {
        self.region.cursors().load_read()
    }

    /// Frames readable now.
    pub fn available(&self) -> usize {
        let cursors = self.region.cursors();
        cursor::available(cursors.load_write(), cursors.load_read(), self.region.capacity)
    }

    /// Read whole interleaved frames into `output`. Returns frames read.
    pub fn read_interleaved(&mut self, output: &mut [f32]) -> usize {
        let channels = self.region.channels;
        let frames = (output.len() / channels).min(self.available());
        if frames == 0 {
            return 0;
        }

        let read = self.read_cursor();
        let (first, second) = cursor::runs(read, frames, self.region.capacity);
        // SAFETY: frames [read, read + frames) are written and owned by the consumer.
        unsafe {
            output[..first * channels].copy_from_slice(self.region.frames(read, first));
            output[first * channels..frames * channels]
                .copy_from_slice(self.region.frames(0, second));
        }
        self.release(frames);
        frames
    }

    /// De-interleave up to `frames` frames into per-channel `channels`.
    /// Returns frames read.
    pub fn read_planar<C: AsMut<[f32]>>(&mut self, channels: &mut [C], frames: usize) -> usize {
        let channel_count = self.region.channels;
        let frames = frames.min(self.available());
        if frames == 0 {
            return 0;
        }

        let read = self.read_cursor();
        let (first, second) = cursor::runs(read, frames, self.region.capacity);
        for (start, offset, run) in [(read, 0, first), (0, first, second)] {
            // SAFETY: as in read_interleaved.
            let source = unsafe { self.region.frames(start, run) };
            for (ch, destination) in channels.iter_mut().enumerate().take(channel_count) {
                let destination = &mut destination.as_mut()[offset..offset + run];
                for (frame, sample) in destination.iter_mut().enumerate() {
                    *sample = source[frame * channel_count + ch];
                }
            }
        }
        self.release(frames);
        frames
    }

    /// Discard up to `frames` frames. Returns frames skipped.
    pub fn skip(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.available());
        self.release(frames);
        frames
    }

    fn release(&self, frames: usize) {
        let cursors = self.region.cursors();
        let next = cursor::advance(cursors.load_read(), frames, self.region.capacity);
        cursors.store_read(next);
    }
}

/// Copy up to `frames` frames from `source` to `destination` unchanged,
/// bounded by what `source` holds and `destination` can take. Both rings
/// must have the same channel count. Returns frames copied.
pub fn transfer(source: &mut RingConsumer, destination: &mut RingProducer, frames: usize) -> usize {
    debug_assert_eq!(source.channels(), destination.channels());
    let frames = frames
        .min(source.available())
        .min(destination.write_space());
    if frames == 0 {
        return 0;
    }

    let mut read = source.read_cursor();
    let mut write = destination.write_cursor();
    let mut remaining = frames;
    while remaining > 0 {
        let run = remaining
            .min(source.capacity() - read)
            .min(destination.capacity() - write);
        // SAFETY: the source frames are owned by the consumer and the
        // destination frames by the producer. Distinct rings never alias.
        unsafe {
            destination
                .region
                .frames_mut(write, run)
                .copy_from_slice(source.region.frames(read, run));
        }
        read = cursor::advance(read, run, source.capacity());
        write = cursor::advance(write, run, destination.capacity());
        remaining -= run;
    }

    source.release(frames);
    destination.publish(frames);
    frames
}
