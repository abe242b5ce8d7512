//! Channel-major sample views.
//!
//! A channel-major block stores all frames of channel 0, then all frames of
//! channel 1, and so on (channel stride = frame count). The views check the
//! `channels × frames` length once at construction and then hand out
//! per-channel slices without allocating.

use smallvec::SmallVec;

use crate::{Error, Result};

/// Per-channel slice list, inline for up to 8 channels.
pub type ChannelSlices<'a> = SmallVec<[&'a [f32]; 8]>;

/// Mutable per-channel slice list, inline for up to 8 channels.
pub type ChannelSlicesMut<'a> = SmallVec<[&'a mut [f32]; 8]>;

/// Read-only channel-major block.
#[derive(Debug, Clone, Copy)]
pub struct ChannelMajor<'a> {
    data: &'a [f32],
    channels: usize,
    frames: usize,
}

impl<'a> ChannelMajor<'a> {
    pub fn new(data: &'a [f32], channels: usize, frames: usize) -> Result<Self> {
        check_len(data.len(), channels, frames)?;
        Ok(Self {
            data,
            channels,
            frames,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &'a [f32] {
        let start = index * self.frames;
        &self.data[start..start + self.frames]
    }

    /// One slice per channel.
    pub fn slices(&self) -> ChannelSlices<'a> {
        (0..self.channels).map(|ch| self.channel(ch)).collect()
    }
}

/// Writable channel-major block.
#[derive(Debug)]
pub struct ChannelMajorMut<'a> {
    data: &'a mut [f32],
    channels: usize,
    frames: usize,
}

impl<'a> ChannelMajorMut<'a> {
    pub fn new(data: &'a mut [f32], channels: usize, frames: usize) -> Result<Self> {
        check_len(data.len(), channels, frames)?;
        Ok(Self {
            data,
            channels,
            frames,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// One mutable slice per channel.
    pub fn slices_mut(&mut self) -> ChannelSlicesMut<'_> {
        let frames = self.frames;
        let mut slices = ChannelSlicesMut::new();
        let mut rest: &mut [f32] = &mut *self.data;
        for _ in 0..self.channels {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(frames);
            slices.push(head);
            rest = tail;
        }
        slices
    }
}

fn check_len(actual: usize, channels: usize, frames: usize) -> Result<()> {
    let expected = channels.checked_mul(frames).ok_or(Error::BufferSize {
        expected: usize::MAX,
        actual,
    })?;
    if actual != expected {
        return Err(Error::BufferSize { expected, actual });
    }
    Ok(())
}
