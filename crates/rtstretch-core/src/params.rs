//! Lock-free parameter targets.
//!
//! The engine is not thread-safe, so a control thread never touches it.
//! Instead it stores targets in a [`ParameterHandle`]; the processing
//! context picks them up at the start of its next `push` or `service` call
//! and applies them through the normal drain-before-change mutators.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF64;

use crate::{Error, Result};

const TEMPO: u32 = 1 << 0;
const PITCH: u32 = 1 << 1;
const FORMANT: u32 = 1 << 2;

/// Cache-line aligned target value.
#[derive(Debug)]
#[repr(align(64))]
struct Target {
    value: AtomicF64,
}

impl Target {
    fn new(value: f64) -> Self {
        Self {
            value: AtomicF64::new(value),
        }
    }

    #[inline]
    fn get(&self) -> f64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    fn set(&self, value: f64) {
        self.value.store(value, Ordering::Release);
    }
}

#[derive(Debug)]
struct Targets {
    tempo: Target,
    pitch: Target,
    formant: Target,
    /// Bitmask of targets written since the last `take_pending`
    pending: AtomicU32,
}

/// Cloneable, `Send + Sync` handle for setting tempo, pitch and formant
/// scale from any thread.
#[derive(Debug, Clone)]
pub struct ParameterHandle {
    targets: Arc<Targets>,
}

/// Targets written since the last poll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingChanges {
    pub tempo: Option<f64>,
    pub pitch: Option<f64>,
    pub formant: Option<f64>,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.tempo.is_none() && self.pitch.is_none() && self.formant.is_none()
    }
}

impl ParameterHandle {
    pub fn new(tempo: f64, pitch: f64, formant: f64) -> Self {
        Self {
            targets: Arc::new(Targets {
                tempo: Target::new(tempo),
                pitch: Target::new(pitch),
                formant: Target::new(formant),
                pending: AtomicU32::new(0),
            }),
        }
    }

    /// Request a new tempo ratio. Fails on non-positive or non-finite input.
    pub fn set_tempo(&self, ratio: f64) -> Result<()> {
        let ratio = Error::check_positive("tempo", ratio)?;
        self.publish(&self.targets.tempo, TEMPO, ratio);
        Ok(())
    }

    /// Request a new pitch scale. Fails on non-positive or non-finite input.
    pub fn set_pitch(&self, scale: f64) -> Result<()> {
        let scale = Error::check_positive("pitch", scale)?;
        self.publish(&self.targets.pitch, PITCH, scale);
        Ok(())
    }

    /// Request a new formant scale. Fails on non-positive or non-finite input.
    pub fn set_formant_scale(&self, scale: f64) -> Result<()> {
        let scale = Error::check_positive("formant_scale", scale)?;
        self.publish(&self.targets.formant, FORMANT, scale);
        Ok(())
    }

    /// Most recently requested tempo
    pub fn tempo(&self) -> f64 {
        self.targets.tempo.get()
    }

    /// Most recently requested pitch scale
    pub fn pitch(&self) -> f64 {
        self.targets.pitch.get()
    }

    /// Most recently requested formant scale
    pub fn formant_scale(&self) -> f64 {
        self.targets.formant.get()
    }

    pub fn has_pending(&self) -> bool {
        self.targets.pending.load(Ordering::Acquire) != 0
    }

    /// Collect and clear pending targets. Called from the processing context.
    pub fn take_pending(&self) -> PendingChanges {
        let mask = self.targets.pending.swap(0, Ordering::AcqRel);
        if mask == 0 {
            return PendingChanges::default();
        }
        let pick = |bit: u32, target: &Target| (mask & bit != 0).then(|| target.get());
        PendingChanges {
            tempo: pick(TEMPO, &self.targets.tempo),
            pitch: pick(PITCH, &self.targets.pitch),
            formant: pick(FORMANT, &self.targets.formant),
        }
    }

    fn publish(&self, target: &Target, bit: u32, value: f64) {
        target.set(value);
        self.targets.pending.fetch_or(bit, Ordering::Release);
    }
}

impl Default for ParameterHandle {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}
