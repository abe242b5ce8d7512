//! Engine option enums and preset derivation.
//!
//! Options are plain values. An engine turns them into concrete analysis
//! parameters through [`EngineOptions::preset`]; nothing is stored globally.

use serde::{Deserialize, Serialize};

/// Processing quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quality {
    /// Consistent pitch, 50% window overlap.
    #[default]
    Standard,
    /// 75% window overlap. Roughly twice the CPU cost.
    HighQuality,
}

/// Formant handling when pitch-shifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Formant {
    /// Formants move with the pitch.
    #[default]
    Shifted,
    /// Spectral envelope is kept in place (vocals, speech).
    Preserved,
}

/// Transient handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transients {
    /// Balanced window length.
    #[default]
    Mixed,
    /// Short window, sharper attacks, more phasiness on sustained material.
    Crisp,
    /// Long window, smeared attacks, smoother sustained material.
    Smooth,
}

impl Transients {
    /// Map the host integer encoding `{0, 1, 2}` to `{Mixed, Crisp, Smooth}`.
    ///
    /// Unknown values fall back to [`Transients::Mixed`].
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Transients::Crisp,
            2 => Transients::Smooth,
            _ => Transients::Mixed,
        }
    }
}

/// Onset detector flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Detector {
    #[default]
    Compound,
    Percussive,
    Soft,
}

impl Detector {
    /// Map the host integer encoding `{0, 1, 2}` to `{Compound, Percussive, Soft}`.
    ///
    /// Unknown values fall back to [`Detector::Compound`].
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Detector::Percussive,
            2 => Detector::Soft,
            _ => Detector::Compound,
        }
    }
}

/// Immutable option set chosen at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub quality: Quality,
    pub formant: Formant,
    pub transients: Transients,
    pub detector: Detector,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high_quality(mut self, enabled: bool) -> Self {
        self.quality = if enabled {
            Quality::HighQuality
        } else {
            Quality::Standard
        };
        self
    }

    pub fn formant_preserved(mut self, enabled: bool) -> Self {
        self.formant = if enabled {
            Formant::Preserved
        } else {
            Formant::Shifted
        };
        self
    }

    pub fn transients(mut self, transients: Transients) -> Self {
        self.transients = transients;
        self
    }

    pub fn detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    /// Derive concrete analysis parameters for the given sample rate.
    ///
    /// Window length follows the transient mode (~23ms crisp, ~46ms mixed,
    /// ~93ms smooth), rounded up to a power of two. High quality switches
    /// from 50% to 75% overlap.
    pub fn preset(&self, sample_rate: u32) -> EnginePreset {
        let window_ms = match self.transients {
            Transients::Crisp => 23.0,
            Transients::Mixed => 46.0,
            Transients::Smooth => 93.0,
        };
        let target = (sample_rate as f64 * window_ms / 1000.0).round() as usize;
        let window = target.clamp(MIN_WINDOW, MAX_WINDOW).next_power_of_two();

        let overlap = match self.quality {
            Quality::Standard => 2,
            Quality::HighQuality => 4,
        };

        EnginePreset {
            window,
            hop: window / overlap,
        }
    }
}

const MIN_WINDOW: usize = 256;
const MAX_WINDOW: usize = 16384;

/// Concrete parameters derived from [`EngineOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnginePreset {
    /// Analysis/synthesis window length in frames (power of two)
    pub window: usize,
    /// Synthesis hop in frames
    pub hop: usize,
}

impl EnginePreset {
    /// Overlap factor (window / hop)
    pub fn overlap(&self) -> usize {
        self.window / self.hop
    }
}
