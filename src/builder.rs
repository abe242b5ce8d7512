//! Builder for configuring and constructing a `RealtimeStretcher`.

use rtstretch_core::StreamConfig;
use rtstretch_engine::{Detector, EngineKind, EngineOptions, StretchEngine, Transients};

use crate::{RealtimeStretcher, Result};

/// Unset fields keep the [`StreamConfig`] defaults: 44100 Hz, 2 channels,
/// 512-frame blocks, standard quality, 16 drain passes.
///
/// # Example
///
/// ```ignore
/// use rtstretch::prelude::*;
///
/// let stretcher = RealtimeStretcher::builder()
///     .sample_rate(48000)
///     .channels(1)
///     .high_quality(true)
///     .formant_preserved(true)
///     .transients(Transients::Crisp)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RealtimeStretcherBuilder {
    config: StreamConfig,
    engine: EngineKind,
}

impl RealtimeStretcherBuilder {
    /// Start from an existing configuration.
    pub fn from_config(config: StreamConfig) -> Self {
        Self {
            config,
            engine: EngineKind::default(),
        }
    }

    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 2
    pub fn channels(mut self, channels: usize) -> Self {
        self.config.channels = channels;
        self
    }

    /// Frames per engine feed. 0 selects the default (512).
    pub fn block_size(mut self, frames: usize) -> Self {
        self.config.block_size = frames;
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn high_quality(mut self, enabled: bool) -> Self {
        self.config.options = self.config.options.high_quality(enabled);
        self
    }

    pub fn formant_preserved(mut self, enabled: bool) -> Self {
        self.config.options = self.config.options.formant_preserved(enabled);
        self
    }

    pub fn transients(mut self, transients: Transients) -> Self {
        self.config.options = self.config.options.transients(transients);
        self
    }

    pub fn detector(mut self, detector: Detector) -> Self {
        self.config.options = self.config.options.detector(detector);
        self
    }

    /// Default: 16
    pub fn max_drain_passes(mut self, passes: usize) -> Self {
        self.config.max_drain_passes = passes;
        self
    }

    /// Default: [`EngineKind::Granular`]
    pub fn engine(mut self, kind: EngineKind) -> Self {
        self.engine = kind;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn build(self) -> Result<RealtimeStretcher> {
        RealtimeStretcher::with_engine_kind(self.engine, self.config)
    }

    /// Build around a caller-supplied engine. The selected engine kind is
    /// ignored.
    pub fn build_with<E: StretchEngine>(self, engine: E) -> Result<RealtimeStretcher<E>> {
        RealtimeStretcher::with_engine(engine, self.config)
    }
}
