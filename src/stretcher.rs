//! Real-time stretcher: one engine, local and shared-memory streaming.

use rtstretch_bridge::{
    RingConsumer, RingProducer, ServiceReport, SharedMemoryStreamBridge, SharedRing,
};
use rtstretch_core::{
    LatencyCompensator, LocalRingBufferPipeline, ParameterHandle, StatsSnapshot, StreamConfig,
};
use rtstretch_engine::{create_engine, EngineKind, StretchEngine};

use crate::{Error, Result};

/// A stretching stream.
///
/// Starts in local mode (`push` / `pull`). [`Self::register_shared_memory`]
/// switches it to bridge mode once, after which [`Self::service`] pumps the
/// shared rings. Both modes share the same engine adapter and latency
/// state.
///
/// All methods except [`Self::parameter_handle`] belong to the single
/// processing context that owns the stretcher.
///
/// # Example
///
/// ```ignore
/// use rtstretch::prelude::*;
///
/// let mut stretcher = RealtimeStretcher::builder()
///     .sample_rate(48000)
///     .channels(2)
///     .block_size(256)
///     .build()?;
///
/// stretcher.set_tempo(0.9)?;
/// stretcher.push(&input, 256)?;
/// stretcher.pull(&mut output, 256)?;
/// ```
pub struct RealtimeStretcher<E: StretchEngine = Box<dyn StretchEngine>> {
    config: StreamConfig,
    pipeline: LocalRingBufferPipeline<E>,
    bridge: Option<SharedMemoryStreamBridge>,
}

impl RealtimeStretcher {
    /// Stretcher with the built-in granular engine.
    pub fn new(config: StreamConfig) -> Result<Self> {
        Self::with_engine_kind(EngineKind::Granular, config)
    }

    pub fn with_engine_kind(kind: EngineKind, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let engine = create_engine(kind, config.sample_rate, config.channels, config.options)?;
        Self::with_engine(engine, config)
    }

    pub fn builder() -> crate::RealtimeStretcherBuilder {
        crate::RealtimeStretcherBuilder::default()
    }
}

impl<E: StretchEngine> RealtimeStretcher<E> {
    /// Stretcher around a caller-supplied engine.
    pub fn with_engine(engine: E, config: StreamConfig) -> Result<Self> {
        let pipeline = LocalRingBufferPipeline::new(engine, &config)?;
        Ok(Self {
            config,
            pipeline,
            bridge: None,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn channels(&self) -> usize {
        self.config.channels
    }

    pub fn block_size(&self) -> usize {
        self.pipeline.adapter().block_size()
    }

    pub fn engine(&self) -> &E {
        self.pipeline.adapter().engine()
    }

    /// Engine implementation version.
    pub fn version(&self) -> u32 {
        self.pipeline.adapter().version()
    }

    pub fn tempo(&self) -> f64 {
        self.engine().time_ratio()
    }

    pub fn pitch(&self) -> f64 {
        self.engine().pitch_scale()
    }

    pub fn formant_scale(&self) -> f64 {
        self.engine().formant_scale()
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Set the tempo ratio (> 0). Pending output drains into the active
    /// output (outbound ring once registered, local rings before).
    pub fn set_tempo(&mut self, ratio: f64) -> Result<()> {
        let (adapter, rings) = self.pipeline.parts_mut();
        match self.bridge.as_mut() {
            Some(bridge) => adapter.set_tempo(ratio, bridge.outbound_mut())?,
            None => adapter.set_tempo(ratio, rings)?,
        }
        Ok(())
    }

    /// Set the pitch scale (> 0). Re-arms latency compensation.
    pub fn set_pitch(&mut self, scale: f64) -> Result<()> {
        let (adapter, rings) = self.pipeline.parts_mut();
        match self.bridge.as_mut() {
            Some(bridge) => adapter.set_pitch(scale, bridge.outbound_mut())?,
            None => adapter.set_pitch(scale, rings)?,
        }
        Ok(())
    }

    /// Set the formant scale (> 0). Re-arms latency compensation.
    pub fn set_formant_scale(&mut self, scale: f64) -> Result<()> {
        let (adapter, rings) = self.pipeline.parts_mut();
        match self.bridge.as_mut() {
            Some(bridge) => adapter.set_formant_scale(scale, bridge.outbound_mut())?,
            None => adapter.set_formant_scale(scale, rings)?,
        }
        Ok(())
    }

    /// Handle for setting parameters from other threads. Targets are
    /// applied at the start of the next `push` or `service`.
    pub fn parameter_handle(&self) -> ParameterHandle {
        self.pipeline.adapter().parameter_handle()
    }

    // =========================================================================
    // Local streaming
    // =========================================================================

    /// Feed `frames` frames of channel-major input (`channels × frames`
    /// samples, channel stride = `frames`).
    pub fn push(&mut self, input: &[f32], frames: usize) -> Result<()> {
        self.pipeline.push(input, frames)?;
        Ok(())
    }

    /// Read `frames` frames into channel-major `output`. Underrun is silence.
    pub fn pull(&mut self, output: &mut [f32], frames: usize) -> Result<()> {
        self.pipeline.pull(output, frames)?;
        Ok(())
    }

    /// Frames ready to pull.
    pub fn samples_available(&self) -> usize {
        self.pipeline.samples_available()
    }

    /// Per-channel capacity of the local rings, in frames.
    pub fn ring_capacity(&self) -> usize {
        self.pipeline.capacity()
    }

    // =========================================================================
    // Shared memory
    // =========================================================================

    /// Switch to bridge mode. Allowed once.
    ///
    /// `inbound` is read by the stretcher and written by an external
    /// producer; `outbound` is written by the stretcher and read by an
    /// external consumer.
    pub fn register_shared_memory(
        &mut self,
        inbound: RingConsumer,
        outbound: RingProducer,
    ) -> Result<()> {
        if self.bridge.is_some() {
            return Err(rtstretch_bridge::Error::AlreadyRegistered.into());
        }
        let bridge = SharedMemoryStreamBridge::new(
            inbound,
            outbound,
            self.config.channels,
            self.block_size(),
        )?;
        self.bridge = Some(bridge);
        Ok(())
    }

    /// Switch to bridge mode over caller-owned memory.
    ///
    /// Each ring is an interleaved `f32` region of `capacity × channels`
    /// samples plus a two-slot `u32` control region (write cursor, read
    /// cursor).
    ///
    /// # Safety
    ///
    /// All four regions must satisfy [`SharedRing::from_raw_parts`] for as
    /// long as this stretcher exists.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn register_raw_shared_memory(
        &mut self,
        inbound_samples: *mut f32,
        inbound_control: *mut u32,
        inbound_capacity: usize,
        outbound_samples: *mut f32,
        outbound_control: *mut u32,
        outbound_capacity: usize,
    ) -> Result<()> {
        if self.bridge.is_some() {
            return Err(rtstretch_bridge::Error::AlreadyRegistered.into());
        }
        let channels = self.config.channels;
        let (_, inbound) = SharedRing::from_raw_parts(
            inbound_samples,
            inbound_control,
            channels,
            inbound_capacity,
        )?
        .split();
        let (outbound, _) = SharedRing::from_raw_parts(
            outbound_samples,
            outbound_control,
            channels,
            outbound_capacity,
        )?
        .split();
        self.register_shared_memory(inbound, outbound)
    }

    pub fn is_registered(&self) -> bool {
        self.bridge.is_some()
    }

    /// Pump the shared rings once. Never blocks. Does nothing before
    /// registration.
    pub fn service(&mut self) -> ServiceReport {
        match self.bridge.as_mut() {
            Some(bridge) => bridge.service(self.pipeline.adapter_mut()),
            None => ServiceReport::default(),
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Current pending start pad and start delay.
    pub fn latency(&self) -> LatencyCompensator {
        self.pipeline.adapter().latency()
    }

    /// True when tempo and pitch are close enough to 1.0 for the bridge to
    /// skip the engine.
    pub fn is_bypassed(&self) -> bool {
        self.pipeline.adapter().is_identity()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.pipeline.adapter().stats().snapshot()
    }
}

impl<E: StretchEngine> std::fmt::Debug for RealtimeStretcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeStretcher")
            .field("config", &self.config)
            .field("version", &self.version())
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtstretch_engine::ScriptedEngine;

    fn scripted(channels: usize) -> RealtimeStretcher<ScriptedEngine> {
        let config = StreamConfig {
            block_size: 64,
            ..StreamConfig::new(8000, channels)
        };
        RealtimeStretcher::with_engine(ScriptedEngine::new(8000, channels), config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = RealtimeStretcher::new(StreamConfig::new(0, 2)).unwrap_err();
        assert!(err.is_invalid_parameter());
        let err = RealtimeStretcher::new(StreamConfig::new(44100, 0)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_setters_validate() {
        let mut stretcher = scripted(1);
        assert!(stretcher.set_tempo(0.0).unwrap_err().is_invalid_parameter());
        assert!(stretcher.set_pitch(-2.0).unwrap_err().is_invalid_parameter());
        assert!(stretcher
            .set_formant_scale(0.0)
            .unwrap_err()
            .is_invalid_parameter());
        assert_eq!(stretcher.tempo(), 1.0);
    }

    #[test]
    fn test_register_once() {
        let mut stretcher = scripted(2);
        let (_in_producer, inbound) = SharedRing::new(2, 1024).unwrap().split();
        let (outbound, _out_consumer) = SharedRing::new(2, 1024).unwrap().split();
        stretcher.register_shared_memory(inbound, outbound).unwrap();
        assert!(stretcher.is_registered());

        let (_, inbound) = SharedRing::new(2, 1024).unwrap().split();
        let (outbound, _) = SharedRing::new(2, 1024).unwrap().split();
        assert_eq!(
            stretcher.register_shared_memory(inbound, outbound),
            Err(Error::Bridge(rtstretch_bridge::Error::AlreadyRegistered))
        );
    }

    #[test]
    fn test_mutators_drain_into_outbound_when_registered() {
        let mut stretcher = scripted(1);
        let (mut input, inbound) = SharedRing::new(1, 1024).unwrap().split();
        let (outbound, output) = SharedRing::new(1, 1024).unwrap().split();
        stretcher.register_shared_memory(inbound, outbound).unwrap();

        stretcher.set_pitch(1.5).unwrap();
        input.write_interleaved(&[0.25; 64]);
        assert_eq!(stretcher.service().fed, 64);
        assert_eq!(output.available(), 0);

        stretcher.set_tempo(1.25).unwrap();
        assert_eq!(output.available(), 64);
        assert_eq!(stretcher.samples_available(), 0);
    }

    #[test]
    fn test_service_before_registration_is_noop() {
        let mut stretcher = scripted(1);
        assert_eq!(stretcher.service(), ServiceReport::default());
    }
}
