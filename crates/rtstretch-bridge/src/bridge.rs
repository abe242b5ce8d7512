//! Shared-memory stream bridge.
//!
//! Pumps audio from an inbound ring through the engine adapter into an
//! outbound ring. `service` is meant to run once per audio callback (or on
//! any fixed cadence) and never blocks: a call that sees stale cursors just
//! does less work and catches up next time.
//!
//! Per call, in order:
//!
//! 1. Apply parameter targets published through the `ParameterHandle`.
//! 2. **Bypass** (tempo and pitch ≈ 1.0): copy
//!    `min(inbound available, outbound free)` frames straight across. Any
//!    output the engine still holds from before is drained out first.
//! 3. Otherwise drain the engine into the outbound ring, dropping what does
//!    not fit. The drain runs on every call, including calls that find
//!    less than one block of input waiting, so a stalled producer never
//!    leaves output trapped in the engine.
//! 4. Feed exactly one block if one full block is waiting. Otherwise return
//!    without touching the inbound ring.
//!
//! The bridge writes only the inbound read cursor and the outbound write
//! cursor. The external producer and consumer own the other two.

use rtstretch_core::{StretchEngineAdapter, DEFAULT_BLOCK_SIZE};
use rtstretch_engine::StretchEngine;

use crate::error::{Error, Result};
use crate::ring::{transfer, RingConsumer, RingProducer};

/// What one `service` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceReport {
    /// The identity fast path was taken
    pub bypassed: bool,
    /// Frames copied straight across (bypass only)
    pub copied: usize,
    /// Engine frames written to the outbound ring
    pub drained: usize,
    /// Inbound frames fed to the engine (0 or one block)
    pub fed: usize,
}

/// Services an inbound/outbound ring pair through a stretch engine adapter.
pub struct SharedMemoryStreamBridge {
    inbound: RingConsumer,
    outbound: RingProducer,
    block_size: usize,
    bypassed: bool,
}

impl SharedMemoryStreamBridge {
    /// Bridge `inbound` to `outbound`, feeding the engine `block_size`
    /// frames at a time (0 selects the default block size).
    pub fn new(
        inbound: RingConsumer,
        outbound: RingProducer,
        channels: usize,
        block_size: usize,
    ) -> Result<Self> {
        for (name, actual) in [
            ("inbound", inbound.channels()),
            ("outbound", outbound.channels()),
        ] {
            if actual != channels {
                return Err(Error::InvalidRing(format!(
                    "{} ring has {} channels, stream has {}",
                    name, actual, channels
                )));
            }
        }

        let block_size = if block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            block_size
        };
        if inbound.capacity() <= block_size {
            return Err(Error::InvalidRing(format!(
                "inbound capacity {} cannot hold one {}-frame block",
                inbound.capacity(),
                block_size
            )));
        }

        tracing::info!(
            "Shared memory bridge registered: {} channels, inbound {} frames, outbound {} frames, block {}",
            channels,
            inbound.capacity(),
            outbound.capacity(),
            block_size
        );

        Ok(Self {
            inbound,
            outbound,
            block_size,
            bypassed: false,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Whether the last service call took the bypass path.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn inbound(&self) -> &RingConsumer {
        &self.inbound
    }

    pub fn outbound(&self) -> &RingProducer {
        &self.outbound
    }

    /// Outbound ring as a drain target for the adapter's mutators.
    pub fn outbound_mut(&mut self) -> &mut RingProducer {
        &mut self.outbound
    }

    /// Move audio from the inbound ring to the outbound ring. Never blocks.
    pub fn service<E: StretchEngine>(
        &mut self,
        adapter: &mut StretchEngineAdapter<E>,
    ) -> ServiceReport {
        // Targets were validated when published
        if let Err(e) = adapter.apply_pending(&mut self.outbound) {
            tracing::warn!("Failed to apply parameter change: {}", e);
        }

        let mut report = ServiceReport::default();

        if adapter.is_identity() {
            if !self.bypassed {
                self.bypassed = true;
                tracing::debug!("Bridge entering bypass");
            }
            report.bypassed = true;

            if adapter.engine().available() > 0 {
                report.drained = adapter.drain_available(&mut self.outbound);
            }

            let available = self.inbound.available();
            if available > 0 {
                report.copied = transfer(&mut self.inbound, &mut self.outbound, available);
                adapter.stats().record_bypass(report.copied);
            }
            return report;
        }

        if self.bypassed {
            self.bypassed = false;
            tracing::debug!("Bridge leaving bypass");
        }

        report.drained = adapter.drain_available(&mut self.outbound);

        if self.inbound.available() < self.block_size {
            adapter.stats().record_starved();
            return report;
        }

        let block = self.block_size;
        let read = self.inbound.read_planar(adapter.input_scratch_mut(), block);
        adapter.feed_input_scratch(read);
        report.fed = read;
        report
    }
}
