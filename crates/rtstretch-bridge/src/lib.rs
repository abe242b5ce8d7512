//! Lock-free shared-memory streaming.
//!
//! Two single-producer/single-consumer rings carry interleaved audio across
//! a thread or execution-context boundary: an inbound ring from an external
//! producer into the stretcher, and an outbound ring from the stretcher to
//! an external consumer. Each ring has a two-slot atomic control region
//! (write cursor, read cursor); no locks are taken anywhere.
//!
//! # Example
//!
//! ```ignore
//! use rtstretch_bridge::{SharedMemoryStreamBridge, SharedRing};
//!
//! let (mut input, inbound) = SharedRing::new(2, 4096)?.split();
//! let (outbound, mut output) = SharedRing::new(2, 4096)?.split();
//! let mut bridge = SharedMemoryStreamBridge::new(inbound, outbound, 2, 512)?;
//!
//! // decode thread
//! input.write_interleaved(&decoded);
//! // audio callback
//! bridge.service(&mut adapter);
//! output.read_interleaved(&mut device_buffer);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod cursor;
pub use cursor::{RingCursors, READ_SLOT, WRITE_SLOT};

mod ring;
pub use ring::{transfer, RingConsumer, RingProducer, SharedRing};

mod bridge;
pub use bridge::{ServiceReport, SharedMemoryStreamBridge};
