//! Centralized error type for the rtstretch umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] rtstretch_engine::Error),

    #[error(transparent)]
    Core(#[from] rtstretch_core::Error),

    #[error(transparent)]
    Bridge(#[from] rtstretch_bridge::Error),
}

impl Error {
    /// True for an out-of-range construction or live parameter, whichever
    /// subsystem reported it.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Error::Engine(rtstretch_engine::Error::InvalidParameter { .. })
                | Error::Core(rtstretch_core::Error::InvalidParameter { .. })
                | Error::Core(rtstretch_core::Error::Engine(
                    rtstretch_engine::Error::InvalidParameter { .. }
                ))
                | Error::Bridge(rtstretch_bridge::Error::Core(
                    rtstretch_core::Error::InvalidParameter { .. }
                ))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
