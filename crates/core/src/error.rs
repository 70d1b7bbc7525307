//! Error types for the denoiser

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors surfaced by sessions, their collaborators and the handle registry
#[derive(Error, Debug)]
pub enum Error {
    /// Bad rate, quality or channel count; rejected before anything is built
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resample quality {0} out of range [0, 10]")]
    InvalidQuality(i32),

    #[error("Resampler initialization failed: {0}")]
    ResamplerInit(String),

    #[error("Denoise engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Buffer allocation failed: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// Null (0), unknown or already destroyed session handle
    #[error("Invalid session handle: {0}")]
    InvalidHandle(u64),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Denoise engine failed: {0}")]
    Engine(String),
}

impl Error {
    /// Construction-time failures leave no session behind
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::InvalidQuality(_)
                | Error::ResamplerInit(_)
                | Error::EngineInit(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
