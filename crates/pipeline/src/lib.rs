//! Streaming denoise pipeline
//!
//! Components:
//! - Resampler pair: stateful sinc conversion between the caller's rate and 48 kHz
//! - Frame engine: fixed 480-sample denoise + VAD with running statistics
//! - Stream session: elastic buffering that turns arbitrary chunks into engine frames
//! - Session registry: integer handles for host bindings

pub mod engine;
pub mod registry;
pub mod resampler;
#[cfg(feature = "rnnoise")]
pub mod rnnoise;
pub mod session;

pub use engine::{DenoiseModel, EngineStats, FrameEngine, VadResult};
pub use registry::{SessionHandle, SessionRegistry, NULL_HANDLE};
pub use resampler::{ResamplerPair, SincResampler, StreamResampler};
#[cfg(feature = "rnnoise")]
pub use rnnoise::RnnoiseModel;
pub use session::{FeedOutput, StreamSession};

pub use audx_core::{Error, Result, ENGINE_INFO};
