//! Core types for the audx streaming denoiser
//!
//! This crate provides the foundation shared by every other crate:
//! - Error taxonomy (`Error`, `Result`)
//! - Fixed engine constants (rate, channel count, bit depth, frame size, resample quality)
//! - PCM16 <-> f32 sample conversion in engine scale
//! - Frame size arithmetic between the caller's rate and the engine rate

pub mod audio;
pub mod error;

pub use audio::{frame_samples_at_rate, EngineInfo, ENGINE_INFO};
pub use error::{Error, Result};
