//! Engine constants and PCM sample helpers
//!
//! The denoise engine runs at a fixed rate on fixed-size mono frames. Every
//! session reconciles the caller's rate with these values; nothing here is
//! configurable at runtime.

use serde::{Deserialize, Serialize};

/// Sample rate the denoise engine runs at (Hz)
pub const ENGINE_SAMPLE_RATE: u32 = 48_000;

/// Channel count (mono only)
pub const CHANNELS: u16 = 1;

/// Bits per sample at the API boundary
pub const BIT_DEPTH: u16 = 16;

/// Samples per engine frame (10 ms at 48 kHz)
pub const FRAME_SIZE: usize = 480;

/// Lowest caller sample rate accepted by a session (Hz)
pub const MIN_SAMPLE_RATE: u32 = 4_000;

/// Highest caller sample rate accepted by a session (Hz)
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Resample quality bounds and presets
pub mod quality {
    /// Fastest, lowest fidelity
    pub const MIN: i32 = 0;
    /// Slowest, highest fidelity
    pub const MAX: i32 = 10;
    /// General purpose
    pub const DEFAULT: i32 = 4;
    /// Voice / real-time calls
    pub const VOIP: i32 = 3;

    /// Check a quality level against the supported range
    pub fn is_valid(quality: i32) -> bool {
        (MIN..=MAX).contains(&quality)
    }
}

/// Read-only view of the fixed constants, for bindings and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub frame_size: usize,
    pub resample_quality_min: i32,
    pub resample_quality_max: i32,
    pub resample_quality_default: i32,
    pub resample_quality_voip: i32,
}

pub const ENGINE_INFO: EngineInfo = EngineInfo {
    sample_rate: ENGINE_SAMPLE_RATE,
    channels: CHANNELS,
    bit_depth: BIT_DEPTH,
    frame_size: FRAME_SIZE,
    resample_quality_min: quality::MIN,
    resample_quality_max: quality::MAX,
    resample_quality_default: quality::DEFAULT,
    resample_quality_voip: quality::VOIP,
};

/// Samples at `input_rate` covering the same duration as `engine_frame`
/// samples at `engine_rate`.
///
/// Rounds half away from zero in integer arithmetic, so the per-frame timing
/// error never exceeds half an input sample. Never returns 0 for a non-zero
/// frame; returns 0 only if `engine_rate` is 0.
pub fn frame_samples_at_rate(engine_frame: usize, input_rate: u32, engine_rate: u32) -> usize {
    if engine_rate == 0 {
        return 0;
    }
    if input_rate == engine_rate {
        return engine_frame;
    }
    let num = engine_frame as u64 * input_rate as u64;
    let den = engine_rate as u64;
    let rounded = (2 * num + den) / (2 * den);
    (rounded as usize).max(usize::from(engine_frame > 0 && input_rate > 0))
}

/// Convert a PCM16 sample to the f32 scale the engine expects (-32768..32767)
#[inline]
pub fn pcm16_to_engine(sample: i16) -> f32 {
    sample as f32
}

/// Convert an engine-scale sample back to PCM16, rounding and saturating
#[inline]
pub fn engine_to_pcm16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    sample.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
