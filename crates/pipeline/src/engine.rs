//! Frame engine adapter
//!
//! Wraps a black-box denoise model behind a fixed-frame contract: exactly
//! one engine frame in, exactly one cleaned frame out, plus a VAD result.
//! The adapter owns the running statistics; nothing outside it touches the
//! counters except through `stats()` and `reset_stats()`.

use audx_config::DenoiserConfig;
use audx_core::{audio::FRAME_SIZE, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Black-box denoise model
///
/// Samples are f32 in 16-bit scale (-32768.0..=32767.0). Implementations
/// write exactly `frame_size()` cleaned samples and return a speech
/// probability.
pub trait DenoiseModel: Send {
    fn process_frame(&mut self, output: &mut [f32], input: &[f32]) -> Result<f32>;

    /// Samples per frame the model requires
    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }

    fn name(&self) -> &str {
        "denoise-model"
    }
}

/// VAD decision for one engine frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VadResult {
    /// Speech probability in [0, 1]
    pub probability: f32,
    pub is_speech: bool,
}

/// Snapshot of the engine's running statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub frames_processed: u64,
    pub speech_frames: u64,
    pub vad_sum: f64,
    /// Reset to 1.0 so the first frame always becomes the new minimum
    pub vad_min: f32,
    /// Reset to 0.0 so the first frame always becomes the new maximum
    pub vad_max: f32,
    pub total_processing_time: Duration,
    pub last_processing_time: Duration,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self {
            frames_processed: 0,
            speech_frames: 0,
            vad_sum: 0.0,
            vad_min: 1.0,
            vad_max: 0.0,
            total_processing_time: Duration::ZERO,
            last_processing_time: Duration::ZERO,
        }
    }
}

impl EngineStats {
    /// Percentage of frames classified as speech
    pub fn speech_ratio(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        self.speech_frames as f64 * 100.0 / self.frames_processed as f64
    }

    pub fn vad_mean(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        self.vad_sum / self.frames_processed as f64
    }

    pub fn mean_processing_time(&self) -> Duration {
        if self.frames_processed == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_processing_time.as_nanos() / self.frames_processed as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    fn record(&mut self, vad: VadResult, elapsed: Duration) {
        self.frames_processed += 1;
        if vad.is_speech {
            self.speech_frames += 1;
        }
        self.vad_sum += vad.probability as f64;
        self.vad_min = self.vad_min.min(vad.probability);
        self.vad_max = self.vad_max.max(vad.probability);
        self.total_processing_time += elapsed;
        self.last_processing_time = elapsed;
    }
}

/// Adapter owning one model instance, its VAD threshold and statistics
pub struct FrameEngine {
    model: Box<dyn DenoiseModel>,
    vad_threshold: f32,
    stats: EngineStats,
}

impl FrameEngine {
    pub fn new(model: Box<dyn DenoiseModel>, vad_threshold: f32) -> Self {
        Self {
            model,
            vad_threshold,
            stats: EngineStats::default(),
        }
    }

    /// Build the production engine described by `config`
    pub fn create(config: &DenoiserConfig) -> Result<Self> {
        config.validate()?;

        #[cfg(feature = "rnnoise")]
        {
            let model = crate::rnnoise::RnnoiseModel::from_config(config)?;
            tracing::debug!(
                model = model.name(),
                vad_threshold = config.vad_threshold,
                "Frame engine created"
            );
            Ok(Self::new(Box::new(model), config.vad_threshold))
        }

        #[cfg(not(feature = "rnnoise"))]
        {
            Err(Error::EngineInit(
                "built without the rnnoise feature".to_string(),
            ))
        }
    }

    pub fn frame_size(&self) -> usize {
        self.model.frame_size()
    }

    pub fn vad_threshold(&self) -> f32 {
        self.vad_threshold
    }

    /// Denoise exactly one frame
    ///
    /// Statistics are only updated for frames the model completed.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<VadResult> {
        let frame_size = self.model.frame_size();
        if input.len() != frame_size || output.len() != frame_size {
            return Err(Error::Engine(format!(
                "frame length mismatch: expected {}, got input {} / output {}",
                frame_size,
                input.len(),
                output.len()
            )));
        }

        let start = Instant::now();
        let raw = self.model.process_frame(output, input)?;
        let elapsed = start.elapsed();

        let probability = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        let vad = VadResult {
            probability,
            is_speech: probability >= self.vad_threshold,
        };
        self.stats.record(vad, elapsed);

        Ok(vad)
    }

    /// Read-only copy of the running statistics
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EngineStats::default();
        tracing::debug!(model = self.model.name(), "Engine statistics reset");
    }
}

impl std::fmt::Debug for FrameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameEngine")
            .field("model", &self.model.name())
            .field("vad_threshold", &self.vad_threshold)
            .field("stats", &self.stats)
            .finish()
    }
}
