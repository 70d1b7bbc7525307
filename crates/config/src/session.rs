//! Per-stream session configuration

use audx_core::audio::{self, quality};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

/// Which weights the denoise engine loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreset {
    /// Weights compiled into the engine
    #[default]
    Embedded,
    /// Weights read from `DenoiserConfig::model_path`
    Custom,
}

/// Denoise engine configuration, passed through to the frame engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenoiserConfig {
    #[serde(default)]
    pub model_preset: ModelPreset,

    /// Model file, required for `ModelPreset::Custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// Speech decision threshold on the VAD probability
    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,

    /// Report VAD results to the caller (frames are processed either way)
    #[serde(default = "default_true")]
    pub enable_vad_output: bool,
}

fn default_vad_threshold() -> f32 {
    0.5
}
fn default_true() -> bool {
    true
}

impl Default for DenoiserConfig {
    fn default() -> Self {
        Self {
            model_preset: ModelPreset::default(),
            model_path: None,
            vad_threshold: default_vad_threshold(),
            enable_vad_output: true,
        }
    }
}

impl DenoiserConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.vad_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "denoiser.vad_threshold".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", self.vad_threshold),
            });
        }

        if self.model_preset == ModelPreset::Custom && self.model_path.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "denoiser.model_path".to_string(),
                message: "Custom model preset requires a model path".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration for one continuous audio stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Caller's sample rate (Hz)
    #[serde(default = "default_input_sample_rate")]
    pub input_sample_rate: u32,

    /// Resampler quality, 0 (fastest) ..= 10 (best)
    #[serde(default = "default_resample_quality")]
    pub resample_quality: i32,

    #[serde(default)]
    pub denoiser: DenoiserConfig,
}

fn default_input_sample_rate() -> u32 {
    audio::ENGINE_SAMPLE_RATE
}
fn default_resample_quality() -> i32 {
    quality::DEFAULT
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: default_input_sample_rate(),
            resample_quality: default_resample_quality(),
            denoiser: DenoiserConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Session at `rate` with default quality and engine settings
    pub fn with_rate(rate: u32) -> Self {
        Self {
            input_sample_rate: rate,
            ..Self::default()
        }
    }

    /// Voice-call preset: VOIP resample quality
    pub fn voip(rate: u32) -> Self {
        Self {
            input_sample_rate: rate,
            resample_quality: quality::VOIP,
            ..Self::default()
        }
    }

    pub fn needs_resampling(&self) -> bool {
        self.input_sample_rate != audio::ENGINE_SAMPLE_RATE
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(audio::MIN_SAMPLE_RATE..=audio::MAX_SAMPLE_RATE).contains(&self.input_sample_rate) {
            return Err(ConfigError::InvalidValue {
                field: "session.input_sample_rate".to_string(),
                message: format!(
                    "Must be between {} and {} Hz, got {}",
                    audio::MIN_SAMPLE_RATE,
                    audio::MAX_SAMPLE_RATE,
                    self.input_sample_rate
                ),
            });
        }

        if !quality::is_valid(self.resample_quality) {
            return Err(ConfigError::InvalidValue {
                field: "session.resample_quality".to_string(),
                message: format!(
                    "Must be between {} and {}, got {}",
                    quality::MIN,
                    quality::MAX,
                    self.resample_quality
                ),
            });
        }

        self.denoiser.validate()
    }
}
