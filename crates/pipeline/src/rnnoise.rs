//! RNNoise denoise model (nnnoiseless)
//!
//! Requirements:
//! - Input audio: 48kHz mono, f32 in 16-bit scale
//! - Frame size: 480 samples (10ms at 48kHz)

use audx_config::{DenoiserConfig, ModelPreset};
use audx_core::{Error, Result};
use nnnoiseless::{DenoiseState, RnnModel};
use std::path::Path;

use crate::engine::DenoiseModel;

pub struct RnnoiseModel {
    /// Boxed due to nnnoiseless API
    state: Box<DenoiseState<'static>>,
    name: &'static str,
}

impl RnnoiseModel {
    /// Model with the weights compiled into nnnoiseless
    pub fn embedded() -> Self {
        Self {
            state: DenoiseState::new(),
            name: "rnnoise-embedded",
        }
    }

    /// Model with weights read from an RNNoise model file
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::EngineInit(format!("failed to read model {}: {}", path.display(), e))
        })?;
        let model = RnnModel::from_bytes(&bytes).ok_or_else(|| {
            Error::EngineInit(format!("invalid RNNoise model file {}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "Loaded custom RNNoise model");

        Ok(Self {
            state: DenoiseState::from_model(model),
            name: "rnnoise-custom",
        })
    }

    pub fn from_config(config: &DenoiserConfig) -> Result<Self> {
        match config.model_preset {
            ModelPreset::Embedded => Ok(Self::embedded()),
            ModelPreset::Custom => {
                let path = config.model_path.as_deref().ok_or_else(|| {
                    Error::EngineInit("custom model preset without a model path".to_string())
                })?;
                Self::from_file(path)
            },
        }
    }
}

impl DenoiseModel for RnnoiseModel {
    fn process_frame(&mut self, output: &mut [f32], input: &[f32]) -> Result<f32> {
        if input.len() != DenoiseState::FRAME_SIZE || output.len() != DenoiseState::FRAME_SIZE {
            return Err(Error::Engine(format!(
                "RNNoise needs {} samples per frame",
                DenoiseState::FRAME_SIZE
            )));
        }
        Ok(self.state.process_frame(output, input))
    }

    fn frame_size(&self) -> usize {
        DenoiseState::FRAME_SIZE
    }

    fn name(&self) -> &str {
        self.name
    }
}
