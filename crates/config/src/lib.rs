//! Configuration management for the audx denoiser
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files
//! - Environment variables (AUDX__ prefix, `__` separated)
//! - Built-in defaults

pub mod session;
pub mod settings;

pub use session::{DenoiserConfig, ModelPreset, SessionConfig};
pub use settings::{load_settings, ObservabilityConfig, Settings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for audx_core::Error {
    fn from(err: ConfigError) -> Self {
        audx_core::Error::InvalidConfig(err.to_string())
    }
}
