//! Configuration management for the video synthesis pipeline
//!
//! Supports loading configuration from:
//! - YAML/TOML files
//! - Environment variables (VIDFORGE_ prefix)
//! - Built-in defaults

pub mod settings;

pub use settings::{
    credential_env_keys, load_settings, AudioSettings, DriverSettings, KindSettings,
    ProviderSettings, ServicesSettings, Settings,
};

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
        ConfigError::ParseError(err.to_string())
    }
}
