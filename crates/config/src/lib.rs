//! Layered configuration for the voice-agent call pipeline: a `Settings`
//! struct deserialized from `config/default.yaml`, an optional
//! `config/{env}.yaml`, then environment variables, validated before the
//! server binds a port or the vault accepts a key.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, FsmTimerSettings, LlmConfig, MediaBridgeSettings, ObservabilityConfig,
    PipelineConfig, ProviderSettings, RateLimitConfig, RuntimeEnvironment, ServerConfig, Settings,
    StoreConfig, TimeoutSettings, VadSettings, VaultConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
