//! Core error types for omm-core.
//!
//! Errors are grouped by concern with thiserror. None of them is fatal
//! once a session is running: the runtime logs them or turns them into
//! an [`Event::Alert`](crate::events::Event::Alert). [`AudioError`] stays
//! inside the audio layer; [`CoreError`] is what the public entry points return.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for omm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The runtime task is gone
    #[error("Runner has shut down")]
    RunnerClosed,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Value below its lower bound
    #[error("'{field}' must be at least {min} (got {value})")]
    TooSmall { field: String, min: u64, value: u64 },
}

/// Errors raised by chime and stream players.
#[derive(Error, Debug)]
pub enum AudioError {
    /// An audio asset could not be loaded
    #[error("Could not load audio from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// The stream URL could not be parsed
    #[error("Invalid stream URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Playback failed on an already-loaded player
    #[error("Playback failed: {0}")]
    Playback(String),

    /// No stream URL has been loaded
    #[error("No stream loaded")]
    NoStream,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
