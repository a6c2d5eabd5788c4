//! TOML-based application configuration.
//!
//! Holds defaults for a session and the audio setup:
//! - Gong count and interval
//! - Chime asset paths and the background stream URL
//! - Fade timing and the post-chime restore delay
//!
//! Configuration is read from `~/.config/omm/config.toml`, or from the path in
//! `OMM_CONFIG`. It is never written back; a missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::AudioSettings;
use crate::error::{ConfigError, Result};
use crate::session::SessionConfig;

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_gong_count")]
    pub gong_count: u32,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

/// Audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_chime_path")]
    pub chime_path: PathBuf,
    #[serde(default = "default_final_chime_path")]
    pub final_chime_path: PathBuf,
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,
    /// Delay between a chime starting and the stream fading back in.
    /// Should roughly match the chime asset's length.
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
    #[serde(default = "default_stream_volume")]
    pub stream_volume: f32,
    #[serde(default)]
    pub stop_music_after_session: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub audio: AudioConfig,
}

// Default functions
fn default_gong_count() -> u32 {
    3
}
fn default_interval_minutes() -> u64 {
    2
}
fn default_chime_path() -> PathBuf {
    PathBuf::from("audio/Chime.mp3")
}
fn default_final_chime_path() -> PathBuf {
    PathBuf::from("audio/EndChime.mp3")
}
fn default_stream_url() -> String {
    "http://localhost:3000/stream".into()
}
fn default_fade_duration_ms() -> u64 {
    1000
}
fn default_fade_steps() -> u32 {
    20
}
fn default_restore_delay_ms() -> u64 {
    2000
}
fn default_stream_volume() -> f32 {
    1.0
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            gong_count: default_gong_count(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chime_path: default_chime_path(),
            final_chime_path: default_final_chime_path(),
            stream_url: default_stream_url(),
            fade_duration_ms: default_fade_duration_ms(),
            fade_steps: default_fade_steps(),
            restore_delay_ms: default_restore_delay_ms(),
            stream_volume: default_stream_volume(),
            stop_music_after_session: false,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Default location: `~/.config/omm/config.toml`, or `OMM_CONFIG` if set.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("OMM_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("omm")
            .join("config.toml")
    }

    /// Load from `path`, or return defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if a value is out of range.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the default location.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`](crate::CoreError::Config) for any
    /// failure reported by [`Config::load_from`].
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(&Self::default_path())?)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.fade_duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "audio.fade_duration_ms".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.audio.fade_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "audio.fade_steps".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.stream_volume) {
            return Err(ConfigError::InvalidValue {
                key: "audio.stream_volume".into(),
                message: format!("{} is outside 0.0..=1.0", self.audio.stream_volume),
            });
        }
        Ok(())
    }

    /// Session parameters from the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`](crate::CoreError::Validation) if the
    /// gong count or interval is zero.
    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig::from_minutes(
            self.session.gong_count,
            self.session.interval_minutes,
        )?)
    }

    pub fn audio_settings(&self) -> AudioSettings {
        AudioSettings {
            fade_duration: Duration::from_millis(self.audio.fade_duration_ms),
            fade_steps: self.audio.fade_steps,
            restore_delay: Duration::from_millis(self.audio.restore_delay_ms),
            stream_volume: self.audio.stream_volume,
        }
    }
}
