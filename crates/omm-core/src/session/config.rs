use serde::Serialize;

use crate::error::ValidationError;

/// Parameters of one session. Immutable once the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    gong_count: u32,
    interval_secs: u64,
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns an error if either value is zero.
    pub fn new(gong_count: u32, interval_secs: u64) -> Result<Self, ValidationError> {
        if gong_count < 1 {
            return Err(ValidationError::TooSmall {
                field: "gong_count".into(),
                min: 1,
                value: gong_count as u64,
            });
        }
        if interval_secs < 1 {
            return Err(ValidationError::TooSmall {
                field: "interval_secs".into(),
                min: 1,
                value: interval_secs,
            });
        }
        Ok(Self {
            gong_count,
            interval_secs,
        })
    }

    /// Build a config from an interval in whole minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is zero.
    pub fn from_minutes(gong_count: u32, interval_minutes: u64) -> Result<Self, ValidationError> {
        Self::new(gong_count, interval_minutes.saturating_mul(60))
    }

    pub fn gong_count(&self) -> u32 {
        self.gong_count
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Index of the gong that plays the final chime.
    pub fn last_gong_index(&self) -> u32 {
        self.gong_count - 1
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gong_count: 3,
            interval_secs: 2 * 60,
        }
    }
}
