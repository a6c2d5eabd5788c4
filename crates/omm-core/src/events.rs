use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::ChimeKind;

/// Every state change in the system produces an Event.
/// Front ends render them; the runtime publishes them on a broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        gong_count: u32,
        interval_secs: u64,
        at: DateTime<Utc>,
    },
    /// A gong boundary was reached. `gong_index` is zero-based.
    GongFired {
        gong_index: u32,
        gong_count: u32,
        chime: ChimeKind,
        at: DateTime<Utc>,
    },
    CountdownTick {
        gong_index: u32,
        remaining_secs: u64,
    },
    /// The session ended. `completed` is false when it was stopped by hand.
    SessionStopped {
        completed: bool,
        at: DateTime<Utc>,
    },
    StreamStarted {
        at: DateTime<Utc>,
    },
    StreamPaused {
        at: DateTime<Utc>,
    },
    /// A fade ran to its last step.
    FadeCompleted {
        volume: f32,
        at: DateTime<Utc>,
    },
    /// Something failed in a way the user should see once.
    Alert {
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        running: bool,
        gong_number: u32,
        gong_count: u32,
        remaining_secs: u64,
        countdown: String,
        stream_playing: bool,
        stream_volume: f32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn alert(message: impl Into<String>) -> Self {
        Event::Alert {
            message: message.into(),
            at: Utc::now(),
        }
    }
}
