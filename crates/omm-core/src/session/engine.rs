//! Session timer implementation.
//!
//! The session timer is a caller-driven state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` once
//! per second while a session is running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (gong boundary)* -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = SessionTimer::new();
//! let events = timer.start(config); // fires gong #0
//! // Once per second:
//! let events = timer.tick(); // countdown or gong events
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::SessionConfig;
use crate::audio::ChimeKind;
use crate::events::Event;

/// Mutable countdown state of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub running: bool,
    /// Zero-based index of the most recently fired gong.
    pub current_gong_index: u32,
    pub remaining_secs: u64,
}

/// Gong countdown engine.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    config: Option<SessionConfig>,
    state: SessionState,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Config of the running session, or of the last one that ran.
    pub fn config(&self) -> Option<SessionConfig> {
        self.config
    }

    /// One-based gong number as shown to the user ("Gong 2 of 5").
    pub fn gong_number(&self) -> u32 {
        if self.state.running {
            self.state.current_gong_index + 1
        } else {
            0
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session and fire gong #0 immediately.
    ///
    /// A running session is replaced; there is never more than one countdown.
    pub fn start(&mut self, config: SessionConfig) -> Vec<Event> {
        self.config = Some(config);
        self.state = SessionState {
            running: true,
            current_gong_index: 0,
            remaining_secs: config.interval_secs(),
        };

        let mut events = vec![Event::SessionStarted {
            session_id: Uuid::new_v4(),
            gong_count: config.gong_count(),
            interval_secs: config.interval_secs(),
            at: Utc::now(),
        }];
        self.fire_gong(config, &mut events);
        events
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Vec<Event> {
        let Some(config) = self.config.filter(|_| self.state.running) else {
            return Vec::new();
        };

        if self.state.remaining_secs > 0 {
            self.state.remaining_secs -= 1;
            return vec![Event::CountdownTick {
                gong_index: self.state.current_gong_index,
                remaining_secs: self.state.remaining_secs,
            }];
        }

        let mut events = Vec::new();
        self.state.current_gong_index += 1;
        self.fire_gong(config, &mut events);
        events
    }

    /// Stop the session by hand. Returns `None` when nothing was running.
    pub fn stop(&mut self) -> Option<Event> {
        if !self.state.running {
            return None;
        }
        Some(self.finish(false))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fire_gong(&mut self, config: SessionConfig, events: &mut Vec<Event>) {
        let index = self.state.current_gong_index;
        let is_final = index >= config.last_gong_index();
        events.push(Event::GongFired {
            gong_index: index,
            gong_count: config.gong_count(),
            chime: if is_final {
                ChimeKind::Final
            } else {
                ChimeKind::Regular
            },
            at: Utc::now(),
        });

        if is_final {
            events.push(self.finish(true));
        } else {
            self.state.remaining_secs = config.interval_secs();
        }
    }

    fn finish(&mut self, completed: bool) -> Event {
        self.state = SessionState::default();
        Event::SessionStopped {
            completed,
            at: Utc::now(),
        }
    }
}

/// Format seconds as a zero-padded `mm:ss` countdown.
pub fn format_countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
