//! # Omm Core Library
//!
//! This library provides the core logic for the Omm meditation timer. The
//! `omm` CLI is a thin terminal front end over the same core a mobile UI
//! would bind to.
//!
//! ## Architecture
//!
//! - **Session Timer**: A caller-driven countdown state machine; the caller
//!   invokes `tick()` once per second and receives gong events
//! - **Audio Coordinator**: Owns the two chime players and the background
//!   stream, ducking the stream around each chime with linear fades
//! - **Runtime**: A single-task async driver that owns both of the above and
//!   the timers that feed them
//!
//! ## Key Components
//!
//! - [`SessionTimer`]: Gong countdown state machine
//! - [`AudioCoordinator`]: Chime playback and stream fades
//! - [`Runner`]: Session owner running on one tokio task
//! - [`Config`]: Read-only TOML configuration

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod session;

pub use audio::{
    AudioCoordinator, AudioSettings, ChimeKind, ChimePlayer, Fade, StreamPlayer, StreamState,
};
pub use config::Config;
pub use error::{AudioError, ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use runtime::{Command, Runner, RunnerHandle};
pub use session::{SessionConfig, SessionState, SessionTimer};
