//! Chime and background-stream playback.
//!
//! Players are behind the [`ChimePlayer`] and [`StreamPlayer`] traits so the
//! coordinator can run against a platform backend, a terminal stand-in, or a
//! recording fake in tests.

mod coordinator;
mod fade;
#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{AudioCoordinator, AudioSettings};
pub use fade::{AfterFade, Fade, FadeStep};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AudioError;

/// Which of the two pre-loaded chimes to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChimeKind {
    Regular,
    Final,
}

/// A short, pre-loaded audio cue.
pub trait ChimePlayer: Send {
    /// Stop any playback in progress, rewind to the start, and play.
    fn rewind_and_play(&mut self) -> Result<(), AudioError>;
}

/// A continuous player for background music.
pub trait StreamPlayer: Send {
    /// Point the player at a new source. Playback state is unchanged.
    fn load(&mut self, url: &Url) -> Result<(), AudioError>;

    fn play(&mut self) -> Result<(), AudioError>;

    fn pause(&mut self);

    /// Set output volume in [0, 1].
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    fn is_playing(&self) -> bool;
}

/// Observable state of the background stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    pub playing: bool,
    pub volume: f32,
    /// Target of the fade in progress, if any.
    pub fade_target: Option<f32>,
}
