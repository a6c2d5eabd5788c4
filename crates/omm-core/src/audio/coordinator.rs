//! Audio coordinator.
//!
//! Owns the two chime players and the background stream. When a gong plays
//! while the stream is audible, the stream is ducked:
//!
//! ```text
//! fade out -> chime -> hold (restore delay) -> fade back in
//! ```
//!
//! The coordinator does not own a clock. The caller invokes
//! [`AudioCoordinator::advance_fade`] once per [`AudioSettings::step_interval`]
//! while [`AudioCoordinator::is_busy`] reports pending work.

use std::time::Duration;

use chrono::Utc;
use url::Url;

use super::fade::{AfterFade, Fade, FadeStep, DEFAULT_FADE_STEPS};
use super::{ChimeKind, ChimePlayer, StreamPlayer, StreamState};
use crate::error::AudioError;
use crate::events::Event;

/// Timing and level parameters for fades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    pub fade_duration: Duration,
    pub fade_steps: u32,
    /// Time the stream stays silent after a chime starts, before fading back in.
    pub restore_delay: Duration,
    /// Volume the stream fades in to when started.
    pub stream_volume: f32,
}

/// Shortest fade-step interval; tokio intervals reject a zero period.
const MIN_STEP_INTERVAL: Duration = Duration::from_millis(1);

impl AudioSettings {
    pub fn step_interval(&self) -> Duration {
        (self.fade_duration / self.fade_steps.max(1)).max(MIN_STEP_INTERVAL)
    }

    /// Number of fade-step intervals covering the restore delay.
    fn hold_steps(&self) -> u32 {
        let step = self.step_interval().as_millis();
        self.restore_delay.as_millis().div_ceil(step) as u32
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            fade_duration: Duration::from_secs(1),
            fade_steps: DEFAULT_FADE_STEPS,
            restore_delay: Duration::from_secs(2),
            stream_volume: 1.0,
        }
    }
}

pub struct AudioCoordinator {
    regular: Option<Box<dyn ChimePlayer>>,
    final_chime: Option<Box<dyn ChimePlayer>>,
    stream: Box<dyn StreamPlayer>,
    settings: AudioSettings,
    fade: Option<Fade>,
    /// Steps left before the post-chime restore fade starts.
    hold: Option<u32>,
    /// Volume to restore once a duck finishes. `Some` while ducking.
    duck_restore: Option<f32>,
    /// Pause the stream instead of restoring it when the duck's chime plays.
    pause_after_duck: bool,
}

impl AudioCoordinator {
    /// A missing chime player turns playback of that chime into a no-op.
    pub fn new(
        regular: Option<Box<dyn ChimePlayer>>,
        final_chime: Option<Box<dyn ChimePlayer>>,
        stream: Box<dyn StreamPlayer>,
        settings: AudioSettings,
    ) -> Self {
        Self {
            regular,
            final_chime,
            stream,
            settings,
            fade: None,
            hold: None,
            duck_restore: None,
            pause_after_duck: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn stream_state(&self) -> StreamState {
        StreamState {
            playing: self.stream.is_playing(),
            volume: self.stream.volume(),
            fade_target: self.fade.as_ref().map(Fade::target),
        }
    }

    /// True while a fade or post-chime hold needs `advance_fade` calls.
    pub fn is_busy(&self) -> bool {
        self.fade.is_some() || self.hold.is_some()
    }

    fn is_pausing(&self) -> bool {
        self.fade
            .as_ref()
            .is_some_and(|f| f.pending() == Some(AfterFade::Pause))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Play a chime, ducking the stream around it if it is playing.
    pub fn play_gong(&mut self, kind: ChimeKind) -> Vec<Event> {
        if !self.stream.is_playing() || self.is_pausing() {
            self.play_chime(kind);
            return Vec::new();
        }

        if self.duck_restore.is_none() {
            let restore = self
                .fade
                .as_ref()
                .map(Fade::target)
                .unwrap_or_else(|| self.stream.volume());
            self.duck_restore = Some(restore);
        }
        self.hold = None;
        self.start_fade(0.0, AfterFade::PlayChime(kind));
        Vec::new()
    }

    /// Start the stream with a fade-in, or fade it out and pause it.
    pub fn toggle_stream(&mut self) -> Vec<Event> {
        self.cancel_duck();

        if self.is_pausing() {
            tracing::debug!("stream toggle reverses pending pause");
            self.start_fade(self.settings.stream_volume, AfterFade::Nothing);
            return Vec::new();
        }

        if self.stream.is_playing() {
            self.start_fade(0.0, AfterFade::Pause);
            return Vec::new();
        }

        self.stream.set_volume(0.0);
        if let Err(e) = self.stream.play() {
            tracing::warn!("stream play failed: {e}");
            return vec![Event::alert(format!("Could not start music: {e}"))];
        }
        self.start_fade(self.settings.stream_volume, AfterFade::Nothing);
        vec![Event::StreamStarted { at: Utc::now() }]
    }

    /// Fade the stream to silence and pause it. A chime waiting on a duck
    /// still plays; the stream pauses instead of coming back.
    pub fn fade_out_and_pause(&mut self) -> Vec<Event> {
        if !self.stream.is_playing() || self.is_pausing() {
            return Vec::new();
        }

        let chime_pending = matches!(
            self.fade.as_ref().and_then(Fade::pending),
            Some(AfterFade::PlayChime(_))
        );
        if chime_pending {
            self.pause_after_duck = true;
            return Vec::new();
        }

        self.cancel_duck();
        self.start_fade(0.0, AfterFade::Pause);
        Vec::new()
    }

    /// Load a new stream source. Invalid URLs leave the stream untouched.
    pub fn set_stream_url(&mut self, url: &str) -> Vec<Event> {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(source) => {
                let err = AudioError::InvalidUrl {
                    url: url.to_string(),
                    source,
                };
                tracing::warn!("{err}");
                return vec![Event::alert(err.to_string())];
            }
        };

        match self.stream.load(&parsed) {
            Ok(()) => {
                tracing::info!(url = %parsed, "stream source loaded");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("stream load failed: {e}");
                vec![Event::alert(e.to_string())]
            }
        }
    }

    /// Drive the active fade or hold by one step.
    pub fn advance_fade(&mut self) -> Vec<Event> {
        let mut events = Vec::new();

        if let Some(fade) = self.fade.as_mut() {
            match fade.step() {
                Some(FadeStep::Step(volume)) => self.stream.set_volume(volume),
                Some(FadeStep::Last(volume, then)) => {
                    self.fade = None;
                    self.stream.set_volume(volume);
                    events.push(Event::FadeCompleted {
                        volume,
                        at: Utc::now(),
                    });
                    self.after_fade(then, &mut events);
                }
                None => self.fade = None,
            }
            return events;
        }

        if let Some(left) = self.hold.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.hold = None;
                self.restore_after_duck();
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Replace the active fade. The replaced fade never completes, but a
    /// chime it was waiting to play is played now.
    fn start_fade(&mut self, target: f32, then: AfterFade) {
        if let Some(old) = self.fade.take() {
            if let Some(AfterFade::PlayChime(kind)) = old.pending() {
                self.play_chime(kind);
            }
        }
        self.fade =
            Some(Fade::new(self.stream.volume(), target, self.settings.fade_steps).then(then));
    }

    fn after_fade(&mut self, then: AfterFade, events: &mut Vec<Event>) {
        match then {
            AfterFade::Nothing => {}
            AfterFade::Pause => {
                self.stream.pause();
                events.push(Event::StreamPaused { at: Utc::now() });
            }
            AfterFade::PlayChime(kind) => {
                self.play_chime(kind);
                if self.pause_after_duck {
                    self.cancel_duck();
                    self.stream.pause();
                    events.push(Event::StreamPaused { at: Utc::now() });
                    return;
                }
                match self.settings.hold_steps() {
                    0 => self.restore_after_duck(),
                    n => self.hold = Some(n),
                }
            }
        }
    }

    fn restore_after_duck(&mut self) {
        if let Some(volume) = self.duck_restore.take() {
            self.start_fade(volume, AfterFade::Nothing);
        }
    }

    fn cancel_duck(&mut self) {
        self.hold = None;
        self.duck_restore = None;
        self.pause_after_duck = false;
    }

    fn play_chime(&mut self, kind: ChimeKind) {
        let player = match kind {
            ChimeKind::Regular => self.regular.as_mut(),
            ChimeKind::Final => self.final_chime.as_mut(),
        };
        let Some(player) = player else {
            tracing::debug!(?kind, "no chime player loaded");
            return;
        };
        if let Err(e) = player.rewind_and_play() {
            tracing::warn!(?kind, "chime playback failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{FakeChime, FakeStream, FakeStreamState, PlayLog};
    use std::sync::{Arc, Mutex};

    fn coordinator(
        settings: AudioSettings,
    ) -> (AudioCoordinator, PlayLog, Arc<Mutex<FakeStreamState>>) {
        let log = PlayLog::default();
        let (stream, state) = FakeStream::new(&log);
        let audio = AudioCoordinator::new(
            Some(FakeChime::boxed(ChimeKind::Regular, &log)),
            Some(FakeChime::boxed(ChimeKind::Final, &log)),
            Box::new(stream),
            settings,
        );
        (audio, log, state)
    }

    fn playing_at(state: &Arc<Mutex<FakeStreamState>>, volume: f32) {
        let mut s = state.lock().unwrap();
        s.url = Some(Url::parse("http://localhost:3000/stream").unwrap());
        s.playing = true;
        s.volume = volume;
    }

    fn advance(audio: &mut AudioCoordinator, n: usize) -> Vec<Event> {
        (0..n).flat_map(|_| audio.advance_fade()).collect()
    }

    fn completions(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::FadeCompleted { .. }))
            .count()
    }

    #[test]
    fn step_interval_is_never_zero() {
        let settings = AudioSettings {
            fade_duration: Duration::ZERO,
            ..AudioSettings::default()
        };
        assert_eq!(settings.step_interval(), Duration::from_millis(1));
    }

    #[test]
    fn gong_without_stream_plays_immediately() {
        let (mut audio, log, _) = coordinator(AudioSettings::default());
        audio.play_gong(ChimeKind::Regular);
        assert_eq!(log.entries(), vec!["chime:regular"]);
        assert!(!audio.is_busy());
    }

    #[test]
    fn gong_ducks_stream_and_restores_prior_volume() {
        let (mut audio, log, state) = coordinator(AudioSettings::default());
        playing_at(&state, 0.8);

        audio.play_gong(ChimeKind::Final);
        assert_eq!(audio.stream_state().fade_target, Some(0.0));

        advance(&mut audio, 19);
        assert_eq!(log.count("chime:final"), 0);
        let events = advance(&mut audio, 1);
        assert_eq!(completions(&events), 1);
        assert_eq!(log.count("chime:final"), 1);
        assert_eq!(state.lock().unwrap().volume, 0.0);

        // 2 s hold at 50 ms per step.
        advance(&mut audio, 40);
        assert_eq!(audio.stream_state().fade_target, Some(0.8));
        advance(&mut audio, 20);
        assert_eq!(state.lock().unwrap().volume, 0.8);
        assert!(!audio.is_busy());
        assert!(state.lock().unwrap().playing);
    }

    #[test]
    fn zero_restore_delay_fades_back_right_after_chime() {
        let settings = AudioSettings {
            restore_delay: Duration::ZERO,
            ..AudioSettings::default()
        };
        let (mut audio, _, state) = coordinator(settings);
        playing_at(&state, 0.5);

        audio.play_gong(ChimeKind::Regular);
        advance(&mut audio, 20);
        assert_eq!(audio.stream_state().fade_target, Some(0.5));
    }

    #[test]
    fn new_fade_cancels_previous_completion() {
        let (mut audio, _, state) = coordinator(AudioSettings::default());
        playing_at(&state, 1.0);

        let mut events = audio.toggle_stream(); // fade out to pause
        events.extend(advance(&mut audio, 5));
        events.extend(audio.toggle_stream()); // reverse: fade back in
        events.extend(advance(&mut audio, 40));

        assert_eq!(completions(&events), 1);
        assert!(!events.iter().any(|e| matches!(e, Event::StreamPaused { .. })));
        assert_eq!(state.lock().unwrap().volume, 1.0);
    }

    #[test]
    fn superseded_duck_still_plays_its_chime() {
        let (mut audio, log, state) = coordinator(AudioSettings::default());
        playing_at(&state, 1.0);

        audio.play_gong(ChimeKind::Regular);
        advance(&mut audio, 3);
        audio.toggle_stream();
        assert_eq!(log.count("chime:regular"), 1);
    }

    #[test]
    fn toggle_starts_stream_with_fade_in() {
        let settings = AudioSettings {
            stream_volume: 0.6,
            ..AudioSettings::default()
        };
        let (mut audio, log, state) = coordinator(settings);
        audio.set_stream_url("http://localhost:3000/stream");

        let events = audio.toggle_stream();
        assert!(matches!(events[..], [Event::StreamStarted { .. }]));
        assert_eq!(state.lock().unwrap().volume, 0.0);
        advance(&mut audio, 20);
        assert!((state.lock().unwrap().volume - 0.6).abs() < f32::EPSILON);
        assert_eq!(log.count("stream:play"), 1);
    }

    #[test]
    fn toggle_while_playing_fades_out_then_pauses() {
        let (mut audio, _, state) = coordinator(AudioSettings::default());
        playing_at(&state, 1.0);

        audio.toggle_stream();
        let events = advance(&mut audio, 20);
        assert!(events.iter().any(|e| matches!(e, Event::StreamPaused { .. })));
        assert!(!state.lock().unwrap().playing);
    }

    #[test]
    fn toggle_without_source_alerts() {
        let (mut audio, _, state) = coordinator(AudioSettings::default());
        let events = audio.toggle_stream();
        assert!(matches!(events[..], [Event::Alert { .. }]));
        assert!(!state.lock().unwrap().playing);
        assert!(!audio.is_busy());
    }

    #[test]
    fn invalid_url_alerts_and_keeps_state() {
        let (mut audio, log, state) = coordinator(AudioSettings::default());
        playing_at(&state, 0.7);
        let before = audio.stream_state();

        let events = audio.set_stream_url("not a url");
        assert!(matches!(events[..], [Event::Alert { .. }]));
        assert_eq!(audio.stream_state(), before);
        assert_eq!(log.count("stream:load"), 0);
    }

    #[test]
    fn fade_out_during_duck_plays_chime_then_pauses() {
        let (mut audio, log, state) = coordinator(AudioSettings::default());
        playing_at(&state, 1.0);

        audio.play_gong(ChimeKind::Final);
        advance(&mut audio, 10);
        audio.fade_out_and_pause();
        let events = advance(&mut audio, 10);

        assert_eq!(log.count("chime:final"), 1);
        assert!(events.iter().any(|e| matches!(e, Event::StreamPaused { .. })));
        assert!(!state.lock().unwrap().playing);
        assert!(!audio.is_busy());
    }

    #[test]
    fn fade_out_during_hold_skips_restore() {
        let (mut audio, _, state) = coordinator(AudioSettings::default());
        playing_at(&state, 1.0);

        audio.play_gong(ChimeKind::Regular);
        advance(&mut audio, 25);
        audio.fade_out_and_pause();
        assert_eq!(audio.stream_state().fade_target, Some(0.0));
        advance(&mut audio, 20);
        assert!(!state.lock().unwrap().playing);
        assert!(!audio.is_busy());
    }

    #[test]
    fn missing_chime_player_is_a_no_op() {
        let log = PlayLog::default();
        let (stream, _) = FakeStream::new(&log);
        let mut audio = AudioCoordinator::new(None, None, Box::new(stream), AudioSettings::default());
        assert!(audio.play_gong(ChimeKind::Final).is_empty());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn step_interval_and_hold() {
        let s = AudioSettings::default();
        assert_eq!(s.step_interval(), Duration::from_millis(50));
        assert_eq!(s.hold_steps(), 40);
    }
}
