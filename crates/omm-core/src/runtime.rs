//! Session runtime.
//!
//! [`Runner`] owns the [`SessionTimer`], the [`AudioCoordinator`], and the two
//! recurring timers that drive them: the 1 Hz countdown and the fade-step
//! clock. Everything runs on the single task executing [`Runner::run`], so
//! state is never shared and needs no locks.
//!
//! Timers exist only while they have work. Dropping an interval cancels it,
//! which keeps at most one countdown and one fade clock alive at a time.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::audio::AudioCoordinator;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::session::{format_countdown, SessionConfig, SessionTimer};

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

/// Requests accepted by a running [`Runner`].
#[derive(Debug)]
pub enum Command {
    Start(SessionConfig),
    Stop,
    ToggleStream,
    SetStreamUrl(String),
    Snapshot(oneshot::Sender<Event>),
}

/// Cloneable front door to a [`Runner`].
#[derive(Clone)]
pub struct RunnerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
    shutdown: CancellationToken,
}

impl RunnerHandle {
    /// # Errors
    ///
    /// Returns [`CoreError::RunnerClosed`] if the runner has exited.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::RunnerClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RunnerClosed`] if the runner has exited.
    pub async fn snapshot(&self) -> Result<Event> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| CoreError::RunnerClosed)
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

pub struct Runner {
    session: SessionTimer,
    audio: AudioCoordinator,
    stop_music_after_session: bool,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
    shutdown: CancellationToken,
    countdown: Option<Interval>,
    fade_clock: Option<Interval>,
}

impl Runner {
    pub fn new(audio: AudioCoordinator, stop_music_after_session: bool) -> (Self, RunnerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let shutdown = CancellationToken::new();

        let runner = Self {
            session: SessionTimer::new(),
            audio,
            stop_music_after_session,
            commands: cmd_rx,
            events: event_tx.clone(),
            shutdown: shutdown.clone(),
            countdown: None,
            fade_clock: None,
        };
        let handle = RunnerHandle {
            commands: cmd_tx,
            events: event_tx,
            shutdown,
        };
        (runner, handle)
    }

    /// Run until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!("session runner started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tick(&mut self.countdown) => {
                    let events = self.session.tick();
                    self.dispatch(events);
                }
                _ = tick(&mut self.fade_clock) => {
                    let events = self.audio.advance_fade();
                    self.dispatch(events);
                }
            }
        }
        tracing::debug!("session runner stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start(config) => {
                tracing::info!(
                    gongs = config.gong_count(),
                    interval_secs = config.interval_secs(),
                    "starting session"
                );
                self.countdown = Some(periodic(COUNTDOWN_PERIOD));
                let events = self.session.start(config);
                self.dispatch(events);
            }
            Command::Stop => {
                let events = self.session.stop().into_iter().collect();
                self.dispatch(events);
            }
            Command::ToggleStream => {
                let events = self.audio.toggle_stream();
                self.dispatch(events);
            }
            Command::SetStreamUrl(url) => {
                let events = self.audio.set_stream_url(&url);
                self.dispatch(events);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Apply the audio side effects of `events`, then publish everything.
    fn dispatch(&mut self, events: Vec<Event>) {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            let follow_up = match &event {
                Event::GongFired {
                    gong_index,
                    gong_count,
                    chime,
                    ..
                } => {
                    tracing::info!(gong = gong_index + 1, of = gong_count, ?chime, "gong");
                    self.audio.play_gong(*chime)
                }
                Event::SessionStopped { completed, .. } => {
                    tracing::info!(completed, "session stopped");
                    self.countdown = None;
                    if self.stop_music_after_session {
                        self.audio.fade_out_and_pause()
                    } else {
                        Vec::new()
                    }
                }
                Event::Alert { message, .. } => {
                    tracing::warn!("{message}");
                    Vec::new()
                }
                _ => Vec::new(),
            };
            out.push(event);
            out.extend(follow_up);
        }

        self.sync_fade_clock();
        for event in out {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn sync_fade_clock(&mut self) {
        match (self.audio.is_busy(), self.fade_clock.is_some()) {
            (true, false) => {
                self.fade_clock = Some(periodic(self.audio.settings().step_interval()));
            }
            (false, true) => self.fade_clock = None,
            _ => {}
        }
    }

    fn snapshot(&self) -> Event {
        let state = self.session.state();
        let stream = self.audio.stream_state();
        Event::StateSnapshot {
            running: state.running,
            gong_number: self.session.gong_number(),
            gong_count: self.session.config().map(|c| c.gong_count()).unwrap_or(0),
            remaining_secs: state.remaining_secs,
            countdown: format_countdown(state.remaining_secs),
            stream_playing: stream.playing,
            stream_volume: stream.volume,
            at: Utc::now(),
        }
    }
}

/// An interval whose first tick is one `period` from now.
fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Wait for the next tick, or forever when there is no interval.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
