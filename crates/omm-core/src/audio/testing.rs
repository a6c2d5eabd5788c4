//! Recording fakes for coordinator and runtime tests.

use std::sync::{Arc, Mutex};

use url::Url;

use super::{ChimeKind, ChimePlayer, StreamPlayer};
use crate::error::AudioError;

/// Shared log of everything the fake players were asked to do.
#[derive(Debug, Clone, Default)]
pub struct PlayLog(Arc<Mutex<Vec<String>>>);

impl PlayLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

pub struct FakeChime {
    kind: ChimeKind,
    log: PlayLog,
}

impl FakeChime {
    pub fn boxed(kind: ChimeKind, log: &PlayLog) -> Box<dyn ChimePlayer> {
        Box::new(Self {
            kind,
            log: log.clone(),
        })
    }
}

impl ChimePlayer for FakeChime {
    fn rewind_and_play(&mut self) -> Result<(), AudioError> {
        self.log.push(match self.kind {
            ChimeKind::Regular => "chime:regular",
            ChimeKind::Final => "chime:final",
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeStreamState {
    pub url: Option<Url>,
    pub playing: bool,
    pub volume: f32,
}

pub struct FakeStream {
    pub state: Arc<Mutex<FakeStreamState>>,
    log: PlayLog,
}

impl FakeStream {
    pub fn new(log: &PlayLog) -> (Self, Arc<Mutex<FakeStreamState>>) {
        let state = Arc::new(Mutex::new(FakeStreamState {
            volume: 1.0,
            ..Default::default()
        }));
        (
            Self {
                state: state.clone(),
                log: log.clone(),
            },
            state,
        )
    }
}

impl StreamPlayer for FakeStream {
    fn load(&mut self, url: &Url) -> Result<(), AudioError> {
        self.state.lock().unwrap().url = Some(url.clone());
        self.log.push("stream:load");
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        if state.url.is_none() {
            return Err(AudioError::NoStream);
        }
        state.playing = true;
        self.log.push("stream:play");
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
        self.log.push("stream:pause");
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}
