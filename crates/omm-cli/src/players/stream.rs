//! Background stream over HTTP.
//!
//! Pulls the configured URL on a background task. Decoding and audio output
//! are not handled here; the player tracks its byte position so a resume
//! continues with a `Range` request where the last pull stopped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use omm_core::{AudioError, StreamPlayer};
use reqwest::header::RANGE;
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A spawned pull. The stream counts as playing until its task finishes.
struct Pull {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct HttpStream {
    client: reqwest::Client,
    url: Option<Url>,
    volume: f32,
    position: Arc<AtomicU64>,
    pull: Option<Pull>,
}

impl HttpStream {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
            volume: 1.0,
            position: Arc::new(AtomicU64::new(0)),
            pull: None,
        }
    }

    fn stop_pull(&mut self) {
        if let Some(pull) = self.pull.take() {
            pull.cancel.cancel();
        }
    }
}

impl Default for HttpStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HttpStream {
    fn drop(&mut self) {
        self.stop_pull();
    }
}

impl StreamPlayer for HttpStream {
    fn load(&mut self, url: &Url) -> Result<(), AudioError> {
        let was_playing = self.is_playing();
        self.stop_pull();
        self.position.store(0, Ordering::Relaxed);
        self.url = Some(url.clone());
        if was_playing {
            self.play()?;
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if self.is_playing() {
            return Ok(());
        }
        let url = self.url.clone().ok_or(AudioError::NoStream)?;
        self.stop_pull();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pull(
            self.client.clone(),
            url,
            self.position.clone(),
            cancel.clone(),
        ));
        self.pull = Some(Pull { cancel, task });
        Ok(())
    }

    fn pause(&mut self) {
        self.stop_pull();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn is_playing(&self) -> bool {
        self.pull.as_ref().is_some_and(|pull| !pull.task.is_finished())
    }
}

async fn pull(client: reqwest::Client, url: Url, position: Arc<AtomicU64>, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!(position = position.load(Ordering::Relaxed), "stream pull paused");
        }
        result = pull_body(&client, &url, &position) => {
            if let Err(e) = result {
                tracing::warn!(%url, "stream pull failed: {e}");
            }
        }
    }
}

async fn pull_body(
    client: &reqwest::Client,
    url: &Url,
    position: &AtomicU64,
) -> Result<(), reqwest::Error> {
    loop {
        let offset = position.load(Ordering::Relaxed);
        let mut request = client.get(url.clone());
        if let Some(range) = range_from(offset) {
            request = request.header(RANGE, range);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE && offset > 0 {
            tracing::info!("stream already at end, rewinding");
            position.store(0, Ordering::Relaxed);
            continue;
        }
        let mut response = response.error_for_status()?;
        if response.status() != StatusCode::PARTIAL_CONTENT {
            // Full body: the server ignored or was not sent a range.
            position.store(0, Ordering::Relaxed);
        }

        while let Some(chunk) = response.chunk().await? {
            position.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }
        tracing::info!(bytes = position.load(Ordering::Relaxed), "stream reached end");
        return Ok(());
    }
}

/// `Range` header resuming at `offset`, or `None` from the start.
fn range_from(offset: u64) -> Option<String> {
    (offset > 0).then(|| format!("bytes={offset}-"))
}
