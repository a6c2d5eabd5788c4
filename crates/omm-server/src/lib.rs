//! # Omm Stream Server
//!
//! Serves one audio file at `/stream`, honoring single byte-range requests so
//! a player can seek and resume.
//!
//! | Request | Response |
//! |---------|----------|
//! | no `Range` | `200`, full file |
//! | `Range: bytes=start-end` | `206` with `Content-Range` |
//! | unsatisfiable range | `416` with `Content-Range: bytes */size` |
//! | file missing | `404` |
//!
//! The file is re-read on every request; nothing is cached.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUDIO_FILE: &str = "audio/music.mp3";
const AUDIO_MIME: &str = "audio/mpeg";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Server terminated: {0}")]
    Serve(#[source] std::io::Error),
}

/// Where to listen and what to serve.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub audio_file_path: PathBuf,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            audio_file_path: PathBuf::from(DEFAULT_AUDIO_FILE),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Read `AUDIO_FILE_PATH` and `OMM_SERVER_PORT`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidEnv`] if `OMM_SERVER_PORT` is not a valid port.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_vars(
            std::env::var("AUDIO_FILE_PATH").ok(),
            std::env::var("OMM_SERVER_PORT").ok(),
        )
    }

    fn from_vars(path: Option<String>, port: Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            config.audio_file_path = PathBuf::from(path);
        }
        if let Some(port) = port {
            config.port = port.parse().map_err(|_| ServerError::InvalidEnv {
                var: "OMM_SERVER_PORT",
                value: port,
            })?;
        }
        Ok(config)
    }
}

#[derive(Clone)]
struct AppState {
    audio_file_path: Arc<PathBuf>,
}

/// Build the router serving `/stream`.
pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        audio_file_path: Arc::new(config.audio_file_path.clone()),
    };
    Router::new()
        .route("/stream", get(stream_audio))
        .with_state(state)
}

/// Bind on all interfaces and serve until the process exits.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the port cannot be bound, or
/// [`ServerError::Serve`] if the accept loop fails.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!("Server listening on port {}", config.port);
    tracing::info!("Serving audio from: {}", config.audio_file_path.display());

    axum::serve(listener, router(&config))
        .await
        .map_err(ServerError::Serve)
}

async fn stream_audio(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let path = state.audio_file_path.as_path();
    let range_header = headers.get(RANGE).and_then(|v| v.to_str().ok());
    tracing::debug!(range = ?range_header, "stream request");

    let len = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => {
            tracing::error!("Audio file not found at: {}", path.display());
            return (StatusCode::NOT_FOUND, "Audio file not found.").into_response();
        }
    };

    let range = match range_header {
        None => None,
        Some(header) => match parse_range(header, len) {
            Some(range) => Some(range),
            None => {
                tracing::debug!(header, len, "unsatisfiable range");
                let mut out = HeaderMap::new();
                out.insert(CONTENT_RANGE, header_value(format!("bytes */{len}")));
                return (StatusCode::RANGE_NOT_SATISFIABLE, out).into_response();
            }
        },
    };

    let (status, start, to_send) = match range {
        Some((start, end)) => (StatusCode::PARTIAL_CONTENT, start, end - start + 1),
        None => (StatusCode::OK, 0, len),
    };

    let mut out = HeaderMap::new();
    out.insert(CONTENT_TYPE, HeaderValue::from_static(AUDIO_MIME));
    out.insert(CONTENT_LENGTH, header_value(to_send.to_string()));
    if let Some((start, end)) = range {
        out.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        out.insert(
            CONTENT_RANGE,
            header_value(format!("bytes {start}-{end}/{len}")),
        );
    }

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Audio file not readable at {}: {e}", path.display());
            return (StatusCode::NOT_FOUND, "Audio file not found.").into_response();
        }
    };
    if start > 0 {
        if let Err(e) = file.seek(std::io::SeekFrom::Start(start)).await {
            tracing::error!("seek to {start} failed: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "seek failed").into_response();
        }
    }

    let body = Body::from_stream(ReaderStream::new(file.take(to_send)));
    (status, out, body).into_response()
}

fn header_value(s: String) -> HeaderValue {
    HeaderValue::from_str(&s).unwrap_or(HeaderValue::from_static("bytes */0"))
}

/// Parse a single `bytes=` range against a file of `len` bytes.
///
/// Accepts `start-end`, `start-` and `-suffix`. The end is clamped to the
/// last byte. Returns `None` for multiple ranges, malformed input, or a range
/// that selects nothing.
fn parse_range(header: &str, len: u64) -> Option<(u64, u64)> {
    let rest = header.trim().strip_prefix("bytes=")?;
    if rest.contains(',') || len == 0 {
        return None;
    }
    let (a, b) = rest.split_once('-')?;
    let (a, b) = (a.trim(), b.trim());
    let last = len - 1;

    if a.is_empty() {
        let suffix: u64 = b.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        return Some((len.saturating_sub(suffix), last));
    }

    let start: u64 = a.parse().ok()?;
    if start > last {
        return None;
    }
    if b.is_empty() {
        return Some((start, last));
    }

    let end: u64 = b.parse::<u64>().ok()?.min(last);
    if end < start {
        return None;
    }
    Some((start, end))
}
