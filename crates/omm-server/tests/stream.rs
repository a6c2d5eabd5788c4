//! `/stream` endpoint tests.
//!
//! Requests go straight to the router with `oneshot`; no socket is bound.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use omm_server::{router, ServerConfig};
use tower::ServiceExt;

fn sample_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

fn config_with_file(dir: &tempfile::TempDir) -> ServerConfig {
    let path = dir.path().join("music.mp3");
    std::fs::write(&path, sample_bytes()).unwrap();
    ServerConfig {
        audio_file_path: path,
        ..ServerConfig::default()
    }
}

async fn get(config: &ServerConfig, range: Option<&str>) -> Response {
    send(config, Method::GET, range).await
}

async fn send(config: &ServerConfig, method: Method, range: Option<&str>) -> Response {
    let mut request = Request::builder().method(method).uri("/stream");
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }
    router(config)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn full_file_without_range() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_file(&dir);

    let response = get(&config, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("audio/mpeg"));
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), sample_bytes().as_slice());
}

#[tokio::test]
async fn closed_range_returns_partial_content() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_file(&dir);

    let response = get(&config, Some("bytes=0-99")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 0-99/1000")
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("100"));
    assert_eq!(header_str(&response, header::ACCEPT_RANGES), Some("bytes"));
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("audio/mpeg"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), &sample_bytes()[0..100]);
}

#[tokio::test]
async fn open_range_runs_to_end_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_file(&dir);

    let response = get(&config, Some("bytes=900-")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 900-999/1000")
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("100"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), &sample_bytes()[900..]);
}

#[tokio::test]
async fn range_past_end_is_unsatisfiable() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_file(&dir);

    let response = get(&config, Some("bytes=1000-")).await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes */1000")
    );
}

#[tokio::test]
async fn head_returns_headers_without_body() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_file(&dir);

    let response = send(&config, Method::HEAD, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("1000"));
    assert_eq!(header_str(&response, header::CONTENT_TYPE), Some("audio/mpeg"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());

    let response = send(&config, Method::HEAD, Some("bytes=0-99")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        Some("bytes 0-99/1000")
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), Some("100"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        audio_file_path: dir.path().join("absent.mp3"),
        ..ServerConfig::default()
    };

    let response = get(&config, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), b"Audio file not found.");

    let response = get(&config, Some("bytes=0-99")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_paths_are_not_served() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_file(&dir);

    let response = router(&config)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
