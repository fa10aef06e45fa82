//! Website ingestion against a local HTTP server.

mod common;

use axum::{http::StatusCode, response::Html, routing::get, Router};
use tempfile::TempDir;

use common::test_pipeline;
use sahayak::models::SourceType;
use sahayak::pipeline::PipelineError;
use sahayak::scrape::ScrapeError;

const LESSON_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Water cycle</title>
  <meta charset="utf-8">
  <style>.hidden { display: none; }</style>
  <script>window.trackingId = "abc123";</script>
</head>
<body>
  <h1>The water cycle</h1>
  <p>Water evaporates from oceans and lakes.</p>
  <p>Vapour condenses into   clouds and falls as rain.</p>
  <noscript>Please enable JavaScript.</noscript>
</body>
</html>"#;

/// Serve fixture pages on an ephemeral port; returns the base URL.
async fn spawn_site() -> String {
    let app = Router::new()
        .route("/lesson", get(|| async { Html(LESSON_PAGE) }))
        .route("/tiny", get(|| async { Html("<p>Hi</p>") }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn page_text_excludes_scripts_and_styles() {
    let base = spawn_site().await;
    let tmp = TempDir::new().unwrap();
    let pipeline = test_pipeline(tmp.path());

    let url = format!("{}/lesson", base);
    let record = pipeline.ingest_url(&url).await.unwrap();
    assert_eq!(record.source_type, SourceType::Website);
    assert_eq!(record.source_path, url);
    assert_eq!(
        record.content,
        "Water cycle The water cycle Water evaporates from oceans and lakes. \
         Vapour condenses into clouds and falls as rain."
    );
    assert!(!record.content.contains("trackingId"));
    assert!(!record.content.contains("display"));
    assert!(!record.content.contains("JavaScript"));
    assert_eq!(pipeline.records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn server_error_is_a_fetch_error() {
    let base = spawn_site().await;
    let tmp = TempDir::new().unwrap();
    let pipeline = test_pipeline(tmp.path());

    let err = pipeline
        .ingest_url(&format!("{}/broken", base))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Fetch(ScrapeError::Status { status: 500, .. })
    ));
    assert!(pipeline.records().await.unwrap().is_empty());
}

#[tokio::test]
async fn near_empty_page_stores_sentinel() {
    let base = spawn_site().await;
    let tmp = TempDir::new().unwrap();
    let pipeline = test_pipeline(tmp.path());

    let record = pipeline
        .ingest_url(&format!("{}/tiny", base))
        .await
        .unwrap();
    assert_eq!(
        record.content,
        "No readable educational content could be extracted."
    );
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let tmp = TempDir::new().unwrap();
    let pipeline = test_pipeline(tmp.path());

    let err = pipeline
        .ingest_url(&format!("http://127.0.0.1:{}/", port))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(ScrapeError::Request(_))));
}
