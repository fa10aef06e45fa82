//! HTTP API tests against a spawned server.

mod common;

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use common::test_pipeline;
use sahayak::server::run_server_with_pipeline;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a server over a fresh store; returns its base URL.
async fn start_server(tmp: &TempDir) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let pipeline = Arc::new(test_pipeline(tmp.path()));
    let bind = format!("127.0.0.1:{}", port);
    let handle = tokio::spawn(async move {
        run_server_with_pipeline(&bind, pipeline).await.ok();
    });
    wait_for_server(port).await;
    (format!("http://127.0.0.1:{}", port), handle)
}

async fn upload(client: &reqwest::Client, base: &str, name: &str, body: &str) -> Value {
    let part = reqwest::multipart::Part::bytes(body.as_bytes().to_vec()).file_name(name.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = client
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn health_and_root() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("running"));

    handle.abort();
}

#[tokio::test]
async fn empty_knowledge_base_is_400() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({"question": "What is photosynthesis?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "no_knowledge");
    assert_eq!(body["error"]["message"], "No knowledge available");

    let resp = client
        .post(format!("{}/generate/worksheet", base))
        .json(&json!({"difficulty": "Easy"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    handle.abort();
}

#[tokio::test]
async fn upload_then_ask_and_generate() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let body = upload(
        &client,
        &base,
        "biology.txt",
        "Photosynthesis is how plants turn sunlight into chemical energy.",
    )
    .await;
    assert!(body["source_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(tmp.path().join("uploads/biology.txt").exists());

    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({"question": "What is photosynthesis?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let answer = body["answer"].as_str().unwrap();
    assert!(answer.starts_with("ANSWER FROM KNOWLEDGE BASE:"));
    assert!(answer.contains("- Photosynthesis is how plants turn sunlight into chemical energy."));
    assert!(answer.contains("TXT: "));

    let resp = client
        .post(format!("{}/generate", base))
        .json(&json!({"difficulty": "Easy", "mode": "worksheet"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let result = body["result"].as_str().unwrap();
    assert!(result.contains("DIFFICULTY LEVEL: Easy"));
    assert!(result.contains("5 Multiple Choice Questions"));

    let resp = client
        .post(format!("{}/generate/assessment", base))
        .json(&json!({"difficulty": "Hard"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["assessment"].as_str().unwrap().contains("SECTION A"));
    assert!(body.get("result").is_none());

    let resp = client
        .post(format!("{}/generate/worksheet", base))
        .json(&json!({"difficulty": "Medium"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["worksheet"]
        .as_str()
        .unwrap()
        .contains("DIFFICULTY LEVEL: Medium"));
    assert!(body.get("result").is_none());

    let body: Value = client
        .get(format!("{}/sources", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source_type"], "txt");
    assert!(sources[0]["chars"].as_u64().unwrap() > 20);

    handle.abort();
}

#[tokio::test]
async fn bad_requests() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = start_server(&tmp).await;
    let client = reqwest::Client::new();
    upload(&client, &base, "notes.md", "Gravity pulls objects toward each other.").await;

    let resp = client
        .post(format!("{}/generate", base))
        .json(&json!({"difficulty": "Easy", "mode": "quiz"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({"question": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/scrape", base))
        .json(&json!({"url": "not-a-url"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "fetch_failed");

    let form = reqwest::multipart::Form::new().text("other", "value");
    let resp = client
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    handle.abort();
}
