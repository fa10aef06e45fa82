//! Text-completion backends.
//!
//! The pipeline depends only on the [`Generator`] trait; which backend is
//! active is decided once by [`create_generator`]:
//!
//! | `generation.provider` | Backend |
//! |-----------------------|---------|
//! | `"disabled"` | [`DisabledGenerator`]: always unavailable |
//! | `"openai"` | [`OpenAIGenerator`]: chat-completions API (remote) |
//! | `"local"` | [`LocalGenerator`]: llama.cpp-compatible `/completion` server |
//!
//! Generation is best-effort. [`generate_text`] turns every failure into a
//! tagged placeholder string so callers always get a response body.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GenerationConfig;

/// Turn markers of the local model's chat format.
pub const START_OF_TURN: &str = "<start_of_turn>";
pub const END_OF_TURN: &str = "<end_of_turn>";
/// Generation stops at the first of these in the output.
pub const STOP_SEQUENCES: &[&str] = &[END_OF_TURN, "User:", "System:"];

/// Placeholder prefix when no backend can serve the request.
pub const MODEL_NOT_LOADED_TAG: &str = "[MODEL NOT LOADED]";
/// Placeholder prefix when the backend failed mid-request.
pub const GENERATION_FAILED_TAG: &str = "Generation failed:";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// No model is configured or reachable.
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String, GenerationError>;
}

/// Run a completion, converting any failure into a tagged placeholder.
pub async fn generate_text(generator: &dyn Generator, prompt: &str, max_tokens: usize) -> String {
    match generator.complete(prompt, max_tokens).await {
        Ok(text) => text,
        Err(GenerationError::Unavailable(detail)) => {
            warn!(backend = generator.name(), %detail, "generation backend unavailable");
            format!("{} {}", MODEL_NOT_LOADED_TAG, detail)
        }
        Err(GenerationError::Backend(message)) => {
            warn!(backend = generator.name(), error = %message, "generation failed");
            format!("{} {}", GENERATION_FAILED_TAG, message)
        }
    }
}

pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "local" => Ok(Arc::new(LocalGenerator::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

// ============ Disabled ============

pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str, _max_tokens: usize) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable(
            "generation provider is disabled; set [generation].provider in the config".to_string(),
        ))
    }
}

// ============ OpenAI ============

/// Remote chat-completions backend (`POST {url}/chat/completions`).
///
/// Works with the OpenAI API and compatible gateways. The API key is read
/// from `OPENAI_API_KEY` when the generator is created; a missing key makes
/// every call report the model as unavailable.
pub struct OpenAIGenerator {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    top_p: f32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            temperature: config.temperature,
            top_p: config.top_p,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Unavailable("OPENAI_API_KEY not set".to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        });
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, %url, "requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!(
                "OpenAI API error {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;
        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| GenerationError::Backend("response has no message content".to_string()))
}

// ============ Local (llama.cpp server) ============

/// Locally hosted quantized model behind a llama.cpp-compatible server
/// (`POST {url}/completion`).
///
/// The prompt is wrapped in the model's turn markers, and output is cut at
/// the end-of-turn marker or a literal `User:` / `System:`. A server that
/// refuses the connection is reported as "model not loaded".
pub struct LocalGenerator {
    url: String,
    temperature: f32,
    top_p: f32,
    client: reqwest::Client,
}

impl LocalGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            temperature: config.temperature,
            top_p: config.top_p,
            client: http_client(config.timeout_secs)?,
        })
    }
}

/// Wrap a prompt as a single user turn followed by an open model turn.
pub fn frame_turn(prompt: &str) -> String {
    format!(
        "{START_OF_TURN}user\n{prompt}{END_OF_TURN}\n{START_OF_TURN}model\n"
    )
}

/// Cut `output` at the first stop sequence and trim it.
pub fn truncate_at_stop(output: &str) -> &str {
    let cut = STOP_SEQUENCES
        .iter()
        .filter_map(|stop| output.find(stop))
        .min()
        .unwrap_or(output.len());
    output[..cut].trim()
}

#[async_trait]
impl Generator for LocalGenerator {
    fn name(&self) -> &str {
        "local"
    }

    async fn complete(&self, prompt: &str, max_tokens: usize) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "prompt": frame_turn(prompt),
            "n_predict": max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "stop": STOP_SEQUENCES,
        });
        let url = format!("{}/completion", self.url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Unavailable(format!("no local model server at {}", self.url))
                } else {
                    GenerationError::Backend(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(GenerationError::Unavailable(format!(
                "local model at {} is still loading",
                self.url
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!(
                "local server error {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;
        let content = json
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| GenerationError::Backend("response has no content".to_string()))?;
        Ok(truncate_at_stop(content).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Generator for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _: &str, _: usize) -> Result<String, GenerationError> {
            Err(GenerationError::Backend("out of memory".into()))
        }
    }

    #[test]
    fn frames_prompt_in_turn_markers() {
        assert_eq!(
            frame_turn("Explain osmosis."),
            "<start_of_turn>user\nExplain osmosis.<end_of_turn>\n<start_of_turn>model\n"
        );
    }

    #[test]
    fn truncates_at_earliest_stop() {
        assert_eq!(truncate_at_stop("  Answer here. User: more"), "Answer here.");
        assert_eq!(
            truncate_at_stop("Q1 ...<end_of_turn>System: x"),
            "Q1 ..."
        );
        assert_eq!(truncate_at_stop("no stops "), "no stops");
    }

    #[tokio::test]
    async fn disabled_yields_placeholder() {
        let text = generate_text(&DisabledGenerator, "prompt", 10).await;
        assert!(text.starts_with(MODEL_NOT_LOADED_TAG));
    }

    #[tokio::test]
    async fn backend_error_yields_tagged_failure() {
        let text = generate_text(&Failing, "prompt", 10).await;
        assert_eq!(text, "Generation failed: out of memory");
    }

    #[tokio::test]
    async fn unreachable_local_server_is_unavailable() {
        // Port 9 (discard) on localhost is closed on test machines.
        let config = GenerationConfig {
            provider: "local".into(),
            url: Some("http://127.0.0.1:9".into()),
            ..GenerationConfig::default()
        };
        let generator = LocalGenerator::new(&config).unwrap();
        let err = generator.complete("hi", 5).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    #[test]
    fn parses_chat_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": " Worksheet \n" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Worksheet");
        assert!(parse_chat_response(&serde_json::json!({})).is_err());
    }
}
