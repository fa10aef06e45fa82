//! Stub embedders and generators shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use sahayak::config::Config;
use sahayak::embedding::Embedder;
use sahayak::generate::{GenerationError, Generator};
use sahayak::pipeline::Pipeline;

/// Topic words the test embedder recognizes.
pub const TOPICS: &[&str] = &["photosynthesis", "mitochondria", "revolution", "gravity"];
pub const DIMS: usize = TOPICS.len() + 1;

/// Embeds a text as the count of each topic word it mentions, plus a
/// constant component so no vector is zero.
pub struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    fn model_name(&self) -> &str {
        "topic-test"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let mut v: Vec<f32> = TOPICS
                    .iter()
                    .map(|topic| lower.matches(topic).count() as f32)
                    .collect();
                v.push(1.0);
                v
            })
            .collect())
    }
}

/// Fails the test if any embedding is requested.
pub struct PanickingEmbedder;

#[async_trait]
impl Embedder for PanickingEmbedder {
    fn model_name(&self) -> &str {
        "panicking"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        panic!("embedder must not be called");
    }
}

/// Returns the prompt it was given.
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }
    async fn complete(&self, prompt: &str, _max_tokens: usize) -> Result<String, GenerationError> {
        Ok(prompt.to_string())
    }
}

pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::minimal();
    config.store.path = dir.join("data").join("knowledge.json");
    config.store.uploads_dir = dir.join("uploads");
    config.embedding.provider = "disabled".to_string();
    config
}

pub fn test_pipeline(dir: &Path) -> Pipeline {
    Pipeline::new(
        test_config(dir),
        Arc::new(TopicEmbedder),
        Arc::new(EchoGenerator),
    )
    .unwrap()
}
