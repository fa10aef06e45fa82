//! The ingestion / retrieval / generation pipeline.
//!
//! One [`Pipeline`] owns the knowledge store and shares a single embedder and
//! generator across all requests. The HTTP server and the CLI are thin
//! wrappers around its methods.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::chunk::chunk_records;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::extract;
use crate::generate::{create_generator, generate_text, Generator};
use crate::models::{AskResponse, Chunk, GenerateResponse, Mode, SourceRecord};
use crate::prompt::{build_prompt, select_excerpt};
use crate::retrieve::answer_question;
use crate::scan::scan_dir;
use crate::scrape::{fetch_page, scrape_client, ScrapeError};
use crate::store::KnowledgeStore;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No knowledge available")]
    EmptyKnowledgeBase,
    #[error("failed to fetch page: {0}")]
    Fetch(#[from] ScrapeError),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("knowledge store error: {0:#}")]
    Store(anyhow::Error),
    #[error("embedding error: {0:#}")]
    Embedding(anyhow::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

pub struct Pipeline {
    config: Arc<Config>,
    store: KnowledgeStore,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    http: reqwest::Client,
}

impl Pipeline {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> anyhow::Result<Self> {
        let http = scrape_client(&config.scrape)?;
        Ok(Self {
            store: KnowledgeStore::new(config.store.path.clone()),
            config: Arc::new(config),
            embedder,
            generator,
            http,
        })
    }

    /// Build a pipeline with the embedder and generator named in `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        info!(
            embedder = embedder.model_name(),
            generator = generator.name(),
            store = %config.store.path.display(),
            "pipeline ready"
        );
        Self::new(config, embedder, generator)
    }

    pub async fn records(&self) -> PipelineResult<Vec<SourceRecord>> {
        self.store.load().await.map_err(PipelineError::Store)
    }

    /// Extract a local file and append it to the store.
    pub async fn ingest_file(&self, path: &Path) -> PipelineResult<SourceRecord> {
        let record = extract_blocking(path.to_path_buf()).await?;
        self.store
            .append(record.clone())
            .await
            .map_err(PipelineError::Store)?;
        info!(path = %record.source_path, source_type = %record.source_type, "ingested file");
        Ok(record)
    }

    /// Save uploaded bytes under the uploads directory, then ingest them.
    ///
    /// Only the final component of `filename` is used.
    pub async fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> PipelineResult<SourceRecord> {
        let name = Path::new(filename)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                PipelineError::InvalidRequest(format!("invalid upload file name '{}'", filename))
            })?;
        let dir = &self.config.store.uploads_dir;
        let dest = dir.join(name);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create uploads directory: {}", dir.display()))
            .map_err(PipelineError::Store)?;
        tokio::fs::write(&dest, bytes)
            .await
            .with_context(|| format!("Failed to save upload: {}", dest.display()))
            .map_err(PipelineError::Store)?;
        self.ingest_file(&dest).await
    }

    /// Ingest every selected file under `root`, in sorted order, with one
    /// store rewrite.
    pub async fn ingest_dir(&self, root: &Path) -> PipelineResult<Vec<SourceRecord>> {
        let files = scan_dir(root, &self.config.ingest)
            .map_err(|e| PipelineError::InvalidRequest(format!("{:#}", e)))?;
        let mut records = Vec::with_capacity(files.len());
        for path in files {
            records.push(extract_blocking(path).await?);
        }
        self.store
            .append_all(records.clone())
            .await
            .map_err(PipelineError::Store)?;
        info!(root = %root.display(), files = records.len(), "ingested directory");
        Ok(records)
    }

    /// Fetch a web page and append its text to the store.
    pub async fn ingest_url(&self, url: &str) -> PipelineResult<SourceRecord> {
        let record = fetch_page(&self.http, url.trim()).await?;
        self.store
            .append(record.clone())
            .await
            .map_err(PipelineError::Store)?;
        Ok(record)
    }

    /// Answer a question from the nearest knowledge chunks.
    pub async fn ask(&self, question: &str) -> PipelineResult<AskResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        let chunks = self.load_chunks().await?;
        let retrieval = &self.config.retrieval;
        let answer = answer_question(
            self.embedder.as_ref(),
            question,
            &chunks,
            retrieval.top_k,
            retrieval.max_sentences,
        )
        .await
        .map_err(PipelineError::Embedding)?;
        Ok(AskResponse { answer })
    }

    /// Generate a worksheet or assessment grounded in the leading chunks.
    ///
    /// Generator failures come back as placeholder text, not errors.
    pub async fn generate(&self, difficulty: &str, mode: Mode) -> PipelineResult<GenerateResponse> {
        let chunks = self.load_chunks().await?;
        let generation = &self.config.generation;
        let excerpt = select_excerpt(&chunks, generation.excerpt_chunks);
        let prompt = build_prompt(&excerpt, difficulty, mode);
        info!(%mode, difficulty, generator = self.generator.name(), "generating");
        let result = generate_text(self.generator.as_ref(), &prompt, generation.max_tokens).await;
        Ok(GenerateResponse { result })
    }

    async fn load_chunks(&self) -> PipelineResult<Vec<Chunk>> {
        let records = self.records().await?;
        let chunks = chunk_records(&records, self.config.chunking.max_chars);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyKnowledgeBase);
        }
        Ok(chunks)
    }
}

/// Run file extraction off the async runtime.
async fn extract_blocking(path: PathBuf) -> PipelineResult<SourceRecord> {
    tokio::task::spawn_blocking(move || extract::ingest_file(&path))
        .await
        .map_err(|e| PipelineError::Store(anyhow::anyhow!("extraction task failed: {}", e)))
}
