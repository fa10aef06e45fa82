//! HTTP API over the [`Pipeline`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/upload` | Multipart upload (field `file`), extracted and stored |
//! | `POST` | `/scrape` | `{"url"}`: fetch a page and store its text |
//! | `POST` | `/ask` | `{"question"}`: answer from the knowledge base |
//! | `POST` | `/generate` | `{"difficulty", "mode"}` → `{"result"}` |
//! | `POST` | `/generate/worksheet` | `{"difficulty"}` → `{"worksheet"}` |
//! | `POST` | `/generate/assessment` | `{"difficulty"}` → `{"assessment"}` |
//! | `GET`  | `/sources` | Ingested records (without content) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_knowledge", "message": "No knowledge available" } }
//! ```
//!
//! Error codes: `no_knowledge` (400), `fetch_failed` (400), `bad_request` (400),
//! `internal` (500). Generation failures are not errors: the result text
//! carries a placeholder instead.
//!
//! All origins, methods, and headers are permitted (CORS).

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::models::{AskResponse, GenerateResponse, Mode};
use crate::pipeline::{Pipeline, PipelineError};

/// Uploaded documents larger than this are rejected.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Build a pipeline from `config` and serve it on `[server].bind`.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pipeline = Arc::new(Pipeline::from_config(config)?);
    run_server_with_pipeline(&bind_addr, pipeline).await
}

/// Serve an existing pipeline until the process is terminated.
pub async fn run_server_with_pipeline(bind_addr: &str, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let app = router(pipeline);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Sahayak API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/scrape", post(handle_scrape))
        .route("/ask", post(handle_ask))
        .route("/generate", post(handle_generate))
        .route("/generate/worksheet", post(handle_generate_worksheet))
        .route("/generate/assessment", post(handle_generate_assessment))
        .route("/sources", get(handle_sources))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let (status, code) = match &err {
            PipelineError::EmptyKnowledgeBase => (StatusCode::BAD_REQUEST, "no_knowledge"),
            PipelineError::Fetch(_) => (StatusCode::BAD_REQUEST, "fetch_failed"),
            PipelineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            PipelineError::Store(_) | PipelineError::Embedding(_) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET / and /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Sahayak educational RAG API is running" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Ingestion ============

#[derive(Serialize)]
struct IngestResponse {
    message: String,
    source_id: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request("upload is missing a file name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;

        let record = state.pipeline.ingest_upload(&filename, &bytes).await?;
        return Ok(Json(IngestResponse {
            message: format!("{} uploaded and processed successfully", filename),
            source_id: record.source_id,
        }));
    }
    Err(bad_request("multipart field 'file' is required"))
}

#[derive(Deserialize)]
struct ScrapeRequest {
    url: String,
}

async fn handle_scrape(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    if req.url.trim().is_empty() {
        return Err(bad_request("url must not be empty"));
    }
    let record = state.pipeline.ingest_url(&req.url).await?;
    Ok(Json(IngestResponse {
        message: format!("{} scraped and stored successfully", record.source_path),
        source_id: record.source_id,
    }))
}

// ============ Question answering and generation ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    Ok(Json(state.pipeline.ask(&req.question).await?))
}

#[derive(Deserialize)]
struct GenerateRequest {
    difficulty: String,
    mode: String,
}

#[derive(Deserialize)]
struct DifficultyRequest {
    difficulty: String,
}

async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let mode: Mode = req.mode.parse().map_err(bad_request)?;
    Ok(Json(state.pipeline.generate(&req.difficulty, mode).await?))
}

#[derive(Serialize)]
struct WorksheetResponse {
    worksheet: String,
}

#[derive(Serialize)]
struct AssessmentResponse {
    assessment: String,
}

async fn handle_generate_worksheet(
    State(state): State<AppState>,
    Json(req): Json<DifficultyRequest>,
) -> Result<Json<WorksheetResponse>, AppError> {
    let generated = state
        .pipeline
        .generate(&req.difficulty, Mode::Worksheet)
        .await?;
    Ok(Json(WorksheetResponse {
        worksheet: generated.result,
    }))
}

async fn handle_generate_assessment(
    State(state): State<AppState>,
    Json(req): Json<DifficultyRequest>,
) -> Result<Json<AssessmentResponse>, AppError> {
    let generated = state
        .pipeline
        .generate(&req.difficulty, Mode::Assessment)
        .await?;
    Ok(Json(AssessmentResponse {
        assessment: generated.result,
    }))
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourceSummary {
    source_id: String,
    source_type: String,
    source_path: String,
    chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    ingested_at: Option<String>,
}

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceSummary>,
}

async fn handle_sources(State(state): State<AppState>) -> Result<Json<SourcesResponse>, AppError> {
    let records = state.pipeline.records().await?;
    let sources = records
        .into_iter()
        .map(|r| SourceSummary {
            chars: r.content.chars().count(),
            source_type: r.source_type.to_string(),
            ingested_at: r.ingested_at.map(|t| t.to_rfc3339()),
            source_id: r.source_id,
            source_path: r.source_path,
        })
        .collect();
    Ok(Json(SourcesResponse { sources }))
}
