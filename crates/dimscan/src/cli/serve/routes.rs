//! HTTP routes over the job engine.
//!
//! | Method | Path                        | Result                               |
//! |--------|-----------------------------|--------------------------------------|
//! | POST   | `/analyze`                  | `{job_id, status: "started"}`        |
//! | GET    | `/status/{id}`              | job state                            |
//! | POST   | `/cancel/{id}`              | job state after cancellation         |
//! | GET    | `/download/{id}/{kind}`     | CSV artifact (`all`/`matching`/`errors`) |
//! | GET    | `/recent?limit=`            | recent job states, newest first      |
//! | GET    | `/health`                   | `{status, version}`                  |

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dimscan_core::{ArtifactKind, EngineError, JobEngine, JobId, JobSpec, JobState, MatchMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use super::error::{ApiError, ApiResult};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: JobEngine,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/status/{id}", get(status))
        .route("/cancel/{id}", post(cancel))
        .route("/download/{id}/{kind}", get(download))
        .route("/recent", get(recent))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body of `POST /analyze`. Omitted fields fall back to the scan defaults.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub directory: Option<String>,
    pub dimension: Option<u32>,
    pub mode: Option<String>,
    pub workers: Option<usize>,
    pub emit_filtered: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub job_id: JobId,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// POST /analyze
async fn analyze(
    State(state): State<AppState>,
    input: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(input) = input.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let directory = input
        .directory
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No directory specified".to_string()))?;
    let directory = PathBuf::from(shellexpand::tilde(directory.trim()).into_owned());

    let mut spec = JobSpec::new(directory, &state.engine.config().scan);
    if let Some(dimension) = input.dimension {
        spec.target_dimension = dimension;
    }
    if let Some(mode) = input.mode {
        spec.mode = MatchMode::parse(&mode)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown mode: {mode}")))?;
    }
    if let Some(workers) = input.workers {
        spec.worker_count = workers;
    }
    if let Some(emit_filtered) = input.emit_filtered {
        spec.emit_filtered = emit_filtered;
    }

    let job_id = state.engine.submit(spec)?;
    tracing::info!(%job_id, "Analysis started");

    Ok(Json(AnalyzeResponse {
        job_id,
        status: "started".to_string(),
    }))
}

/// GET /status/{id}
async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobState>> {
    Ok(Json(state.engine.status(&parse_id(&id)?)?))
}

/// POST /cancel/{id}
async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobState>> {
    Ok(Json(state.engine.cancel(&parse_id(&id)?)?))
}

/// GET /download/{id}/{kind}
async fn download(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind = ArtifactKind::parse(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown artifact type: {kind}")))?;
    let artifact = state.engine.artifacts(&parse_id(&id)?, kind)?;

    let file = artifact.open().map_err(EngineError::from)?;
    let length = file.metadata().map_err(EngineError::from)?.len();
    let stream = ReaderStream::new(tokio::fs::File::from_std(file));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name()),
            ),
        ],
        Body::from_stream(stream),
    ))
}

/// GET /recent?limit=
async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<JobState>> {
    Json(state.engine.recent(query.limit.unwrap_or(10)))
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: dimscan_core::VERSION,
    })
}

/// Unparseable ids name no job.
fn parse_id(id: &str) -> ApiResult<JobId> {
    id.parse()
        .map_err(|_| ApiError::Engine(EngineError::NotFound(id.to_string())))
}
