//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dimscan_core::EngineError;
use serde_json::json;

/// Error type for HTTP handlers.
///
/// Renders as `{"error": <message>, "code": <CODE>}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An error from the job engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A malformed request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Engine(engine) => match engine {
                EngineError::InvalidSpec(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_SPEC", msg.clone())
                }
                EngineError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", engine.to_string())
                }
                EngineError::NotReady { .. } => {
                    (StatusCode::CONFLICT, "NOT_READY", engine.to_string())
                }
                EngineError::NotProduced { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_PRODUCED", engine.to_string())
                }
                EngineError::Io(e) => {
                    tracing::error!(error = %e, "Artifact I/O error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
