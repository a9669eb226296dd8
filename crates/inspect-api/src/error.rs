//! API error types with JSON bodies.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use inspect_agents::AgentError;
use inspect_out::RenderError;
use inspect_store::FailureKind;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Agent failed: {0}")]
    Agent(#[from] AgentError),
    #[error("Export failed: {0}")]
    Render(#[from] RenderError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Render(RenderError::Format(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Agent(_) => StatusCode::BAD_GATEWAY,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}

/// HTTP status for a failed store operation.
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
