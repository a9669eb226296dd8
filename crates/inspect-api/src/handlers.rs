//! REST handlers
use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use inspect_out::ExportFormat;
use inspect_store::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{status_for, ApiError};
use crate::state::{AppState, SessionKey};

/// File name the latest uploaded camera frame is stored under.
pub const CURRENT_FRAME: &str = "current_frame.jpg";

fn default_user() -> String {
    "default_user".to_string()
}

fn default_session() -> String {
    "current_inspection".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default = "default_user")]
    pub user_id: String,
    #[serde(default = "default_session")]
    pub session_id: String,
    pub text: String,
}

impl ChatRequest {
    fn key(&self) -> SessionKey {
        SessionKey::new(self.user_id.clone(), self.session_id.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub updates: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Map a store outcome onto a JSON response, picking the status from the
/// failure kind.
fn outcome_response<T: Serialize>(outcome: Outcome<T>) -> Response {
    let status = outcome.kind().map(status_for).unwrap_or(StatusCode::OK);
    (status, Json(outcome)).into_response()
}

fn require_text(text: &str) -> Result<&str, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    Ok(text)
}

// ============================================================================
// Agents
// ============================================================================

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = require_text(&request.text)?;
    let session = state
        .generators
        .get_or_create(request.key(), || state.new_generator())
        .await;

    let turn = session.lock().await.handle(text).await?;
    state.metrics.record_turn("generator");
    if let Some(saved) = &turn.saved {
        state.metrics.record_save(saved);
    }

    let mut body = json!({
        "status": "success",
        "message": turn.message,
        "session_id": request.session_id,
    });
    if let Some(saved) = turn.saved {
        body["saved"] = serde_json::to_value(saved)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }
    Ok(Json(body))
}

pub async fn review(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = require_text(&request.text)?;
    let session = state
        .reviewers
        .get_or_create(request.key(), || state.new_reviewer())
        .await;

    let turn = session.lock().await.handle(text).await?;
    state.metrics.record_turn("reviewer");
    tracing::debug!(tools = ?turn.tools_used, "Review turn finished");

    Ok(Json(json!({
        "status": "success",
        "analysis": turn.analysis,
        "session_id": request.session_id,
    })))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let key = SessionKey::new(user_id, session_id);
    let generator = state.generators.remove(&key).await;
    let reviewer = state.reviewers.remove(&key).await;

    if generator || reviewer {
        tracing::info!(user_id = %key.user_id, session_id = %key.session_id, "Session closed");
        (StatusCode::OK, Json(json!({ "status": "deleted" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": "No such session" })),
        )
    }
}

// ============================================================================
// Reports
// ============================================================================

pub async fn save_report(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let outcome = state.reports.save(&payload);
    state.metrics.record_save(&outcome);
    outcome_response(outcome)
}

pub async fn history(State(state): State<AppState>, Path(serial): Path<String>) -> Response {
    outcome_response(state.reports.history(&serial))
}

pub async fn update_report(
    State(state): State<AppState>,
    Path((serial, timestamp)): Path<(String, String)>,
    Json(request): Json<UpdateRequest>,
) -> Response {
    outcome_response(state.reports.update(&serial, &timestamp, &request.updates))
}

pub async fn export_latest(
    State(state): State<AppState>,
    Path(serial): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = query.format.as_deref().unwrap_or("html").parse()?;

    let stored = match state.reports.latest(&serial) {
        Outcome::Success(stored) => stored,
        failure => return Ok(outcome_response(failure)),
    };

    let body = state.exporter.render(&stored.report, format)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

// ============================================================================
// Frames, health, metrics
// ============================================================================

/// Store the `file` part of a multipart upload as the current frame.
pub async fn upload_frame(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        tokio::fs::create_dir_all(&state.upload_dir)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let path = state.upload_dir.join(CURRENT_FRAME);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        tracing::debug!(bytes = data.len(), path = %path.display(), "Frame stored");
        return Ok(Json(json!({ "status": "ok", "filename": CURRENT_FRAME })));
    }

    Err(ApiError::BadRequest("missing 'file' field".to_string()))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
