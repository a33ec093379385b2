//! HTTP commands exposed by the engine

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::clipboard::ClipboardStatus;
use crate::error::EngineError;
use crate::intent::Command;
use crate::router::RouterResponse;
use crate::session::DEFAULT_SESSION;
use crate::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Engine(err) = self;
        let message = err.to_string();

        let (status, body) = match &err {
            EngineError::EmptyCommand => (StatusCode::BAD_REQUEST, json!({"status": "error", "message": message})),
            e if e.is_quota() => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({"status": "error", "message": message, "quotaExceeded": true}),
            ),
            EngineError::MissingState(_) => (StatusCode::OK, json!({"status": "error", "message": message})),
            _ => {
                log::error!("Request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"status": "error", "message": message}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RunCommandRequest {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub parsed: Option<Command>,
}

fn session_id(headers: &HeaderMap) -> &str {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SESSION)
}

pub async fn run_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RunCommandRequest>,
) -> Result<Json<RouterResponse>, ApiError> {
    let session = state.sessions.get(session_id(&headers));
    let response = state
        .router
        .route(&session, &request.command, request.parsed)
        .await?;
    Ok(Json(response))
}

pub async fn get_clipboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<ClipboardStatus> {
    let session = state.sessions.get(session_id(&headers));
    let status = session.clipboard.lock().await.status();
    Json(status)
}

pub async fn clear_clipboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Value> {
    let session = state.sessions.get(session_id(&headers));
    session.clipboard.lock().await.clear();
    Json(json!({"message": "Clipboard memory cleared"}))
}

pub async fn get_conversation(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Value> {
    let session = state.sessions.get(session_id(&headers));
    let messages = session.conversation.lock().await.messages();
    Json(json!({"sessionId": session.id, "count": messages.len(), "messages": messages}))
}

pub async fn clear_conversation(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Value> {
    let session = state.sessions.get(session_id(&headers));
    session.conversation.lock().await.clear();
    Json(json!({"message": "Conversation cleared"}))
}

pub async fn voice_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "platform": state.platform.name(),
        "aiEnabled": state.ai_enabled,
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "services": {
            "router": "up",
            "llm": if state.ai_enabled { "configured" } else { "missing_api_key" },
            "sessions": state.sessions.len(),
        },
    }))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/runCommand", post(run_command))
        .route("/clipboard", get(get_clipboard).delete(clear_clipboard))
        .route("/conversation", get(get_conversation).delete(clear_conversation))
        .route("/voiceStatus", get(voice_status))
        .route("/health", get(health))
        .with_state(state)
}
