//! Request handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineStatus};
use crate::inference::{ChatMessage, GenerationOrigin};
use crate::orchestrator::{QueryParams, QueryResponse};
use crate::provisioning::ModelStatus;

/// State shared by every handler.
pub type AppState = Arc<Engine>;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query_type: String,
    #[serde(default)]
    pub params: QueryParams,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub response: String,
    pub origin: GenerationOrigin,
    pub model: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ModelRetryResponse {
    pub query_type: String,
    pub status: ModelStatus,
}

pub async fn query(State(engine): State<AppState>, Json(request): Json<QueryRequest>) -> Json<QueryResponse> {
    Json(engine.query(&request.query_type, &request.params).await)
}

pub async fn chat(State(engine): State<AppState>, Json(request): Json<ChatRequestBody>) -> Response {
    if request.messages.is_empty() {
        return (StatusCode::BAD_REQUEST, "messages must not be empty").into_response();
    }
    let generation = engine.chat(&request.messages, request.model.as_deref()).await;
    Json(ChatResponseBody {
        success: !generation.is_fallback(),
        response: generation.text,
        origin: generation.origin,
        model: generation.model,
    })
    .into_response()
}

pub async fn status(State(engine): State<AppState>) -> Json<EngineStatus> {
    Json(engine.status())
}

pub async fn retry_model(State(engine): State<AppState>, Path(query_type): Path<String>) -> Response {
    match engine.retry_model(&query_type).await {
        Some(status) => Json(ModelRetryResponse { query_type, status }).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no specialized model for '{}'", query_type)).into_response(),
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
