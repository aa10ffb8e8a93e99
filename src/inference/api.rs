//! Wire protocol of the inference backend.
//!
//! # Endpoints
//! - `GET  /api/tags`     → installed models
//! - `POST /api/generate` → single completion (`stream: false`)
//! - `POST /api/chat`     → single chat turn (`stream: false`)
//! - `POST /api/create`   → NDJSON status stream while a model is built
//!
//! This layer maps transport and payload problems onto [`InferenceError`]
//! and knows nothing about caching, breakers or retries.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::inference::error::{InferenceError, InferenceResult};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self { role: role.to_string(), content: content.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRequest<'a> {
    pub name: &'a str,
    pub modelfile: &'a str,
    pub stream: bool,
}

/// Does `listed` (from `/api/tags`) name the model `wanted`?
///
/// The backend reports untagged models with an implicit `:latest`.
pub fn same_model(listed: &str, wanted: &str) -> bool {
    let strip = |name: &str| name.strip_suffix(":latest").unwrap_or(name).to_string();
    strip(listed) == strip(wanted)
}

/// Thin HTTP client for the backend.
#[derive(Debug, Clone)]
pub struct OllamaApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaApi {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Names of installed models.
    pub async fn list_models(&self) -> InferenceResult<Vec<String>> {
        let start = Instant::now();
        let result: InferenceResult<Vec<String>> = async {
            let response = self.http.get(self.url("/api/tags")).send().await.map_err(InferenceError::from_reqwest)?;
            let body = read_success_body(response).await?;
            let tags: TagsResponse =
                serde_json::from_str(&body).map_err(|e| InferenceError::MalformedPayload(e.to_string()))?;
            Ok(tags.models.into_iter().map(|m| m.name).collect())
        }
        .await;
        record("list_models", &result, start);
        result
    }

    /// One non-streamed completion. Returns the raw `response` text.
    pub async fn generate(&self, request: &GenerateRequest<'_>) -> InferenceResult<String> {
        let start = Instant::now();
        let result: InferenceResult<String> = async {
            let response = self
                .http
                .post(self.url("/api/generate"))
                .json(request)
                .send()
                .await
                .map_err(InferenceError::from_reqwest)?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(InferenceError::ModelNotReady(request.model.to_string()));
            }
            let body = read_success_body(response).await?;
            let parsed: GenerateResponse =
                serde_json::from_str(&body).map_err(|e| InferenceError::MalformedPayload(e.to_string()))?;
            Ok(parsed.response)
        }
        .await;
        record("generate", &result, start);
        result
    }

    /// One non-streamed chat turn. Returns the assistant's content.
    pub async fn chat(&self, request: &ChatRequest<'_>) -> InferenceResult<String> {
        let start = Instant::now();
        let result: InferenceResult<String> = async {
            let response = self
                .http
                .post(self.url("/api/chat"))
                .json(request)
                .send()
                .await
                .map_err(InferenceError::from_reqwest)?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(InferenceError::ModelNotReady(request.model.to_string()));
            }
            let body = read_success_body(response).await?;
            let parsed: ChatResponse =
                serde_json::from_str(&body).map_err(|e| InferenceError::MalformedPayload(e.to_string()))?;
            Ok(parsed.message.content)
        }
        .await;
        record("chat", &result, start);
        result
    }

    /// Start a streamed model build. The caller consumes the NDJSON body.
    ///
    /// Model builds can take far longer than a completion, so the per-request
    /// timeout is lifted here and the caller bounds the stream itself.
    pub async fn create_model(&self, request: &CreateRequest<'_>) -> InferenceResult<reqwest::Response> {
        let response = self
            .http
            .post(self.url("/api/create"))
            .timeout(self.timeout.max(Duration::from_secs(600)))
            .json(request)
            .send()
            .await
            .map_err(InferenceError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(InferenceError::BadStatus(response.status().as_u16()));
        }
        Ok(response)
    }
}

async fn read_success_body(response: reqwest::Response) -> InferenceResult<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(InferenceError::BadStatus(status.as_u16()));
    }
    response.text().await.map_err(InferenceError::from_reqwest)
}

fn record<T>(operation: &'static str, result: &InferenceResult<T>, start: Instant) {
    let outcome = match result {
        Ok(_) => "success",
        Err(InferenceError::Timeout(_)) => "timeout",
        Err(_) => "error",
    };
    metrics::record_backend_request(operation, outcome, start);
}
