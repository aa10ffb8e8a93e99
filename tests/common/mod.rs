//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use pest_advisor::config::schema::SpecializedModelConfig;
use pest_advisor::AdvisorConfig;

pub const LONG_ANSWER: &str = "Spray a mild soap solution on the colonies every five days, \
encourage ladybirds, and remove badly infested shoots.";

/// Programmable behaviour of the mock inference backend.
#[derive(Debug)]
pub struct MockState {
    pub models: Mutex<Vec<String>>,
    pub tags_status: AtomicU16,
    pub generate_status: AtomicU16,
    pub generate_text: Mutex<String>,
    /// Delay before each generate reply.
    pub generate_delay_ms: AtomicU64,
    /// Answer this many generate calls with 503 before behaving normally.
    pub fail_first: AtomicUsize,
    pub create_lines: Mutex<Vec<String>>,
    /// Whether a created model shows up in later listings.
    pub register_on_create: AtomicBool,

    pub tags_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub last_generate: Mutex<Option<Value>>,
    pub last_create: Mutex<Option<Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            models: Mutex::new(vec!["llama3:latest".to_string()]),
            tags_status: AtomicU16::new(200),
            generate_status: AtomicU16::new(200),
            generate_text: Mutex::new(LONG_ANSWER.to_string()),
            generate_delay_ms: AtomicU64::new(0),
            fail_first: AtomicUsize::new(0),
            create_lines: Mutex::new(vec![
                r#"{"status":"reading model metadata"}"#.to_string(),
                r#"{"status":"creating system layer"}"#.to_string(),
                r#"{"status":"writing manifest"}"#.to_string(),
                r#"{"status":"success"}"#.to_string(),
            ]),
            register_on_create: AtomicBool::new(true),
            tags_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            last_generate: Mutex::new(None),
            last_create: Mutex::new(None),
        }
    }
}

impl MockState {
    pub fn set_models(&self, models: &[&str]) {
        *self.models.lock().unwrap() = models.iter().map(|m| m.to_string()).collect();
    }

    pub fn set_generate_text(&self, text: &str) {
        *self.generate_text.lock().unwrap() = text.to_string();
    }

    pub fn set_create_lines(&self, lines: &[&str]) {
        *self.create_lines.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
    }

    pub fn tags(&self) -> usize {
        self.tags_calls.load(Ordering::SeqCst)
    }

    pub fn generates(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn last_generate_field(&self, field: &str) -> Option<String> {
        self.last_generate
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

/// A running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn tags(State(state): State<Arc<MockState>>) -> Response {
    state.tags_calls.fetch_add(1, Ordering::SeqCst);
    let status = state.tags_status.load(Ordering::SeqCst);
    if status != 200 {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    let models: Vec<Value> = state.models.lock().unwrap().iter().map(|m| json!({ "name": m })).collect();
    Json(json!({ "models": models })).into_response()
}

async fn generate(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.generate_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_generate.lock().unwrap() = Some(body);

    let delay = state.generate_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let failing = state
        .fail_first
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let status = state.generate_status.load(Ordering::SeqCst);
    if status != 200 {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    let text = state.generate_text.lock().unwrap().clone();
    Json(json!({ "response": text, "done": true })).into_response()
}

async fn chat(State(state): State<Arc<MockState>>, Json(_body): Json<Value>) -> Response {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);
    let text = state.generate_text.lock().unwrap().clone();
    Json(json!({ "message": { "role": "assistant", "content": text }, "done": true })).into_response()
}

async fn create(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.create_calls.fetch_add(1, Ordering::SeqCst);
    let name = body.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    *state.last_create.lock().unwrap() = Some(body);

    if state.register_on_create.load(Ordering::SeqCst) {
        state.models.lock().unwrap().push(format!("{}:latest", name));
    }
    let mut lines = state.create_lines.lock().unwrap().join("\n");
    lines.push('\n');
    ([("content-type", "application/x-ndjson")], lines).into_response()
}

/// Start a mock inference backend on an ephemeral port.
pub async fn start_mock_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/api/tags", get(tags))
        .route("/api/generate", post(generate))
        .route("/api/chat", post(chat))
        .route("/api/create", post(create))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, state }
}

/// A URL nothing listens on.
pub async fn dead_backend_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Configuration tuned for fast tests against `base_url`.
pub fn test_config(base_url: &str) -> AdvisorConfig {
    let mut config = AdvisorConfig::default();
    config.backend.base_url = base_url.to_string();
    config.backend.request_timeout_secs = 5;
    config.backend.connect_timeout_secs = 1;
    config.retries.initial_backoff_ms = 10;
    config.retries.max_backoff_ms = 50;
    config.models.provision = false;
    config.models.verify_timeout_secs = 1;
    config.models.verify_interval_ms = 50;
    config.routing.init_wait_secs = 5;
    config.cache.persist_path = None;
    config.cache.save_probability = 0.0;
    config
}

/// One specialized model whose template lives under `dir`.
pub fn specialized(dir: &std::path::Path, query_type: &str, name: &str, template: &str) -> SpecializedModelConfig {
    let path = dir.join(format!("{}.modelfile", query_type));
    std::fs::write(&path, template).unwrap();
    SpecializedModelConfig {
        query_type: query_type.to_string(),
        name: name.to_string(),
        template: path.to_string_lossy().into_owned(),
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
