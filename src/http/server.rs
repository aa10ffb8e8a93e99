//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router over the engine
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve until the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::http::handlers;
use crate::http::request_id::{request_id_of, UuidRequestId};

/// HTTP front end of the advisor.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        let timeout = Duration::from_secs(engine.config().server.request_timeout_secs);
        Self { router: Self::build_router(engine, timeout) }
    }

    /// Build the router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(engine: Arc<Engine>, timeout: Duration) -> Router {
        Router::new()
            .route("/api/query", post(handlers::query))
            .route("/api/chat", post(handlers::chat))
            .route("/api/status", get(handlers::status))
            .route("/api/models/{query_type}/retry", post(handlers::retry_model))
            .route("/health", get(handlers::health))
            .with_state(engine)
            .layer(TimeoutLayer::new(timeout))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id_of(request),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
