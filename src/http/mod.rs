//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request_id.rs, trace span, timeout)
//!     → handlers.rs
//!         POST /api/query                  → Engine::query
//!         POST /api/chat                   → Engine::chat
//!         GET  /api/status                 → Engine::status
//!         POST /api/models/{type}/retry    → Engine::retry_model
//!         GET  /health                     → liveness
//! ```

pub mod handlers;
pub mod request_id;
pub mod server;

pub use request_id::X_REQUEST_ID;
pub use server::HttpServer;
