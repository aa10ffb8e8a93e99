//! Pest management advisor library.
//!
//! Answers farmer questions from a local knowledge base and a remote
//! generative model, degrading gracefully when the model is slow or gone.

pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod health;
pub mod http;
pub mod inference;
pub mod knowledge;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;
pub mod provisioning;
pub mod resilience;

pub use config::AdvisorConfig;
pub use engine::Engine;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
