//! Inference subsystem.
//!
//! # Data Flow
//! ```text
//! InferenceClient::generate(prompt, model_hint)
//!     → exact cache → semantic cache
//!     → availability (lazy refresh via health::probe)
//!     → generate breaker → RetryExecutor → api.rs (HTTP)
//!     → clean.rs → cache put
//!     ↘ any failure → fallback.rs (no network)
//! ```

pub mod api;
pub mod clean;
pub mod client;
pub mod error;
pub mod fallback;

pub use api::{same_model, ChatMessage};
pub use client::{Generation, GenerationOrigin, InferenceClient};
pub use error::{InferenceError, InferenceResult};
