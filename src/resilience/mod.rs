//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the inference backend:
//!     → circuit_breaker.rs (fail fast when the operation's circuit is open)
//!     → retries.rs (retry transient failures with backoff.rs delays)
//!     → timeouts.rs (every attempt has a hard deadline)
//!     → circuit_breaker.rs (record the final outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only transient failures (timeouts, connect errors, 429/5xx) are retried
//! - One breaker per logical operation prevents cascading failures

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState};
pub use retries::RetryExecutor;
