//! Backend health subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (lifecycle::startup) or stale availability (InferenceClient):
//!     → probe.rs (list → non-empty → trial generation)
//!     → availability flag + installed model list on the client
//! ```
//!
//! # Design Decisions
//! - Availability is re-checked lazily, at most once per refresh interval
//! - Probe failures feed the availability circuit breaker

pub mod probe;

pub use probe::{probe_backend, ProbeOutcome};
