//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted prose
//! - Request ID (x-request-id) flows through the HTTP trace spans
//! - Metrics are cheap and no-ops without an installed recorder

pub mod logging;
pub mod metrics;
