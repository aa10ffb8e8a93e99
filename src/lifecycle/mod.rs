//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Engine::start → NonBlockingInitializer (probe → provision) in background
//!     Requests wait at most `routing.init_wait_secs` for the outcome
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger → server drains, cache writes a final snapshot
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{InitializationStatus, NonBlockingInitializer};
