//! Specialized model provisioning.
//!
//! # Data Flow
//! ```text
//! ModelProvisioner::ensure_ready(query_type)
//!     → list models (present → READY)
//!     → modelfile.rs (normalize template)
//!     → POST /api/create → stream.rs (CREATING → VERIFYING | FAILED)
//!     → poll listing within the verify budget → READY | FAILED
//!     → registry.rs (status consulted by the orchestrator)
//! ```

pub mod modelfile;
pub mod provisioner;
pub mod registry;
pub mod stream;

pub use provisioner::{ModelProvisioner, ProvisionError};
pub use registry::{ModelDescriptor, ModelRegistry, ModelStatus};
