//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → ADVISOR_* environment overrides
//!     → validation.rs (semantic checks)
//!     → AdvisorConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow an empty config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdvisorConfig;
pub use schema::BackendConfig;
pub use schema::BreakerConfig;
pub use schema::CacheConfig;
pub use schema::GenerationConfig;
pub use schema::KnowledgeConfig;
pub use schema::ModelsConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetryConfig;
pub use schema::RoutingConfig;
pub use schema::SpecializedModelConfig;
