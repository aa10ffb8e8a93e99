//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the advisor.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so the service runs unconfigured.

use serde::{Deserialize, Serialize};

/// Root configuration for the pest advisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdvisorConfig {
    /// HTTP service settings.
    pub server: ServerConfig,

    /// Remote inference backend.
    pub backend: BackendConfig,

    /// One circuit breaker per upstream operation.
    pub breakers: BreakersConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Generation defaults.
    pub generation: GenerationConfig,

    /// Specialized model provisioning.
    pub models: ModelsConfig,

    /// Query routing thresholds.
    pub routing: RoutingConfig,

    /// Bundled knowledge base.
    pub knowledge: KnowledgeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout for inbound queries in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            // Must exceed the init wait plus one backend call.
            request_timeout_secs: 300,
        }
    }
}

/// Inference backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g., "http://127.0.0.1:11434").
    pub base_url: String,

    /// Model used when no specialized model is ready.
    pub default_model: String,

    /// Hard timeout for a single backend call in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Minimum spacing between availability refreshes in seconds.
    pub refresh_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            default_model: "llama3".to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 5,
            refresh_interval_secs: 300,
        }
    }
}

/// Circuit breaker thresholds for one operation.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before allowing a probe.
    pub recovery_timeout_secs: u64,

    /// Probe calls allowed while half-open.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 60,
            half_open_max_calls: 1,
        }
    }
}

/// Breakers for each logical upstream operation.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakersConfig {
    pub availability: BreakerConfig,
    pub generate: BreakerConfig,
    pub chat: BreakerConfig,
    pub list_models: BreakerConfig,
}

impl BreakersConfig {
    /// Apply the same settings to every breaker.
    pub fn set_all(&mut self, f: impl Fn(&mut BreakerConfig)) {
        f(&mut self.availability);
        f(&mut self.generate);
        f(&mut self.chat);
        f(&mut self.list_models);
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds.
    pub initial_backoff_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Capacity of the exact-match tier.
    pub max_entries: usize,

    /// Capacity of the semantic tier.
    pub max_semantic_entries: usize,

    /// Minimum similarity for a semantic hit.
    pub semantic_threshold: f64,

    /// Snapshot file. Persistence is disabled when unset.
    pub persist_path: Option<String>,

    /// Chance of snapshotting after a successful write.
    pub save_probability: f64,

    /// Sweep and snapshot interval in seconds.
    pub maintenance_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            max_entries: 1_000,
            max_semantic_entries: 200,
            semantic_threshold: 0.85,
            persist_path: None,
            save_probability: 0.05,
            maintenance_interval_secs: 300,
        }
    }
}

/// Generation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,

    /// Responses shorter than this after cleaning are rejected.
    pub min_response_chars: usize,

    /// Optional system prompt sent with every generate call.
    pub system_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            min_response_chars: 20,
            system_prompt: Some(
                "You are an agricultural extension officer. Give practical, safe pest management advice."
                    .to_string(),
            ),
        }
    }
}

/// A specialized model bound to one query type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SpecializedModelConfig {
    /// Query type tag (e.g., "pest_identification").
    pub query_type: String,

    /// Model name on the backend.
    pub name: String,

    /// Path to the modelfile template.
    pub template: String,
}

/// Specialized model provisioning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Provision specialized models at startup.
    pub provision: bool,

    pub specialized: Vec<SpecializedModelConfig>,

    /// How long to wait for a created model to become listable, in seconds.
    pub verify_timeout_secs: u64,

    /// Listing poll cadence during verification, in milliseconds.
    pub verify_interval_ms: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let model = |query_type: &str, name: &str| SpecializedModelConfig {
            query_type: query_type.to_string(),
            name: name.to_string(),
            template: format!("modelfiles/{}.modelfile", query_type),
        };
        Self {
            provision: true,
            specialized: vec![
                model("pest_identification", "pest-advisor-identify"),
                model("control_methods", "pest-advisor-control"),
                model("indigenous_practice", "pest-advisor-indigenous"),
                model("general", "pest-advisor-general"),
            ],
            verify_timeout_secs: 60,
            verify_interval_ms: 2_000,
        }
    }
}

/// Query routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Allow the orchestrator to call the inference backend at all.
    pub inference_enabled: bool,

    /// Queries longer than this many words count as complex.
    pub complexity_word_threshold: usize,

    /// Phrases that mark a query as asking for an explanation.
    pub complexity_keywords: Vec<String>,

    /// Minimum similarity to reuse a previous answer.
    pub similarity_threshold: f64,

    /// Answers shorter than this are not remembered.
    pub min_cacheable_chars: usize,

    /// Capacity of the similar-query cache.
    pub max_similar_queries: usize,

    /// How long a query waits for startup to finish, in seconds.
    pub init_wait_secs: u64,

    /// Response augmenter: "none", "related_practices" or "safety_note".
    pub augmenter: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let keywords = [
            "why", "explain", "how does", "how do", "compare", "difference", "best way",
            "what causes", "prevent", "recommend",
        ];
        Self {
            inference_enabled: true,
            complexity_word_threshold: 20,
            complexity_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            similarity_threshold: 0.85,
            min_cacheable_chars: 50,
            max_similar_queries: 500,
            init_wait_secs: 45,
            augmenter: "none".to_string(),
        }
    }
}

/// Knowledge base configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// JSON file with pests, practices and crops. The built-in seed is used when unset.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when RUST_LOG is unset.
    pub log_level: String,

    /// "compact" or "pretty".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "pest_advisor=info,tower_http=info".to_string(),
            log_format: "compact".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
