//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AdvisorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "ADVISOR_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AdvisorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: AdvisorConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration.
///
/// The file is optional; without one the defaults apply. Environment
/// overrides are layered on top and the result is validated once.
pub fn resolve_config(path: Option<&Path>) -> Result<AdvisorConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => AdvisorConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay `ADVISOR_*` variables onto `config`.
///
/// `lookup` abstracts the environment so overrides can be tested without
/// mutating process state. Unparseable values are logged and skipped.
pub fn apply_env_overrides(config: &mut AdvisorConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    if let Some(v) = var("BACKEND_URL") {
        config.backend.base_url = v;
    }
    if let Some(v) = var("DEFAULT_MODEL") {
        config.backend.default_model = v;
    }
    if let Some(v) = var("BIND_ADDRESS") {
        config.server.bind_address = v;
    }
    if let Some(v) = var("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = var("CACHE_PATH") {
        config.cache.persist_path = Some(v);
    }
    if let Some(v) = parsed::<u64>(var("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS") {
        config.backend.request_timeout_secs = v;
    }
    if let Some(v) = parsed::<u64>(var("CACHE_TTL_SECS"), "CACHE_TTL_SECS") {
        config.cache.ttl_secs = v;
    }
    if let Some(v) = parsed::<usize>(var("MAX_SEMANTIC_CACHE_SIZE"), "MAX_SEMANTIC_CACHE_SIZE") {
        config.cache.max_semantic_entries = v;
    }
    if let Some(v) = parsed::<u32>(var("BREAKER_FAILURE_THRESHOLD"), "BREAKER_FAILURE_THRESHOLD") {
        config.breakers.set_all(|b| b.failure_threshold = v);
    }
    if let Some(v) = parsed::<u64>(var("BREAKER_RECOVERY_SECS"), "BREAKER_RECOVERY_SECS") {
        config.breakers.set_all(|b| b.recovery_timeout_secs = v);
    }
    if let Some(v) = parsed::<u32>(var("BREAKER_HALF_OPEN_MAX_CALLS"), "BREAKER_HALF_OPEN_MAX_CALLS") {
        config.breakers.set_all(|b| b.half_open_max_calls = v);
    }
}

fn parsed<T: std::str::FromStr>(value: Option<String>, name: &str) -> Option<T> {
    let raw = value?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = %format!("{}{}", ENV_PREFIX, name), value = %raw, "Ignoring unparseable override");
            None
        }
    }
}
