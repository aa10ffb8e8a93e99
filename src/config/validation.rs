//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! consistency. Every problem is reported, not just the first.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{AdvisorConfig, BreakerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("backend.base_url '{0}' is not a valid http(s) URL")]
    InvalidBaseUrl(String),

    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field} must be in (0, 1], got {value}")]
    OutOfRange { field: String, value: f64 },

    #[error("specialized model for '{0}' has an empty name")]
    EmptyModelName(String),

    #[error("query type '{0}' has more than one specialized model")]
    DuplicateQueryType(String),

    #[error("unknown augmenter '{0}'")]
    UnknownAugmenter(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AdvisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.backend.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => errors.push(ValidationError::InvalidBaseUrl(config.backend.base_url.clone())),
    }

    non_zero(&mut errors, "backend.request_timeout_secs", config.backend.request_timeout_secs);
    non_zero(&mut errors, "cache.ttl_secs", config.cache.ttl_secs);
    non_zero(&mut errors, "cache.max_entries", config.cache.max_entries as u64);
    non_zero(&mut errors, "retries.max_attempts", config.retries.max_attempts as u64);

    for (name, breaker) in [
        ("availability", &config.breakers.availability),
        ("generate", &config.breakers.generate),
        ("chat", &config.breakers.chat),
        ("list_models", &config.breakers.list_models),
    ] {
        check_breaker(&mut errors, name, breaker);
    }

    unit_interval(&mut errors, "cache.semantic_threshold", config.cache.semantic_threshold);
    unit_interval(&mut errors, "routing.similarity_threshold", config.routing.similarity_threshold);
    if !(0.0..=1.0).contains(&config.cache.save_probability) {
        errors.push(ValidationError::OutOfRange {
            field: "cache.save_probability".to_string(),
            value: config.cache.save_probability,
        });
    }

    let mut seen = HashSet::new();
    for model in &config.models.specialized {
        if model.name.trim().is_empty() {
            errors.push(ValidationError::EmptyModelName(model.query_type.clone()));
        }
        if !seen.insert(model.query_type.as_str()) {
            errors.push(ValidationError::DuplicateQueryType(model.query_type.clone()));
        }
    }

    if !matches!(config.routing.augmenter.as_str(), "none" | "related_practices" | "safety_note") {
        errors.push(ValidationError::UnknownAugmenter(config.routing.augmenter.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_breaker(errors: &mut Vec<ValidationError>, name: &str, breaker: &BreakerConfig) {
    non_zero(errors, &format!("breakers.{}.failure_threshold", name), breaker.failure_threshold as u64);
    non_zero(errors, &format!("breakers.{}.half_open_max_calls", name), breaker.half_open_max_calls as u64);
}

fn non_zero(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field: field.to_string() });
    }
}

fn unit_interval(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(value > 0.0 && value <= 1.0) {
        errors.push(ValidationError::OutOfRange { field: field.to_string(), value });
    }
}
