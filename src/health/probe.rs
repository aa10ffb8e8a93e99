//! Backend availability probe.
//!
//! # Steps
//! 1. List installed models
//! 2. Require at least one
//! 3. Run a tiny generation against the first one; only a well-formed
//!    `{"response": ...}` payload counts as proof of readiness
//!
//! Every step runs behind the availability breaker. A failed step records a
//! breaker failure and reports the backend unavailable; nothing is raised.

use crate::inference::api::{GenerateOptions, GenerateRequest, OllamaApi};
use crate::resilience::{CallPermit, CircuitBreaker};

const PROBE_PROMPT: &str = "Reply with the single word OK.";

/// Result of one availability probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Available { models: Vec<String> },
    Unavailable { reason: String },
}

impl ProbeOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeOutcome::Available { .. })
    }
}

/// Probe the backend once.
pub async fn probe_backend(api: &OllamaApi, breaker: &CircuitBreaker) -> ProbeOutcome {
    let Some(permit) = breaker.try_acquire() else {
        tracing::debug!("Availability circuit open, skipping probe");
        return ProbeOutcome::Unavailable { reason: "availability circuit open".to_string() };
    };

    let models = match api.list_models().await {
        Ok(models) => models,
        Err(e) => return fail(permit, format!("listing models failed: {}", e)),
    };

    let Some(first) = models.first() else {
        return fail(permit, "backend has no models installed".to_string());
    };

    let request = GenerateRequest {
        model: first,
        prompt: PROBE_PROMPT,
        stream: false,
        options: GenerateOptions { temperature: 0.0, num_predict: 8 },
        system: None,
    };
    if let Err(e) = api.generate(&request).await {
        return fail(permit, format!("trial generation on '{}' failed: {}", first, e));
    }

    permit.success();
    tracing::info!(models = models.len(), probe_model = %first, "Inference backend available");
    ProbeOutcome::Available { models }
}

fn fail(permit: CallPermit<'_>, reason: String) -> ProbeOutcome {
    permit.failure();
    tracing::warn!(reason = %reason, "Inference backend unavailable");
    ProbeOutcome::Unavailable { reason }
}
