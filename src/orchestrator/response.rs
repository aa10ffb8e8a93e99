//! Query results.

use serde::Serialize;

use crate::lifecycle::InitializationStatus;

/// Which path produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    RuleEngine,
    Inference,
    InferenceWithContext,
    Cache,
    Fallback,
    Initializing,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::RuleEngine => "rule_engine",
            Source::Inference => "inference",
            Source::InferenceWithContext => "inference_with_context",
            Source::Cache => "cache",
            Source::Fallback => "fallback",
            Source::Initializing => "initializing",
        }
    }

    /// Fallback and initializing answers are not a success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Source::Fallback | Source::Initializing)
    }
}

/// Answer to one query. Always carries some text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryResponse {
    pub response: String,
    pub source: Source,
    pub success: bool,
    pub initialization: InitializationStatus,
}

impl QueryResponse {
    pub fn new(response: String, source: Source, initialization: InitializationStatus) -> Self {
        Self { response, success: source.is_success(), source, initialization }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let r = QueryResponse::new("Spray neem.".into(), Source::InferenceWithContext, InitializationStatus::Succeeded);
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({
                "response": "Spray neem.",
                "source": "inference_with_context",
                "success": true,
                "initialization": "succeeded"
            })
        );
    }

    #[test]
    fn test_success_flag() {
        assert!(!QueryResponse::new("x".into(), Source::Fallback, InitializationStatus::Failed).success);
        assert!(!QueryResponse::new("x".into(), Source::Initializing, InitializationStatus::Pending).success);
        assert!(QueryResponse::new("x".into(), Source::Cache, InitializationStatus::Succeeded).success);
    }
}
