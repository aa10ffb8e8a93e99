//! Routing decision: answer from the knowledge source alone, or also ask
//! the inference backend.
//!
//! | query type            | no facts  | facts, simple | facts, complex |
//! |-----------------------|-----------|---------------|----------------|
//! | general               | inference | inference     | inference      |
//! | pest identification   | inference | knowledge     | inference      |
//! | control methods       | inference | knowledge     | inference      |
//! | indigenous practice   | inference | knowledge     | inference      |
//! | crop pests            | knowledge | knowledge     | inference      |

use crate::cache::similarity::normalize_text;
use crate::config::RoutingConfig;
use crate::orchestrator::classify::QueryType;

/// Long questions and explanation requests count as complex.
pub fn is_complex(text: &str, config: &RoutingConfig) -> bool {
    let normalized = normalize_text(text);
    if normalized.split_whitespace().count() > config.complexity_word_threshold {
        return true;
    }
    let padded = format!(" {} ", normalized);
    config
        .complexity_keywords
        .iter()
        .any(|k| padded.contains(&format!(" {} ", k.trim().to_lowercase())))
}

pub fn should_use_inference(kind: QueryType, has_facts: bool, text: &str, config: &RoutingConfig) -> bool {
    if !config.inference_enabled {
        return false;
    }
    match kind {
        QueryType::General => true,
        QueryType::PestIdentification | QueryType::ControlMethods | QueryType::IndigenousPractice => {
            !has_facts || is_complex(text, config)
        }
        QueryType::CropPests => is_complex(text, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_always_uses_inference() {
        let config = RoutingConfig::default();
        assert!(should_use_inference(QueryType::General, false, "hello", &config));
        assert!(should_use_inference(QueryType::General, true, "hello", &config));
    }

    #[test]
    fn test_facts_without_complexity_stay_local() {
        let config = RoutingConfig::default();
        assert!(!should_use_inference(QueryType::PestIdentification, true, "aphid identification", &config));
        assert!(should_use_inference(QueryType::PestIdentification, false, "aphid identification", &config));
    }

    #[test]
    fn test_complexity_signals() {
        let config = RoutingConfig::default();
        assert!(is_complex("Why do aphids come back every season?", &config));
        assert!(is_complex("Explain the lifecycle", &config));
        assert!(!is_complex("aphid control", &config));
        // Keywords match whole words only.
        assert!(!is_complex("whyte fly", &config));

        let long = "word ".repeat(21);
        assert!(is_complex(&long, &config));
    }

    #[test]
    fn test_crop_pests_only_when_complex() {
        let config = RoutingConfig::default();
        assert!(!should_use_inference(QueryType::CropPests, false, "pests of maize", &config));
        assert!(should_use_inference(QueryType::CropPests, true, "Compare the pests of maize and sorghum", &config));
    }

    #[test]
    fn test_inference_disabled() {
        let config = RoutingConfig { inference_enabled: false, ..RoutingConfig::default() };
        assert!(!should_use_inference(QueryType::General, false, "anything", &config));
    }
}
