//! Merging inference output with knowledge facts.

use crate::inference::Generation;
use crate::orchestrator::facts::Facts;
use crate::orchestrator::response::Source;

pub const NOTHING_FOUND: &str = "I could not find information about that. Please add the pest, crop or \
practice name, or describe what you see on the plants.";

/// Build the prompt sent to the backend. Facts, if any, come first as context.
pub fn build_prompt(question: &str, facts: &Facts) -> String {
    if facts.is_empty() {
        question.to_string()
    } else {
        format!(
            "Use these facts from the local pest knowledge base when answering.\n{}\n\nQuestion: {}",
            facts.render(),
            question
        )
    }
}

/// Pick the final answer.
///
/// A real inference answer wins, then the facts, then the fallback text the
/// client produced, then a not-found notice.
pub fn merge(inference: Option<&Generation>, facts: &Facts) -> (String, Source) {
    if let Some(generation) = inference.filter(|g| !g.is_fallback() && !g.text.trim().is_empty()) {
        let source = if facts.is_empty() { Source::Inference } else { Source::InferenceWithContext };
        return (generation.text.clone(), source);
    }
    if !facts.is_empty() {
        return (facts.render(), Source::RuleEngine);
    }
    match inference {
        Some(generation) => (generation.text.clone(), Source::Fallback),
        None => (NOTHING_FOUND.to_string(), Source::Fallback),
    }
}
