//! Response cleaning and validation.

use crate::inference::error::{InferenceError, InferenceResult};

/// Openings that mean the model declined or produced filler.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "i'm sorry, but i can",
    "i am sorry, but i can",
    "i cannot provide",
    "i can't provide",
    "i am unable to",
    "i'm unable to",
    "i don't have enough information",
];

/// Strip code fences, collapse blank runs and reject unusable text.
pub fn clean_response(raw: &str, min_chars: usize) -> InferenceResult<String> {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = true;

    for line in raw.lines() {
        if line.trim_start().starts_with("```") {
            continue;
        }
        let line = line.trim_end();
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(line);
        previous_blank = blank;
    }

    let text = lines.join("\n").trim().to_string();

    if text.chars().count() < min_chars {
        return Err(InferenceError::EmptyOrRejectedContent(format!(
            "{} characters, need at least {}",
            text.chars().count(),
            min_chars
        )));
    }

    let lowered = text.to_lowercase();
    if lowered.contains("as an ai language model") || BOILERPLATE_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return Err(InferenceError::EmptyOrRejectedContent("boilerplate reply".to_string()));
    }

    Ok(text)
}
