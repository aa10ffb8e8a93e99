//! Text normalization and word-set similarity.

use std::collections::HashSet;

/// Words that carry no topical signal in farmer questions.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "can", "do", "does", "for", "how", "i", "in", "is", "it", "me",
    "my", "of", "on", "or", "plant", "the", "to", "what", "with",
];

/// Lower-case, drop punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Checked on the raw word and again after stemming ("does" stems to "doe").
fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Fold the common English plural endings.
fn stem(word: &str) -> String {
    if word.len() > 4 && word.ends_with("oes") {
        word[..word.len() - 2].to_string()
    } else if word.len() > 4 && word.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// The set of content words in `text`.
pub fn word_set(text: &str) -> HashSet<String> {
    normalize_text(text)
        .split(' ')
        .filter(|w| !w.is_empty() && !is_stop_word(w))
        .map(stem)
        .filter(|w| !is_stop_word(w))
        .collect()
}

/// Jaccard similarity of two word sets. Two empty sets score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Jaccard similarity of the content words of two texts.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}
