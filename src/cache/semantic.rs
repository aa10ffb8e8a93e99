//! Semantic tier: approximate matches by word overlap.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::cache::similarity::{jaccard, normalize_text, word_set};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticCacheEntry {
    pub query: String,
    pub response: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// A semantic hit and how close it was.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub response: String,
    pub score: f64,
}

#[derive(Debug)]
pub(crate) struct SemanticTier {
    entries: VecDeque<SemanticCacheEntry>,
    max_entries: usize,
}

impl SemanticTier {
    pub(crate) fn new(max_entries: usize) -> Self {
        Self { entries: VecDeque::new(), max_entries }
    }

    /// Best live entry scoring at least `threshold`; earliest wins ties.
    pub(crate) fn find(&self, query: &str, threshold: f64, now_ms: u64, ttl_ms: u64) -> Option<SemanticMatch> {
        let words = word_set(query);
        let mut best: Option<SemanticMatch> = None;

        for entry in &self.entries {
            if now_ms.saturating_sub(entry.created_at) >= ttl_ms {
                continue;
            }
            let score = jaccard(&words, &word_set(&entry.query));
            if score < threshold {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(SemanticMatch { response: entry.response.clone(), score });
            }
        }
        best
    }

    /// Append, replacing an earlier entry for the same question.
    pub(crate) fn put(&mut self, entry: SemanticCacheEntry) {
        let normalized = normalize_text(&entry.query);
        self.entries.retain(|e| normalize_text(&e.query) != normalized);
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub(crate) fn purge_expired(&mut self, now_ms: u64, ttl_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| now_ms.saturating_sub(e.created_at) < ttl_ms);
        before - self.entries.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<SemanticCacheEntry> {
        self.entries.iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
