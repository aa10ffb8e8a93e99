//! Similar-query response cache.
//!
//! Remembers final answers by query type, subject and normalized text, and
//! reuses one when a later query of the same type and subject is close enough
//! by word overlap.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::cache::similarity::{jaccard, normalize_text, word_set};
use crate::orchestrator::classify::QueryType;

/// A remembered answer. `score` is set when the record is reused.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryRecord {
    pub query_type: QueryType,
    /// Entities named in the query's parameters.
    pub subject: String,
    pub normalized_query: String,
    pub response: String,
    pub score: Option<f64>,
}

#[derive(Debug)]
pub struct SimilarQueryCache {
    records: Mutex<VecDeque<QueryRecord>>,
    threshold: f64,
    capacity: usize,
}

impl SimilarQueryCache {
    pub fn new(threshold: f64, capacity: usize) -> Self {
        Self { records: Mutex::new(VecDeque::new()), threshold, capacity: capacity.max(1) }
    }

    /// Best match of the same type and subject scoring at least the
    /// threshold. Ties go to the earlier record.
    pub fn find(&self, kind: QueryType, subject: &str, text: &str) -> Option<QueryRecord> {
        let words = word_set(text);
        if words.is_empty() {
            return None;
        }

        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut best: Option<(f64, &QueryRecord)> = None;
        for record in records.iter().filter(|r| r.query_type == kind && r.subject == subject) {
            let score = jaccard(&words, &word_set(&record.normalized_query));
            if score >= self.threshold && best.map_or(true, |(s, _)| score > s) {
                best = Some((score, record));
            }
        }

        best.map(|(score, record)| QueryRecord { score: Some(score), ..record.clone() })
    }

    /// Remember an answer, replacing an earlier one for the same text.
    pub fn insert(&self, kind: QueryType, subject: &str, text: &str, response: &str) {
        let normalized_query = normalize_text(text);
        if normalized_query.is_empty() {
            return;
        }

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.retain(|r| !(r.query_type == kind && r.subject == subject && r.normalized_query == normalized_query));
        records.push_back(QueryRecord {
            query_type: kind,
            subject: subject.to_string(),
            normalized_query,
            response: response.to_string(),
            score: None,
        });
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
