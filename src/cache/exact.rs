//! Exact-match tier: LRU map with per-entry TTL.

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};

/// One cached generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) >= ttl_ms
    }
}

/// Build the composite key for a generation request.
///
/// Stable across restarts so persisted snapshots stay addressable.
pub fn cache_key(prompt: &str, model: &str, temperature: f32, max_tokens: u32) -> String {
    let prompt = prompt.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    format!("{}|{:.2}|{}|{}", model, temperature, max_tokens, prompt)
}

#[derive(Debug)]
pub(crate) struct ExactTier {
    entries: LruCache<String, CacheEntry>,
}

impl ExactTier {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: LruCache::new(capacity) }
    }

    /// Live value for `key`; an expired entry is removed on the way.
    pub(crate) fn get(&mut self, key: &str, now_ms: u64, ttl_ms: u64) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now_ms, ttl_ms) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.pop(key);
        }
        None
    }

    /// Insert, evicting the least recently used entry at capacity.
    pub(crate) fn put(&mut self, entry: CacheEntry) {
        self.entries.put(entry.key.clone(), entry);
    }

    pub(crate) fn purge_expired(&mut self, now_ms: u64, ttl_ms: u64) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now_ms, ttl_ms))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            self.entries.pop(key);
        }
        stale.len()
    }

    /// Entries from least to most recently used.
    pub(crate) fn snapshot(&self) -> Vec<CacheEntry> {
        self.entries.iter().rev().map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, created_at: u64) -> CacheEntry {
        CacheEntry { key: key.to_string(), value: format!("value-{}", key), created_at }
    }

    #[test]
    fn test_key_normalizes_prompt() {
        assert_eq!(
            cache_key("  Aphids   ON roses ", "llama3", 0.7, 512),
            cache_key("aphids on roses", "llama3", 0.7, 512)
        );
        assert_ne!(
            cache_key("aphids", "llama3", 0.7, 512),
            cache_key("aphids", "mistral", 0.7, 512)
        );
    }

    #[test]
    fn test_lru_eviction() {
        let mut tier = ExactTier::new(2);
        tier.put(entry("a", 0));
        tier.put(entry("b", 0));
        assert!(tier.get("a", 0, 1_000).is_some());
        tier.put(entry("c", 0));

        assert!(tier.get("b", 0, 1_000).is_none());
        assert!(tier.get("a", 0, 1_000).is_some());
        assert!(tier.get("c", 0, 1_000).is_some());
    }

    #[test]
    fn test_expired_entry_is_dropped_on_read() {
        let mut tier = ExactTier::new(4);
        tier.put(entry("a", 0));
        assert!(tier.get("a", 1_000, 1_000).is_none());
        assert_eq!(tier.len(), 0);
    }

    #[test]
    fn test_snapshot_order() {
        let mut tier = ExactTier::new(4);
        tier.put(entry("old", 0));
        tier.put(entry("new", 0));
        let keys: Vec<_> = tier.snapshot().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["old", "new"]);
    }
}
