//! Tiered response cache.
//!
//! # Data Flow
//! ```text
//! generate(prompt):
//!     → exact.rs (composite key, TTL checked on read)
//!     → semantic.rs (word-overlap match against earlier prompts)
//!     → miss: caller asks the backend, then put() fills both tiers
//!
//! Background:
//!     maintenance task → cleanup_expired() → save()
//!     successful put → occasional save()
//!     startup → load() drops entries older than the TTL
//! ```
//!
//! # Design Decisions
//! - Both tiers sit behind one mutex; disk writes take a second lock so at
//!   most one snapshot is written at a time
//! - Disk writes never run on an async worker: `put` hands them to the
//!   blocking pool and the maintenance task does the same
//! - Timestamps are wall-clock so a snapshot survives restarts

pub mod exact;
pub mod persistence;
pub mod semantic;
pub mod similarity;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::clock::SharedClock;
use crate::config::CacheConfig;
use crate::observability::metrics;

pub use exact::{cache_key, CacheEntry};
pub use persistence::{CacheSnapshot, PersistenceError};
pub use semantic::{SemanticCacheEntry, SemanticMatch};

use exact::ExactTier;
use semantic::SemanticTier;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub exact_entries: usize,
    pub semantic_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct Tiers {
    exact: ExactTier,
    semantic: SemanticTier,
}

/// Exact + semantic response cache with TTL and disk snapshots.
#[derive(Debug)]
pub struct TieredResponseCache {
    tiers: Mutex<Tiers>,
    ttl_ms: u64,
    semantic_threshold: f64,
    persist_path: Option<PathBuf>,
    save_probability: f64,
    save_lock: Arc<Mutex<()>>,
    hits: AtomicU64,
    misses: AtomicU64,
    clock: SharedClock,
}

impl TieredResponseCache {
    pub fn new(config: &CacheConfig, clock: SharedClock) -> Self {
        Self {
            tiers: Mutex::new(Tiers {
                exact: ExactTier::new(config.max_entries),
                semantic: SemanticTier::new(config.max_semantic_entries),
            }),
            ttl_ms: config.ttl_secs.saturating_mul(1_000),
            semantic_threshold: config.semantic_threshold,
            persist_path: config.persist_path.as_ref().map(PathBuf::from),
            save_probability: config.save_probability,
            save_lock: Arc::new(Mutex::new(())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            clock,
        }
    }

    /// Configured semantic threshold.
    pub fn semantic_threshold(&self) -> f64 {
        self.semantic_threshold
    }

    /// Exact lookup.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now_millis();
        let value = self.lock().exact.get(key, now, self.ttl_ms);
        self.count(value.is_some(), "exact");
        value
    }

    /// Closest earlier query scoring at least `threshold`.
    pub fn find_semantic(&self, query: &str, threshold: f64) -> Option<SemanticMatch> {
        let now = self.clock.now_millis();
        let found = self.lock().semantic.find(query, threshold, now, self.ttl_ms);
        self.count(found.is_some(), "semantic");
        found
    }

    /// Store a response in both tiers.
    ///
    /// `key` addresses the exact tier; `query` is the text the semantic tier
    /// matches against.
    pub fn put(&self, key: &str, query: &str, value: &str) {
        let now = self.clock.now_millis();
        {
            let mut tiers = self.lock();
            tiers.exact.put(CacheEntry { key: key.to_string(), value: value.to_string(), created_at: now });
            tiers.semantic.put(SemanticCacheEntry {
                query: query.to_string(),
                response: value.to_string(),
                created_at: now,
            });
        }

        if self.persist_path.is_some() && fastrand::f64() < self.save_probability {
            self.save_in_background();
        }
    }

    /// Snapshot now, write on the blocking pool. Inline when no runtime runs.
    fn save_in_background(&self) {
        let Some(path) = self.persist_path.clone() else {
            return;
        };
        let snapshot = self.snapshot();
        let save_lock = self.save_lock.clone();
        let write = move || {
            let _guard = save_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = persistence::write_snapshot(&path, &snapshot) {
                tracing::warn!(error = %e, "Opportunistic cache save failed");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }

    fn snapshot(&self) -> CacheSnapshot {
        let tiers = self.lock();
        CacheSnapshot { exact: tiers.exact.snapshot(), semantic: tiers.semantic.snapshot() }
    }

    /// Drop expired entries from both tiers. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut tiers = self.lock();
        let removed = tiers.exact.purge_expired(now, self.ttl_ms) + tiers.semantic.purge_expired(now, self.ttl_ms);
        if removed > 0 {
            tracing::debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Write both tiers to the snapshot file, if one is configured.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        let snapshot = self.snapshot();
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        persistence::write_snapshot(path, &snapshot)?;
        tracing::debug!(
            path = %path.display(),
            exact = snapshot.exact.len(),
            semantic = snapshot.semantic.len(),
            "Saved cache snapshot"
        );
        Ok(())
    }

    /// Merge the snapshot file into memory, skipping expired entries.
    pub fn load(&self) -> Result<usize, PersistenceError> {
        let Some(path) = &self.persist_path else {
            return Ok(0);
        };

        let mut snapshot = persistence::read_snapshot(path)?;
        let now = self.clock.now_millis();
        let ttl = self.ttl_ms;
        snapshot.exact.retain(|e| !e.is_expired(now, ttl));
        snapshot.semantic.retain(|e| now.saturating_sub(e.created_at) < ttl);

        let loaded = snapshot.exact.len() + snapshot.semantic.len();
        let mut tiers = self.lock();
        for entry in snapshot.exact {
            tiers.exact.put(entry);
        }
        for entry in snapshot.semantic {
            tiers.semantic.put(entry);
        }
        drop(tiers);

        tracing::info!(path = %path.display(), loaded, "Loaded cache snapshot");
        Ok(loaded)
    }

    pub fn stats(&self) -> CacheStats {
        let tiers = self.lock();
        CacheStats {
            exact_entries: tiers.exact.len(),
            semantic_entries: tiers.semantic.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn count(&self, hit: bool, tier: &'static str) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        metrics::record_cache_lookup(tier, hit);
    }

    fn lock(&self) -> MutexGuard<'_, Tiers> {
        self.tiers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Periodically sweep and snapshot the cache until shutdown.
///
/// A final snapshot is written on the way out.
pub async fn run_maintenance(cache: Arc<TieredResponseCache>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so startup is not a sweep.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cache.cleanup_expired();
                if let Err(e) = save_blocking(&cache).await {
                    tracing::warn!(error = %e, "Periodic cache save failed");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Cache maintenance received shutdown signal, exiting loop");
                break;
            }
        }
    }

    if let Err(e) = save_blocking(&cache).await {
        tracing::warn!(error = %e, "Final cache save failed");
    }
}

async fn save_blocking(cache: &Arc<TieredResponseCache>) -> Result<(), PersistenceError> {
    let cache = cache.clone();
    match tokio::task::spawn_blocking(move || cache.save()).await {
        Ok(result) => result,
        Err(e) => Err(PersistenceError::Io(std::io::Error::other(e))),
    }
}
