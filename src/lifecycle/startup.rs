//! Non-blocking startup.
//!
//! # Responsibilities
//! - Run the startup sequence (availability probe, model provisioning) in a
//!   background task so the service can accept traffic immediately
//! - Publish a one-shot outcome readable by any number of callers
//!
//! # Design Decisions
//! - The outcome is set exactly once; later completions are ignored
//! - A panicking startup task counts as FAILED

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

/// Outcome of background initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitializationStatus {
    Pending,
    Succeeded,
    Failed,
}

impl InitializationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitializationStatus::Pending => "pending",
            InitializationStatus::Succeeded => "succeeded",
            InitializationStatus::Failed => "failed",
        }
    }
}

/// Runs the startup sequence once, off the request path.
#[derive(Debug)]
pub struct NonBlockingInitializer {
    status: Arc<watch::Sender<InitializationStatus>>,
    started: AtomicBool,
}

impl Default for NonBlockingInitializer {
    fn default() -> Self {
        Self::new()
    }
}

impl NonBlockingInitializer {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(InitializationStatus::Pending);
        Self { status: Arc::new(tx), started: AtomicBool::new(false) }
    }

    /// Spawn `sequence`. `true` from the sequence means SUCCEEDED.
    ///
    /// Only the first call starts anything.
    pub fn start<F>(&self, sequence: F)
    where
        F: Future<Output = bool> + Send + 'static,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!("Initialization already started");
            return;
        }

        let status = self.status.clone();
        let handle = tokio::spawn(sequence);
        tokio::spawn(async move {
            let outcome = match handle.await {
                Ok(true) => InitializationStatus::Succeeded,
                Ok(false) => InitializationStatus::Failed,
                Err(e) => {
                    tracing::error!(error = %e, "Initialization task aborted");
                    InitializationStatus::Failed
                }
            };
            publish(&status, outcome);
        });
    }

    /// Record an outcome directly. Returns `false` if one was already set.
    pub fn complete(&self, succeeded: bool) -> bool {
        let outcome = if succeeded { InitializationStatus::Succeeded } else { InitializationStatus::Failed };
        publish(&self.status, outcome)
    }

    pub fn is_complete(&self) -> bool {
        self.last_outcome() != InitializationStatus::Pending
    }

    pub fn last_outcome(&self) -> InitializationStatus {
        *self.status.borrow()
    }

    /// Wait up to `timeout` for an outcome; returns whatever is current then.
    pub async fn wait_until_complete(&self, timeout: Duration) -> InitializationStatus {
        let mut rx = self.status.subscribe();
        let _ = tokio::time::timeout(timeout, rx.wait_for(|s| *s != InitializationStatus::Pending)).await;
        self.last_outcome()
    }
}

fn publish(status: &watch::Sender<InitializationStatus>, outcome: InitializationStatus) -> bool {
    let set = status.send_if_modified(|current| {
        if *current == InitializationStatus::Pending {
            *current = outcome;
            true
        } else {
            false
        }
    });
    if set {
        tracing::info!(outcome = outcome.as_str(), "Initialization complete");
    }
    set
}
