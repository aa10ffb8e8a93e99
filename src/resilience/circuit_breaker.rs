//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first can_execute() after recovery_timeout
//! Half-Open → Closed: half_open_max_calls successes
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per upstream operation (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - All transitions happen under a single mutex
//! - Callers that await between admission and verdict hold a [`CallPermit`];
//!   a permit dropped without a verdict counts as a failure, so a cancelled
//!   half-open probe reopens the circuit instead of holding its slot

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::clock::SharedClock;
use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_ms: u64,
    half_open_calls: u32,
    half_open_successes: u32,
}

/// A tri-state failure gate for one upstream operation.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    failure_threshold: u32,
    recovery_timeout: Duration,
    half_open_max_calls: u32,
    clock: SharedClock,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig, clock: SharedClock) -> Self {
        Self {
            name,
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: Duration::from_secs(config.recovery_timeout_secs),
            half_open_max_calls: config.half_open_max_calls.max(1),
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_ms: 0,
                half_open_calls: 0,
                half_open_successes: 0,
            }),
        }
    }

    /// Operation this breaker protects.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask permission for one call.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// here; half-open admits at most `half_open_max_calls` probes.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = self.clock.now_millis().saturating_sub(inner.last_failure_ms);
                if elapsed > self.recovery_timeout.as_millis() as u64 {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.half_open_calls = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.half_open_max_calls {
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Ask permission for one call and get a guard that must be settled.
    ///
    /// Same admission rules as [`can_execute`](Self::can_execute).
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        self.can_execute().then(|| CallPermit { breaker: self, settled: false })
    }

    /// Record a successful call.
    pub fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.half_open_max_calls {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            // A straggler that was admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn on_failure(&self) {
        let mut inner = self.lock();
        inner.last_failure_ms = self.clock.now_millis();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    /// Current state. Does not advance Open → Half-Open.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded while closed.
    pub fn failure_count(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.half_open_calls = 0;
        inner.half_open_successes = 0;
        if to == CircuitState::Closed {
            inner.consecutive_failures = 0;
        }

        match to {
            CircuitState::Open => tracing::warn!(operation = self.name, from = %from, "Circuit opened"),
            _ => tracing::info!(operation = self.name, from = %from, to = %to, "Circuit state changed"),
        }
        metrics::record_circuit_state(self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An admitted call. Settle it with [`success`](Self::success) or
/// [`failure`](Self::failure); dropping it unsettled records a failure.
#[must_use = "an unsettled permit records a failure when dropped"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl CallPermit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(operation = self.breaker.name, "Call abandoned before completion, counting as failure");
            self.breaker.on_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn breaker(threshold: u32, half_open: u32) -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = BreakerConfig {
            failure_threshold: threshold,
            recovery_timeout_secs: 30,
            half_open_max_calls: half_open,
        };
        (CircuitBreaker::new("test", config, clock.clone()), clock)
    }

    #[test]
    fn test_opens_after_threshold() {
        let (cb, _) = breaker(3, 1);

        cb.on_failure();
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_execute());

        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let (cb, _) = breaker(3, 1);
        cb.on_failure();
        cb.on_failure();
        cb.on_success();
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn test_half_open_after_recovery_timeout() {
        let (cb, clock) = breaker(1, 1);
        cb.on_failure();
        assert!(!cb.can_execute());

        clock.advance(Duration::from_secs(30));
        assert!(!cb.can_execute(), "timeout must be strictly exceeded");

        clock.advance(Duration::from_millis(1));
        assert!(cb.can_execute());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        // Only one probe while half-open.
        assert!(!cb.can_execute());
    }

    #[test]
    fn test_failure_in_half_open_reopens() {
        let (cb, clock) = breaker(2, 1);
        cb.on_failure();
        cb.on_failure();
        clock.advance(Duration::from_secs(31));
        assert!(cb.can_execute());

        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());
    }

    #[test]
    fn test_half_open_successes_close() {
        let (cb, clock) = breaker(1, 2);
        cb.on_failure();
        clock.advance(Duration::from_secs(31));

        assert!(cb.can_execute());
        assert!(cb.can_execute());
        assert!(!cb.can_execute());

        cb.on_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.on_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
        assert!(cb.can_execute());
    }

    #[test]
    fn test_abandoned_half_open_permit_reopens() {
        let (cb, clock) = breaker(1, 1);
        cb.on_failure();
        clock.advance(Duration::from_secs(31));

        let permit = cb.try_acquire().unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        drop(permit);
        assert_eq!(cb.state(), CircuitState::Open);

        // The next recovery window admits a fresh probe.
        clock.advance(Duration::from_secs(31));
        let permit = cb.try_acquire().unwrap();
        permit.success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_settled_permit_records_once() {
        let (cb, _) = breaker(2, 1);
        cb.try_acquire().unwrap().failure();
        assert_eq!(cb.failure_count(), 1);
        cb.try_acquire().unwrap().success();
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_concurrent_failures_open_once() {
        let (cb, _) = breaker(50, 1);
        let cb = Arc::new(cb);
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        cb.on_failure();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
