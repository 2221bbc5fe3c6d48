//! Circuit breaker for per-service protection.
//!
//! # States
//! - Closed: normal operation, commands run
//! - Open: service assumed down, commands fail fast
//! - Half-Open: one trial command is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: requests >= volume threshold AND error % >= threshold, within the rolling window
//! Open → Half-Open: sleep window elapsed (checked lazily on access)
//! Half-Open → Closed: trial succeeds (window reset)
//! Half-Open → Open: trial fails or is abandoned (sleep window restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per service name, never per instance
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open (prevents hammering a recovering service)
//! - Concurrency ceiling checked before the state, so a capacity rejection
//!   never consumes the trial
//! - State and window share one small per-breaker mutex; lifetime counters are atomics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::{Duration, Instant};

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::rolling::{RollingWindow, WindowCounts};

/// Public view of a breaker's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    Open { since: Instant },
    HalfOpen { trial_in_flight: bool },
}

impl State {
    fn public(&self) -> CircuitState {
        match self {
            State::Closed => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: State,
    window: RollingWindow,
}

/// Why a command was refused before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    CircuitOpen,
    CapacityExceeded,
}

/// Lifetime counters, exposed through snapshots.
#[derive(Debug, Default)]
pub(crate) struct BreakerStats {
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    pub timeouts: AtomicU64,
    pub short_circuits: AtomicU64,
    pub capacity_rejections: AtomicU64,
    pub fallbacks: AtomicU64,
}

/// Per-service circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    pub(crate) stats: BreakerStats,
}

/// Point-in-time view of one breaker, for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub in_flight: usize,
    pub window_requests: u64,
    pub window_failures: u64,
    pub error_percent: u8,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_timeouts: u64,
    pub total_short_circuits: u64,
    pub total_capacity_rejections: u64,
    pub total_fallbacks: u64,
    pub config: BreakerConfig,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let window = RollingWindow::new(config.rolling_window_secs as usize, Duration::from_secs(1));
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                window,
            }),
            in_flight: AtomicUsize::new(0),
            stats: BreakerStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state, advancing Open → Half-Open if the sleep window has passed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.advance(&mut inner, Instant::now());
        inner.state.public()
    }

    /// Commands currently holding a concurrency slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Rolling window counts at this moment.
    pub fn window_counts(&self) -> WindowCounts {
        self.lock().window.counts(Instant::now())
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let (state, counts) = {
            let mut inner = self.lock();
            let now = Instant::now();
            self.advance(&mut inner, now);
            (inner.state.public(), inner.window.counts(now))
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state,
            in_flight: self.in_flight(),
            window_requests: counts.total(),
            window_failures: counts.failures,
            error_percent: counts.error_percent(),
            total_successes: self.stats.successes.load(Ordering::Relaxed),
            total_failures: self.stats.failures.load(Ordering::Relaxed),
            total_timeouts: self.stats.timeouts.load(Ordering::Relaxed),
            total_short_circuits: self.stats.short_circuits.load(Ordering::Relaxed),
            total_capacity_rejections: self.stats.capacity_rejections.load(Ordering::Relaxed),
            total_fallbacks: self.stats.fallbacks.load(Ordering::Relaxed),
            config: self.config.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, inner: &mut Inner, now: Instant) {
        if let State::Open { since } = inner.state {
            if now.saturating_duration_since(since) >= self.config.sleep_window() {
                self.transition(inner, State::HalfOpen { trial_in_flight: false });
            }
        }
    }

    fn transition(&self, inner: &mut Inner, next: State) {
        let from = inner.state.public();
        let to = next.public();
        inner.state = next;
        if from != to {
            tracing::warn!(service = %self.name, from = %from, to = %to, "Circuit breaker state transition");
            metrics::record_breaker_transition(&self.name, from.as_str(), to.as_str());
        }
    }

    /// Take a concurrency slot, then ask the state machine for admission.
    pub(crate) fn try_acquire(&self) -> Result<Permit<'_>, Rejection> {
        let mut current = self.in_flight.load(Ordering::Relaxed);
        loop {
            if current >= self.config.max_concurrent_requests {
                self.stats.capacity_rejections.fetch_add(1, Ordering::Relaxed);
                return Err(Rejection::CapacityExceeded);
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        // From here on the slot is owned by the permit; dropping it releases the slot.
        let mut permit = Permit {
            breaker: self,
            trial: false,
            settled: false,
        };

        let mut inner = self.lock();
        self.advance(&mut inner, Instant::now());
        match inner.state {
            State::Closed => {}
            State::HalfOpen { trial_in_flight: false } => {
                inner.state = State::HalfOpen { trial_in_flight: true };
                permit.trial = true;
                tracing::info!(service = %self.name, "Circuit breaker admitting trial request");
            }
            State::Open { .. } | State::HalfOpen { trial_in_flight: true } => {
                drop(inner);
                permit.settled = true;
                self.stats.short_circuits.fetch_add(1, Ordering::Relaxed);
                return Err(Rejection::CircuitOpen);
            }
        }
        Ok(permit)
    }

    fn record(&self, trial: bool, success: bool) {
        if success {
            self.stats.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
        }

        let now = Instant::now();
        let mut inner = self.lock();
        if success {
            inner.window.record_success(now);
        } else {
            inner.window.record_failure(now);
        }

        if trial {
            if success {
                inner.window.reset();
                self.transition(&mut inner, State::Closed);
            } else {
                self.transition(&mut inner, State::Open { since: now });
            }
            return;
        }

        // A success can be the request that reaches the volume threshold.
        if matches!(inner.state, State::Closed) {
            let counts = inner.window.counts(now);
            if counts.total() >= self.config.request_volume_threshold
                && counts.exceeds(self.config.error_percent_threshold)
            {
                tracing::warn!(
                    service = %self.name,
                    requests = counts.total(),
                    error_percent = counts.error_percent(),
                    "Circuit breaker tripped"
                );
                self.transition(&mut inner, State::Open { since: now });
            }
        }
    }

    fn abandon_trial(&self) {
        let mut inner = self.lock();
        if let State::HalfOpen { trial_in_flight: true } = inner.state {
            tracing::debug!(service = %self.name, "Trial request abandoned, re-opening");
            self.transition(&mut inner, State::Open { since: Instant::now() });
        }
    }
}

/// Admission ticket for one command.
///
/// Holds a concurrency slot until dropped. An outcome must be reported with
/// [`Permit::success`] or [`Permit::failure`]; a trial permit dropped without
/// an outcome re-opens the breaker.
#[derive(Debug)]
pub(crate) struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Permit<'_> {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record(self.trial, true);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record(self.trial, false);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.abandon_trial();
        }
        self.breaker.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
