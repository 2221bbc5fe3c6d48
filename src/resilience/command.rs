//! Breaker-gated command execution.
//!
//! # Responsibilities
//! - Enforce the per-service concurrency ceiling
//! - Short-circuit while the breaker is open
//! - Enforce the command timeout
//! - Feed outcomes back into the breaker and invoke the fallback on any failure
//!
//! # Design Decisions
//! - `run` is a closure, so a rejected command is never even constructed
//! - On timeout the in-flight future is dropped, which cancels it
//! - Whatever the fallback returns is the result of the command

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, Rejection};

/// Why a command did not produce a value. Handed to the fallback.
#[derive(Debug, Error)]
pub enum CommandError<E> {
    /// Breaker open; `run` was not invoked.
    #[error("circuit open")]
    CircuitOpen,

    /// Concurrency ceiling reached; `run` was not invoked.
    #[error("max concurrency reached")]
    CapacityExceeded,

    /// `run` exceeded the configured timeout.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// `run` returned an error.
    #[error("command failed: {0}")]
    Failed(E),
}

impl<E> CommandError<E> {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CommandError::CircuitOpen => "circuit_open",
            CommandError::CapacityExceeded => "capacity_exceeded",
            CommandError::Timeout(_) => "timeout",
            CommandError::Failed(_) => "failed",
        }
    }

    /// True when `run` was never started.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CommandError::CircuitOpen | CommandError::CapacityExceeded)
    }
}

impl<E> From<Rejection> for CommandError<E> {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::CircuitOpen => CommandError::CircuitOpen,
            Rejection::CapacityExceeded => CommandError::CapacityExceeded,
        }
    }
}

impl CircuitBreaker {
    /// Run a command through this breaker.
    ///
    /// `run` is invoked only when the breaker admits the command. Any
    /// rejection, timeout or error is passed to `fallback`, whose result is
    /// returned.
    pub async fn execute<T, E, F, R, Fut, Fb>(&self, run: R, fallback: Fb) -> Result<T, F>
    where
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Fb: FnOnce(CommandError<E>) -> Result<T, F>,
    {
        let permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(rejection) => return self.fall_back(rejection.into(), fallback),
        };

        let timeout = self.config().timeout();
        let error = match tokio::time::timeout(timeout, run()).await {
            Ok(Ok(value)) => {
                permit.success();
                return Ok(value);
            }
            Ok(Err(e)) => {
                permit.failure();
                CommandError::Failed(e)
            }
            Err(_) => {
                self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                permit.failure();
                CommandError::Timeout(timeout)
            }
        };

        self.fall_back(error, fallback)
    }

    fn fall_back<T, E, F, Fb>(&self, error: CommandError<E>, fallback: Fb) -> Result<T, F>
    where
        Fb: FnOnce(CommandError<E>) -> Result<T, F>,
    {
        self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
        metrics::record_command_failure(self.name(), error.reason());
        fallback(error)
    }
}
