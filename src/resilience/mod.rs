//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request for service S:
//!     → registry.rs (get or lazily create the breaker for S)
//!     → command.rs (capacity check, breaker admission, timeout)
//!     → circuit_breaker.rs (record outcome, trip or reset)
//!     → rolling.rs (bucketed success/failure counts)
//!     → On any failure: fallback decides the result
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every command has a deadline
//! - No retries here: an open breaker is the backoff, half-open is the probe
//! - Breakers are independent per service; no lock spans two services

pub mod circuit_breaker;
pub mod command;
pub mod registry;
pub mod rolling;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use command::CommandError;
pub use registry::BreakerRegistry;
