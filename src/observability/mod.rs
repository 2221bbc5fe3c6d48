//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events: service, instance id, error)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin breaker feed (see admin module)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through logs via the x-request-id header
//! - Observability is advisory; nothing here affects routing outcomes

pub mod logging;
pub mod metrics;
