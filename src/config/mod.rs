//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared with the breaker registry, discovery and servers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → static discovery catalog swapped atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Breaker settings are creation-time only; reloads never reconfigure a live breaker
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, DiscoveryConfig, DiscoveryMode, GatewayConfig, ListenerConfig,
    LoadBalancerConfig, LogFormat, ObservabilityConfig, RoutingConfig, StaticInstanceConfig,
};
