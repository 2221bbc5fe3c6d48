//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy command (inside the breaker)
//!     → DiscoveryClient::discover_services(name)
//!         - catalog.rs (in-memory, config driven, hot reloadable)
//!         - consul.rs (Consul agent health API)
//!     → Vec<ServiceInstance> snapshot, fetched fresh for every request
//!     → load_balancer picks one
//! ```
//!
//! # Design Decisions
//! - Lookup errors are logged and reported as an empty list; the caller
//!   cannot tell "backend unreachable" from "zero instances"
//! - Instances are immutable snapshots; the gateway never mutates them
//! - Register/deregister exist for services sitting behind the gateway,
//!   the routing core never calls them

pub mod catalog;
pub mod consul;
pub mod instance;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{DiscoveryConfig, DiscoveryMode};

pub use catalog::StaticCatalog;
pub use consul::ConsulClient;
pub use instance::{Registration, ServiceInstance};

/// Resolves logical service names to live instances.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Return the currently live instances of `service_name`.
    ///
    /// Never fails: lookup errors are logged and yield an empty list.
    async fn discover_services(&self, service_name: &str) -> Vec<ServiceInstance>;

    /// Register an instance. Returns true on success.
    async fn register(&self, registration: &Registration) -> bool;

    /// Remove a previously registered instance. Returns true on success.
    async fn deregister(&self, instance_id: &str) -> bool;
}

/// Discovery backend built from configuration.
///
/// The static catalog is returned separately so that config reloads can
/// replace its contents.
pub fn from_config(
    config: &DiscoveryConfig,
) -> Result<(Arc<dyn DiscoveryClient>, Option<Arc<StaticCatalog>>), consul::ConsulError> {
    match config.mode {
        DiscoveryMode::Static => {
            let catalog = Arc::new(StaticCatalog::from_config(&config.instances));
            Ok((catalog.clone() as Arc<dyn DiscoveryClient>, Some(catalog)))
        }
        DiscoveryMode::Consul => {
            let client = ConsulClient::new(
                &config.consul_address,
                std::time::Duration::from_millis(config.consul_timeout_ms),
            )?;
            Ok((Arc::new(client) as Arc<dyn DiscoveryClient>, None))
        }
    }
}
