//! In-memory service catalog.
//!
//! Readers load an `Arc` snapshot without locking; writers (register,
//! deregister, config reload) build a new map and swap it in.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::config::StaticInstanceConfig;
use crate::discovery::{DiscoveryClient, Registration, ServiceInstance};

type Catalog = HashMap<String, Vec<ServiceInstance>>;

/// Discovery backed by a static, swappable table of instances.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    services: ArcSwap<Catalog>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from configured instances.
    pub fn from_config(instances: &[StaticInstanceConfig]) -> Self {
        Self {
            services: ArcSwap::from_pointee(build(instances)),
        }
    }

    /// Replace the whole catalog (config reload).
    pub fn replace(&self, instances: &[StaticInstanceConfig]) {
        let catalog = build(instances);
        tracing::info!(services = catalog.len(), "Static discovery catalog replaced");
        self.services.store(Arc::new(catalog));
    }

    /// Names of all services with at least one instance.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.load().keys().cloned().collect();
        names.sort();
        names
    }
}

fn build(instances: &[StaticInstanceConfig]) -> Catalog {
    let mut catalog = Catalog::new();
    for instance in instances {
        catalog
            .entry(instance.service.clone())
            .or_default()
            .push(ServiceInstance::from(instance));
    }
    catalog
}

#[async_trait]
impl DiscoveryClient for StaticCatalog {
    async fn discover_services(&self, service_name: &str) -> Vec<ServiceInstance> {
        let instances = self
            .services
            .load()
            .get(service_name)
            .cloned()
            .unwrap_or_default();
        if instances.is_empty() {
            tracing::debug!(service = %service_name, "No instances in static catalog");
        }
        instances
    }

    async fn register(&self, registration: &Registration) -> bool {
        let instance = ServiceInstance::from(registration);
        self.services.rcu(|current| {
            let mut next = Catalog::clone(current);
            let entries = next.entry(instance.service.clone()).or_default();
            entries.retain(|i| i.id != instance.id);
            entries.push(instance.clone());
            next
        });
        tracing::info!(service = %registration.service, instance_id = %registration.instance_id, "Instance registered");
        true
    }

    async fn deregister(&self, instance_id: &str) -> bool {
        let mut removed = false;
        self.services.rcu(|current| {
            removed = false;
            let mut next = Catalog::clone(current);
            for entries in next.values_mut() {
                let before = entries.len();
                entries.retain(|i| i.id != instance_id);
                removed |= entries.len() != before;
            }
            next.retain(|_, entries| !entries.is_empty());
            next
        });
        if removed {
            tracing::info!(instance_id = %instance_id, "Instance deregistered");
        } else {
            tracing::warn!(instance_id = %instance_id, "Deregister for unknown instance");
        }
        removed
    }
}
