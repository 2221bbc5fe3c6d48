//! Breaker registry.
//!
//! # Responsibilities
//! - Map service names to their circuit breakers
//! - Create each breaker exactly once, even under concurrent first use
//! - Resolve per-service configuration overrides at creation time
//!
//! # Design Decisions
//! - Owned by the server state, not a process-wide global
//! - Fast path is a shard read; creation re-checks under the shard write lock
//! - Entries are never removed; bound the name space with the routing allow-list

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::BreakerConfig;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker};

/// All circuit breakers known to one gateway.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    defaults: BreakerConfig,
    overrides: HashMap<String, BreakerConfig>,
}

impl BreakerRegistry {
    /// Create a registry with a default config and per-service overrides.
    pub fn new(defaults: BreakerConfig, overrides: HashMap<String, BreakerConfig>) -> Self {
        Self {
            breakers: DashMap::new(),
            defaults,
            overrides,
        }
    }

    /// Return the breaker for `name`, creating it with `config` if absent.
    ///
    /// `config` is ignored when the breaker already exists.
    pub fn get_or_create(&self, name: &str, config: &BreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.value().clone();
        }

        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(service = %name, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(name, config.clone()))
            })
            .value()
            .clone()
    }

    /// Return the breaker for `name`, using its override or the default config.
    pub fn breaker_for(&self, name: &str) -> Arc<CircuitBreaker> {
        let config = self.overrides.get(name).unwrap_or(&self.defaults);
        self.get_or_create(name, config)
    }

    /// Pre-register a breaker. Returns false if one already existed.
    pub fn configure(&self, name: &str, config: BreakerConfig) -> bool {
        let mut created = false;
        self.breakers.entry(name.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(CircuitBreaker::new(name, config))
        });
        created
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|entry| entry.value().clone()).collect();
        let mut snapshots: Vec<BreakerSnapshot> = breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = BreakerRegistry::default();
        let a = registry.get_or_create("orders", &BreakerConfig::default());
        let b = registry.get_or_create(
            "orders",
            &BreakerConfig {
                timeout_ms: 1,
                ..BreakerConfig::default()
            },
        );

        assert!(Arc::ptr_eq(&a, &b));
        // Config applies at creation only
        assert_eq!(b.config().timeout_ms, 1000);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_first_use_creates_one_breaker() {
        let registry = Arc::new(BreakerRegistry::default());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.breaker_for("orders")
                })
            })
            .collect();

        let breakers: Vec<Arc<CircuitBreaker>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        let first = &breakers[0];
        assert!(breakers.iter().all(|b| Arc::ptr_eq(b, first)));
        // Registry holds one reference, each thread result holds one
        assert_eq!(Arc::strong_count(first), threads + 1);
    }

    #[test]
    fn test_overrides_and_configure() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "orders".to_string(),
            BreakerConfig {
                request_volume_threshold: 20,
                ..BreakerConfig::default()
            },
        );
        let registry = BreakerRegistry::new(BreakerConfig::default(), overrides);

        assert_eq!(registry.breaker_for("orders").config().request_volume_threshold, 20);
        assert_eq!(registry.breaker_for("users").config().request_volume_threshold, 5);

        assert!(registry.configure("billing", BreakerConfig { timeout_ms: 50, ..BreakerConfig::default() }));
        assert!(!registry.configure("billing", BreakerConfig::default()));
        assert_eq!(registry.breaker_for("billing").config().timeout_ms, 50);

        assert!(registry.get("unknown").is_none());
        let names: Vec<String> = registry.snapshots().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["billing", "orders", "users"]);
    }
}
