//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::discovery::ServiceInstance;
use crate::load_balancer::{LoadBalancer, NoInstances};

/// Round-robin selector.
/// Stores an internal counter to rotate through instances. The list may
/// change between calls, so the counter is reduced modulo its current length.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn select<'a>(&self, instances: &'a [ServiceInstance]) -> Result<&'a ServiceInstance, NoInstances> {
        if instances.is_empty() {
            return Err(NoInstances);
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % instances.len();
        Ok(&instances[index])
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
