//! Random load balancing strategy.

use rand::Rng;

use crate::discovery::ServiceInstance;
use crate::load_balancer::{LoadBalancer, NoInstances};

/// Uniform random selector. Carries no state between calls.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn select<'a>(&self, instances: &'a [ServiceInstance]) -> Result<&'a ServiceInstance, NoInstances> {
        if instances.is_empty() {
            return Err(NoInstances);
        }

        let index = rand::thread_rng().gen_range(0..instances.len());
        Ok(&instances[index])
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
