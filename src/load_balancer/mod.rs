//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery returns fresh instance list
//!     → Apply load balancing algorithm:
//!         - random.rs (uniform random pick, no state)
//!         - round_robin.rs (rotate through instances)
//!     → Return one instance or NoInstances
//! ```
//!
//! # Design Decisions
//! - Strategies only see the list handed to them; callers never cache a pick
//! - Strategies are shared across all requests, so any state is atomic
//! - Strategy selection is process-wide, chosen from config

pub mod random;
pub mod round_robin;

use std::fmt::Debug;

use thiserror::Error;

use crate::discovery::ServiceInstance;

pub use random::Random;
pub use round_robin::RoundRobin;

/// Returned when there is nothing to select from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no service instances available")]
pub struct NoInstances;

/// Picks one instance out of a freshly discovered list.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Select an instance. Fails only when `instances` is empty.
    fn select<'a>(&self, instances: &'a [ServiceInstance]) -> Result<&'a ServiceInstance, NoInstances>;

    /// Strategy name, for logs.
    fn name(&self) -> &'static str;
}

/// Build a strategy from its configured name.
pub fn from_strategy(name: &str) -> Option<Box<dyn LoadBalancer>> {
    match name {
        "random" => Some(Box::new(Random::new())),
        "round_robin" | "round-robin" => Some(Box::new(RoundRobin::new())),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn test_instances(count: u16) -> Vec<ServiceInstance> {
    (0..count)
        .map(|i| ServiceInstance::new("orders", format!("orders-{}", i), "127.0.0.1", 9000 + i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_strategy() {
        assert_eq!(from_strategy("random").unwrap().name(), "random");
        assert_eq!(from_strategy("round_robin").unwrap().name(), "round_robin");
        assert!(from_strategy("weighted").is_none());
    }

    #[test]
    fn test_empty_list_fails_for_every_strategy() {
        for name in ["random", "round_robin"] {
            let lb = from_strategy(name).unwrap();
            assert_eq!(lb.select(&[]), Err(NoInstances));
        }
    }
}
