//! Service instance types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::StaticInstanceConfig;

/// One running, addressable replica of a backend service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Unique instance identifier.
    pub id: String,
    /// Logical service name.
    pub service: String,
    pub address: String,
    pub port: u16,
    /// Path the discovery backend probes for health.
    pub health_path: String,
}

impl ServiceInstance {
    pub fn new(
        service: impl Into<String>,
        id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            address: address.into(),
            port,
            health_path: "/health".to_string(),
        }
    }

    /// `address:port`, suitable for a URI authority.
    pub fn authority(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.authority())
    }
}

impl From<&StaticInstanceConfig> for ServiceInstance {
    fn from(config: &StaticInstanceConfig) -> Self {
        Self {
            id: config.id.clone(),
            service: config.service.clone(),
            address: config.address.clone(),
            port: config.port,
            health_path: config.health_path.clone(),
        }
    }
}

/// Self-registration request for a service behind the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub service: String,
    pub instance_id: String,
    pub health_path: String,
    pub host: String,
    pub port: u16,
}

impl From<&Registration> for ServiceInstance {
    fn from(reg: &Registration) -> Self {
        Self {
            id: reg.instance_id.clone(),
            service: reg.service.clone(),
            address: reg.host.clone(),
            port: reg.port,
            health_path: reg.health_path.clone(),
        }
    }
}
