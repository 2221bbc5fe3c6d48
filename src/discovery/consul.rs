//! Consul discovery backend.
//!
//! # Responsibilities
//! - Query passing instances through the agent health API
//! - Register/deregister instances with an HTTP health check
//!
//! # Design Decisions
//! - Every agent call is bounded by the configured timeout
//! - Only instances whose checks are passing are returned
//! - An instance without its own address falls back to the node address

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::discovery::{DiscoveryClient, Registration, ServiceInstance};

/// Errors raised while talking to the Consul agent.
#[derive(Debug, Error)]
pub enum ConsulError {
    #[error("invalid consul address '{0}': {1}")]
    Address(String, url::ParseError),

    #[error("consul request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("consul returned status {0}")]
    Status(reqwest::StatusCode),
}

const CHECK_INTERVAL: &str = "15s";
const DEREGISTER_CRITICAL_AFTER: &str = "30s";

/// Thin client over the Consul agent HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulClient {
    base_url: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(rename = "Node")]
    node: NodeEntry,
    #[serde(rename = "Service")]
    service: ServiceEntry,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    #[serde(rename = "Address", default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Meta", default)]
    meta: Option<std::collections::HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    meta: AgentMeta<'a>,
    check: AgentCheck,
}

#[derive(Debug, Serialize)]
struct AgentMeta<'a> {
    health_path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentCheck {
    #[serde(rename = "HTTP")]
    http: String,
    interval: &'static str,
    deregister_critical_service_after: &'static str,
}

impl ConsulClient {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, ConsulError> {
        let base_url =
            Url::parse(address).map_err(|e| ConsulError::Address(address.to_string(), e))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConsulError> {
        self.base_url
            .join(path)
            .map_err(|e| ConsulError::Address(self.base_url.to_string(), e))
    }

    async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, ConsulError> {
        let mut url = self.endpoint("v1/health/service/")?;
        // Pushed as a segment so the name is percent-encoded.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(service_name);
        }
        url.query_pairs_mut().append_pair("passing", "true");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ConsulError::Status(response.status()));
        }
        let entries: Vec<HealthEntry> = response.json().await?;

        Ok(entries.into_iter().map(HealthEntry::into_instance).collect())
    }

    async fn put(&self, url: Url, body: Option<&AgentRegistration<'_>>) -> Result<(), ConsulError> {
        let mut request = self.client.put(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ConsulError::Status(response.status()));
        }
        Ok(())
    }
}

impl HealthEntry {
    fn into_instance(self) -> ServiceInstance {
        let address = if self.service.address.is_empty() {
            self.node.address
        } else {
            self.service.address
        };
        let health_path = self
            .service
            .meta
            .and_then(|mut m| m.remove("health_path"))
            .unwrap_or_else(|| "/health".to_string());
        ServiceInstance {
            id: self.service.id,
            service: self.service.service,
            address,
            port: self.service.port,
            health_path,
        }
    }
}

#[async_trait]
impl DiscoveryClient for ConsulClient {
    async fn discover_services(&self, service_name: &str) -> Vec<ServiceInstance> {
        match self.fetch_instances(service_name).await {
            Ok(instances) => instances,
            Err(e) => {
                tracing::error!(service = %service_name, error = %e, "Service discovery failed");
                Vec::new()
            }
        }
    }

    async fn register(&self, registration: &Registration) -> bool {
        let body = AgentRegistration {
            id: &registration.instance_id,
            name: &registration.service,
            address: &registration.host,
            port: registration.port,
            meta: AgentMeta {
                health_path: &registration.health_path,
            },
            check: AgentCheck {
                http: format!(
                    "http://{}:{}{}",
                    registration.host, registration.port, registration.health_path
                ),
                interval: CHECK_INTERVAL,
                deregister_critical_service_after: DEREGISTER_CRITICAL_AFTER,
            },
        };

        let result = match self.endpoint("v1/agent/service/register") {
            Ok(url) => self.put(url, Some(&body)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(service = %registration.service, instance_id = %registration.instance_id, "Registered with consul");
                true
            }
            Err(e) => {
                tracing::error!(instance_id = %registration.instance_id, error = %e, "Consul registration failed");
                false
            }
        }
    }

    async fn deregister(&self, instance_id: &str) -> bool {
        let result = match self.endpoint("v1/agent/service/deregister/") {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(instance_id);
                }
                self.put(url, None).await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(instance_id = %instance_id, "Deregistered from consul");
                true
            }
            Err(e) => {
                tracing::error!(instance_id = %instance_id, error = %e, "Consul deregistration failed");
                false
            }
        }
    }
}
