//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request deadline).
    pub listener: ListenerConfig,

    /// Default circuit breaker settings, used for any service without an override.
    pub breaker: BreakerConfig,

    /// Per-service breaker overrides keyed by service name.
    pub services: HashMap<String, BreakerConfig>,

    /// Service name routing policy.
    pub routing: RoutingConfig,

    /// Instance selection strategy.
    pub load_balancer: LoadBalancerConfig,

    /// Service discovery backend.
    pub discovery: DiscoveryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,

    /// Upper bound on a whole request/response exchange, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Circuit breaker settings for one service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// How long a command may run before it is counted as failed.
    pub timeout_ms: u64,

    /// Maximum commands in flight for one service.
    pub max_concurrent_requests: usize,

    /// Minimum requests in the rolling window before the breaker may trip.
    pub request_volume_threshold: u64,

    /// Time spent open before a single trial request is let through.
    pub sleep_window_ms: u64,

    /// Failure percentage (1-100) at or above which the breaker trips.
    pub error_percent_threshold: u8,

    /// Length of the rolling statistics window, in one-second buckets.
    pub rolling_window_secs: u32,
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sleep_window(&self) -> Duration {
        Duration::from_millis(self.sleep_window_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            max_concurrent_requests: 10,
            request_volume_threshold: 5,
            sleep_window_ms: 5000,
            error_percent_threshold: 50,
            rolling_window_secs: 10,
        }
    }
}

/// Routing policy for service names taken from the request path.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// When non-empty, only these service names are routed; others get 404.
    pub allowed_services: Vec<String>,
}

impl RoutingConfig {
    pub fn is_allowed(&self, service_name: &str) -> bool {
        self.allowed_services.is_empty() || self.allowed_services.iter().any(|s| s == service_name)
    }
}

/// Load balancer selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Strategy name: "random" or "round_robin".
    pub strategy: String,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: "random".to_string(),
        }
    }
}

/// Which discovery backend the gateway consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Instances listed in this file.
    #[default]
    Static,
    /// A Consul agent's health API.
    Consul,
}

/// Service discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,

    /// Base URL of the Consul agent (consul mode only).
    pub consul_address: String,

    /// Request timeout for discovery backend calls, in milliseconds.
    pub consul_timeout_ms: u64,

    /// Statically known instances (static mode only).
    pub instances: Vec<StaticInstanceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Static,
            consul_address: "http://127.0.0.1:8500".to_string(),
            consul_timeout_ms: 2000,
            instances: Vec::new(),
        }
    }
}

/// One statically configured service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticInstanceConfig {
    /// Logical service name the instance belongs to.
    pub service: String,

    /// Unique instance identifier.
    pub id: String,

    /// Host name or IP address.
    pub address: String,

    pub port: u16,

    #[serde(default = "default_health_path")]
    pub health_path: String,
}

fn default_health_path() -> String {
    "/health".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9091".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Interval between breaker snapshots on the event stream.
    pub stream_interval_ms: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:9092".to_string(),
            stream_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9090");
        assert_eq!(config.breaker, BreakerConfig::default());
        assert_eq!(config.discovery.mode, DiscoveryMode::Static);
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_service_overrides_and_instances() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [breaker]
            timeout_ms = 250

            [services.orders]
            request_volume_threshold = 20
            error_percent_threshold = 25

            [[discovery.instances]]
            service = "orders"
            id = "orders-1"
            address = "10.0.0.5"
            port = 9001
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.timeout(), Duration::from_millis(250));
        let orders = &config.services["orders"];
        assert_eq!(orders.request_volume_threshold, 20);
        assert_eq!(orders.error_percent_threshold, 25);
        // Unset fields in an override fall back to the built-in defaults.
        assert_eq!(orders.timeout_ms, 1000);
        assert_eq!(config.discovery.instances[0].health_path, "/health");
    }

    #[test]
    fn test_allow_list() {
        let mut routing = RoutingConfig::default();
        assert!(routing.is_allowed("anything"));
        routing.allowed_services = vec!["orders".into()];
        assert!(routing.is_allowed("orders"));
        assert!(!routing.is_allowed("users"));
    }
}
