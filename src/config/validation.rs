//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, percentages in 1..=100)
//! - Keep every breaker timeout below the listener's request deadline
//! - Check bind addresses parse
//! - Detect duplicate static instance ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerConfig, DiscoveryMode, GatewayConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: String },

    #[error("{field}: must be between 1 and 100, got {value}")]
    Percent { field: String, value: u8 },

    #[error("discovery.instances[{index}]: {reason}")]
    Instance { index: usize, reason: String },

    #[error("load_balancer.strategy: unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("discovery.consul_address: invalid URL '{0}'")]
    ConsulAddress(String),

    #[error("{field}: {timeout_ms}ms must be below listener.request_timeout_secs ({deadline_ms}ms)")]
    TimeoutNotBelowDeadline {
        field: String,
        timeout_ms: u64,
        deadline_ms: u64,
    },
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.request_timeout_secs".into(),
        });
    }

    let deadline_ms = config.listener.request_timeout_secs.saturating_mul(1000);
    check_breaker(&mut errors, "breaker", &config.breaker, deadline_ms);
    for (name, breaker) in &config.services {
        check_breaker(&mut errors, &format!("services.{}", name), breaker, deadline_ms);
    }

    if crate::load_balancer::from_strategy(&config.load_balancer.strategy).is_none() {
        errors.push(ValidationError::UnknownStrategy(
            config.load_balancer.strategy.clone(),
        ));
    }

    if config.discovery.mode == DiscoveryMode::Consul
        && url::Url::parse(&config.discovery.consul_address).is_err()
    {
        errors.push(ValidationError::ConsulAddress(
            config.discovery.consul_address.clone(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for (index, instance) in config.discovery.instances.iter().enumerate() {
        if instance.service.is_empty() {
            errors.push(ValidationError::Instance { index, reason: "empty service name".into() });
        }
        if instance.id.is_empty() {
            errors.push(ValidationError::Instance { index, reason: "empty id".into() });
        } else if !seen_ids.insert(instance.id.as_str()) {
            errors.push(ValidationError::Instance {
                index,
                reason: format!("duplicate id '{}'", instance.id),
            });
        }
        if instance.address.is_empty() {
            errors.push(ValidationError::Instance { index, reason: "empty address".into() });
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.stream_interval_ms == 0 {
            errors.push(ValidationError::Zero {
                field: "admin.stream_interval_ms".into(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.into(),
            value: value.into(),
        });
    }
}

fn check_breaker(
    errors: &mut Vec<ValidationError>,
    prefix: &str,
    breaker: &BreakerConfig,
    deadline_ms: u64,
) {
    let zero_fields = [
        ("timeout_ms", breaker.timeout_ms == 0),
        ("max_concurrent_requests", breaker.max_concurrent_requests == 0),
        ("sleep_window_ms", breaker.sleep_window_ms == 0),
        ("rolling_window_secs", breaker.rolling_window_secs == 0),
    ];
    for (field, is_zero) in zero_fields {
        if is_zero {
            errors.push(ValidationError::Zero {
                field: format!("{}.{}", prefix, field),
            });
        }
    }

    if !(1..=100).contains(&breaker.error_percent_threshold) {
        errors.push(ValidationError::Percent {
            field: format!("{}.error_percent_threshold", prefix),
            value: breaker.error_percent_threshold,
        });
    }

    // A zero deadline is already reported on the listener.
    if deadline_ms > 0 && breaker.timeout_ms >= deadline_ms {
        errors.push(ValidationError::TimeoutNotBelowDeadline {
            field: format!("{}.timeout_ms", prefix),
            timeout_ms: breaker.timeout_ms,
            deadline_ms,
        });
    }
}
