//! Gateway error types.
//!
//! `ProxyError` is what a forwarding command fails with inside the breaker;
//! it never reaches the client directly. `GatewayError` is what the handler
//! turns into a response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::load_balancer::NoInstances;

/// Failure of the forwarding command itself.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    NoInstances(#[from] NoInstances),

    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),

    #[error("forwarding to instance {instance} failed: {source}")]
    Forward {
        instance: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

/// Errors that become client-visible responses.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request path has no service segment.
    #[error("missing service name")]
    BadRequest,

    /// The service name is not on the routing allow-list.
    #[error("unknown service '{0}'")]
    UnknownService(String),

    /// The breaker-gated command failed or was rejected; the fallback ran.
    #[error("execution rejected")]
    ExecutionRejected,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest | GatewayError::UnknownService(_) => StatusCode::NOT_FOUND,
            GatewayError::ExecutionRejected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::BadRequest | GatewayError::UnknownService(_) => {
                self.status().into_response()
            }
            GatewayError::ExecutionRejected => (self.status(), self.to_string()).into_response(),
        }
    }
}
