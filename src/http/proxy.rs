//! Proxy handler.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → request.rs (service name + remainder; empty name → 404)
//!     → registry (breaker for the service, created on first use)
//!     → breaker.execute(
//!           discovery → load balancer → rewrite.rs → upstream call,
//!           fallback: log + "execution rejected")
//!     → upstream response streamed back, or 500 with the error text
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
};

use hyper::body::Incoming;

use crate::http::error::{GatewayError, ProxyError};
use crate::http::request::{request_id, ServiceRoute};
use crate::http::rewrite::rewrite_request;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Main proxy handler.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);

    let route = match ServiceRoute::parse(request.uri().path()) {
        Some(route) => route,
        None => {
            tracing::debug!(request_id = %request_id, path = %request.uri().path(), "No service name in path");
            return GatewayError::BadRequest.into_response();
        }
    };
    if !state.routing.is_allowed(&route.service_name) {
        tracing::warn!(request_id = %request_id, service = %route.service_name, "Service not on allow-list");
        return GatewayError::UnknownService(route.service_name).into_response();
    }

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        service = %route.service_name,
        "Proxying request"
    );

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let breaker = state.breakers.breaker_for(&route.service_name);

    let result = breaker
        .execute(
            || forward(&state, &route, client_addr, request),
            |error| {
                tracing::warn!(
                    request_id = %request_id,
                    service = %route.service_name,
                    reason = error.reason(),
                    error = %error,
                    "Proxy error, fallback executed"
                );
                Err(GatewayError::ExecutionRejected)
            },
        )
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    metrics::record_request(&route.service_name, response.status().as_u16(), start_time);
    response
}

/// The breaker-gated command: discover, select, rewrite, forward.
async fn forward(
    state: &AppState,
    route: &ServiceRoute,
    client_addr: Option<SocketAddr>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let instances = state.discovery.discover_services(&route.service_name).await;
    let instance = state.load_balancer.select(&instances)?;

    tracing::info!(
        service = %route.service_name,
        instance_id = %instance.id,
        strategy = state.load_balancer.name(),
        "Selected service instance"
    );

    let upstream = rewrite_request(instance, route, client_addr, request)?;
    let response: hyper::Response<Incoming> = state
        .client
        .request(upstream)
        .await
        .map_err(|source| ProxyError::Forward {
            instance: instance.id.clone(),
            source,
        })?;

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(body)))
}
