//! Admin API: breaker state feed and discovery inspection.
//!
//! Served on its own listener so it is never reachable through the proxy path.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AdminConfig;
use crate::discovery::DiscoveryClient;
use crate::resilience::BreakerRegistry;

use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub breakers: Arc<BreakerRegistry>,
    pub discovery: Arc<dyn DiscoveryClient>,
    pub api_key: Arc<str>,
    pub stream_interval: Duration,
}

impl AdminState {
    pub fn new(
        config: &AdminConfig,
        breakers: Arc<BreakerRegistry>,
        discovery: Arc<dyn DiscoveryClient>,
    ) -> Self {
        Self {
            breakers,
            discovery,
            api_key: Arc::from(config.api_key.as_str()),
            stream_interval: Duration::from_millis(config.stream_interval_ms),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/breakers/stream", get(stream_breakers))
        .route("/admin/breakers/{name}", get(get_breaker))
        .route("/admin/services/{name}", get(get_service_instances))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve_admin(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
