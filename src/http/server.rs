//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request deadline, request ID)
//! - Own the breaker registry, discovery client and load balancer
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::StatusCode, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, RoutingConfig};
use crate::discovery::DiscoveryClient;
use crate::http::proxy::proxy_handler;
use crate::load_balancer::{self, LoadBalancer, Random};
use crate::resilience::BreakerRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub breakers: Arc<BreakerRegistry>,
    pub discovery: Arc<dyn DiscoveryClient>,
    pub load_balancer: Arc<dyn LoadBalancer>,
    pub client: Client<HttpConnector, Body>,
    pub routing: Arc<RoutingConfig>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    state: AppState,
}

impl GatewayServer {
    /// Create a new gateway server with the given configuration.
    pub fn new(config: &GatewayConfig, discovery: Arc<dyn DiscoveryClient>) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(
            config.breaker.clone(),
            config.services.clone(),
        ));

        let load_balancer: Arc<dyn LoadBalancer> =
            match load_balancer::from_strategy(&config.load_balancer.strategy) {
                Some(lb) => Arc::from(lb),
                None => {
                    tracing::warn!(
                        strategy = %config.load_balancer.strategy,
                        "Unknown load balancer strategy, using random"
                    );
                    Arc::new(Random::new())
                }
            };

        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(Some(config.breaker.timeout()));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            breakers,
            discovery,
            load_balancer,
            client,
            routing: Arc::new(config.routing.clone()),
        };

        let router = Self::build_router(config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The outer deadline answers 500 like every other failure; validation
    /// keeps it above every breaker timeout so the breaker sees the failure first.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::INTERNAL_SERVER_ERROR,
                Duration::from_secs(config.listener.request_timeout_secs),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The breaker registry, shared with the admin API.
    pub fn breakers(&self) -> Arc<BreakerRegistry> {
        self.state.breakers.clone()
    }

    /// The discovery client, shared with the admin API.
    pub fn discovery(&self) -> Arc<dyn DiscoveryClient> {
        self.state.discovery.clone()
    }

    /// The router, for in-process use without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            strategy = self.state.load_balancer.name(),
            "Gateway server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Gateway server received shutdown signal");
            })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}
