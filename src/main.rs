//! Service gateway
//!
//! Routes `/{service}/{rest}` to a live instance of `service`, with every
//! call wrapped in that service's circuit breaker.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server ──▶ http::proxy ──▶ resilience (breaker for {service})
//!                                                          │
//!                                                          ▼
//!                                                   discovery ──▶ load_balancer
//!                                                          │
//!     Client Response                                      ▼
//!     ◀─────────────── upstream response, or 500 ◀── instance http://addr:port/{rest}
//!
//!     Cross-cutting: config (TOML + hot reload), observability, admin API, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use service_gateway::config::{load_config, GatewayConfig};
use service_gateway::lifecycle::startup;
use service_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "service-gateway", version, about = "Circuit-breaking API gateway")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        strategy = %config.load_balancer.strategy,
        "Configuration loaded"
    );

    startup::run(config, args.config).await?;
    Ok(())
}
