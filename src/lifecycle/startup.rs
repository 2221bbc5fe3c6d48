//! Startup orchestration.
//!
//! Order: observability, discovery, breakers + proxy, admin, config watcher,
//! then the listeners. Any failure before the listeners are bound is fatal.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{self, AdminState};
use crate::config::watcher::ConfigWatcher;
use crate::config::GatewayConfig;
use crate::discovery::{self, consul::ConsulError, StaticCatalog};
use crate::http::GatewayServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("discovery: {0}")]
    Discovery(#[from] ConsulError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the gateway until SIGINT/SIGTERM.
///
/// Logging must already be initialised. `config_path`, when present, is
/// watched and reloads are applied to the static catalog.
pub async fn run(config: GatewayConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let (discovery, catalog) = discovery::from_config(&config.discovery)?;
    tracing::info!(mode = ?config.discovery.mode, "Discovery client ready");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(&config, discovery);

    let mut tasks = Vec::new();

    if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let state = AdminState::new(&config.admin, server.breakers(), server.discovery());
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve_admin(listener, state, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    }

    // The notify watcher stops when dropped, so it lives until run returns.
    let _watcher = match (config_path, catalog) {
        (Some(path), Some(catalog)) => spawn_reload(path, catalog, &shutdown),
        _ => None,
    };

    let listener = bind(&config.listener.bind_address).await?;

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_shutdown().await;
        trigger.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

fn spawn_reload(
    path: PathBuf,
    catalog: Arc<StaticCatalog>,
    shutdown: &Shutdown,
) -> Option<notify::RecommendedWatcher> {
    let (watcher, mut updates) = ConfigWatcher::new(&path);
    let watcher = match watcher.run() {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            return None;
        }
    };

    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(new_config) = updates.recv() => {
                    catalog.replace(&new_config.discovery.instances);
                    tracing::info!(
                        services = ?catalog.service_names(),
                        "Static catalog reloaded"
                    );
                }
                _ = stop.recv() => break,
                else => break,
            }
        }
    });

    Some(watcher)
}
