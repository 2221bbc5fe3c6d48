//! Config file hot reload.
//!
//! The parent directory is watched rather than the file, so editors that
//! save by writing a temp file and renaming it over the original keep
//! triggering reloads. Filesystem events are coalesced for `debounce` before
//! the file is read, so a truncate-then-write never loads the empty file.
//!
//! Breaker settings are read once, when a service's breaker is first built,
//! so a reload only reaches subsystems that consume the receiver (the static
//! discovery catalog).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches one config file and sends every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver for validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called inside a Tokio runtime.
    ///
    /// Reloads stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self
            .path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file_name) => {
                let _ = event_tx.send(());
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        tokio::spawn(reload_loop(self.path, self.debounce, event_rx, self.update_tx));
        Ok(watcher)
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
) {
    while events.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while events.try_recv().is_ok() {}

        match load_config(&path) {
            Ok(config) => {
                tracing::info!(path = ?path, "Config file reloaded");
                if updates.send(config).is_err() {
                    break;
                }
            }
            Err(e) => tracing::error!(
                path = ?path,
                error = %e,
                "Config reload rejected, keeping current configuration"
            ),
        }
    }
}
