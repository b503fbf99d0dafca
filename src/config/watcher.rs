//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Notice changes to the one configuration file
//! - Reload, validate and hand a new config to the server
//!
//! # Design Decisions
//! - The parent directory is watched, so saves that replace the file by
//!   rename are seen; events for other files in it are ignored
//! - A burst of events is one reload, taken once the file has been quiet
//!   for the debounce window
//! - A rewrite with identical bytes sends nothing
//! - An invalid file is logged and nothing is sent; the server keeps its config

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::GatewayConfig;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the configuration file and sends each new valid config.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
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

    /// Start watching. Must be called inside a Tokio runtime; the returned
    /// watcher must be kept alive, and dropping it stops the reload task.
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
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        // Seeded with the file as it is now, so the first event only reloads
        // if something actually changed.
        let current = std::fs::read(&self.path).ok();
        tokio::spawn(reload_loop(
            self.path.clone(),
            self.debounce,
            event_rx,
            self.update_tx,
            current,
        ));

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
    mut last: Option<Vec<u8>>,
) {
    while events.recv().await.is_some() {
        // Wait for the file to go quiet.
        loop {
            match tokio::time::timeout(debounce, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to read config, keeping current configuration"
                );
                continue;
            }
        };
        if last.as_deref() == Some(content.as_slice()) {
            tracing::debug!(path = ?path, "Config unchanged, not reloading");
            continue;
        }
        last = Some(content.clone());

        let parsed = String::from_utf8(content)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_config(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => {
                tracing::info!(path = ?path, "Config file changed, reloading");
                if updates.send(config).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
            }
        }
    }
}
