//! Framework directory gateway.
//!
//! ```text
//!                    ┌──────────────────────── GATEWAY ─────────────────────────┐
//!                    │                                                          │
//!   Browser ─────────┼─▶ request id ─▶ bypass ──(non-GET, not /api/)──────────┐ │
//!                    │                   │                                     │ │
//!                    │                   ▼                                     │ │
//!                    │              page routes ──(no match)──▶ api_fallback ──┤ │
//!                    │                   │                                     │ │
//!                    │                   ▼                                     ▼ │
//!                    │        fetch / fetch_all / csrf ───────────────▶ API Server
//!                    │                   │                                       │
//!   Browser ◀────────┼─── HTML + props ◀─┘ (307 to login on 401, 404 otherwise)  │
//!                    └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The configuration file is named by the first argument or `GATEWAY_CONFIG`;
//! without either, defaults are used and nothing is watched.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use bff_gateway::config::watcher::ConfigWatcher;
use bff_gateway::config::{load_config, GatewayConfig};
use bff_gateway::lifecycle::{wait_for_signal, Shutdown};
use bff_gateway::observability::{logging, metrics};
use bff_gateway::HttpServer;

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("GATEWAY_CONFIG").map(PathBuf::from))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();
    let config = match &path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bff-gateway starting");

    tracing::info!(
        config = ?path,
        bind_address = %config.listener.bind_address,
        api = %config.api.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));

    if let Err(e) = wait_for_signal().await {
        tracing::error!(error = %e, "Failed to listen for signals");
    }
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
