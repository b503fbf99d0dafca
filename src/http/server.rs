//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with page routes, bypass and fallback
//! - Wire up middleware (request ID, tracing, optional timeout)
//! - Hold the hot-swappable gateway state
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::http::request::MakeRequestUuidV4;
use crate::pages;
use crate::routing::{api_fallback, bypass_middleware, BypassRule};
use crate::upstream::{http_client, ApiClient, HttpClient};

/// Everything a request needs, compiled from one configuration.
#[derive(Debug)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub api: ApiClient,
    pub bypass: BypassRule,
}

impl GatewayState {
    /// Validate `config` and compile it around an existing upstream client.
    pub fn compile(config: GatewayConfig, client: HttpClient) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiClient::with_client(&config, client)?,
            bypass: BypassRule::new(&config.api.prefix),
            config,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<ArcSwap<GatewayState>>,
    client: HttpClient,
}

impl AppState {
    pub fn new(state: GatewayState, client: HttpClient) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(state)),
            client,
        }
    }

    /// Snapshot of the current state; stays valid across reloads.
    pub fn load(&self) -> Arc<GatewayState> {
        self.inner.load_full()
    }

    /// Swap in a new configuration. The old one stays if the new one is invalid.
    pub fn reload(&self, config: GatewayConfig) -> Result<(), ConfigError> {
        let state = GatewayState::compile(config, self.client.clone())?;
        tracing::info!(api = %state.api.origin().as_str(), "Configuration reloaded");
        self.inner.store(Arc::new(state));
        Ok(())
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let client = http_client();
        let request_secs = config.timeouts.request_secs;
        let state = AppState::new(GatewayState::compile(config, client.clone())?, client);

        let router = Self::build_router(request_secs, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_secs: u64, state: AppState) -> Router {
        let router = pages::routes()
            .fallback(api_fallback)
            .layer(middleware::from_fn_with_state(state.clone(), bypass_middleware))
            .with_state(state);

        let router = if request_secs > 0 {
            router.layer(TimeoutLayer::new(Duration::from_secs(request_secs)))
        } else {
            router
        };

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api = %self.state.load().api.origin().as_str(),
            "HTTP server starting"
        );

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = state.reload(config) {
                    tracing::error!(error = %e, "Rejected configuration update");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
