//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::compression::CompressionLayer;

use bff_gateway::config::GatewayConfig;
use bff_gateway::http::HttpServer;
use bff_gateway::lifecycle::Shutdown;

/// What the mock API saw.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path and query.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What the mock API answers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![("content-type", "application/json; charset=utf-8")],
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// A programmable API Server on an ephemeral port.
pub struct MockApi {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Method, &str) -> Reply + Send + Sync + 'static,
    {
        Self::spawn(respond, false).await
    }

    /// Like `start`, but compresses replies the client says it can decode.
    pub async fn start_compressed<F>(respond: F) -> Self
    where
        F: Fn(&Method, &str) -> Reply + Send + Sync + 'static,
    {
        Self::spawn(respond, true).await
    }

    async fn spawn<F>(respond: F, compress: bool) -> Self
    where
        F: Fn(&Method, &str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond = Arc::new(respond);

        let log = requests.clone();
        let app = Router::new().fallback(move |request: Request<Body>| {
            let log = log.clone();
            let respond = respond.clone();
            async move {
                let (parts, body) = request.into_parts();
                let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
                let uri = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_default();
                let reply = respond(&parts.method, parts.uri.path());
                log.lock().unwrap().push(Recorded {
                    method: parts.method,
                    uri,
                    headers: parts.headers,
                    body,
                });

                let mut response = Response::new(Body::from(reply.body));
                *response.status_mut() = StatusCode::from_u16(reply.status).unwrap();
                for (name, value) in reply.headers {
                    response.headers_mut().append(
                        HeaderName::from_static(name),
                        HeaderValue::from_static(value),
                    );
                }
                response
            }
        });

        let app = if compress {
            app.layer(CompressionLayer::new())
        } else {
            app
        };

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.requests().into_iter().map(|r| r.uri).collect();
        paths.sort();
        paths
    }

    /// The single recorded request for `uri`.
    pub fn request_for(&self, uri: &str) -> Recorded {
        let matching: Vec<Recorded> = self
            .requests()
            .into_iter()
            .filter(|r| r.uri == uri)
            .collect();
        assert_eq!(matching.len(), 1, "expected one request for {uri}, got {matching:?}");
        matching.into_iter().next().unwrap()
    }
}

/// A running gateway in front of a mock API.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl Gateway {
    pub async fn start(api: &MockApi) -> Self {
        Self::start_with(config_for(api)).await
    }

    pub async fn start_with(config: GatewayConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(config).unwrap();
        let shutdown = Shutdown::new();
        let (config_updates, updates_rx) = mpsc::unbounded_channel();
        let server_shutdown = shutdown.subscribe();

        tokio::spawn(async move {
            let _ = server.run(listener, updates_rx, server_shutdown).await;
        });

        Self {
            addr,
            shutdown,
            config_updates,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn config_for(api: &MockApi) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.api.base_url = api.base_url();
    config
}

/// A browser that does not follow redirects.
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Props embedded in a rendered page.
pub fn props_of(html: &str) -> Value {
    let start_tag = r#"<script id="__PROPS__" type="application/json">"#;
    let start = html.find(start_tag).expect("no props script") + start_tag.len();
    let end = start + html[start..].find("</script>").unwrap();
    serde_json::from_str(&html[start..end]).unwrap()
}
