//! HTTP client for the API Server.
//!
//! # Responsibilities
//! - Resolve API paths against the configured origin
//! - Issue buffered requests (page fetches, CSRF, submissions)
//! - Forward whole requests untouched (router bypass and fallback)
//!
//! # Design Decisions
//! - One pooled hyper client shared across config reloads
//! - Buffered calls decode gzip and brotli bodies; forwarded responses stay
//!   encoded for the browser to decode
//! - No retry, no per-call timeout: a hung API call hangs the page request
//! - Request IDs are carried upstream as ordinary headers

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tower::{Layer, ServiceExt};
use tower_http::decompression::DecompressionLayer;

use crate::config::{ApiConfig, ConfigError, GatewayConfig};
use crate::config::validation::validate_config;
use crate::error::GatewayError;
use crate::http::headers::HeaderPolicy;
use crate::http::request::request_id;
use crate::observability::metrics;

/// The pooled connector type used for every API call.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the shared upstream client.
pub fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Base URL of the API Server with any trailing slash removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOrigin {
    base: String,
}

impl ApiOrigin {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URI for `path_and_query` on the API Server.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, GatewayError> {
        let uri = if path_and_query.starts_with('/') {
            format!("{}{}", self.base, path_and_query)
        } else {
            format!("{}/{}", self.base, path_and_query)
        };
        Ok(uri.parse()?)
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }
}

/// A fully buffered API response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Client for one API Server, bound to the header policy in effect.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: HttpClient,
    origin: ApiOrigin,
    policy: Arc<HeaderPolicy>,
    login_path: String,
    csrf_path: String,
}

impl ApiClient {
    pub fn new(client: HttpClient, api: &ApiConfig, policy: Arc<HeaderPolicy>) -> Self {
        Self {
            client,
            origin: ApiOrigin::new(&api.base_url),
            policy,
            login_path: api.login_path.clone(),
            csrf_path: api.csrf_path.clone(),
        }
    }

    /// Validate `config` and build a client with a fresh connection pool.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, http_client())
    }

    /// Validate `config` and build a client on an existing connection pool.
    pub fn with_client(config: &GatewayConfig, client: HttpClient) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let policy = HeaderPolicy::compile(&config.headers.rules).map_err(|errors| {
            ConfigError::Validation(errors.into_iter().map(Into::into).collect())
        })?;
        Ok(Self::new(client, &config.api, Arc::new(policy)))
    }

    pub fn origin(&self) -> &ApiOrigin {
        &self.origin
    }

    pub fn policy(&self) -> &HeaderPolicy {
        &self.policy
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn csrf_path(&self) -> &str {
        &self.csrf_path
    }

    /// GET `path` on behalf of a browser request carrying `inbound` headers.
    pub async fn get(
        &self,
        path: &str,
        inbound: &HeaderMap,
    ) -> Result<UpstreamResponse, GatewayError> {
        let headers = self.policy.upstream_headers(inbound);
        self.send(Method::GET, path, headers, Body::empty()).await
    }

    /// Send a request with these headers and buffer the decoded response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        mut headers: HeaderMap,
        body: Body,
    ) -> Result<UpstreamResponse, GatewayError> {
        let start = Instant::now();
        let uri = self.origin.uri_for(path)?;

        tracing::debug!(
            request_id = %request_id(&headers),
            method = %method,
            uri = %uri,
            "Calling API"
        );

        // The decompression layer advertises only the encodings it can decode.
        headers.remove(header::ACCEPT_ENCODING);

        let mut request = Request::builder().method(method.clone()).uri(uri);
        if let Some(target) = request.headers_mut() {
            *target = headers;
        }
        let request = request.body(body)?;

        let response = DecompressionLayer::new()
            .layer(self.client.clone())
            .oneshot(request)
            .await?;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), usize::MAX).await?;

        metrics::record_upstream(method.as_str(), parts.status.as_u16(), start);
        tracing::debug!(
            method = %method,
            path = %path,
            status = %parts.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "API responded"
        );

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Re-target `request` at the API Server, keeping method, path, query,
    /// headers and body, and hand back the API's response as is.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, GatewayError> {
        let start = Instant::now();
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        parts.uri = self.origin.uri_for(path_and_query)?;
        let method = parts.method.clone();

        tracing::debug!(
            request_id = %request_id(&parts.headers),
            method = %method,
            uri = %parts.uri,
            "Forwarding to API"
        );

        let response = self.client.request(Request::from_parts(parts, body)).await?;
        metrics::record_upstream(method.as_str(), response.status().as_u16(), start);

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_for_keeps_path_and_query() {
        let origin = ApiOrigin::new("http://web:3000/");
        assert_eq!(origin.as_str(), "http://web:3000");
        assert_eq!(
            origin.uri_for("/categories/5?x=1&y=2").unwrap(),
            "http://web:3000/categories/5?x=1&y=2"
        );
        assert_eq!(origin.uri_for("csrf").unwrap(), "http://web:3000/csrf");
    }

    #[test]
    fn test_uri_for_keeps_base_path() {
        let origin = ApiOrigin::new("http://127.0.0.1:3000/backend");
        assert_eq!(
            origin.uri_for("/frameworks").unwrap(),
            "http://127.0.0.1:3000/backend/frameworks"
        );
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = GatewayConfig::default();
        config.api.base_url = "https://rails-nextjs.fly.dev".into();
        assert!(matches!(
            ApiClient::from_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
