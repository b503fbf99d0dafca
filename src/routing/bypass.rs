//! Method-based router bypass.
//!
//! Page routes can only answer GET. Every other method outside the API
//! prefix is handed to the API Server before the page router sees it, with
//! path and query preserved, and the API Server writes the whole response.
//!
//! ```text
//! GET  *              → PassThrough
//! *    /api/...       → PassThrough
//! POST /categories/5  → ToApi
//! ```

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::matcher::{AndMatcher, Matcher, MethodMatcher, NotMatcher, PathPrefixMatcher};

/// Where a request should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Let the gateway's own router handle it.
    PassThrough,
    /// Rewrite it to the API origin.
    ToApi,
}

/// The compiled bypass condition: not GET, and not under the API prefix.
#[derive(Debug)]
pub struct BypassRule {
    matcher: AndMatcher,
}

impl BypassRule {
    pub fn new(api_prefix: &str) -> Self {
        Self {
            matcher: AndMatcher::new(vec![
                Box::new(NotMatcher::new(MethodMatcher::new([Method::GET]))),
                Box::new(NotMatcher::new(PathPrefixMatcher::new(api_prefix))),
            ]),
        }
    }

    pub fn decide(&self, req: &Request<Body>) -> RouteDecision {
        if self.matcher.matches(req) {
            RouteDecision::ToApi
        } else {
            RouteDecision::PassThrough
        }
    }
}

/// Middleware in front of the page routes.
pub async fn bypass_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let gateway = state.load();

    match gateway.bypass.decide(&request) {
        RouteDecision::PassThrough => next.run(request).await,
        RouteDecision::ToApi => {
            tracing::debug!(
                request_id = %request_id(request.headers()),
                method = %request.method(),
                path = %request.uri().path(),
                "Bypassing page router"
            );
            metrics::record_bypass(request.method().as_str());
            gateway.api.forward(request).await.into_response()
        }
    }
}

/// Anything the page router does not know goes to the API Server as is.
pub async fn api_fallback(State(state): State<AppState>, request: Request<Body>) -> Response {
    let gateway = state.load();
    tracing::debug!(
        request_id = %request_id(request.headers()),
        method = %request.method(),
        path = %request.uri().path(),
        "No page route, proxying to API"
    );
    gateway.api.forward(request).await.into_response()
}
