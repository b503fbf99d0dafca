//! Request-path errors.
//!
//! Nothing here is classified into a page outcome: an upstream 401/404 is a
//! [`FetchOutcome`](crate::upstream::FetchOutcome), not an error. What ends up
//! in [`GatewayError`] is a failure to talk to the API Server at all, or a
//! body that could not be read or decoded, and it surfaces as the generic
//! error page.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::pages::view::ErrorPage;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[from] axum::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid upstream URI: {0}")]
    Uri(#[from] axum::http::uri::InvalidUri),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        crate::observability::metrics::record_page_outcome("error");

        match ErrorPage::internal().render_html() {
            Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        }
    }
}
