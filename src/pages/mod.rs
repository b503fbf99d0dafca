//! Server-rendered pages.
//!
//! # Data Flow
//! ```text
//! GET /categories/5
//!     → categories::show
//!         → ApiClient::fetch_json("/categories/5")
//!             Success  → Page { props } → 200 HTML
//!             Redirect → 307 /users/sign_in
//!             NotFound → 404
//! ```
//!
//! Every handler returns a [`PageResponse`]; transport and decode failures
//! surface as [`GatewayError`](crate::error::GatewayError) and become a 500.

pub mod categories;
pub mod frameworks;
pub mod home;
pub mod view;

use axum::routing::get;
use axum::Router;

use crate::http::server::AppState;

pub use view::{ActionButton, Breadcrumb, ErrorPage, FormField, FormView, Layout, Page, PageResponse};

/// All page routes. Anything else falls through to the router's fallback.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/about", get(home::about))
        .route("/categories", get(categories::index))
        .route("/categories/new", get(categories::new))
        .route("/categories/{cid}", get(categories::show))
        .route("/categories/{cid}/edit", get(categories::edit))
        .route("/frameworks/{fid}", get(frameworks::show))
}

/// Whether a path segment is safe to splice into an API path.
pub(crate) fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
