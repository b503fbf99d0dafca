use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::pages::view::{Layout, Page, PageResponse};
use crate::upstream::{FetchOutcome, Fetched};

#[derive(Serialize)]
struct HomeProps {
    categories: Value,
    frameworks: Value,
    layout: Layout,
}

/// Landing page: every category and every framework, fetched together.
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<PageResponse, GatewayError> {
    let gateway = state.load();
    let fetched = gateway
        .api
        .fetch_all(&["/categories", "/frameworks"], &headers)
        .await?;

    let page = fetched.try_map(|bodies| {
        let mut bodies = bodies.into_iter();
        let props = HomeProps {
            categories: bodies.next().unwrap_or(Value::Null),
            frameworks: bodies.next().unwrap_or(Value::Null),
            layout: Layout::default(),
        };
        Page::new("home", "Frameworks", &props)
    })?;
    Ok(page.into())
}

#[derive(Serialize)]
struct AboutProps {
    layout: Layout,
}

pub async fn about() -> Result<PageResponse, GatewayError> {
    let page = Page::new("about", "About", &AboutProps { layout: Layout::default() })?;
    Ok(Fetched::new(FetchOutcome::Success(page)).into())
}
