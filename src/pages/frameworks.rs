use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::models::display_name;
use crate::pages::valid_id;
use crate::pages::view::{ActionButton, Layout, Page, PageResponse};

#[derive(Serialize)]
struct ShowProps {
    framework: Value,
    layout: Layout,
}

pub async fn show(
    State(state): State<AppState>,
    Path(fid): Path<String>,
    headers: HeaderMap,
) -> Result<PageResponse, GatewayError> {
    if !valid_id(&fid) {
        return Ok(PageResponse::not_found());
    }

    let gateway = state.load();
    let fetched = gateway
        .api
        .fetch_json::<Value>(&format!("/frameworks/{fid}"), &headers)
        .await?;

    let page = fetched.try_map(|framework| {
        let title = display_name(&framework, "Framework").to_string();
        let props = ShowProps {
            framework,
            layout: Layout::with_button(ActionButton::new(
                format!("/frameworks/{fid}/edit"),
                "Edit Framework",
            )),
        };
        Page::new("framework", title, &props)
    })?;
    Ok(page.into())
}
