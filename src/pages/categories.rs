//! Category pages: index, new, show and edit.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method};
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::http::server::AppState;
use crate::models::{display_name, pick, CategoryFields};
use crate::pages::valid_id;
use crate::pages::view::{
    ActionButton, Breadcrumb, FormField, FormView, Layout, Page, PageResponse,
};
use crate::upstream::{CsrfToken, FetchOutcome, Fetched};

#[derive(Serialize)]
struct IndexProps {
    categories: Vec<Value>,
    layout: Layout,
}

#[derive(Serialize)]
struct ShowProps {
    category: Value,
    layout: Layout,
}

#[derive(Serialize)]
struct EditProps {
    /// `{id, name, description}` as the API sent them.
    category: Value,
    layout: Layout,
}

#[derive(Serialize)]
struct NewProps {
    layout: Layout,
}

fn category_fields(category: Option<&CategoryFields>) -> Vec<FormField> {
    let name = category.and_then(|c| c.name.as_deref());
    let description = category.and_then(|c| c.description.as_deref());
    vec![
        FormField::text("category_name", "category[name]", "Name", name),
        FormField::textarea(
            "category_description",
            "category[description]",
            "Description",
            description,
        ),
    ]
}

pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<PageResponse, GatewayError> {
    let gateway = state.load();
    let fetched = gateway
        .api
        .fetch_json::<Vec<Value>>("/categories", &headers)
        .await?;

    let page = fetched.try_map(|categories| {
        let props = IndexProps {
            categories: categories
                .iter()
                .map(|category| pick(category, &["id", "name"]))
                .collect(),
            layout: Layout {
                breadcrumbs: vec![Breadcrumb {
                    name: "Categories".into(),
                    href: "/".into(),
                }],
                action_button: Some(ActionButton::new("/categories/new", "New Category")),
            },
        };
        Page::new("categories", "Categories", &props)
    })?;
    Ok(page.into())
}

/// Empty creation form. Only the CSRF token is fetched.
pub async fn new(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<PageResponse, GatewayError> {
    let gateway = state.load();
    let (token, relayed) = gateway.api.fetch_csrf_token(&headers).await;

    let form = FormView::new("/categories", &Method::POST, &token, category_fields(None))?;
    let page = Page::new("new_category", "New Category", &NewProps { layout: Layout::default() })?
        .with_form(form);

    Ok(Fetched {
        outcome: FetchOutcome::Success(page),
        headers: relayed,
    }
    .into())
}

pub async fn show(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    headers: HeaderMap,
) -> Result<PageResponse, GatewayError> {
    if !valid_id(&cid) {
        return Ok(PageResponse::not_found());
    }

    let gateway = state.load();
    let fetched = gateway
        .api
        .fetch_json::<Value>(&format!("/categories/{cid}"), &headers)
        .await?;

    let page = fetched.try_map(|category| {
        let title = display_name(&category, "Category").to_string();
        let props = ShowProps {
            category,
            layout: Layout::with_button(ActionButton::new(
                format!("/categories/{cid}/edit"),
                "Edit Category",
            )),
        };
        Page::new("category", title, &props)
    })?;
    Ok(page.into())
}

/// Edit form. The category and the CSRF token are fetched concurrently.
pub async fn edit(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    headers: HeaderMap,
) -> Result<PageResponse, GatewayError> {
    if !valid_id(&cid) {
        return Ok(PageResponse::not_found());
    }

    let gateway = state.load();
    let path = format!("/categories/{cid}");
    let (fetched, (token, csrf_headers)) = tokio::join!(
        gateway.api.fetch_json::<Value>(&path, &headers),
        gateway.api.fetch_csrf_token(&headers)
    );
    let mut fetched = fetched?;

    if fetched.outcome.is_success() {
        gateway.api.policy().merge_downstream(&mut fetched.headers, &csrf_headers);
    }

    let page = fetched.try_map(|category| edit_page(category, &cid, &token))?;
    Ok(page.into())
}

fn edit_page(category: Value, cid: &str, token: &CsrfToken) -> Result<Page, GatewayError> {
    let fields = CategoryFields::read(&category);
    let id = fields.id.as_ref().map_or_else(|| cid.to_string(), ToString::to_string);
    let form = FormView::new(
        format!("/categories/{id}"),
        &Method::PUT,
        token,
        category_fields(Some(&fields)),
    )?;
    let props = EditProps {
        category: pick(&category, &["id", "name", "description"]),
        layout: Layout::with_button(ActionButton::new(
            format!("/categories/{cid}"),
            "Show Category",
        )),
    };
    Ok(Page::new("edit_category", "Edit Category", &props)?.with_form(form))
}
