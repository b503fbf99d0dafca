//! Page results and how they become HTTP responses.
//!
//! ```text
//! Success(page) → 200 text/html shell, props as JSON in #__PROPS__
//! Redirect      → 307 (308 when permanent) + Location
//! NotFound      → 404 page
//! ```
//!
//! Relayed API headers are added to every outcome, but never replace a
//! header the gateway set itself.

use askama::Template;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::upstream::{CsrfToken, FetchOutcome, Fetched};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub url: String,
    pub text: String,
}

impl ActionButton {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Navigation chrome shared by every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub breadcrumbs: Vec<Breadcrumb>,
    pub action_button: Option<ActionButton>,
}

impl Layout {
    pub fn with_button(action_button: ActionButton) -> Self {
        Self {
            breadcrumbs: Vec::new(),
            action_button: Some(action_button),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub id: String,
    pub name: String,
    pub label: String,
    pub value: String,
    pub multiline: bool,
}

impl FormField {
    pub fn text(id: &str, name: &str, label: &str, value: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            label: label.to_string(),
            value: value.unwrap_or_default().to_string(),
            multiline: false,
        }
    }

    pub fn textarea(id: &str, name: &str, label: &str, value: Option<&str>) -> Self {
        Self {
            multiline: true,
            ..Self::text(id, name, label, value)
        }
    }
}

/// A mutation form with its CSRF field.
#[derive(Debug, Clone)]
pub struct FormView {
    pub action: String,
    /// Rails `_method` override; HTML forms can only send GET and POST.
    pub method_override: Option<String>,
    pub csrf_field: String,
    pub fields: Vec<FormField>,
}

impl FormView {
    pub fn new(
        action: impl Into<String>,
        method: &Method,
        token: &CsrfToken,
        fields: Vec<FormField>,
    ) -> Result<Self, GatewayError> {
        let method_override = (*method != Method::POST).then(|| method.as_str().to_lowercase());
        Ok(Self {
            action: action.into(),
            method_override,
            csrf_field: token.hidden_field()?,
            fields,
        })
    }
}

/// A rendered page: its name, title and props.
#[derive(Debug, Clone)]
pub struct Page {
    name: &'static str,
    title: String,
    props: Value,
    form: Option<FormView>,
}

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    title: &'a str,
    page: &'a str,
    form: Option<&'a FormView>,
    props_json: String,
}

impl Page {
    pub fn new(
        name: &'static str,
        title: impl Into<String>,
        props: &impl Serialize,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            name,
            title: title.into(),
            props: serde_json::to_value(props)?,
            form: None,
        })
    }

    pub fn with_form(mut self, form: FormView) -> Self {
        self.form = Some(form);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn props(&self) -> &Value {
        &self.props
    }

    pub fn form(&self) -> Option<&FormView> {
        self.form.as_ref()
    }

    pub fn render_html(&self) -> Result<String, GatewayError> {
        let template = PageTemplate {
            title: &self.title,
            page: self.name,
            form: self.form.as_ref(),
            props_json: script_safe_json(&self.props)?,
        };
        Ok(template.render()?)
    }
}

/// JSON that can sit inside a `<script>` element.
pub fn script_safe_json(value: &Value) -> Result<String, serde_json::Error> {
    // `<`, `>` and `&` only ever occur inside JSON strings, where the escapes are equivalent.
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Status page for not-found and failures.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    status: u16,
    message: &'static str,
}

impl ErrorPage {
    pub fn internal() -> Self {
        Self {
            status: 500,
            message: "Internal Server Error",
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            message: "This page could not be found.",
        }
    }

    pub fn render_html(&self) -> Result<String, askama::Error> {
        self.render()
    }
}

/// Handler return type for every page route.
#[derive(Debug)]
pub struct PageResponse(pub Fetched<Page>);

impl PageResponse {
    pub fn not_found() -> Self {
        Self(Fetched::new(FetchOutcome::NotFound))
    }
}

impl From<Fetched<Page>> for PageResponse {
    fn from(fetched: Fetched<Page>) -> Self {
        Self(fetched)
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let Fetched { outcome, headers } = self.0;

        let mut response = match outcome {
            FetchOutcome::Success(page) => {
                metrics::record_page_outcome("render");
                match page.render_html() {
                    Ok(html) => Html(html).into_response(),
                    Err(e) => return e.into_response(),
                }
            }
            FetchOutcome::Redirect { destination, permanent } => {
                metrics::record_page_outcome("redirect");
                if permanent {
                    Redirect::permanent(&destination).into_response()
                } else {
                    Redirect::temporary(&destination).into_response()
                }
            }
            FetchOutcome::NotFound => {
                metrics::record_page_outcome("not_found");
                match ErrorPage::not_found().render_html() {
                    Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                    Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
                }
            }
        };

        relay_headers(response.headers_mut(), &headers);
        response
    }
}

fn relay_headers(target: &mut HeaderMap, relayed: &HeaderMap) {
    for name in relayed.keys() {
        if target.contains_key(name) {
            continue;
        }
        for value in relayed.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}
