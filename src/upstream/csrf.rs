//! CSRF token bridge.
//!
//! The API Server hands out a per-session anti-forgery token at its CSRF
//! endpoint. Form pages fetch it with the browser's cookies and embed it as a
//! hidden `authenticity_token` field. The bridge is best effort: any failure
//! leaves the token empty and the API Server rejects the eventual submission.

use askama::Template;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::upstream::client::ApiClient;

/// Form field (and JSON key) the API Server reads the token from.
pub const AUTHENTICITY_TOKEN: &str = "authenticity_token";

/// An anti-forgery token; empty when none could be obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrfToken(String);

#[derive(Template)]
#[template(
    source = r#"<input type="hidden" name="authenticity_token" value="{{ token }}">"#,
    ext = "html"
)]
struct HiddenField<'a> {
    token: &'a str,
}

impl CsrfToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Extract the token from a CSRF endpoint body.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|json| json.get(AUTHENTICITY_TOKEN)?.as_str().map(Self::new))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `<input type="hidden" name="authenticity_token" value="...">`, value escaped.
    pub fn hidden_field(&self) -> Result<String, askama::Error> {
        HiddenField { token: &self.0 }.render()
    }
}

impl ApiClient {
    /// Ask the API Server for a token on behalf of the browser.
    ///
    /// Returns the token together with the response headers to relay (the
    /// session cookie the token is bound to). Never fails.
    pub async fn fetch_csrf_token(&self, inbound: &HeaderMap) -> (CsrfToken, HeaderMap) {
        let response = match self.get(self.csrf_path(), inbound).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "CSRF token request failed");
                return (CsrfToken::default(), HeaderMap::new());
            }
        };

        if response.status != StatusCode::OK {
            tracing::warn!(status = %response.status, "CSRF endpoint refused");
            return (CsrfToken::default(), HeaderMap::new());
        }

        let token = CsrfToken::from_body(&response.body);
        if token.is_empty() {
            tracing::warn!("CSRF endpoint returned no authenticity_token");
        }
        (token, self.policy().downstream_headers(&response.headers))
    }
}
