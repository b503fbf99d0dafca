//! Mutation submission.
//!
//! Sends a form or JSON body to the API Server and classifies the answer:
//!
//! ```text
//! 200/201      → Success(body)          204 → Success(null)
//! 401          → Redirect(login)        404 → NotFound
//! 422 {field: [msg]} → ValidationFailed(errors)
//! anything else → Rejected { status }
//! ```
//!
//! While a submission is in flight the client's [`LoadingSignal`] reads
//! `true`; the signal belongs to the client, not to the process.
//!
//! Browser form posts do not come through here. The router bypass relays
//! them to the API Server, so a 422 reaches the browser as the API's JSON.
//! This client serves the CLI and library callers.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use url::form_urlencoded;

use crate::error::GatewayError;
use crate::upstream::client::ApiClient;
use crate::upstream::csrf::{CsrfToken, AUTHENTICITY_TOKEN};

/// Field-keyed validation messages, as the API Server reports them on 422.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Flatten into one line per message for CLI output, e.g. `"name can't be blank"`.
    pub fn messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, messages)| {
                messages.iter().map(move |message| {
                    if field == "base" {
                        message.clone()
                    } else {
                        format!("{} {}", field.replace('_', " "), message)
                    }
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

/// Result of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Success(Value),
    Redirect(String),
    NotFound,
    ValidationFailed(ValidationErrors),
    Rejected { status: StatusCode },
}

/// Classify an API answer to a mutation.
pub fn classify_submission(status: StatusCode, body: &[u8], login_path: &str) -> SubmitOutcome {
    match status {
        StatusCode::OK | StatusCode::CREATED => {
            SubmitOutcome::Success(serde_json::from_slice(body).unwrap_or(Value::Null))
        }
        StatusCode::NO_CONTENT => SubmitOutcome::Success(Value::Null),
        StatusCode::UNAUTHORIZED => SubmitOutcome::Redirect(login_path.to_string()),
        StatusCode::NOT_FOUND => SubmitOutcome::NotFound,
        StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_slice::<ValidationErrors>(body) {
            Ok(errors) => SubmitOutcome::ValidationFailed(errors),
            // An invalid CSRF token also yields 422, with an HTML body.
            Err(_) => SubmitOutcome::Rejected { status },
        },
        _ => SubmitOutcome::Rejected { status },
    }
}

/// Request body of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitBody {
    /// `application/x-www-form-urlencoded`, Rails-style keys (`category[name]`).
    Form(Vec<(String, String)>),
    /// `application/json`.
    Json(Value),
}

impl SubmitBody {
    fn encode(&self, token: &CsrfToken) -> Result<(HeaderValue, Vec<u8>), GatewayError> {
        match self {
            SubmitBody::Form(pairs) => {
                let mut form = form_urlencoded::Serializer::new(String::new());
                if !token.is_empty() {
                    form.append_pair(AUTHENTICITY_TOKEN, token.as_str());
                }
                for (key, value) in pairs {
                    form.append_pair(key, value);
                }
                Ok((
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                    form.finish().into_bytes(),
                ))
            }
            SubmitBody::Json(value) => {
                let mut value = value.clone();
                if let (Value::Object(map), false) = (&mut value, token.is_empty()) {
                    map.insert(AUTHENTICITY_TOKEN.to_string(), Value::from(token.as_str()));
                }
                Ok((
                    HeaderValue::from_static("application/json"),
                    serde_json::to_vec(&value)?,
                ))
            }
        }
    }
}

/// A mutation to send.
#[derive(Debug, Clone)]
pub struct Submission {
    pub method: Method,
    pub path: String,
    pub body: SubmitBody,
    pub token: CsrfToken,
}

/// Observable "a submission is in flight" state.
#[derive(Debug, Clone)]
pub struct LoadingSignal(watch::Receiver<usize>);

impl LoadingSignal {
    pub fn is_loading(&self) -> bool {
        *self.0.borrow() > 0
    }

    /// Wait until the loading state may have changed.
    pub async fn changed(&mut self) -> bool {
        self.0.changed().await.is_ok()
    }
}

struct InFlight<'a>(&'a watch::Sender<usize>);

impl<'a> InFlight<'a> {
    fn start(tx: &'a watch::Sender<usize>) -> Self {
        tx.send_modify(|n| *n += 1);
        Self(tx)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Sends mutations through an [`ApiClient`] and tracks them in flight.
#[derive(Debug)]
pub struct SubmitClient {
    api: ApiClient,
    in_flight: watch::Sender<usize>,
}

impl SubmitClient {
    pub fn new(api: ApiClient) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self { api, in_flight }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn loading(&self) -> LoadingSignal {
        LoadingSignal(self.in_flight.subscribe())
    }

    /// Send `submission` with the browser's `inbound` headers (cookies) attached.
    pub async fn submit(
        &self,
        submission: &Submission,
        inbound: &HeaderMap,
    ) -> Result<SubmitOutcome, GatewayError> {
        let (content_type, body) = submission.body.encode(&submission.token)?;

        let mut headers = self.api.policy().upstream_headers(inbound);
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);
        headers.insert(header::CONTENT_TYPE, content_type);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let _guard = InFlight::start(&self.in_flight);
        let response = self
            .api
            .send(submission.method.clone(), &submission.path, headers, Body::from(body))
            .await?;

        let outcome = classify_submission(response.status, &response.body, self.api.login_path());
        tracing::info!(
            method = %submission.method,
            path = %submission.path,
            status = %response.status,
            "Submission answered"
        );
        Ok(outcome)
    }
}

/// Turn `set-cookie` response headers into a `cookie` request header.
pub fn session_cookies(response_headers: &HeaderMap) -> Option<HeaderValue> {
    let pairs: Vec<&str> = response_headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        return None;
    }
    HeaderValue::from_str(&pairs.join("; ")).ok()
}
