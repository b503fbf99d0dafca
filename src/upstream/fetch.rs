//! Single and aggregated page fetches.
//!
//! A fetch turns API responses into exactly one of three page outcomes:
//! render the data, redirect to the login page, or not-found.
//!
//! ```text
//! single:      200 → Success(body)   401 → Redirect(login)   else → NotFound
//! aggregated:  all 200 → Success([body; N] in request order)
//!              any 401 → Redirect(login)
//!              else     → NotFound
//! ```
//!
//! Transport failures are not outcomes; they come back as `Err`.

use axum::http::{HeaderMap, StatusCode};
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GatewayError;
use crate::upstream::client::{ApiClient, UpstreamResponse};

/// What a page should do with the API's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Success(T),
    Redirect { destination: String, permanent: bool },
    NotFound,
}

impl<T> FetchOutcome<T> {
    fn redirect_to(login_path: &str) -> Self {
        FetchOutcome::Redirect {
            destination: login_path.to_string(),
            permanent: false,
        }
    }

    /// Run the success continuation; other outcomes pass through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Success(value) => FetchOutcome::Success(f(value)),
            FetchOutcome::Redirect { destination, permanent } => {
                FetchOutcome::Redirect { destination, permanent }
            }
            FetchOutcome::NotFound => FetchOutcome::NotFound,
        }
    }

    /// Like [`map`](Self::map) for a continuation that can fail.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FetchOutcome<U>, E> {
        Ok(match self {
            FetchOutcome::Success(value) => FetchOutcome::Success(f(value)?),
            FetchOutcome::Redirect { destination, permanent } => {
                FetchOutcome::Redirect { destination, permanent }
            }
            FetchOutcome::NotFound => FetchOutcome::NotFound,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Classify one API status.
pub fn outcome_for(status: StatusCode, login_path: &str) -> FetchOutcome<()> {
    match status {
        StatusCode::OK => FetchOutcome::Success(()),
        StatusCode::UNAUTHORIZED => FetchOutcome::redirect_to(login_path),
        // 404 and every other status collapse into not-found.
        _ => FetchOutcome::NotFound,
    }
}

/// Classify the statuses of a fan-out. 401 takes precedence over 404.
pub fn outcome_for_all(statuses: &[StatusCode], login_path: &str) -> FetchOutcome<()> {
    if statuses.iter().all(|s| *s == StatusCode::OK) {
        FetchOutcome::Success(())
    } else if statuses.contains(&StatusCode::UNAUTHORIZED) {
        FetchOutcome::redirect_to(login_path)
    } else {
        FetchOutcome::NotFound
    }
}

/// An outcome plus the API response headers to relay to the browser.
#[derive(Debug)]
pub struct Fetched<T> {
    pub outcome: FetchOutcome<T>,
    pub headers: HeaderMap,
}

impl<T> Fetched<T> {
    pub fn new(outcome: FetchOutcome<T>) -> Self {
        Self {
            outcome,
            headers: HeaderMap::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            outcome: self.outcome.map(f),
            headers: self.headers,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Fetched<U>, E> {
        Ok(Fetched {
            outcome: self.outcome.try_map(f)?,
            headers: self.headers,
        })
    }
}

impl ApiClient {
    /// Fetch one resource and decode its body on success.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        inbound: &HeaderMap,
    ) -> Result<Fetched<T>, GatewayError> {
        let response = self.get(path, inbound).await?;

        let outcome = outcome_for(response.status, self.login_path())
            .try_map(|()| serde_json::from_slice::<T>(&response.body))?;

        let headers = if outcome.is_success() {
            self.policy().downstream_headers(&response.headers)
        } else {
            tracing::debug!(path = %path, status = %response.status, "Fetch did not succeed");
            HeaderMap::new()
        };

        Ok(Fetched { outcome, headers })
    }

    /// Fetch every path concurrently, wait for all of them, then classify.
    pub async fn fetch_all(
        &self,
        paths: &[&str],
        inbound: &HeaderMap,
    ) -> Result<Fetched<Vec<Value>>, GatewayError> {
        let responses = join_all(paths.iter().map(|path| self.get(path, inbound)))
            .await
            .into_iter()
            .collect::<Result<Vec<UpstreamResponse>, _>>()?;

        // Every 200 leg relays its headers, even when the overall fetch fails.
        let mut headers = HeaderMap::new();
        for response in responses.iter().filter(|r| r.status == StatusCode::OK) {
            self.policy().merge_downstream(&mut headers, &response.headers);
        }

        let statuses: Vec<StatusCode> = responses.iter().map(|r| r.status).collect();
        let outcome = outcome_for_all(&statuses, self.login_path());
        if !outcome.is_success() {
            tracing::debug!(paths = ?paths, statuses = ?statuses, "Aggregated fetch did not succeed");
        }

        let outcome = outcome.try_map(|()| {
            responses
                .iter()
                .map(|r| serde_json::from_slice::<Value>(&r.body))
                .collect::<Result<Vec<_>, _>>()
        })?;

        Ok(Fetched { outcome, headers })
    }
}
