//! Header-forwarding policy.
//!
//! # Responsibilities
//! - Hold the built-in rows every policy starts from
//! - Compile the configured rule table into header names and values once
//! - Build the upstream request headers from the browser's headers
//! - Build the browser response headers from the upstream's headers
//!
//! # Design Decisions
//! - Built-in rows force `Accept: application/json` upstream and strip the
//!   body headers downstream; configuration may add rows but never replace them
//! - Headers without a rule pass through unchanged, all values kept
//! - `set` replaces every incoming value and adds the header when absent
//! - One table, reviewed as a whole; no header literals elsewhere in the relay

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{Direction, HeaderAction, HeaderRule};

/// A rule that failed to compile.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("`{0}` is not a valid header name")]
    InvalidName(String),

    #[error("value for `{name}` is not a valid header value")]
    InvalidValue { name: String },

    #[error("more than one {direction:?} rule for `{name}`")]
    Duplicate { direction: Direction, name: String },

    #[error("{direction:?} `{name}` is fixed by the gateway and cannot be configured")]
    Reserved { direction: Direction, name: String },
}

#[derive(Debug, Clone)]
enum Action {
    Drop,
    Set(HeaderValue),
}

/// Compiled header-forwarding policy.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    upstream: Vec<(HeaderName, Action)>,
    downstream: Vec<(HeaderName, Action)>,
}

impl HeaderPolicy {
    /// The rows every policy carries before configured rules are added.
    fn builtin() -> Self {
        Self {
            upstream: vec![(
                header::ACCEPT,
                Action::Set(HeaderValue::from_static("application/json")),
            )],
            downstream: vec![
                (header::CONTENT_TYPE, Action::Drop),
                (header::CONTENT_ENCODING, Action::Drop),
                // The gateway writes its own page body, so upstream framing is meaningless.
                (header::CONTENT_LENGTH, Action::Drop),
                (header::TRANSFER_ENCODING, Action::Drop),
            ],
        }
    }

    /// Compile the built-in rows plus a configured rule table, reporting every
    /// bad rule. Configured rules may not name a built-in row.
    pub fn compile(rules: &[HeaderRule]) -> Result<Self, Vec<PolicyError>> {
        let mut policy = Self::builtin();
        let reserved_upstream = policy.upstream.len();
        let reserved_downstream = policy.downstream.len();
        let mut errors = Vec::new();

        for rule in rules {
            let name = match HeaderName::from_bytes(rule.name.as_bytes()) {
                Ok(name) => name,
                Err(_) => {
                    errors.push(PolicyError::InvalidName(rule.name.clone()));
                    continue;
                }
            };

            let action = match &rule.action {
                HeaderAction::Drop => Action::Drop,
                HeaderAction::Set(value) => match HeaderValue::from_str(value) {
                    Ok(value) => Action::Set(value),
                    Err(_) => {
                        errors.push(PolicyError::InvalidValue {
                            name: rule.name.clone(),
                        });
                        continue;
                    }
                },
            };

            let (table, reserved) = match rule.direction {
                Direction::Upstream => (&mut policy.upstream, reserved_upstream),
                Direction::Downstream => (&mut policy.downstream, reserved_downstream),
            };
            match table.iter().position(|(existing, _)| *existing == name) {
                Some(index) if index < reserved => {
                    errors.push(PolicyError::Reserved {
                        direction: rule.direction,
                        name: name.as_str().to_string(),
                    });
                }
                Some(_) => {
                    errors.push(PolicyError::Duplicate {
                        direction: rule.direction,
                        name: name.as_str().to_string(),
                    });
                }
                None => table.push((name, action)),
            }
        }

        if errors.is_empty() {
            Ok(policy)
        } else {
            Err(errors)
        }
    }

    /// Headers to send to the API Server for a browser request carrying `inbound`.
    pub fn upstream_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = inbound.clone();
        apply(&self.upstream, &mut headers);
        headers
    }

    /// Headers to hand back to the browser for an API response carrying `upstream`.
    pub fn downstream_headers(&self, upstream: &HeaderMap) -> HeaderMap {
        let mut headers = upstream.clone();
        apply(&self.downstream, &mut headers);
        headers
    }

    /// Relay `upstream`'s headers into `target`, which may already hold headers
    /// from an earlier response. A later response replaces a header name wholesale.
    pub fn merge_downstream(&self, target: &mut HeaderMap, upstream: &HeaderMap) {
        let relayed = self.downstream_headers(upstream);
        for name in relayed.keys() {
            target.remove(name);
            for value in relayed.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }
}

fn apply(rules: &[(HeaderName, Action)], headers: &mut HeaderMap) {
    for (name, action) in rules {
        match action {
            Action::Drop => {
                headers.remove(name);
            }
            Action::Set(value) => {
                headers.insert(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> HeaderPolicy {
        HeaderPolicy::compile(&[]).unwrap()
    }

    #[test]
    fn test_accept_is_forced_to_json() {
        let policy = default_policy();

        let mut inbound = HeaderMap::new();
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/html,*/*"));
        inbound.insert(header::COOKIE, HeaderValue::from_static("_session=abc"));
        let out = policy.upstream_headers(&inbound);
        assert_eq!(out[header::ACCEPT], "application/json");
        assert_eq!(out[header::COOKIE], "_session=abc");

        let out = policy.upstream_headers(&HeaderMap::new());
        assert_eq!(out[header::ACCEPT], "application/json");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_downstream_drops_body_headers_and_keeps_cookies() {
        let policy = default_policy();

        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        upstream.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        upstream.insert("x-runtime", HeaderValue::from_static("0.01"));

        let out = policy.downstream_headers(&upstream);
        assert!(out.get(header::CONTENT_TYPE).is_none());
        assert!(out.get(header::CONTENT_ENCODING).is_none());
        assert!(out.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(out.get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(out["x-runtime"], "0.01");
    }

    #[test]
    fn test_merge_replaces_by_name() {
        let policy = default_policy();
        let mut target = HeaderMap::new();

        let mut first = HeaderMap::new();
        first.insert("x-runtime", HeaderValue::from_static("1"));
        first.insert("etag", HeaderValue::from_static("\"a\""));
        policy.merge_downstream(&mut target, &first);

        let mut second = HeaderMap::new();
        second.insert("x-runtime", HeaderValue::from_static("2"));
        policy.merge_downstream(&mut target, &second);

        assert_eq!(target.get_all("x-runtime").iter().count(), 1);
        assert_eq!(target["x-runtime"], "2");
        assert_eq!(target["etag"], "\"a\"");
    }

    #[test]
    fn test_compile_reports_all_bad_rules() {
        let rules = vec![
            HeaderRule::new(Direction::Upstream, "bad header", HeaderAction::Drop),
            HeaderRule::new(Direction::Upstream, "x-a", HeaderAction::Set("line\nbreak".into())),
            HeaderRule::new(Direction::Downstream, "X-B", HeaderAction::Drop),
            HeaderRule::new(Direction::Downstream, "x-b", HeaderAction::Drop),
            HeaderRule::new(Direction::Upstream, "x-b", HeaderAction::Drop),
        ];

        let errors = HeaderPolicy::compile(&rules).unwrap_err();
        assert_eq!(
            errors,
            vec![
                PolicyError::InvalidName("bad header".into()),
                PolicyError::InvalidValue { name: "x-a".into() },
                PolicyError::Duplicate {
                    direction: Direction::Downstream,
                    name: "x-b".into()
                },
            ]
        );
    }

    #[test]
    fn test_configured_rules_add_to_builtin_rows() {
        let rules = vec![
            HeaderRule::new(Direction::Upstream, "x-forwarded-host", HeaderAction::Drop),
            HeaderRule::new(Direction::Downstream, "x-runtime", HeaderAction::Drop),
        ];
        let policy = HeaderPolicy::compile(&rules).unwrap();

        let mut inbound = HeaderMap::new();
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        inbound.insert("x-forwarded-host", HeaderValue::from_static("example.com"));
        let out = policy.upstream_headers(&inbound);
        assert_eq!(out[header::ACCEPT], "application/json");
        assert!(out.get("x-forwarded-host").is_none());

        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        upstream.insert("x-runtime", HeaderValue::from_static("0.01"));
        upstream.insert(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        let out = policy.downstream_headers(&upstream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[header::SET_COOKIE], "a=1");
    }

    #[test]
    fn test_builtin_rows_cannot_be_overridden() {
        let rules = vec![
            HeaderRule::new(Direction::Upstream, "Accept", HeaderAction::Set("text/html".into())),
            HeaderRule::new(Direction::Upstream, "Accept", HeaderAction::Drop),
            HeaderRule::new(Direction::Downstream, "content-length", HeaderAction::Drop),
            // Same name on the other leg is not reserved.
            HeaderRule::new(Direction::Downstream, "accept", HeaderAction::Drop),
        ];

        let errors = HeaderPolicy::compile(&rules).unwrap_err();
        assert_eq!(
            errors,
            vec![
                PolicyError::Reserved {
                    direction: Direction::Upstream,
                    name: "accept".into()
                },
                PolicyError::Reserved {
                    direction: Direction::Upstream,
                    name: "accept".into()
                },
                PolicyError::Reserved {
                    direction: Direction::Downstream,
                    name: "content-length".into()
                },
            ]
        );
    }
}
