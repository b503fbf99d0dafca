//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where the API Server lives and which of its paths the gateway knows.
    pub api: ApiConfig,

    /// Header-forwarding policy table.
    pub headers: HeaderPolicyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// API Server coordinates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Plain HTTP origin of the API Server (e.g., "http://web:3000").
    pub base_url: String,

    /// Paths starting with this prefix are never rewritten by the bypass.
    pub prefix: String,

    /// Endpoint issuing the CSRF token.
    pub csrf_path: String,

    /// Where unauthenticated visitors are redirected.
    pub login_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://web:3000".to_string(),
            prefix: "/api/".to_string(),
            csrf_path: "/csrf".to_string(),
            login_path: "/users/sign_in".to_string(),
        }
    }
}

/// Which leg of the relay a header rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Browser request → API request.
    Upstream,
    /// API response → browser response.
    Downstream,
}

/// What to do with a header on its way through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderAction {
    /// Do not forward the header.
    Drop,
    /// Replace whatever came in with this value.
    Set(String),
}

/// A single row of the header-forwarding policy table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderRule {
    pub direction: Direction,
    pub name: String,
    pub action: HeaderAction,
}

impl HeaderRule {
    pub fn new(direction: Direction, name: impl Into<String>, action: HeaderAction) -> Self {
        Self {
            direction,
            name: name.into(),
            action,
        }
    }
}

/// Extra header-forwarding rules. The gateway always forces `Accept` upstream
/// and strips the body headers downstream; rows here add to that and may not
/// name those headers again. Headers without a rule pass through unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderPolicyConfig {
    pub rules: Vec<HeaderRule>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds. 0 disables it.
    pub request_secs: u64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable lines or one JSON object per event.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://web:3000");
        assert_eq!(config.api.login_path, "/users/sign_in");
        assert!(config.headers.rules.is_empty());
        assert_eq!(config.timeouts.request_secs, 0);
    }

    #[test]
    fn test_header_rules_parse() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [api]
            base_url = "http://127.0.0.1:3000"

            [[headers.rules]]
            direction = "upstream"
            name = "x-client"
            action = { set = "bff-gateway" }

            [[headers.rules]]
            direction = "downstream"
            name = "x-runtime"
            action = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api.prefix, "/api/");
        assert_eq!(
            config.headers.rules,
            vec![
                HeaderRule::new(
                    Direction::Upstream,
                    "x-client",
                    HeaderAction::Set("bff-gateway".into())
                ),
                HeaderRule::new(Direction::Downstream, "x-runtime", HeaderAction::Drop),
            ]
        );
    }
}
