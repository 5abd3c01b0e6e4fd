//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files and
//! for the JSON representation served by the admin API.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout applied when a rule leaves `timeout` unset or zero.
pub const DEFAULT_RULE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_COOKIE_KEY: &str = "bff_admin_token";
pub const DEFAULT_COOKIE_VALUE: &str = "change_me_in_production";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings.
    pub server: ServerConfig,

    /// Ordered routing rules.
    pub proxy: ProxyConfig,

    /// Request log pipeline settings.
    pub log: LogConfig,

    /// Cookie gate in front of the admin surface.
    pub admin_auth: AdminAuthConfig,

    /// Admin UI assets.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Fill in values that must never be empty once loaded.
    pub fn normalize(&mut self) {
        if self.admin_auth.cookie_key.is_empty() {
            self.admin_auth.cookie_key = DEFAULT_COOKIE_KEY.to_string();
        }
        if self.admin_auth.cookie_value.is_empty() {
            self.admin_auth.cookie_value = DEFAULT_COOKIE_VALUE.to_string();
        }
        if self.log.level.is_empty() {
            self.log.level = default_log_level();
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Listener port.
    pub port: u16,

    /// Largest inbound request body the gateway buffers.
    pub max_body_bytes: usize,

    /// How long shutdown waits for in-flight exchanges (open event streams
    /// included) before closing them.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 10 * 1024 * 1024,
            shutdown_grace_secs: 10,
        }
    }
}

/// Container for the rule list.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Rules in evaluation order. The first full match wins.
    pub rules: Vec<RuleConfig>,
}

/// A named routing directive: match condition plus forwarding target.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RuleConfig {
    /// Rule identifier for logging/metrics.
    pub name: String,

    /// Conditions the request must satisfy.
    #[serde(rename = "match")]
    pub match_condition: MatchCondition,

    /// Backend base URL (e.g., "http://backend:9000").
    pub target: String,

    /// Per-rule timeout in seconds; 0 means the default.
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,

    /// Headers set on the outbound request, overwriting inbound ones.
    #[serde(rename = "headers")]
    pub extra_headers: BTreeMap<String, String>,

    /// Replacement for the first occurrence of `match.path` in the path.
    pub rewrite_path: String,
}

impl RuleConfig {
    /// The configured timeout, or [`DEFAULT_RULE_TIMEOUT`] when unset.
    pub fn effective_timeout(&self) -> Duration {
        crate::resilience::timeouts::effective_timeout(self.timeout_secs)
    }
}

/// Request attributes a rule requires. Empty fields match anything.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MatchCondition {
    /// Path prefix.
    pub path: String,

    /// HTTP method, compared case-insensitively.
    pub method: String,

    /// Exact header values (first value of each header).
    pub headers: BTreeMap<String, String>,

    /// Exact query parameter values (first value of each key).
    pub query: BTreeMap<String, String>,

    /// Top-level JSON body fields, compared in canonical string form.
    pub body: BTreeMap<String, String>,
}

/// Request log pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default diagnostic level (trace, debug, info, warn, error).
    pub level: String,

    /// Append-only request log file.
    pub file: String,

    /// Number of buffered records that triggers a flush.
    pub buffer_capacity: usize,

    /// Periodic flush interval in seconds.
    pub flush_interval_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: "logs/bff-proxy.log".to_string(),
            buffer_capacity: 100,
            flush_interval_secs: 5,
        }
    }
}

/// Admin cookie gate.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminAuthConfig {
    /// Cookie name.
    pub cookie_key: String,

    /// Expected cookie value.
    pub cookie_value: String,
}

impl Default for AdminAuthConfig {
    fn default() -> Self {
        Self {
            cookie_key: DEFAULT_COOKIE_KEY.to_string(),
            // WARNING: This is a placeholder! Change this in production.
            cookie_value: DEFAULT_COOKIE_VALUE.to_string(),
        }
    }
}

/// Admin UI configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Directory holding `index.html`.
    pub static_dir: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            static_dir: "web/static".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
