//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every rule can actually be forwarded (target URL, headers)
//! - Validate value ranges (capacities and intervals > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::{HeaderName, HeaderValue, Method};
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted location of the offending field (e.g. `proxy.rules[2].target`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (i, rule) in config.proxy.rules.iter().enumerate() {
        let at = |field: &str| format!("proxy.rules[{}].{}", i, field);

        if !rule.name.is_empty() && !names.insert(rule.name.as_str()) {
            errors.push(ValidationError::new(
                at("name"),
                format!("duplicate rule name '{}'", rule.name),
            ));
        }

        match Url::parse(&rule.target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => errors.push(ValidationError::new(
                at("target"),
                format!("unsupported target '{}' (scheme {})", rule.target, url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                at("target"),
                format!("invalid target '{}': {}", rule.target, e),
            )),
        }

        let method = &rule.match_condition.method;
        if !method.is_empty() && Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                at("match.method"),
                format!("invalid method '{}'", method),
            ));
        }

        for name in rule.match_condition.headers.keys() {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::new(
                    at("match.headers"),
                    format!("invalid header name '{}'", name),
                ));
            }
        }

        for (name, value) in &rule.extra_headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::new(
                    at("headers"),
                    format!("invalid header name '{}'", name),
                ));
            }
            if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::new(
                    at("headers"),
                    format!("invalid value for header '{}'", name),
                ));
            }
        }
    }

    if config.log.buffer_capacity == 0 {
        errors.push(ValidationError::new("log.buffer_capacity", "must be greater than 0"));
    }
    if config.log.flush_interval_secs == 0 {
        errors.push(ValidationError::new("log.flush_interval_secs", "must be greater than 0"));
    }
    if config.log.file.is_empty() {
        errors.push(ValidationError::new("log.file", "must not be empty"));
    }
    if config.admin_auth.cookie_key.is_empty() {
        errors.push(ValidationError::new("admin_auth.cookie_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
