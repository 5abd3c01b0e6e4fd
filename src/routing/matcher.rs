//! Rule condition matching logic.
//!
//! # Responsibilities
//! - Match path prefix (byte prefix, case-sensitive, no normalization)
//! - Match method (case-insensitive)
//! - Match header, query and JSON body values (exact, first value)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Empty condition = always matches (wildcard), so no matcher is compiled
//! - Malformed or absent JSON makes the body condition fail, never an error
//! - No regex to guarantee O(n) matching

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::schema::MatchCondition;
use crate::http::request::InboundRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &InboundRequest) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        req.path.starts_with(&self.prefix)
    }
}

/// Matches the HTTP method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: String,
}

impl MethodMatcher {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        req.method.as_str().eq_ignore_ascii_case(&self.method)
    }
}

/// Requires every configured header to carry exactly the configured value.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    expected: BTreeMap<String, String>,
}

impl HeaderMatcher {
    pub fn new(expected: BTreeMap<String, String>) -> Self {
        Self { expected }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        self.expected
            .iter()
            .all(|(name, value)| req.header(name) == Some(value.as_str()))
    }
}

/// Requires every configured query parameter to carry exactly the configured value.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    expected: BTreeMap<String, String>,
}

impl QueryMatcher {
    pub fn new(expected: BTreeMap<String, String>) -> Self {
        Self { expected }
    }
}

impl Matcher for QueryMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        self.expected
            .iter()
            .all(|(key, value)| req.query_param(key).as_deref() == Some(value.as_str()))
    }
}

/// Requires every configured key to exist in the top-level JSON body object
/// with a value whose canonical string form equals the configured string.
#[derive(Debug, Clone)]
pub struct BodyMatcher {
    expected: BTreeMap<String, String>,
}

impl BodyMatcher {
    pub fn new(expected: BTreeMap<String, String>) -> Self {
        Self { expected }
    }
}

impl Matcher for BodyMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        let Some(body) = req.json_object() else {
            return false;
        };
        self.expected.iter().all(|(key, value)| {
            body.get(key)
                .map(|actual| canonical_string(actual) == *value)
                .unwrap_or(false)
        })
    }
}

/// Canonical string form of a JSON value for body comparison.
///
/// Strings compare raw. Integral floats below 1e21 in magnitude drop the
/// fractional part, so `5.0` and `5` both read as `"5"`.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Compile a match condition, skipping every empty dimension.
    ///
    /// Dimensions are ordered cheapest first; evaluation stops at the first
    /// failing one.
    pub fn from_condition(condition: &MatchCondition) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        if !condition.path.is_empty() {
            matchers.push(Box::new(PathPrefixMatcher::new(condition.path.clone())));
        }
        if !condition.method.is_empty() {
            matchers.push(Box::new(MethodMatcher::new(condition.method.clone())));
        }
        if !condition.headers.is_empty() {
            matchers.push(Box::new(HeaderMatcher::new(condition.headers.clone())));
        }
        if !condition.query.is_empty() {
            matchers.push(Box::new(QueryMatcher::new(condition.query.clone())));
        }
        if !condition.body.is_empty() {
            matchers.push(Box::new(BodyMatcher::new(condition.body.clone())));
        }
        Self::new(matchers)
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}
