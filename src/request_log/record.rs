//! Request log record and its on-disk representation.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::schema::RuleConfig;
use crate::http::request::InboundRequest;

/// Logged in place of the body of a relayed event stream.
pub const STREAM_SENTINEL: &str = "[SSE Stream]";

/// One handled request, matched or not. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestLogRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Serialized as integer nanoseconds.
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
    pub method: String,
    pub path: String,
    #[serde(rename = "query")]
    pub raw_query: String,
    #[serde(rename = "headers")]
    pub request_headers: BTreeMap<String, String>,
    #[serde(rename = "body")]
    pub request_body: String,
    pub status_code: u16,
    pub response_body: String,
    #[serde(rename = "target")]
    pub target_base: String,
    pub rule_name: String,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A record under construction, started when the request arrives.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    started: Instant,
    start_time: DateTime<Utc>,
    method: String,
    path: String,
    raw_query: String,
    request_headers: BTreeMap<String, String>,
    request_body: String,
    target_base: String,
    rule_name: String,
}

impl PendingRecord {
    /// Capture the inbound side of the exchange.
    pub fn begin(req: &InboundRequest, started: Instant, start_time: DateTime<Utc>) -> Self {
        Self {
            started,
            start_time,
            method: req.method.to_string(),
            path: req.path.clone(),
            raw_query: req.raw_query.clone(),
            request_headers: req.first_value_headers(),
            request_body: req.body_text(),
            target_base: String::new(),
            rule_name: String::new(),
        }
    }

    /// Attribute the exchange to the matched rule.
    pub fn with_rule(mut self, rule: &RuleConfig) -> Self {
        self.target_base = rule.target.clone();
        self.rule_name = rule.name.clone();
        self
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Close the record with the outcome the client observed.
    pub fn finish(
        self,
        status_code: u16,
        response_body: impl Into<String>,
        error_message: Option<String>,
    ) -> RequestLogRecord {
        RequestLogRecord {
            start_time: self.start_time,
            end_time: Utc::now(),
            duration: self.started.elapsed(),
            method: self.method,
            path: self.path,
            raw_query: self.raw_query,
            request_headers: self.request_headers,
            request_body: self.request_body,
            status_code,
            response_body: response_body.into(),
            target_base: self.target_base,
            rule_name: self.rule_name,
            error_message,
        }
    }
}

mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        // Negative durations cannot be produced by a monotonic clock; clamp them.
        let nanos = i64::deserialize(d)?;
        Ok(Duration::from_nanos(nanos.max(0) as u64))
    }
}
