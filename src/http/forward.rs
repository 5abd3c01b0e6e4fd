//! Outbound forwarding to a rule's backend.
//!
//! # Responsibilities
//! - Build the target URL (path rewrite, raw query passthrough)
//! - Merge inbound headers with the rule's extra headers
//! - Issue the outbound call under the rule's deadline
//! - Hand back either a fully read body or a live event stream
//!
//! # Design Decisions
//! - Inbound body is forwarded verbatim
//! - Rule headers overwrite inbound ones; nothing is ever duplicated
//! - Headers owned by the transport (host, framing, connection) are not copied
//! - The deadline covers the whole exchange for buffered responses but only
//!   the header phase for event streams

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use thiserror::Error;

use crate::config::schema::RuleConfig;
use crate::http::request::InboundRequest;
use crate::http::stream;
use crate::resilience::timeouts::with_deadline;

/// Inbound headers that the outbound connection manages itself.
const TRANSPORT_MANAGED: [HeaderName; 4] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Failure to obtain a response from the backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read upstream response: {0}")]
    Body(#[source] reqwest::Error),
}

impl ForwardError {
    /// Message plus the full source chain, for the request log only.
    pub fn detail(&self) -> String {
        // The variant's own message already includes its direct source.
        match self.source().and_then(|s| s.source()) {
            Some(cause) => format!("{}: {}", self, error_chain(cause)),
            None => self.to_string(),
        }
    }
}

/// `err` followed by each of its causes, joined with `": "`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Backend response body, decided by event-stream detection.
pub enum Payload {
    Buffered(Bytes),
    Stream(reqwest::Response),
}

/// A backend response whose status and headers have arrived.
pub struct Forwarded {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub payload: Payload,
}

/// Inbound path with the first occurrence of `match.path` replaced by
/// `rewrite_path`, or unchanged when no rewrite is configured.
pub fn effective_path<'a>(path: &'a str, rule: &RuleConfig) -> Cow<'a, str> {
    if rule.rewrite_path.is_empty() {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(path.replacen(rule.match_condition.path.as_str(), &rule.rewrite_path, 1))
    }
}

/// `target` (trailing slash stripped) + effective path + raw query.
pub fn target_url(rule: &RuleConfig, req: &InboundRequest) -> String {
    let mut url = String::with_capacity(rule.target.len() + req.path.len() + req.raw_query.len() + 1);
    url.push_str(rule.target.strip_suffix('/').unwrap_or(&rule.target));
    url.push_str(&effective_path(&req.path, rule));
    if !req.raw_query.is_empty() {
        url.push('?');
        url.push_str(&req.raw_query);
    }
    url
}

/// Inbound headers (first value per name) overlaid with the rule's headers.
pub fn outbound_headers(
    inbound: &HeaderMap,
    extra: &BTreeMap<String, String>,
) -> Result<HeaderMap, ForwardError> {
    let mut headers = HeaderMap::with_capacity(inbound.keys_len() + extra.len());
    for (name, value) in inbound {
        if TRANSPORT_MANAGED.contains(name) || headers.contains_key(name) {
            continue;
        }
        headers.insert(name.clone(), value.clone());
    }

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ForwardError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ForwardError::InvalidRequest(format!("header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Outbound HTTP client shared by all requests.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to build configured HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self { client }
    }

    /// Forward `req` to `rule`'s backend.
    ///
    /// Dropping the returned future (client gone) cancels the outbound call.
    pub async fn forward(
        &self,
        req: &InboundRequest,
        rule: &RuleConfig,
    ) -> Result<Forwarded, ForwardError> {
        let timeout = rule.effective_timeout();
        let url = target_url(rule, req);
        let headers = outbound_headers(&req.headers, &rule.extra_headers)?;
        let wants_stream = stream::accepts_event_stream(&headers);

        let outbound = self
            .client
            .request(req.method.clone(), &url)
            .headers(headers)
            .body(req.body.clone())
            .build()
            .map_err(|e| ForwardError::InvalidRequest(e.to_string()))?;

        tracing::debug!(url = %url, timeout = ?timeout, "Forwarding request");

        let exchange = async {
            let response = self
                .client
                .execute(outbound)
                .await
                .map_err(ForwardError::Transport)?;
            let status = response.status();
            let headers = response.headers().clone();

            if wants_stream || stream::is_event_stream(&headers) {
                return Ok(Forwarded {
                    status,
                    headers,
                    payload: Payload::Stream(response),
                });
            }

            let body = response.bytes().await.map_err(ForwardError::Body)?;
            Ok(Forwarded {
                status,
                headers,
                payload: Payload::Buffered(body),
            })
        };

        with_deadline(timeout, exchange)
            .await
            .map_err(|elapsed| ForwardError::Timeout(elapsed.0))?
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}
