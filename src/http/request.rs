//! Inbound request capture.
//!
//! # Responsibilities
//! - Buffer the inbound request into an owned, immutable view
//! - Extract routing-relevant information (path, raw query, headers, JSON body)
//! - Preserve the original request for logging and forwarding
//!
//! # Design Decisions
//! - The body is buffered once; matching and forwarding share the same bytes
//! - The JSON body is parsed lazily and at most once per request
//! - Header lookups always use the first value of a repeated header

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use serde_json::{Map, Value};

/// Everything the gateway needs from one inbound request.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Raw request path, not normalized.
    pub path: String,
    /// Raw query string without the leading `?`; empty when absent.
    pub raw_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    json_body: OnceLock<Option<Map<String, Value>>>,
}

impl InboundRequest {
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            raw_query: uri.query().unwrap_or_default().to_string(),
            headers,
            body,
            json_body: OnceLock::new(),
        }
    }

    /// First value of header `name`, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First decoded value of query parameter `key`.
    pub fn query_param(&self, key: &str) -> Option<Cow<'_, str>> {
        url::form_urlencoded::parse(self.raw_query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The body as a top-level JSON object, or `None` when absent or malformed.
    pub fn json_object(&self) -> Option<&Map<String, Value>> {
        self.json_body
            .get_or_init(|| {
                if self.body.is_empty() {
                    return None;
                }
                match serde_json::from_slice::<Value>(&self.body) {
                    Ok(Value::Object(map)) => Some(map),
                    _ => None,
                }
            })
            .as_ref()
    }

    /// Header snapshot for the request log: first value wins per name.
    pub fn first_value_headers(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (name, value) in &self.headers {
            out.entry(name.as_str().to_string())
                .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        out
    }

    /// Body text for the request log.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
