//! Per-request orchestration.
//!
//! Sequences rule matching, forwarding, stream relay and request logging for
//! every non-admin request, and resolves every failure to a client status.
//!
//! ```text
//! request → snapshot → buffer body → match ─┬─ none  → log → 404
//!                                           └─ rule  → forward ─┬─ error    → log → 502
//!                                                               ├─ buffered → log → relay
//!                                                               └─ stream   → relay → log at end
//! ```

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::Instrument;
use uuid::Uuid;

use crate::http::forward::{Forwarded, Payload};
use crate::http::request::InboundRequest;
use crate::http::response::{self, BAD_REQUEST_BODY, NOT_FOUND_BODY, PAYLOAD_TOO_LARGE_BODY};
use crate::http::server::AppState;
use crate::http::stream::StreamRelay;
use crate::observability::metrics;
use crate::request_log::{PendingRecord, RecordGuard};

/// Requests under this prefix belong to the admin surface.
pub const ADMIN_PREFIX: &str = "/admin";

/// Logged for requests no rule matched.
pub const NO_MATCHING_RULE: &str = "no matching proxy rule";

/// Fallback handler: everything the admin router does not claim.
pub async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if request.uri().path().starts_with(ADMIN_PREFIX) {
        return response::not_found();
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    handle(state, request).instrument(span).await
}

async fn handle(state: AppState, request: Request<Body>) -> Response {
    let started = Instant::now();
    let start_time = Utc::now();

    // One snapshot for the whole request, even if a reload lands mid-flight.
    let snapshot = state.config.current();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let limit = snapshot.config.server.max_body_bytes;
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let inbound = InboundRequest::new(parts.method, &parts.uri, parts.headers, Bytes::new());
            let guard = RecordGuard::new(
                state.log.clone(),
                PendingRecord::begin(&inbound, started, start_time),
            );
            return if e.downcast_ref::<LengthLimitError>().is_some() {
                tracing::warn!(limit, "Request body too large");
                let error = format!("request body exceeds {} bytes", limit);
                guard.complete(413, PAYLOAD_TOO_LARGE_BODY, Some(error));
                metrics::record_request(&method, 413, "", started);
                response::payload_too_large()
            } else {
                tracing::warn!(error = %e, "Failed to read request body");
                let error = format!("failed to read request body: {}", e);
                guard.complete(400, BAD_REQUEST_BODY, Some(error));
                metrics::record_request(&method, 400, "", started);
                response::bad_request()
            };
        }
    };

    let inbound = InboundRequest::new(parts.method, &parts.uri, parts.headers, body);
    let mut guard = RecordGuard::new(
        state.log.clone(),
        PendingRecord::begin(&inbound, started, start_time),
    );

    let Some(rule) = snapshot.router.match_request(&inbound) else {
        tracing::warn!("No rule matched");
        guard.complete(404, NOT_FOUND_BODY, Some(NO_MATCHING_RULE.to_string()));
        metrics::record_request(&method, 404, "", started);
        return response::not_found();
    };
    guard.set_rule(rule);

    tracing::debug!(rule = %rule.name, target = %rule.target, "Rule matched");

    match state.forwarder.forward(&inbound, rule).await {
        Err(e) => {
            let detail = e.detail();
            tracing::error!(rule = %rule.name, error = %detail, "Upstream error");
            guard.complete(502, "", Some(detail));
            metrics::record_request(&method, 502, &rule.name, started);
            response::bad_gateway()
        }
        Ok(Forwarded {
            status,
            headers,
            payload: Payload::Buffered(bytes),
        }) => {
            guard.complete(status.as_u16(), String::from_utf8_lossy(&bytes).into_owned(), None);
            metrics::record_request(&method, status.as_u16(), &rule.name, started);
            response::relay(status, &headers, Body::from(bytes))
        }
        Ok(Forwarded {
            status,
            headers,
            payload: Payload::Stream(upstream),
        }) => {
            tracing::debug!(status = %status, "Relaying event stream");
            metrics::record_request(&method, status.as_u16(), &rule.name, started);
            let relay = StreamRelay::new(upstream, guard).with_cutoff(state.stream_cutoff.clone());
            response::relay(status, &headers, Body::from_stream(relay))
        }
    }
}
