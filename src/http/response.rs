//! Response handling and transformation.
//!
//! # Responsibilities
//! - Copy backend status and headers to the client response
//! - Produce the fixed gateway responses (404, 413, 400, 502)
//!
//! # Design Decisions
//! - Hop-by-hop headers stripped; hyper re-frames the body itself
//! - Gateway error bodies never mention rules, targets or backend detail

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Body of the no-match response, also recorded in the request log.
pub const NOT_FOUND_BODY: &str = "404 page not found";
pub const PAYLOAD_TOO_LARGE_BODY: &str = "413 payload too large";
pub const BAD_REQUEST_BODY: &str = "400 bad request";
pub const BAD_GATEWAY_MESSAGE: &str = "upstream request failed";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Backend headers fit to send to the client.
pub fn client_headers(backend: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(backend.len());
    for (name, value) in backend {
        if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Relay a backend response: its status, its headers, the given body.
pub fn relay(status: StatusCode, backend_headers: &HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = client_headers(backend_headers);
    response
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
}

pub fn payload_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, PAYLOAD_TOO_LARGE_BODY).into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, BAD_REQUEST_BODY).into_response()
}

pub fn bad_gateway() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({ "error": BAD_GATEWAY_MESSAGE })),
    )
        .into_response()
}
