use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::http::response;
use crate::http::server::AppState;

/// Value of the cookie `name` across all `Cookie` headers, if present.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = state.config.current();
    let auth = &snapshot.config.admin_auth;

    match cookie_value(request.headers(), &auth.cookie_key) {
        Some(value) if value == auth.cookie_value => next.run(request).await,
        _ => {
            tracing::debug!(path = %request.uri().path(), "Admin cookie missing or wrong");
            response::not_found()
        }
    }
}
