use std::path::Path;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::{ConfigError, GatewayConfig};
use crate::http::response;
use crate::http::server::AppState;

/// Records returned by the logs endpoint when no usable limit is given.
pub const DEFAULT_LOG_LIMIT: usize = 100;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub async fn get_index(State(state): State<AppState>) -> Response {
    let static_dir = state.config.current().config.admin.static_dir.clone();
    let index = Path::new(&static_dir).join("index.html");

    match tokio::fs::read_to_string(&index).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::warn!(path = ?index, error = %e, "Admin index page unavailable");
            response::not_found()
        }
    }
}

pub async fn get_config(State(state): State<AppState>) -> Json<GatewayConfig> {
    Json(state.config.current().config.clone())
}

pub async fn update_config(
    State(state): State<AppState>,
    payload: Result<Json<GatewayConfig>, JsonRejection>,
) -> Response {
    let Json(config) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected admin config update");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let store = state.config.clone();
    let outcome = tokio::task::spawn_blocking(move || store.update(config)).await;

    match outcome {
        Ok(Ok(snapshot)) => {
            tracing::info!(rules = snapshot.router.len(), "Configuration updated via admin");
            (StatusCode::OK, Json(json!({ "message": "config updated" }))).into_response()
        }
        Ok(Err(e @ ConfigError::Validation(_))) => {
            tracing::warn!(error = %e, "Admin config update failed validation");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to persist admin config update");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Config update task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "config update failed")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<String>,
}

impl LogsQuery {
    /// Non-numeric or missing limits fall back to the default; negative ones
    /// ask for nothing.
    fn limit(&self) -> usize {
        match self.limit.as_deref().map(|l| l.trim().parse::<i64>()) {
            Some(Ok(n)) => usize::try_from(n).unwrap_or(0),
            _ => DEFAULT_LOG_LIMIT,
        }
    }
}

pub async fn get_logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Response {
    let limit = query.limit();
    let log = state.log.clone();

    match tokio::task::spawn_blocking(move || log.tail(limit)).await {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to read request log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Request log read task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read logs")
        }
    }
}
