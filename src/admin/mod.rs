//! Administrative surface.
//!
//! # Responsibilities
//! - Serve the admin UI entry page
//! - Read and replace the live configuration
//! - Expose the request log tail
//!
//! # Design Decisions
//! - Every route sits behind the cookie gate in `auth.rs`
//! - A failed gate answers 404 so the surface is indistinguishable from an
//!   unknown path

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::get,
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(get_index))
        .route("/admin/", get(get_index))
        .route("/admin/index.html", get(get_index))
        .route("/admin/api/config", get(get_config).post(update_config))
        .route("/admin/api/logs", get(get_logs))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
