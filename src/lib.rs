//! Backend-for-frontend gateway library.
//!
//! Routes inbound HTTP requests to backend services by ordered rules,
//! relays responses (including Server-Sent Events) and records every
//! exchange in a JSON-lines request log.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod request_log;
pub mod resilience;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
