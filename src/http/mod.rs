//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, admin routes, gateway fallback)
//!     → gateway.rs (per-request orchestration)
//!     → request.rs (buffered inbound view used for matching)
//!     → [routing layer picks the rule]
//!     → forward.rs (outbound call to the rule's target)
//!     → response.rs / stream.rs (buffered relay or event-stream relay)
//!     → Send to client
//! ```

pub mod forward;
pub mod gateway;
pub mod request;
pub mod response;
pub mod server;
pub mod stream;

pub use forward::{ForwardError, Forwarder};
pub use request::InboundRequest;
pub use server::{AppState, HttpServer};
