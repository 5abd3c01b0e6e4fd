//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured diagnostic events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (diagnostics)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! The per-request audit trail is not a diagnostic concern; it lives in
//! `request_log`.

pub mod logging;
pub mod metrics;
