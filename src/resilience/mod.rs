//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce per-rule deadline on the outbound call)
//!     → On failure: ForwardError, surfaced to the client as 502
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - No retries: a failed forward is reported once and logged

pub mod timeouts;
