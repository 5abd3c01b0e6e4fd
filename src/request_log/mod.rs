//! Request log subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway handler / stream relay
//!     → record.rs (PendingRecord → RequestLogRecord, one per request)
//!     → guard.rs (completes the record once, even if the client leaves)
//!     → pipeline.rs (buffer; flush at capacity)
//!     → flusher.rs (flush every interval)
//!     → append-only JSON-lines file
//!
//! Admin surface
//!     → pipeline.rs tail (flush, then read last 1 MiB newest-first)
//! ```
//!
//! # Design Decisions
//! - Faults are reported through tracing and never reach the request path
//! - A single lock serializes append, flush and tail

pub mod flusher;
pub mod guard;
pub mod pipeline;
pub mod record;

pub use flusher::FlushTask;
pub use guard::RecordGuard;
pub use pipeline::{LogError, LogPipeline};
pub use record::{PendingRecord, RequestLogRecord, STREAM_SENTINEL};
