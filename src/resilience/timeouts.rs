//! Timeout enforcement.
//!
//! # Responsibilities
//! - Resolve the effective per-rule deadline
//! - Wrap backend calls with that deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Only the header phase of a streamed response is bounded

use std::future::Future;
use std::time::Duration;

use crate::config::schema::DEFAULT_RULE_TIMEOUT;

/// Returned when a deadline elapses before the wrapped future completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub Duration);

impl std::fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deadline of {:?} exceeded", self.0)
    }
}

impl std::error::Error for DeadlineExceeded {}

/// Configured seconds, or the 30 second default when zero.
pub fn effective_timeout(configured_secs: u64) -> Duration {
    if configured_secs == 0 {
        DEFAULT_RULE_TIMEOUT
    } else {
        Duration::from_secs(configured_secs)
    }
}

/// Run `fut` under `deadline`. Dropping the returned future cancels `fut`.
pub async fn with_deadline<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
