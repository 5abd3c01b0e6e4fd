//! Exactly-once completion of a request's log record.

use std::sync::Arc;

use crate::config::schema::RuleConfig;
use crate::request_log::pipeline::LogPipeline;
use crate::request_log::record::PendingRecord;

/// nginx's "client closed request"; the client never saw a response.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

const CLIENT_GONE: &str = "client disconnected before response";

/// Owns a [`PendingRecord`] until the exchange ends.
///
/// [`RecordGuard::complete`] appends the record with the real outcome. If the
/// guard is dropped first (the client went away and the handler or body
/// stream was cancelled) the record is appended with the abandon outcome, so
/// every request is logged exactly once either way.
pub struct RecordGuard {
    pending: Option<PendingRecord>,
    pipeline: Arc<LogPipeline>,
    abandon_status: u16,
    abandon_body: String,
    abandon_error: String,
}

impl RecordGuard {
    pub fn new(pipeline: Arc<LogPipeline>, pending: PendingRecord) -> Self {
        Self {
            pending: Some(pending),
            pipeline,
            abandon_status: CLIENT_CLOSED_REQUEST,
            abandon_body: String::new(),
            abandon_error: CLIENT_GONE.to_string(),
        }
    }

    /// Attribute the exchange to the matched rule.
    pub fn set_rule(&mut self, rule: &RuleConfig) {
        self.pending = self.pending.take().map(|p| p.with_rule(rule));
    }

    /// Outcome to record if the guard is dropped without completing.
    pub fn on_abandon(&mut self, status: u16, body: impl Into<String>, error: impl Into<String>) {
        self.abandon_status = status;
        self.abandon_body = body.into();
        self.abandon_error = error.into();
    }

    pub fn complete(mut self, status: u16, response_body: impl Into<String>, error: Option<String>) {
        if let Some(pending) = self.pending.take() {
            self.pipeline.append(pending.finish(status, response_body, error));
        }
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(reason = %self.abandon_error, "Request abandoned before completion");
            let body = std::mem::take(&mut self.abandon_body);
            let error = std::mem::take(&mut self.abandon_error);
            self.pipeline
                .append(pending.finish(self.abandon_status, body, Some(error)));
        }
    }
}
