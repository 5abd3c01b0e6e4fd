//! Server-Sent Events passthrough.
//!
//! # Responsibilities
//! - Detect event-stream exchanges from request or response headers
//! - Relay the backend body in small chunks as it arrives
//! - Record the exchange in the request log exactly once when it ends
//!
//! # Data Flow
//! ```text
//! Backend ──bytes──▶ StreamRelay (≤4 KiB frames) ──▶ hyper ──flush──▶ Client
//!                        │
//!                        └─ end / error / drop ──▶ RequestLogRecord
//! ```
//!
//! # Design Decisions
//! - Every chunk becomes its own body frame; hyper writes and flushes each
//!   frame as soon as it is yielded, so nothing is held back
//! - No deadline is applied once headers are sent; a live stream may run
//!   indefinitely
//! - A mid-stream read error cannot change the status already sent: it is
//!   logged and the connection is aborted
//! - The body is never materialized for logging; the sentinel stands in
//! - A stream still open when the shutdown drain window expires is cut off
//!   and logged before the request log closes

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::{header, HeaderMap};
use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::watch;

use crate::http::forward::error_chain;
use crate::request_log::{RecordGuard, STREAM_SENTINEL};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest frame relayed to the client in one write.
pub const STREAM_CHUNK_SIZE: usize = 4096;

const EVENT_STREAM: &str = "text/event-stream";

/// Logged when the client goes away before the backend finishes.
pub const CLIENT_GONE_MID_STREAM: &str = "client disconnected before end of stream";

/// Logged when shutdown ends a stream the backend had not finished.
pub const CUT_BY_SHUTDOWN: &str = "stream cut off by gateway shutdown";

fn mentions_event_stream(headers: &HeaderMap, name: header::HeaderName) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains(EVENT_STREAM))
        .unwrap_or(false)
}

/// The request asks for an event stream (`Accept: text/event-stream`).
pub fn accepts_event_stream(request_headers: &HeaderMap) -> bool {
    mentions_event_stream(request_headers, header::ACCEPT)
}

/// The response is an event stream (`Content-Type: text/event-stream`).
pub fn is_event_stream(response_headers: &HeaderMap) -> bool {
    mentions_event_stream(response_headers, header::CONTENT_TYPE)
}

/// Either side alone is enough to switch to streaming.
pub fn is_sse(request_headers: &HeaderMap, response_headers: &HeaderMap) -> bool {
    accepts_event_stream(request_headers) || is_event_stream(response_headers)
}

/// Body stream that relays a backend event stream and logs its outcome.
pub struct StreamRelay {
    upstream: BoxStream<'static, Result<Bytes, BoxError>>,
    cutoff: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
    pending: Bytes,
    record: Option<RecordGuard>,
    status: u16,
    done: bool,
}

impl StreamRelay {
    /// `record` is completed with the backend `status` when the stream ends.
    pub fn new(response: reqwest::Response, mut record: RecordGuard) -> Self {
        let status = response.status().as_u16();
        record.on_abandon(status, STREAM_SENTINEL, CLIENT_GONE_MID_STREAM);
        let upstream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(BoxError::from))
            .boxed();
        Self::from_stream(upstream, status, record)
    }

    pub fn from_stream(
        upstream: BoxStream<'static, Result<Bytes, BoxError>>,
        status: u16,
        record: RecordGuard,
    ) -> Self {
        Self {
            upstream,
            cutoff: None,
            pending: Bytes::new(),
            record: Some(record),
            status,
            done: false,
        }
    }

    /// End the stream early once `cutoff` turns `true`.
    ///
    /// A dropped sender never cuts the stream.
    pub fn with_cutoff(mut self, mut cutoff: watch::Receiver<bool>) -> Self {
        self.cutoff = Some(Box::pin(async move {
            let cut = cutoff.wait_for(|cut| *cut).await.is_ok();
            if !cut {
                std::future::pending::<()>().await;
            }
        }));
        self
    }

    fn finish(&mut self, error: Option<String>) {
        self.done = true;
        if let Some(record) = self.record.take() {
            record.complete(self.status, STREAM_SENTINEL, error);
        }
    }
}

impl Stream for StreamRelay {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(STREAM_CHUNK_SIZE);
                return Poll::Ready(Some(Ok(this.pending.split_to(n))));
            }
            if this.done {
                return Poll::Ready(None);
            }
            if let Some(cutoff) = this.cutoff.as_mut() {
                if cutoff.as_mut().poll(cx).is_ready() {
                    tracing::warn!("Event stream cut off by shutdown");
                    this.finish(Some(CUT_BY_SHUTDOWN.to_string()));
                    return Poll::Ready(None);
                }
            }
            match this.upstream.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => this.pending = bytes,
                Poll::Ready(Some(Err(e))) => {
                    let detail = error_chain(e.as_ref());
                    tracing::warn!(error = %detail, "Upstream event stream failed after headers were sent");
                    this.finish(Some(format!("failed to read upstream stream: {}", detail)));
                    return Poll::Ready(Some(Err(io::Error::other(e))));
                }
                Poll::Ready(None) => {
                    tracing::debug!("Upstream event stream ended");
                    this.finish(None);
                    return Poll::Ready(None);
                }
            }
        }
    }
}
