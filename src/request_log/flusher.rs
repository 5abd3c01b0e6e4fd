//! Periodic flush of the request log.
//!
//! # Responsibilities
//! - Flush the buffer on a fixed interval regardless of fill level
//! - Stop promptly when shutdown is signalled
//!
//! # Design Decisions
//! - File IO runs on the blocking pool so a slow disk never stalls the
//!   request-serving workers
//! - Takes the same lock as `append`, so load can delay a tick but not skip it

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::request_log::pipeline::LogPipeline;

pub struct FlushTask {
    pipeline: Arc<LogPipeline>,
    interval: Duration,
}

impl FlushTask {
    pub fn new(pipeline: Arc<LogPipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Request log flusher starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pipeline = Arc::clone(&self.pipeline);
                    if let Err(e) = tokio::task::spawn_blocking(move || pipeline.flush()).await {
                        tracing::error!(error = %e, "Request log flush task failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Request log flusher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
