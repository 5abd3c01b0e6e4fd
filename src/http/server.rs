//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: admin surface first, gateway as the fallback
//! - Own the shared state (config store, outbound client, request log)
//! - Run the background tasks: periodic log flush and config reload
//! - Drain on shutdown, then close the request log exactly once

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::config::{ConfigStore, GatewayConfig};
use crate::http::forward::Forwarder;
use crate::http::gateway::gateway_handler;
use crate::request_log::{FlushTask, LogPipeline};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub forwarder: Forwarder,
    pub log: Arc<LogPipeline>,
    /// Flips to `true` when open streams must be cut off.
    pub stream_cutoff: watch::Receiver<bool>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
    cutoff_tx: watch::Sender<bool>,
}

impl HttpServer {
    /// Create a server whose admin updates stay in memory.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_config_path(config, None)
    }

    /// Create a server that persists admin updates to `path`.
    pub fn with_config_path(config: GatewayConfig, path: Option<PathBuf>) -> Self {
        let log = Arc::new(LogPipeline::open(
            config.log.file.clone(),
            config.log.buffer_capacity,
        ));
        let (cutoff_tx, stream_cutoff) = watch::channel(false);
        let state = AppState {
            config: Arc::new(ConfigStore::new(config, path)),
            forwarder: Forwarder::new(),
            log,
            stream_cutoff,
        };

        let router = Self::build_router(state.clone());
        Self {
            router,
            state,
            cutoff_tx,
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .merge(admin::setup_admin_router(state.clone()))
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The assembled router, for serving it some other way.
    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The configuration active right now.
    pub fn config(&self) -> GatewayConfig {
        self.state.config.current().config.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Configurations arriving on `config_updates` are adopted as they come.
    /// After the signal, in-flight exchanges get `server.shutdown_grace_secs`
    /// to finish. Streams still open after that are cut off so their records
    /// land before the request log is flushed and closed.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let active = self.state.config.current();
        let grace = Duration::from_secs(active.config.server.shutdown_grace_secs);
        tracing::info!(
            address = %addr,
            rules = active.router.len(),
            "HTTP server starting"
        );

        let flush_interval = Duration::from_secs(active.config.log.flush_interval_secs);
        let flusher = tokio::spawn(
            FlushTask::new(self.state.log.clone(), flush_interval).run(shutdown.resubscribe()),
        );
        let reloader = tokio::spawn(apply_config_updates(
            self.state.config.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal, draining connections");
                let _ = drain_tx.send(());
            })
            .into_future();
        tokio::pin!(serve);

        let drain_deadline = async move {
            match drain_rx.await {
                Ok(()) => tokio::time::sleep(grace).await,
                Err(_) => std::future::pending::<()>().await,
            }
        };

        let result = tokio::select! {
            res = &mut serve => res,
            _ = drain_deadline => {
                tracing::warn!(grace = ?grace, "Drain window expired, cutting off open streams");
                let _ = self.cutoff_tx.send(true);
                match tokio::time::timeout(CUTOFF_SETTLE, &mut serve).await {
                    Ok(res) => res,
                    Err(_) => {
                        tracing::warn!("Connections still open after cutoff, closing anyway");
                        Ok(())
                    }
                }
            }
        };

        flusher.abort();
        reloader.abort();

        let log = self.state.log.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || log.close()).await {
            tracing::error!(error = %e, "Failed to close request log");
        }

        tracing::info!("HTTP server stopped");
        result
    }
}

/// How long cut-off connections get to wind down before the log closes.
const CUTOFF_SETTLE: Duration = Duration::from_secs(1);

async fn apply_config_updates(
    store: Arc<ConfigStore>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    if store.replace(config) {
                        tracing::info!(rules = store.current().router.len(), "Configuration reloaded");
                    } else {
                        tracing::debug!("Reloaded configuration already active");
                    }
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
