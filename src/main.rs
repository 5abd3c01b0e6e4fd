//! BFF gateway (v1)
//!
//! A rule-driven backend-for-frontend gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────────┐
//!                        │                     BFF GATEWAY                        │
//!                        │                                                        │
//!   Client Request       │  ┌──────────┐    ┌──────────┐    ┌──────────────┐     │
//!   ─────────────────────┼─▶│   http   │───▶│ gateway  │───▶│   routing    │     │
//!                        │  │  server  │    │ handler  │    │ (first match)│     │
//!                        │  └────┬─────┘    └────┬─────┘    └──────┬───────┘     │
//!                        │       │ /admin        │                 ▼             │
//!                        │       ▼               │          ┌──────────────┐     │
//!                        │  ┌──────────┐         │          │  forwarder   │─────┼──▶ Backend
//!                        │  │  admin   │         │          │  (reqwest)   │◀────┼─── Service
//!                        │  └──────────┘         │          └──────┬───────┘     │
//!   Client Response      │                       ▼                 │             │
//!   ◀────────────────────┼──────────── buffered relay / SSE relay ◀┘             │
//!                        │                       │                               │
//!                        │                       ▼                               │
//!                        │                ┌─────────────┐                        │
//!                        │                │ request_log │──▶ JSON-lines file     │
//!                        │                └─────────────┘                        │
//!                        │  config (watch + admin) · observability · lifecycle   │
//!                        └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use bff_gateway::config::loader::load_config;
use bff_gateway::config::watcher::ConfigWatcher;
use bff_gateway::lifecycle::{wait_for_signal, Shutdown};
use bff_gateway::observability::{logging, metrics};
use bff_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "bff-gateway")]
#[command(about = "Rule-driven backend-for-frontend gateway", long_about = None)]
struct Cli {
    /// Configuration file (YAML, or TOML by extension).
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_tracing("info");
            tracing::error!(path = ?cli.config, error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    logging::init_tracing(&config.log.level);
    tracing::info!("bff-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = ?cli.config,
        bind_address = %config.server.bind_address(),
        rules = config.proxy.rules.len(),
        log_file = %config.log.file,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");
    tracing::info!("Admin UI at http://{}/admin", local_addr);

    // Dropping the watcher handle stops the watch; keep it for the process lifetime.
    let (watcher, config_updates) = ConfigWatcher::new(&cli.config);
    let _watcher = match watcher.run() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::with_config_path(config, Some(cli.config.clone()));
    let mut server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        res = &mut server_task => {
            tracing::error!("HTTP server exited before a shutdown signal");
            res??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
