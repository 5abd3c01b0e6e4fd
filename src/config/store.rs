//! Live configuration service.
//!
//! Holds the active [`Snapshot`] behind an atomic pointer. Readers take one
//! `Arc<Snapshot>` per request and keep it for the request's lifetime;
//! writers build a complete new snapshot and swap it in, so a reader never
//! observes a half-updated rule set.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::config::loader::{save_config, ConfigError};
use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;
use crate::observability::metrics;
use crate::routing::Router;

/// An immutable configuration plus the router compiled from its rules.
#[derive(Debug)]
pub struct Snapshot {
    pub config: GatewayConfig,
    pub router: Router,
}

impl Snapshot {
    pub fn new(config: GatewayConfig) -> Self {
        let router = Router::from_config(config.proxy.rules.clone());
        Self { config, router }
    }
}

/// Owner of the active configuration snapshot.
pub struct ConfigStore {
    current: ArcSwap<Snapshot>,
    /// File that admin updates are persisted to; `None` keeps them in memory.
    path: Option<PathBuf>,
    /// Serializes writers so persistence order equals adoption order.
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(config: GatewayConfig, path: Option<PathBuf>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::new(config)),
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// The active snapshot. Lock-free.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Adopt an already-validated configuration from a file reload.
    ///
    /// Fixed settings are carried over the same way as for [`update`].
    /// Returns `false` when the result equals the active config and nothing
    /// was swapped.
    ///
    /// [`update`]: ConfigStore::update
    pub fn replace(&self, mut config: GatewayConfig) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let active = self.current.load();
        carry_fixed_fields(&mut config, &active.config);
        if config == active.config {
            return false;
        }
        self.swap(config);
        true
    }

    /// Full replacement from the admin surface: validate, persist, adopt.
    ///
    /// Listener, log file and static asset settings are fixed for the
    /// lifetime of the process and are carried over from the active config.
    pub fn update(&self, mut config: GatewayConfig) -> Result<Arc<Snapshot>, ConfigError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let active = self.current.load();

        config.normalize();
        carry_fixed_fields(&mut config, &active.config);

        validate_config(&config).map_err(ConfigError::Validation)?;

        if let Some(path) = &self.path {
            save_config(path, &config)?;
        }

        Ok(self.swap(config))
    }

    fn swap(&self, config: GatewayConfig) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::new(config));
        self.current.store(Arc::clone(&snapshot));
        metrics::record_config_reload();
        tracing::info!(rules = snapshot.router.len(), "Configuration adopted");
        snapshot
    }
}

/// Listener, log file and static asset settings only take effect at startup.
fn carry_fixed_fields(config: &mut GatewayConfig, active: &GatewayConfig) {
    config.server = active.server.clone();
    config.log.file = active.log.file.clone();
    config.admin.static_dir = active.admin.static_dir.clone();
}
