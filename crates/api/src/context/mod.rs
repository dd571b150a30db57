//! Application context - dependency injection container

use std::fs;
use std::path::Path;
use std::sync::Arc;

use adminsync_core::{
    MutationSync, OutboxDrainer, OutboxStore, OutcomeSink, RetryPolicy, SyncCoordinator,
    UpsertEndpoint,
};
use adminsync_domain::{AdminSyncError, Config, Result};
use adminsync_infra::{
    config, DbManager, DrainWorker, DrainWorkerConfig, HubClient, SqliteOutboxRepository,
};
use tokio::sync::Mutex;
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub outbox: Arc<dyn OutboxStore>,
    pub coordinator: Arc<SyncCoordinator>,
    pub drainer: Arc<OutboxDrainer>,
    worker: Mutex<DrainWorker>,
}

impl AppContext {
    /// Load configuration and build the context.
    ///
    /// # Errors
    /// Returns an error if configuration is missing or invalid, or if the
    /// outbox database cannot be opened.
    pub fn new() -> Result<Self> {
        let config = config::load()?;
        Self::new_with_config(config)
    }

    /// Build the context from an explicit configuration.
    pub fn new_with_config(config: Config) -> Result<Self> {
        config.validate()?;

        ensure_parent_dir(Path::new(&config.database.path))?;

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;
        db.health_check()?;

        let endpoint: Arc<dyn UpsertEndpoint> = Arc::new(HubClient::from_config(&config.hub)?);
        let outbox: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxRepository::new(db.clone()));

        let coordinator = Arc::new(SyncCoordinator::new(endpoint.clone(), outbox.clone()));
        let drainer = Arc::new(
            OutboxDrainer::new(endpoint, outbox.clone())
                .with_policy(RetryPolicy::from(&config.drain))
                .with_batch_size(config.drain.batch_size),
        );

        let worker = DrainWorker::new(
            drainer.clone(),
            outbox.clone(),
            DrainWorkerConfig::from(&config.drain),
        );

        info!(db_path = %config.database.path, "Application context initialized");

        Ok(Self { config, db, outbox, coordinator, drainer, worker: Mutex::new(worker) })
    }

    /// Wire a post-commit sync hook that records outcomes into `sink`.
    pub fn mutation_sync(&self, sink: Arc<dyn OutcomeSink>) -> MutationSync {
        MutationSync::new(self.coordinator.clone(), sink)
    }

    /// Start the background drain worker.
    pub async fn start(&self) -> Result<()> {
        self.worker.lock().await.start().map_err(AdminSyncError::from)
    }

    /// Stop the background drain worker and wait for it to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if !worker.is_running() {
            return Ok(());
        }
        worker.stop().await.map_err(AdminSyncError::from)
    }

    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_running()
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| AdminSyncError::Config(format!("cannot create {}: {e}", parent.display()))),
        _ => Ok(()),
    }
}
