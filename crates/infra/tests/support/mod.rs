//! Shared helpers for `adminsync-infra` integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use adminsync_domain::{EndpointUrls, EntityKind, EntitySnapshot, HubConfig};
use adminsync_infra::database::{DbManager, SqliteOutboxRepository};
use tempfile::TempDir;

/// A migrated outbox database in a temporary directory.
pub struct TestDb {
    pub manager: Arc<DbManager>,
    pub repo: Arc<SqliteOutboxRepository>,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir created");
        let manager =
            Arc::new(DbManager::new(dir.path().join("outbox.db"), 2).expect("db manager created"));
        manager.run_migrations().expect("migrations applied");
        let repo = Arc::new(SqliteOutboxRepository::new(manager.clone()));
        Self { manager, repo, _dir: dir }
    }
}

/// Hub settings pointing every kind at `base_url`.
pub fn hub_config(base_url: &str) -> HubConfig {
    HubConfig {
        token: "test-token".into(),
        timeout_ms: 2_000,
        urls: EndpointUrls {
            tenants: format!("{base_url}/tenants/upsert"),
            clients: format!("{base_url}/clients/upsert"),
            subtenants: format!("{base_url}/subtenants/upsert"),
            domains: format!("{base_url}/domains/upsert"),
            branding: format!("{base_url}/branding/upsert"),
        },
    }
}

pub fn tenant(key: &str) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::Tenant, key, true)
        .with_field("client_id", "client-1")
        .with_field("name", "Acme")
}
