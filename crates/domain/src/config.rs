//! Configuration structures
//!
//! Loaded by `adminsync_infra::config` from the environment or a JSON/TOML
//! file. Everything except the hub token, the per-kind URLs and the database
//! path has a default.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_DB_POOL_SIZE,
    DEFAULT_DRAIN_BATCH_SIZE, DEFAULT_DRAIN_INTERVAL_SECS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_SENT_RETENTION_SECS, DEFAULT_UPSERT_TIMEOUT_MS,
};
use crate::errors::{AdminSyncError, Result};
use crate::types::EntityKind;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub hub: HubConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub drain: DrainConfig,
}

impl Config {
    /// Reject configurations the process must not start with.
    ///
    /// # Errors
    /// Returns [`AdminSyncError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.hub.validate()?;

        if self.database.path.trim().is_empty() {
            return Err(AdminSyncError::Config("database path is required".into()));
        }
        if self.database.pool_size == 0 {
            return Err(AdminSyncError::Config("database pool size must be positive".into()));
        }

        self.drain.validate()
    }
}

/// Remote endpoint ("hub") settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Shared bearer token.
    pub token: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub urls: EndpointUrls,
}

impl HubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(AdminSyncError::Config("hub token is required".into()));
        }
        if self.timeout_ms == 0 {
            return Err(AdminSyncError::Config("hub timeout must be positive".into()));
        }

        for kind in EntityKind::ALL {
            let url = self.urls.for_kind(kind).trim();
            if url.is_empty() {
                return Err(AdminSyncError::Config(format!("upsert URL for {kind} is required")));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AdminSyncError::Config(format!(
                    "upsert URL for {kind} must be http(s): {url}"
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("urls", &self.urls)
            .finish()
    }
}

/// One upsert URL per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointUrls {
    pub tenants: String,
    pub clients: String,
    pub subtenants: String,
    pub domains: String,
    pub branding: String,
}

impl EndpointUrls {
    pub fn for_kind(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Tenant => &self.tenants,
            EntityKind::Client => &self.clients,
            EntityKind::Subtenant => &self.subtenants,
            EntityKind::Domain => &self.domains,
            EntityKind::Branding => &self.branding,
        }
    }
}

/// Outbox database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Drain cadence and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub interval_secs: u64,
    pub sent_retention_secs: u64,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_DRAIN_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            interval_secs: DEFAULT_DRAIN_INTERVAL_SECS,
            sent_retention_secs: DEFAULT_SENT_RETENTION_SECS,
        }
    }
}

impl DrainConfig {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AdminSyncError::Config("drain batch size must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(AdminSyncError::Config("max attempts must be positive".into()));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(AdminSyncError::Config(format!(
                "backoff cap ({}ms) is below backoff base ({}ms)",
                self.backoff_max_ms, self.backoff_base_ms
            )));
        }
        if self.interval_secs == 0 {
            return Err(AdminSyncError::Config("drain interval must be positive".into()));
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_UPSERT_TIMEOUT_MS
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}
