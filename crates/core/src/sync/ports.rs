//! Port interfaces for sync operations

use adminsync_domain::{EntityKind, NewOutboxEntry, OutboxRecord, Result, SyncOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::errors::UpsertError;

/// Successful upsert acknowledgement from the remote endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertAck {
    pub sync_id: Option<String>,
    /// The `id` (or `host`) the endpoint echoed back.
    pub remote_key: Option<String>,
}

/// Trait for delivering upsert payloads to the downstream system.
///
/// One call per invocation. Implementations must not retry internally and
/// must not persist anything.
#[async_trait]
pub trait UpsertEndpoint: Send + Sync {
    /// Push one upsert payload for `kind`.
    async fn upsert(
        &self,
        kind: EntityKind,
        payload: &Value,
    ) -> std::result::Result<UpsertAck, UpsertError>;
}

/// Trait for the durable outbox of failed syncs.
///
/// Every mutating method bumps the record's `version`. Methods taking an
/// `expected_version` are compare-and-swap: they change nothing and report
/// a miss when another writer got there first.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Persist a new record, replacing any older open record for the same
    /// entity. The record is due immediately.
    async fn enqueue(&self, entry: NewOutboxEntry, now: DateTime<Utc>) -> Result<OutboxRecord>;

    /// Drop every record for the entity that is not `SENT`. Called after a
    /// successful immediate sync.
    async fn resolve_entity(&self, kind: EntityKind, key: &str) -> Result<usize>;

    /// Records that are `PENDING` or `FAILED`, not exhausted, and whose
    /// `next_retry_at` is unset or not after `now`; oldest schedule first.
    async fn fetch_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxRecord>>;

    /// Increment `attempts` and set `next_retry_at` if the record is still at
    /// `expected_version` and retryable. Returns the updated record, or
    /// `None` when the claim lost a race.
    async fn claim_attempt(
        &self,
        id: &str,
        expected_version: i64,
        next_retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboxRecord>>;

    /// Mark an entry as successfully sent
    async fn mark_sent(&self, id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Mark an entry as failed with error message. Never downgrades `SENT`.
    async fn mark_failed(&self, id: &str, error: &str, now: DateTime<Utc>) -> Result<()>;

    /// Terminally fail a record that ran out of attempts.
    async fn mark_exhausted(
        &self,
        id: &str,
        expected_version: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn get(&self, id: &str) -> Result<Option<OutboxRecord>>;

    async fn find_by_entity(&self, kind: EntityKind, key: &str) -> Result<Vec<OutboxRecord>>;

    /// Terminally failed records, most recent first.
    async fn list_exhausted(&self, limit: usize) -> Result<Vec<OutboxRecord>>;

    /// Delete `SENT` records last updated before `before`.
    async fn purge_sent(&self, before: DateTime<Utc>) -> Result<usize>;
}

/// Trait for the CRUD store side that keeps the last outcome on each entity.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn load_outcome(&self, kind: EntityKind, key: &str) -> Result<Option<SyncOutcome>>;

    async fn attach_outcome(
        &self,
        kind: EntityKind,
        key: &str,
        outcome: &SyncOutcome,
    ) -> Result<()>;
}

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
