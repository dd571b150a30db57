//! SQLite-backed implementation of the outbox store port.
//!
//! Every mutation bumps `version`. Claims and exhaustion are conditional on
//! the version the caller read, which is what keeps overlapping drainers from
//! double-counting an attempt.

use std::sync::Arc;

use adminsync_core::OutboxStore;
use adminsync_domain::{
    AdminSyncError, EntityKind, NewOutboxEntry, OutboxRecord, OutboxStatus, Result as DomainResult,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, warn};
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};

/// SQLite outbox repository.
pub struct SqliteOutboxRepository {
    db: Arc<DbManager>,
}

impl SqliteOutboxRepository {
    /// Construct a repository backed by the shared manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Run `f` on a pooled connection off the async runtime.
    async fn with_connection<T, F>(&self, f: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            f(&mut *conn)
        })
        .await
        .map_err(map_join_error)?
    }

    fn insert_entry(conn: &mut Connection, record: &OutboxRecord) -> DomainResult<usize> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|err| AdminSyncError::InvalidInput(format!("payload not serializable: {err}")))?;

        let tx = conn.transaction().map_err(map_sql_error)?;
        let superseded = tx
            .execute(
                OUTBOX_SUPERSEDE_SQL,
                params![record.entity_kind.as_str(), record.entity_key],
            )
            .map_err(map_sql_error)?;
        tx.execute(
            OUTBOX_INSERT_SQL,
            params![
                record.id,
                record.entity_kind.as_str(),
                record.entity_key,
                record.request_id,
                payload,
                record.status.as_str(),
                record.attempts,
                record.last_error,
                record.next_retry_at.map(to_millis),
                record.exhausted_at.map(to_millis),
                record.version,
                to_millis(record.created_at),
                to_millis(record.updated_at),
            ],
        )
        .map_err(map_sql_error)?;
        tx.commit().map_err(map_sql_error)?;
        Ok(superseded)
    }

    fn select_by_id(conn: &Connection, id: &str) -> DomainResult<Option<OutboxRecord>> {
        conn.query_row(OUTBOX_SELECT_BY_ID_SQL, params![id], map_outbox_row)
            .optional()
            .map_err(map_sql_error)
    }

    fn select_many(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> DomainResult<Vec<OutboxRecord>> {
        let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
        let rows = stmt.query_map(params, map_outbox_row).map_err(map_sql_error)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
    }

    fn ensure_exists(conn: &Connection, id: &str) -> DomainResult<()> {
        let exists: bool = conn
            .query_row("SELECT EXISTS(SELECT 1 FROM sync_outbox WHERE id = ?1)", params![id], |row| {
                row.get(0)
            })
            .map_err(map_sql_error)?;
        if exists {
            Ok(())
        } else {
            Err(AdminSyncError::NotFound(format!("outbox record {id}")))
        }
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxRepository {
    async fn enqueue(
        &self,
        entry: NewOutboxEntry,
        now: DateTime<Utc>,
    ) -> DomainResult<OutboxRecord> {
        let record = entry.into_record(Uuid::now_v7().to_string(), now);
        let to_insert = record.clone();

        let superseded =
            self.with_connection(move |conn| Self::insert_entry(conn, &to_insert)).await?;

        debug!(
            outbox_id = %record.id,
            entity_kind = %record.entity_kind,
            entity_key = %record.entity_key,
            superseded,
            "outbox record enqueued"
        );
        Ok(record)
    }

    async fn resolve_entity(&self, kind: EntityKind, key: &str) -> DomainResult<usize> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.execute(OUTBOX_SUPERSEDE_SQL, params![kind.as_str(), key]).map_err(map_sql_error)
        })
        .await
    }

    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> DomainResult<Vec<OutboxRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = usize_to_i64(limit);
        self.with_connection(move |conn| {
            Self::select_many(conn, OUTBOX_DUE_SQL, params![to_millis(now), limit])
        })
        .await
    }

    async fn claim_attempt(
        &self,
        id: &str,
        expected_version: i64,
        next_retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<OutboxRecord>> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            let changed = conn
                .execute(
                    OUTBOX_CLAIM_SQL,
                    params![id, expected_version, to_millis(next_retry_at), to_millis(now)],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Ok(None);
            }
            Self::select_by_id(conn, &id)
        })
        .await
    }

    async fn mark_sent(&self, id: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let id = id.to_string();
        self.with_connection(move |conn| {
            let changed = conn
                .execute(OUTBOX_MARK_SENT_SQL, params![id, to_millis(now)])
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(AdminSyncError::NotFound(format!("outbox record {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn mark_failed(&self, id: &str, error: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let id = id.to_string();
        let error = error.to_string();
        self.with_connection(move |conn| {
            let changed = conn
                .execute(OUTBOX_MARK_FAILED_SQL, params![id, error, to_millis(now)])
                .map_err(map_sql_error)?;
            if changed == 0 {
                // Already SENT rows are left alone; only a missing row is an error.
                Self::ensure_exists(conn, &id)?;
            }
            Ok(())
        })
        .await
    }

    async fn mark_exhausted(
        &self,
        id: &str,
        expected_version: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let id = id.to_string();
        let reason = reason.to_string();
        self.with_connection(move |conn| {
            conn.execute(OUTBOX_EXHAUST_SQL, params![id, expected_version, reason, to_millis(now)])
                .map(|changed| changed > 0)
                .map_err(map_sql_error)
        })
        .await
    }

    async fn get(&self, id: &str) -> DomainResult<Option<OutboxRecord>> {
        let id = id.to_string();
        self.with_connection(move |conn| Self::select_by_id(conn, &id)).await
    }

    async fn find_by_entity(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> DomainResult<Vec<OutboxRecord>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            Self::select_many(conn, OUTBOX_BY_ENTITY_SQL, params![kind.as_str(), key])
        })
        .await
    }

    async fn list_exhausted(&self, limit: usize) -> DomainResult<Vec<OutboxRecord>> {
        let limit = usize_to_i64(limit);
        self.with_connection(move |conn| {
            Self::select_many(conn, OUTBOX_EXHAUSTED_SQL, params![limit])
        })
        .await
    }

    async fn purge_sent(&self, before: DateTime<Utc>) -> DomainResult<usize> {
        self.with_connection(move |conn| {
            conn.execute(OUTBOX_PURGE_SENT_SQL, params![to_millis(before)]).map_err(map_sql_error)
        })
        .await
    }
}

const OUTBOX_INSERT_SQL: &str = "INSERT INTO sync_outbox (
        id, entity_kind, entity_key, request_id, payload_json, status, attempts, last_error,
        next_retry_at, exhausted_at, version, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const OUTBOX_SUPERSEDE_SQL: &str = "DELETE FROM sync_outbox
    WHERE entity_kind = ?1 AND entity_key = ?2 AND status != 'SENT'";

const OUTBOX_SELECT_BY_ID_SQL: &str = "SELECT id, entity_kind, entity_key, request_id, \
     payload_json, status, attempts, last_error, next_retry_at, exhausted_at, version, \
     created_at, updated_at
    FROM sync_outbox WHERE id = ?1";

const OUTBOX_DUE_SQL: &str = "SELECT id, entity_kind, entity_key, request_id, payload_json, \
     status, attempts, last_error, next_retry_at, exhausted_at, version, created_at, updated_at
    FROM sync_outbox
    WHERE status IN ('PENDING', 'FAILED')
      AND exhausted_at IS NULL
      AND (next_retry_at IS NULL OR next_retry_at <= ?1)
    ORDER BY COALESCE(next_retry_at, created_at) ASC, created_at ASC, id ASC
    LIMIT ?2";

const OUTBOX_BY_ENTITY_SQL: &str = "SELECT id, entity_kind, entity_key, request_id, \
     payload_json, status, attempts, last_error, next_retry_at, exhausted_at, version, \
     created_at, updated_at
    FROM sync_outbox
    WHERE entity_kind = ?1 AND entity_key = ?2
    ORDER BY created_at ASC, id ASC";

const OUTBOX_EXHAUSTED_SQL: &str = "SELECT id, entity_kind, entity_key, request_id, \
     payload_json, status, attempts, last_error, next_retry_at, exhausted_at, version, \
     created_at, updated_at
    FROM sync_outbox
    WHERE exhausted_at IS NOT NULL
    ORDER BY exhausted_at DESC, id ASC
    LIMIT ?1";

const OUTBOX_CLAIM_SQL: &str = "UPDATE sync_outbox
    SET attempts = attempts + 1, next_retry_at = ?3, version = version + 1, updated_at = ?4
    WHERE id = ?1 AND version = ?2 AND status != 'SENT' AND exhausted_at IS NULL";

const OUTBOX_MARK_SENT_SQL: &str = "UPDATE sync_outbox
    SET status = 'SENT', last_error = NULL, next_retry_at = NULL,
        version = version + 1, updated_at = ?2
    WHERE id = ?1";

const OUTBOX_MARK_FAILED_SQL: &str = "UPDATE sync_outbox
    SET status = 'FAILED', last_error = ?2, version = version + 1, updated_at = ?3
    WHERE id = ?1 AND status != 'SENT'";

const OUTBOX_EXHAUST_SQL: &str = "UPDATE sync_outbox
    SET status = 'FAILED', last_error = ?3, next_retry_at = NULL, exhausted_at = ?4,
        version = version + 1, updated_at = ?4
    WHERE id = ?1 AND version = ?2 AND status != 'SENT' AND exhausted_at IS NULL";

const OUTBOX_PURGE_SENT_SQL: &str = "DELETE FROM sync_outbox
    WHERE status = 'SENT' AND updated_at < ?1";

fn map_outbox_row(row: &Row<'_>) -> rusqlite::Result<OutboxRecord> {
    let id: String = row.get(0)?;

    let kind_raw: String = row.get(1)?;
    let entity_kind =
        kind_raw.parse::<EntityKind>().map_err(|err| conversion_error(1, err.into()))?;

    let payload_raw: String = row.get(4)?;
    let payload =
        serde_json::from_str(&payload_raw).map_err(|err| conversion_error(4, Box::new(err)))?;

    let status_raw: String = row.get(5)?;
    let status = parse_status(&id, &status_raw)?;

    Ok(OutboxRecord {
        id,
        entity_kind,
        entity_key: row.get(2)?,
        request_id: row.get(3)?,
        payload,
        status,
        attempts: row.get(6)?,
        last_error: row.get(7)?,
        next_retry_at: optional_timestamp(row, 8)?,
        exhausted_at: optional_timestamp(row, 9)?,
        version: row.get(10)?,
        created_at: timestamp(row, 11)?,
        updated_at: timestamp(row, 12)?,
    })
}

fn parse_status(id: &str, raw: &str) -> rusqlite::Result<OutboxStatus> {
    raw.parse::<OutboxStatus>().map_err(|err| {
        warn!(outbox_id = %id, raw_status = %raw, "invalid outbox status returned by SQLite");
        conversion_error(5, err.into())
    })
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    from_millis(millis).ok_or_else(|| {
        conversion_error(idx, format!("timestamp out of range: {millis}").into())
    })
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => timestamp(row, idx).map(Some),
        None => Ok(None),
    }
}

fn conversion_error(
    idx: usize,
    err: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err)
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn map_join_error(err: task::JoinError) -> AdminSyncError {
    if err.is_cancelled() {
        AdminSyncError::Internal("outbox task cancelled".into())
    } else {
        AdminSyncError::Internal(format!("outbox task panic: {err}"))
    }
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
