// ============================================================================
// Outbox Pattern Types
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::EntityKind;

/// Outbox record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

crate::impl_domain_status_conversions!(OutboxStatus {
    Pending => "PENDING",
    Sent => "SENT",
    Failed => "FAILED",
});

/// Durable retry record for one failed sync of one entity.
///
/// `version` is bumped on every mutation and is the compare-and-swap token
/// drainers use so that two of them never claim the same attempt.
/// `exhausted_at` is set once the record has run out of attempts; it stays
/// `FAILED` and is no longer returned by due queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: String,
    pub entity_kind: EntityKind,
    pub entity_key: String,
    pub request_id: String,
    pub payload: Value,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub exhausted_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxRecord {
    /// True when a drainer may pick this record up at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, OutboxStatus::Pending | OutboxStatus::Failed)
            && self.exhausted_at.is_none()
            && self.next_retry_at.map_or(true, |at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted_at.is_some()
    }
}

/// Input to `OutboxStore::enqueue`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEntry {
    pub entity_kind: EntityKind,
    pub entity_key: String,
    pub request_id: String,
    pub payload: Value,
    /// Failure reason of the immediate attempt, when known.
    pub initial_error: Option<String>,
}

impl NewOutboxEntry {
    /// Materialise the record a store persists for this entry.
    ///
    /// The record starts `FAILED` when the immediate failure reason is known
    /// and `PENDING` otherwise, with zero attempts and immediately due.
    pub fn into_record(self, id: String, now: DateTime<Utc>) -> OutboxRecord {
        let status =
            if self.initial_error.is_some() { OutboxStatus::Failed } else { OutboxStatus::Pending };

        OutboxRecord {
            id,
            entity_kind: self.entity_kind,
            entity_key: self.entity_key,
            request_id: self.request_id,
            payload: self.payload,
            status,
            attempts: 0,
            last_error: self.initial_error,
            next_retry_at: Some(now),
            exhausted_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
