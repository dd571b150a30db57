//! In-memory outbox with the same compare-and-swap rules as the SQLite
//! repository.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use adminsync_core::OutboxStore;
use adminsync_domain::{
    AdminSyncError, EntityKind, NewOutboxEntry, OutboxRecord, OutboxStatus, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Default)]
pub struct MemoryOutbox {
    records: Mutex<Vec<OutboxRecord>>,
    next_id: AtomicU64,
    fail_enqueue: AtomicBool,
    fail_mark_sent: AtomicBool,
    /// Simulates a competing drainer claiming every fetched record.
    bump_on_fetch: AtomicBool,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_enqueue(&self) {
        self.fail_enqueue.store(true, Ordering::SeqCst);
    }

    pub fn fail_mark_sent(&self) {
        self.fail_mark_sent.store(true, Ordering::SeqCst);
    }

    pub fn bump_on_fetch(&self) {
        self.bump_on_fetch.store(true, Ordering::SeqCst);
    }

    /// Insert a record as-is.
    pub fn insert(&self, record: OutboxRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn records(&self) -> Vec<OutboxRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn only_record(&self) -> OutboxRecord {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one outbox record");
        records.into_iter().next().unwrap()
    }

    fn with_record<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut OutboxRecord) -> T,
    ) -> Result<T> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AdminSyncError::NotFound(format!("outbox record {id}")))?;
        Ok(f(record))
    }
}

fn is_open(record: &OutboxRecord) -> bool {
    record.status != OutboxStatus::Sent
}

#[async_trait]
impl OutboxStore for MemoryOutbox {
    async fn enqueue(&self, entry: NewOutboxEntry, now: DateTime<Utc>) -> Result<OutboxRecord> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(AdminSyncError::Database("disk full".into()));
        }
        let id = format!("outbox-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = entry.into_record(id, now);

        let mut records = self.records.lock().unwrap();
        records.retain(|r| {
            !(r.entity_kind == record.entity_kind
                && r.entity_key == record.entity_key
                && is_open(r))
        });
        records.push(record.clone());
        Ok(record)
    }

    async fn resolve_entity(&self, kind: EntityKind, key: &str) -> Result<usize> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !(r.entity_kind == kind && r.entity_key == key && is_open(r)));
        Ok(before - records.len())
    }

    async fn fetch_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxRecord>> {
        let mut records = self.records.lock().unwrap();
        let mut due: Vec<OutboxRecord> = records.iter().filter(|r| r.is_due(now)).cloned().collect();
        due.sort_by_key(|r| (r.next_retry_at.unwrap_or(r.created_at), r.created_at));
        due.truncate(limit);

        if self.bump_on_fetch.load(Ordering::SeqCst) {
            for record in records.iter_mut().filter(|r| due.iter().any(|d| d.id == r.id)) {
                record.version += 1;
            }
        }
        Ok(due)
    }

    async fn claim_attempt(
        &self,
        id: &str,
        expected_version: i64,
        next_retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboxRecord>> {
        self.with_record(id, |record| {
            if record.version != expected_version
                || !is_open(record)
                || record.exhausted_at.is_some()
            {
                return None;
            }
            record.attempts += 1;
            record.next_retry_at = Some(next_retry_at);
            record.version += 1;
            record.updated_at = now;
            Some(record.clone())
        })
    }

    async fn mark_sent(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.fail_mark_sent.load(Ordering::SeqCst) {
            return Err(AdminSyncError::Database("database is locked".into()));
        }
        self.with_record(id, |record| {
            record.status = OutboxStatus::Sent;
            record.last_error = None;
            record.next_retry_at = None;
            record.version += 1;
            record.updated_at = now;
        })
    }

    async fn mark_failed(&self, id: &str, error: &str, now: DateTime<Utc>) -> Result<()> {
        self.with_record(id, |record| {
            if is_open(record) {
                record.status = OutboxStatus::Failed;
                record.last_error = Some(error.to_string());
                record.version += 1;
                record.updated_at = now;
            }
        })
    }

    async fn mark_exhausted(
        &self,
        id: &str,
        expected_version: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_record(id, |record| {
            if record.version != expected_version
                || !is_open(record)
                || record.exhausted_at.is_some()
            {
                return false;
            }
            record.status = OutboxStatus::Failed;
            record.last_error = Some(reason.to_string());
            record.next_retry_at = None;
            record.exhausted_at = Some(now);
            record.version += 1;
            record.updated_at = now;
            true
        })
    }

    async fn get(&self, id: &str) -> Result<Option<OutboxRecord>> {
        Ok(self.records.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_entity(&self, kind: EntityKind, key: &str) -> Result<Vec<OutboxRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.entity_kind == kind && r.entity_key == key)
            .cloned()
            .collect())
    }

    async fn list_exhausted(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        let mut exhausted: Vec<OutboxRecord> =
            self.records.lock().unwrap().iter().filter(|r| r.is_exhausted()).cloned().collect();
        exhausted.sort_by(|a, b| b.exhausted_at.cmp(&a.exhausted_at));
        exhausted.truncate(limit);
        Ok(exhausted)
    }

    async fn purge_sent(&self, before: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.lock().unwrap();
        let count = records.len();
        records.retain(|r| !(r.status == OutboxStatus::Sent && r.updated_at < before));
        Ok(count - records.len())
    }
}
