//! One drain pass over the outbox.

use std::sync::Arc;

use adminsync_domain::constants::{DEFAULT_DRAIN_BATCH_SIZE, MAX_ATTEMPTS_REACHED};
use adminsync_domain::{OutboxRecord, Result};
use tracing::{debug, error, info, instrument, warn};

use super::ports::{Clock, OutboxStore, SystemClock, UpsertEndpoint};
use super::retry::RetryPolicy;

/// Maximum stored length of a failure reason.
const MAX_REASON_LEN: usize = 256;

/// Counters for one `drain_once` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Due records returned by the store.
    pub picked: usize,
    pub sent: usize,
    pub failed: usize,
    /// Records terminally failed during this pass.
    pub exhausted: usize,
    /// Records another drainer claimed first.
    pub skipped: usize,
    /// Records whose bookkeeping write failed.
    pub errors: usize,
}

enum RecordResult {
    Sent,
    Failed,
    Exhausted,
    Skipped,
}

/// Re-attempts delivery of due outbox records.
///
/// Scheduling is external: callers invoke [`OutboxDrainer::drain_once`] on
/// whatever cadence suits them. Overlapping calls, in one process or many,
/// are safe; each attempt is claimed with a version check first.
pub struct OutboxDrainer {
    endpoint: Arc<dyn UpsertEndpoint>,
    outbox: Arc<dyn OutboxStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    batch_size: usize,
}

impl OutboxDrainer {
    pub fn new(endpoint: Arc<dyn UpsertEndpoint>, outbox: Arc<dyn OutboxStore>) -> Self {
        Self {
            endpoint,
            outbox,
            clock: Arc::new(SystemClock),
            policy: RetryPolicy::default(),
            batch_size: DEFAULT_DRAIN_BATCH_SIZE,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Process up to one batch of due records.
    ///
    /// Only a failure of the due query itself is returned as an error. A
    /// failing record is logged, counted and skipped.
    #[instrument(skip(self), fields(batch_size = self.batch_size))]
    pub async fn drain_once(&self) -> Result<DrainReport> {
        let now = self.clock.now();
        let records = self.outbox.fetch_due(now, self.batch_size).await.map_err(|err| {
            error!(error = %err, "Failed to fetch due outbox records");
            err
        })?;

        let mut report = DrainReport { picked: records.len(), ..DrainReport::default() };
        if records.is_empty() {
            return Ok(report);
        }

        debug!(count = records.len(), "Draining outbox batch");

        for record in records {
            match self.process_record(&record).await {
                Ok(RecordResult::Sent) => report.sent += 1,
                Ok(RecordResult::Failed) => report.failed += 1,
                Ok(RecordResult::Exhausted) => report.exhausted += 1,
                Ok(RecordResult::Skipped) => report.skipped += 1,
                Err(err) => {
                    report.errors += 1;
                    warn!(
                        outbox_id = %record.id,
                        entity_kind = %record.entity_kind,
                        entity_key = %record.entity_key,
                        error = %err,
                        "Failed to process outbox record"
                    );
                }
            }
        }

        info!(
            picked = report.picked,
            sent = report.sent,
            failed = report.failed,
            exhausted = report.exhausted,
            skipped = report.skipped,
            errors = report.errors,
            "Outbox drain pass complete"
        );

        Ok(report)
    }

    async fn process_record(&self, record: &OutboxRecord) -> Result<RecordResult> {
        let now = self.clock.now();

        if self.policy.is_exhausted(record.attempts) {
            let marked = self
                .outbox
                .mark_exhausted(&record.id, record.version, MAX_ATTEMPTS_REACHED, now)
                .await?;
            if !marked {
                return Ok(RecordResult::Skipped);
            }
            warn!(
                outbox_id = %record.id,
                entity_kind = %record.entity_kind,
                entity_key = %record.entity_key,
                attempts = record.attempts,
                last_error = ?record.last_error,
                "Outbox record exhausted its attempts"
            );
            return Ok(RecordResult::Exhausted);
        }

        let attempt = record.attempts.saturating_add(1);
        let next_retry_at = self.policy.next_retry_at(attempt, now);

        // The CAS keeps a concurrent drainer holding the same read from
        // counting this attempt twice. Once the backoff delay elapses the
        // record is due again even if this call is still in flight; that
        // overlap is covered by the request id, not by the claim.
        let Some(claimed) =
            self.outbox.claim_attempt(&record.id, record.version, next_retry_at, now).await?
        else {
            debug!(outbox_id = %record.id, "Outbox record claimed elsewhere");
            return Ok(RecordResult::Skipped);
        };

        match self.endpoint.upsert(claimed.entity_kind, &claimed.payload).await {
            Ok(ack) => {
                self.outbox.mark_sent(&claimed.id, self.clock.now()).await?;
                info!(
                    outbox_id = %claimed.id,
                    entity_kind = %claimed.entity_kind,
                    entity_key = %claimed.entity_key,
                    request_id = %claimed.request_id,
                    attempts = claimed.attempts,
                    sync_id = ?ack.sync_id,
                    "Outbox record delivered"
                );
                Ok(RecordResult::Sent)
            }
            Err(err) => {
                let reason = truncate_reason(&err.to_string());
                self.outbox.mark_failed(&claimed.id, &reason, self.clock.now()).await?;
                warn!(
                    outbox_id = %claimed.id,
                    entity_kind = %claimed.entity_kind,
                    entity_key = %claimed.entity_key,
                    attempts = claimed.attempts,
                    error_code = %err.code(),
                    retryable = err.is_retryable(),
                    %next_retry_at,
                    "Outbox retry failed"
                );
                Ok(RecordResult::Failed)
            }
        }
    }
}

/// Truncate an error message for storage in `last_error`.
fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() <= MAX_REASON_LEN {
        return reason.to_string();
    }
    let mut truncated: String = reason.chars().take(MAX_REASON_LEN - 3).collect();
    truncated.push_str("...");
    truncated
}
