//! Immediate sync with durable fallback.

use std::sync::Arc;

use adminsync_domain::{EntitySnapshot, NewOutboxEntry, SyncAction, SyncOutcome};
use tracing::{debug, error, instrument, warn};

use super::payload::build_payload;
use super::ports::{Clock, OutboxStore, SystemClock, UpsertEndpoint};
use super::request_id::resolve_request_id;

/// Try the endpoint once, fall back to the outbox on any failure.
///
/// `sync` never returns an error: every failure, including a failure to
/// write the outbox, ends up in the returned [`SyncOutcome`] or the logs.
pub struct SyncCoordinator {
    endpoint: Arc<dyn UpsertEndpoint>,
    outbox: Arc<dyn OutboxStore>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(endpoint: Arc<dyn UpsertEndpoint>, outbox: Arc<dyn OutboxStore>) -> Self {
        Self { endpoint, outbox, clock: Arc::new(SystemClock) }
    }

    /// Replace the wall clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Push one entity snapshot downstream.
    #[instrument(
        skip(self, snapshot),
        fields(entity_kind = %snapshot.kind, entity_key = %snapshot.key)
    )]
    pub async fn sync(
        &self,
        snapshot: &EntitySnapshot,
        action: SyncAction,
        request_id: Option<&str>,
    ) -> SyncOutcome {
        let started_at = self.clock.now();
        let request_id =
            resolve_request_id(request_id, action, snapshot.kind, &snapshot.key, started_at);
        let payload = build_payload(snapshot, &request_id);

        match self.endpoint.upsert(snapshot.kind, &payload).await {
            Ok(ack) => {
                debug!(request_id = %request_id, sync_id = ?ack.sync_id, "Immediate sync succeeded");

                // Older queued attempts for this entity carry a stale payload.
                match self.outbox.resolve_entity(snapshot.kind, &snapshot.key).await {
                    Ok(0) => {}
                    Ok(resolved) => {
                        debug!(resolved, "Resolved superseded outbox records");
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to resolve outbox records after sync");
                    }
                }

                SyncOutcome::succeeded(request_id, ack.sync_id, self.clock.now())
            }
            Err(err) => {
                let error_code = err.code();
                warn!(
                    request_id = %request_id,
                    error_code = %error_code,
                    category = ?err.category(),
                    error = %err,
                    "Immediate sync failed, queueing for retry"
                );

                let entry = NewOutboxEntry {
                    entity_kind: snapshot.kind,
                    entity_key: snapshot.key.clone(),
                    request_id: request_id.clone(),
                    payload,
                    initial_error: Some(err.to_string()),
                };

                match self.outbox.enqueue(entry, self.clock.now()).await {
                    Ok(record) => {
                        debug!(outbox_id = %record.id, status = %record.status, "Outbox record written");
                    }
                    Err(store_err) => {
                        error!(
                            request_id = %request_id,
                            error = %store_err,
                            "Failed to enqueue outbox record; change will not be retried"
                        );
                    }
                }

                SyncOutcome::failed(request_id, error_code, err.to_string(), self.clock.now())
            }
        }
    }
}
