//! CRUD-side glue: sync after commit, then attach the outcome.

use std::sync::Arc;

use adminsync_domain::{EntitySnapshot, SyncAction, SyncOutcome};
use tracing::{debug, instrument, warn};

use super::coordinator::SyncCoordinator;
use super::ports::OutcomeSink;

/// Runs a sync after the local mutation committed and records the outcome
/// on the entity.
///
/// The two steps fail independently. Neither a failed sync nor a failed
/// attach is ever surfaced to the caller; the local mutation already stands.
pub struct MutationSync {
    coordinator: Arc<SyncCoordinator>,
    sink: Arc<dyn OutcomeSink>,
}

impl MutationSync {
    pub fn new(coordinator: Arc<SyncCoordinator>, sink: Arc<dyn OutcomeSink>) -> Self {
        Self { coordinator, sink }
    }

    /// Sync `snapshot` and attach the outcome unless a newer one is stored.
    #[instrument(skip(self, snapshot), fields(entity_kind = %snapshot.kind, entity_key = %snapshot.key))]
    pub async fn after_commit(
        &self,
        snapshot: &EntitySnapshot,
        action: SyncAction,
        request_id: Option<&str>,
    ) -> SyncOutcome {
        let outcome = self.coordinator.sync(snapshot, action, request_id).await;

        let stored = match self.sink.load_outcome(snapshot.kind, &snapshot.key).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "Failed to load stored sync outcome");
                None
            }
        };

        if !outcome.supersedes(stored.as_ref()) {
            debug!(request_id = %outcome.request_id, "Stored outcome is newer, not attaching");
            return outcome;
        }

        if let Err(err) = self.sink.attach_outcome(snapshot.kind, &snapshot.key, &outcome).await {
            warn!(
                request_id = %outcome.request_id,
                error = %err,
                "Failed to attach sync outcome to entity"
            );
        }

        outcome
    }
}
