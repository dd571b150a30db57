//! Outcome attachment after a local commit.

mod support;

use std::sync::Arc;

use adminsync_core::{Clock, MutationSync, SyncCoordinator};
use adminsync_domain::{EntityKind, SyncAction, SyncOutcome};
use chrono::Duration;
use support::endpoint::http_error;
use support::{tenant, FixedClock, MemoryOutbox, MemoryOutcomeSink, StubEndpoint};

fn mutation_sync(
    endpoint: StubEndpoint,
    sink: &Arc<MemoryOutcomeSink>,
    clock: &Arc<FixedClock>,
) -> MutationSync {
    let coordinator = SyncCoordinator::new(Arc::new(endpoint), Arc::new(MemoryOutbox::new()))
        .with_clock(clock.clone());
    MutationSync::new(Arc::new(coordinator), sink.clone())
}

#[tokio::test]
async fn successful_sync_outcome_is_attached() {
    let sink = Arc::new(MemoryOutcomeSink::new());
    let clock = Arc::new(FixedClock::at_epoch());
    let sync = mutation_sync(StubEndpoint::succeeding("sync-1"), &sink, &clock);

    let outcome = sync.after_commit(&tenant("t-1"), SyncAction::Create, None).await;

    assert!(outcome.ok);
    assert_eq!(sink.stored(EntityKind::Tenant, "t-1"), Some(outcome));
}

#[tokio::test]
async fn failed_sync_outcome_is_attached() {
    let sink = Arc::new(MemoryOutcomeSink::new());
    let clock = Arc::new(FixedClock::at_epoch());
    let sync = mutation_sync(StubEndpoint::failing(http_error(503)), &sink, &clock);

    let outcome = sync.after_commit(&tenant("t-1"), SyncAction::Update, None).await;

    let stored = sink.stored(EntityKind::Tenant, "t-1").unwrap();
    assert!(!stored.ok);
    assert_eq!(stored.error_code.as_deref(), Some("HTTP_503"));
    assert_eq!(stored, outcome);
}

#[tokio::test]
async fn newer_stored_outcome_is_not_overwritten() {
    let sink = Arc::new(MemoryOutcomeSink::new());
    let clock = Arc::new(FixedClock::at_epoch());
    let newer = SyncOutcome::succeeded("req-newer", None, clock.now() + Duration::minutes(5));
    sink.seed(EntityKind::Tenant, "t-1", newer.clone());
    let sync = mutation_sync(StubEndpoint::failing(http_error(503)), &sink, &clock);

    let outcome = sync.after_commit(&tenant("t-1"), SyncAction::Update, None).await;

    assert!(!outcome.ok);
    assert_eq!(sink.attach_calls(), 0);
    assert_eq!(sink.stored(EntityKind::Tenant, "t-1"), Some(newer));
}

#[tokio::test]
async fn attach_failure_is_swallowed() {
    let sink = Arc::new(MemoryOutcomeSink::failing_attach());
    let clock = Arc::new(FixedClock::at_epoch());
    let sync = mutation_sync(StubEndpoint::succeeding("sync-1"), &sink, &clock);

    let outcome = sync.after_commit(&tenant("t-1"), SyncAction::Create, None).await;

    assert!(outcome.ok);
    assert_eq!(sink.attach_calls(), 1);
    assert!(sink.stored(EntityKind::Tenant, "t-1").is_none());
}

#[tokio::test]
async fn load_failure_still_attaches() {
    let sink = Arc::new(MemoryOutcomeSink::failing_load());
    let clock = Arc::new(FixedClock::at_epoch());
    let sync = mutation_sync(StubEndpoint::succeeding("sync-1"), &sink, &clock);

    let outcome = sync.after_commit(&tenant("t-1"), SyncAction::Create, None).await;

    assert_eq!(sink.attach_calls(), 1);
    assert_eq!(sink.stored(EntityKind::Tenant, "t-1"), Some(outcome));
}
