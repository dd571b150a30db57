//! Shared test helpers for `adminsync-core` integration tests.
//!
//! In-memory doubles for every core port so the coordinator and drainer
//! suites can focus on behaviour instead of storage and HTTP.

#![allow(dead_code)]

pub mod clock;
pub mod endpoint;
pub mod outbox;

use adminsync_domain::{EntityKind, EntitySnapshot};

pub use clock::FixedClock;
pub use endpoint::{MemoryOutcomeSink, StubEndpoint};
pub use outbox::MemoryOutbox;

/// A tenant snapshot carrying every required field.
pub fn tenant(key: &str) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::Tenant, key, true)
        .with_field("client_id", "client-1")
        .with_field("name", "Acme")
}

/// A domain snapshot keyed by host.
pub fn domain(host: &str) -> EntitySnapshot {
    EntitySnapshot::new(EntityKind::Domain, host, true)
        .with_field("tenant_id", "tenant-1")
        .with_field("default_subtenant_id", "sub-1")
        .with_field("client_id", "client-1")
}
