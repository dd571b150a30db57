//! Domain types

pub mod entity;
pub mod outbox;
pub mod outcome;

pub use entity::{EntityKind, EntitySnapshot, SyncAction};
pub use outbox::{NewOutboxEntry, OutboxRecord, OutboxStatus};
pub use outcome::SyncOutcome;
