//! # AdminSync Core
//!
//! Pure sync logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the remote endpoint, the outbox
//!   store, the entity outcome sink and the clock
//! - The per-kind payload table and request-id derivation
//! - `SyncCoordinator` (try now, fall back to the outbox)
//! - `OutboxDrainer` (one batch of due retries)
//! - `MutationSync` (CRUD-side glue that attaches outcomes)
//!
//! ## Architecture Principles
//! - Only depends on `adminsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod sync;

pub use sync::coordinator::SyncCoordinator;
pub use sync::drainer::{DrainReport, OutboxDrainer};
pub use sync::errors::{UpsertError, UpsertErrorCategory};
pub use sync::mutation::MutationSync;
pub use sync::payload::{build_payload, shape_for, PayloadShape};
pub use sync::ports::{Clock, OutboxStore, OutcomeSink, SystemClock, UpsertAck, UpsertEndpoint};
pub use sync::request_id::resolve_request_id;
pub use sync::retry::RetryPolicy;
