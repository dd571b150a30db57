//! Write-through sync and durable outbox retry.
//!
//! The immediate path ([`coordinator::SyncCoordinator`]) runs inline with an
//! entity mutation and never fails it. The retry path
//! ([`drainer::OutboxDrainer`]) runs on its own cadence and drives queued
//! records to `SENT` or to terminal failure.

pub mod coordinator;
pub mod drainer;
pub mod errors;
pub mod mutation;
pub mod payload;
pub mod ports;
pub mod request_id;
pub mod retry;
