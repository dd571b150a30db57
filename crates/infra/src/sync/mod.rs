//! Sync infrastructure
//!
//! - HubClient: HTTP upsert client for the per-kind endpoints
//! - DrainWorker: Background drain of the outbox with retention purge
//!
//! Background work follows explicit lifecycle management with join handle
//! tracking and cancellation support.

pub mod drain_worker;
mod errors;
pub mod hub_client;

pub use drain_worker::{DrainWorker, DrainWorkerConfig, TickSummary};
pub use errors::WorkerError;
pub use hub_client::HubClient;
