//! # AdminSync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The SQLite outbox repository and its connection manager
//! - The HTTP client for the upsert endpoints
//! - Configuration loading from the environment or files
//! - The background drain worker
//!
//! ## Architecture
//! - Implements traits defined in `adminsync-core`
//! - Contains all "impure" code (I/O, network, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod sync;

// Re-export commonly used items
pub use database::{DbManager, SqliteOutboxRepository};
pub use errors::InfraError;
pub use sync::{DrainWorker, DrainWorkerConfig, HubClient};
