//! # AdminSync Domain
//!
//! Business domain types for the administrative entity sync subsystem.
//!
//! This crate contains:
//! - Entity snapshots and the entity kind / action tags
//! - Sync outcomes attached back onto entities
//! - Outbox records and their status lifecycle
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other AdminSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
