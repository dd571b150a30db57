//! Database implementations

pub mod manager;
pub mod outbox_repository;

pub use manager::*;
pub use outbox_repository::*;
