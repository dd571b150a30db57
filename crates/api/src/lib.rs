//! # AdminSync application wiring
//!
//! Builds the concrete sync stack from configuration and owns the
//! background drain worker for the `adminsync-drainer` binary.

pub mod context;
pub mod logging;

pub use context::AppContext;
