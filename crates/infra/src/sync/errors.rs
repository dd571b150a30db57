//! Drain worker lifecycle errors

use adminsync_domain::AdminSyncError;
use thiserror::Error;

use crate::errors::InfraError;

/// Worker lifecycle errors
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker is already running
    #[error("Worker already running")]
    AlreadyRunning,

    /// Worker is not running
    #[error("Worker not running")]
    NotRunning,

    /// Worker task did not finish within the join timeout
    #[error("Worker task did not stop within {seconds}s")]
    JoinTimeout { seconds: u64 },

    /// Worker task panicked
    #[error("Worker task panicked: {0}")]
    TaskPanicked(String),
}

impl From<WorkerError> for InfraError {
    fn from(err: WorkerError) -> Self {
        let domain_err = match err {
            WorkerError::AlreadyRunning | WorkerError::NotRunning => {
                AdminSyncError::InvalidInput(err.to_string())
            }
            _ => AdminSyncError::Internal(err.to_string()),
        };
        InfraError(domain_err)
    }
}

impl From<WorkerError> for AdminSyncError {
    fn from(err: WorkerError) -> Self {
        InfraError::from(err).into()
    }
}
