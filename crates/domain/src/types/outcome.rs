//! Sync outcome attached back onto entities for observability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{OUTCOME_STATUS_FAILED, OUTCOME_STATUS_OK};

/// Result of one delivery attempt, immediate or retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub ok: bool,
    pub http_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub request_id: String,
}

impl SyncOutcome {
    pub fn succeeded(
        request_id: impl Into<String>,
        sync_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            ok: true,
            http_status: OUTCOME_STATUS_OK,
            sync_id,
            error_code: None,
            error_message: None,
            updated_at: at,
            request_id: request_id.into(),
        }
    }

    pub fn failed(
        request_id: impl Into<String>,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            ok: false,
            http_status: OUTCOME_STATUS_FAILED,
            sync_id: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            updated_at: at,
            request_id: request_id.into(),
        }
    }

    /// Last-write-wins check against the outcome currently stored on the
    /// entity. Ties go to the incoming outcome.
    pub fn supersedes(&self, stored: Option<&SyncOutcome>) -> bool {
        stored.map_or(true, |previous| self.updated_at >= previous.updated_at)
    }
}
