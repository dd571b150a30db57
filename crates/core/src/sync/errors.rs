//! Upsert error taxonomy
//!
//! Every way a delivery attempt can fail, classified so the outcome and the
//! outbox record carry a stable error code.

use std::time::Duration;

use adminsync_domain::constants::SYNC_ERROR_CODE;
use serde_json::Value;
use thiserror::Error;

/// Categories of upsert errors, used as a log field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertErrorCategory {
    /// Timeouts and connection failures
    Network,
    /// 401/403
    Authentication,
    /// 429
    RateLimit,
    /// 5xx and malformed success bodies
    Server,
    /// Other 4xx
    Client,
    /// The endpoint answered 2xx with `ok: false`
    Rejected,
    /// Failure raised before the request left the process
    Local,
}

/// Upsert operation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpsertError {
    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{message}")]
    Http { status: u16, message: String, details: Option<Value> },

    #[error("Endpoint returned unexpected response format")]
    UnexpectedResponse { details: Option<Value> },

    #[error("{message}")]
    Remote { code: String, message: String, details: Option<Value> },

    #[error("{0}")]
    Local(String),
}

impl UpsertError {
    /// Stable error code recorded on outcomes and outbox records.
    pub fn code(&self) -> String {
        match self {
            Self::Timeout(_) => "TIMEOUT".to_string(),
            Self::Connection(_) => "CONNECTION_ERROR".to_string(),
            Self::Http { status, .. } => format!("HTTP_{status}"),
            Self::UnexpectedResponse { .. } => "UNEXPECTED_RESPONSE".to_string(),
            Self::Remote { code, .. } => code.clone(),
            Self::Local(_) => SYNC_ERROR_CODE.to_string(),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> UpsertErrorCategory {
        match self {
            Self::Timeout(_) | Self::Connection(_) => UpsertErrorCategory::Network,
            Self::Http { status: 401 | 403, .. } => UpsertErrorCategory::Authentication,
            Self::Http { status: 429, .. } => UpsertErrorCategory::RateLimit,
            Self::Http { status, .. } if *status >= 500 => UpsertErrorCategory::Server,
            Self::Http { .. } => UpsertErrorCategory::Client,
            Self::UnexpectedResponse { .. } => UpsertErrorCategory::Server,
            Self::Remote { .. } => UpsertErrorCategory::Rejected,
            Self::Local(_) => UpsertErrorCategory::Local,
        }
    }

    /// Whether a later attempt could plausibly succeed without the payload
    /// changing. The drainer retries regardless; this only feeds logs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            UpsertErrorCategory::Network
                | UpsertErrorCategory::RateLimit
                | UpsertErrorCategory::Server
        )
    }

    /// Structured details carried by the endpoint, if any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Http { details, .. }
            | Self::UnexpectedResponse { details }
            | Self::Remote { details, .. } => details.as_ref(),
            Self::Timeout(_) | Self::Connection(_) | Self::Local(_) => None,
        }
    }
}
