//! Default values shared by configuration and the sync components.

/// Default timeout for a single upsert call, in milliseconds.
pub const DEFAULT_UPSERT_TIMEOUT_MS: u64 = 8_000;

/// Default number of outbox records processed per drain pass.
pub const DEFAULT_DRAIN_BATCH_SIZE: usize = 10;

/// Drain attempts after which a record is terminally failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff base delay, in milliseconds.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Backoff cap, in milliseconds.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Interval between drain passes run by the background worker, in seconds.
pub const DEFAULT_DRAIN_INTERVAL_SECS: u64 = 5;

/// How long SENT records are kept before archival, in seconds.
pub const DEFAULT_SENT_RETENTION_SECS: u64 = 86_400;

/// Default SQLite connection pool size.
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

/// `last_error` written when a record runs out of attempts.
pub const MAX_ATTEMPTS_REACHED: &str = "max attempts reached";

/// Error code for failures raised locally rather than by the endpoint.
pub const SYNC_ERROR_CODE: &str = "SYNC_ERROR";

/// HTTP status recorded on outcomes for successful syncs.
pub const OUTCOME_STATUS_OK: u16 = 200;

/// HTTP status recorded on outcomes for failed syncs.
pub const OUTCOME_STATUS_FAILED: u16 = 500;
