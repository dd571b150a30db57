//! Conversions from external infrastructure errors into domain errors.

use adminsync_domain::AdminSyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AdminSyncError);

impl From<InfraError> for AdminSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AdminSyncError> for InfraError {
    fn from(value: AdminSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAdminSyncError {
    fn into_adminsync(self) -> AdminSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → AdminSyncError */
/* -------------------------------------------------------------------------- */

impl IntoAdminSyncError for SqlError {
    fn into_adminsync(self) -> AdminSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        AdminSyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        AdminSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::CannotOpen, _) => {
                        AdminSyncError::Database(format!("unable to open database: {message}"))
                    }
                    _ => AdminSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => AdminSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                AdminSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                AdminSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => AdminSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => AdminSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_adminsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → AdminSyncError */
/* -------------------------------------------------------------------------- */

impl IntoAdminSyncError for r2d2::Error {
    fn into_adminsync(self) -> AdminSyncError {
        AdminSyncError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_adminsync())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AdminSyncError */
/* -------------------------------------------------------------------------- */

// Request-time failures are classified by the hub client itself; only client
// construction reaches this conversion.
impl IntoAdminSyncError for HttpError {
    fn into_adminsync(self) -> AdminSyncError {
        if self.is_builder() {
            AdminSyncError::Config(format!("failed to build HTTP client: {self}"))
        } else {
            AdminSyncError::Network(self.to_string())
        }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_adminsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
