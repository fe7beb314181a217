//! Error types for tm-db

use thiserror::Error;

/// Ledger storage errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Ledger row for this version already exists (D003)
    #[error("[D003] Ledger already contains version {version}: {message}")]
    DuplicateKey { version: i64, message: String },

    /// BEGIN / COMMIT / ROLLBACK failure (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Backend not compiled into this build (D005)
    #[error("[D005] Database backend '{0}' is not available in this build")]
    BackendUnavailable(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

/// Whether a DuckDB error message reports a primary key / unique violation.
///
/// duckdb::Error does not expose structured constraint variants, so the
/// message is the only thing to match on.
pub(crate) fn is_duckdb_duplicate_key(message: &str) -> bool {
    message.contains("Duplicate key")
        || message.contains("violates primary key constraint")
        || message.contains("violates unique constraint")
}
