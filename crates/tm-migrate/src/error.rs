//! Error types for the migration executor.

use thiserror::Error;
use tm_core::CoreError;
use tm_db::DbError;

/// Migration run errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Migrations could not be loaded (M001)
    #[error("[M001] Failed to load migrations: {0}")]
    Source(#[from] CoreError),

    /// Ledger setup or read failed (M002)
    #[error("[M002] Ledger unavailable: {0}")]
    Connection(#[source] DbError),

    /// Begin, execute, record, or commit failed for a migration (M003)
    #[error("[M003] Migration {version} ({name}) failed: {source}")]
    Transaction {
        version: i64,
        name: String,
        #[source]
        source: DbError,
    },

    /// Another runner recorded this version first (M004)
    #[error("[M004] Migration {version} is already recorded in the ledger: {source}")]
    DuplicateKey {
        version: i64,
        #[source]
        source: DbError,
    },

    /// The caller-supplied deadline expired (M005)
    #[error(
        "[M005] Deadline exceeded during {operation}{}",
        .version.map(|v| format!(" of migration {v}")).unwrap_or_default()
    )]
    DeadlineExceeded {
        operation: &'static str,
        version: Option<i64>,
    },
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// The migration version that caused the failure, if any.
    pub fn failed_version(&self) -> Option<i64> {
        match self {
            MigrateError::Transaction { version, .. } | MigrateError::DuplicateKey { version, .. } => {
                Some(*version)
            }
            MigrateError::DeadlineExceeded { version, .. } => *version,
            MigrateError::Source(_) | MigrateError::Connection(_) => None,
        }
    }
}
