//! Ledger trait definitions

use crate::error::DbResult;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

/// Name of the table recording applied migrations.
pub const LEDGER_TABLE: &str = "schema_migrations";

/// A row of the ledger: one successfully committed migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: i64,
    pub name: String,
    pub applied_at: NaiveDateTime,
}

/// Durable record of applied migration versions.
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create the ledger table if it does not exist. Safe to repeat.
    async fn ensure_schema(&self) -> DbResult<()>;

    /// Highest applied version, or 0 if nothing has been applied
    async fn current_version(&self) -> DbResult<i64>;

    /// All applied versions
    async fn applied_versions(&self) -> DbResult<BTreeSet<i64>>;

    /// All ledger rows, ordered by version
    async fn applied_entries(&self) -> DbResult<Vec<LedgerEntry>>;

    /// Open an exclusive transaction for applying one migration.
    async fn begin<'a>(&'a self) -> DbResult<Box<dyn LedgerTransaction + 'a>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Release pooled connections. Backends without a pool do nothing.
    async fn close(&self) {}
}

/// A transaction scope in which a migration script runs and is recorded.
///
/// Either [`commit`](Self::commit) or [`rollback`](Self::rollback) must be
/// called; dropping an unfinished transaction rolls it back.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Execute a (possibly multi-statement) migration script
    async fn execute_script(&mut self, sql: &str) -> DbResult<()>;

    /// Insert the ledger row for `version` inside this transaction
    async fn record_applied(&mut self, version: i64, name: &str) -> DbResult<()>;

    /// Commit everything executed in this transaction
    async fn commit(self: Box<Self>) -> DbResult<()>;

    /// Discard everything executed in this transaction
    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
