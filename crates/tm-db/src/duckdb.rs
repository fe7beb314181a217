//! DuckDB ledger backend implementation

use crate::error::{is_duckdb_duplicate_key, DbError, DbResult};
use crate::traits::{LedgerEntry, LedgerStore, LedgerTransaction, LEDGER_TABLE};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use duckdb::Connection;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};

/// DuckDB ledger backend
///
/// A single connection sits behind an async mutex. An open transaction holds
/// the lock until it is committed, rolled back, or dropped, so ledger reads
/// issued while a transaction is open wait for it to finish.
pub struct DuckDbLedger {
    conn: Mutex<Connection>,
}

impl DuckDbLedger {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Execute multiple SQL statements outside of any migration transaction
    pub async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Count the rows returned by `sql`
    pub async fn query_count(&self, sql: &str) -> DbResult<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count as usize)
    }

    /// Check if a table or view exists
    pub async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn.lock().await;

        // Handle schema-qualified names
        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }
}

#[async_trait]
impl LedgerStore for DuckDbLedger {
    async fn ensure_schema(&self) -> DbResult<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
                 version    BIGINT PRIMARY KEY,
                 name       VARCHAR(255) NOT NULL,
                 applied_at TIMESTAMP NOT NULL DEFAULT now()
             );"
        ))
        .map_err(|e| DbError::ExecutionError(format!("failed to create {LEDGER_TABLE}: {e}")))
    }

    async fn current_version(&self) -> DbResult<i64> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!("SELECT COALESCE(MAX(version), 0) FROM {LEDGER_TABLE}"),
            [],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(format!("failed to read schema version: {e}")))
    }

    async fn applied_versions(&self) -> DbResult<BTreeSet<i64>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("SELECT version FROM {LEDGER_TABLE}"))?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut versions = BTreeSet::new();
        for row in rows {
            versions.insert(row?);
        }
        Ok(versions)
    }

    async fn applied_entries(&self) -> DbResult<Vec<LedgerEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT version, name, applied_at FROM {LEDGER_TABLE} ORDER BY version"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(LedgerEntry {
                version: row.get(0)?,
                name: row.get(1)?,
                applied_at: row.get::<_, NaiveDateTime>(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    async fn begin<'a>(&'a self) -> DbResult<Box<dyn LedgerTransaction + 'a>> {
        let conn = self.conn.lock().await;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(DuckDbTransaction {
            conn,
            finished: false,
        }))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// An open DuckDB transaction holding the connection lock.
struct DuckDbTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

#[async_trait]
impl LedgerTransaction for DuckDbTransaction<'_> {
    async fn execute_script(&mut self, sql: &str) -> DbResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    async fn record_applied(&mut self, version: i64, name: &str) -> DbResult<()> {
        self.conn
            .execute(
                &format!("INSERT INTO {LEDGER_TABLE} (version, name) VALUES (?, ?)"),
                duckdb::params![version, name],
            )
            .map_err(|e| {
                let message = e.to_string();
                if is_duckdb_duplicate_key(&message) {
                    DbError::DuplicateKey { version, message }
                } else {
                    DbError::ExecutionError(format!("failed to record version {version}: {message}"))
                }
            })?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let mut this = self;
        this.finished = true;
        if let Err(commit_err) = this.conn.execute_batch("COMMIT") {
            let _ = this.conn.execute_batch("ROLLBACK");
            return Err(DbError::TransactionError(format!(
                "COMMIT failed: {commit_err}"
            )));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let mut this = self;
        this.finished = true;
        this.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("Rolling back unfinished DuckDB transaction");
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
