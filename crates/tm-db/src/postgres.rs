//! PostgreSQL ledger backend (feature `postgres`)

use crate::error::{DbError, DbResult};
use crate::traits::{LedgerEntry, LedgerStore, LedgerTransaction, LEDGER_TABLE};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::collections::BTreeSet;
use std::time::Duration;

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL ledger backend backed by a connection pool
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Connect to `url` and verify the connection.
    pub async fn connect(url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .max_lifetime(Duration::from_secs(3600))
            .connect(url)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| DbError::ConnectionError(format!("ping failed: {e}")))?;

        Ok(Self { pool })
    }
}

/// DDL for the ledger table. Every column is required.
fn create_ledger_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
             version    BIGINT PRIMARY KEY,
             name       VARCHAR(255) NOT NULL,
             applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
         )"
    )
}

/// Map a read-side sqlx error, separating unreachable-database failures.
fn read_error(context: &str, err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            DbError::ConnectionError(format!("{context}: {err}"))
        }
        other => DbError::ExecutionError(format!("{context}: {other}")),
    }
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    async fn ensure_schema(&self) -> DbResult<()> {
        let ddl = create_ledger_sql();
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| read_error(&format!("failed to create {LEDGER_TABLE}"), e))?;
        Ok(())
    }

    async fn current_version(&self) -> DbResult<i64> {
        sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COALESCE(MAX(version), 0)::BIGINT FROM {LEDGER_TABLE}"
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| read_error("failed to read schema version", e))
    }

    async fn applied_versions(&self) -> DbResult<BTreeSet<i64>> {
        let versions: Vec<i64> =
            sqlx::query_scalar(&format!("SELECT version FROM {LEDGER_TABLE}"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| read_error("failed to read applied versions", e))?;
        Ok(versions.into_iter().collect())
    }

    async fn applied_entries(&self) -> DbResult<Vec<LedgerEntry>> {
        let rows: Vec<(i64, String, NaiveDateTime)> = sqlx::query_as(&format!(
            "SELECT version, name, applied_at FROM {LEDGER_TABLE} ORDER BY version"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_error("failed to read ledger", e))?;

        Ok(rows
            .into_iter()
            .map(|(version, name, applied_at)| LedgerEntry {
                version,
                name,
                applied_at,
            })
            .collect())
    }

    async fn begin<'a>(&'a self) -> DbResult<Box<dyn LedgerTransaction + 'a>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// An open PostgreSQL transaction. sqlx rolls it back on drop.
struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PostgresTransaction {
    async fn execute_script(&mut self, sql: &str) -> DbResult<()> {
        sqlx::raw_sql(sql)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(())
    }

    async fn record_applied(&mut self, version: i64, name: &str) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {LEDGER_TABLE} (version, name, applied_at) VALUES ($1, $2, NOW())"
        ))
        .bind(version)
        .bind(name)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            let is_unique = e
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if is_unique {
                DbError::DuplicateKey {
                    version,
                    message: e.to_string(),
                }
            } else {
                DbError::ExecutionError(format!("failed to record version {version}: {e}"))
            }
        })?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
