//! Migration executor.
//!
//! [`Migrator`] diffs the migrations produced by a [`MigrationSource`]
//! against the versions recorded by a [`LedgerStore`] and applies the pending
//! ones in ascending version order. Each migration runs in its own
//! transaction together with its ledger insert, so a version is recorded if
//! and only if its script committed. The first failure rolls back the
//! in-flight transaction and ends the run; earlier migrations stay applied.

use crate::error::{MigrateError, MigrateResult};
use crate::status::{MigrationState, StatusReport};
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tm_core::{Migration, MigrationSource};
use tm_db::{DbError, DbResult, LedgerStore, LedgerTransaction};
use tokio::time::Instant;

/// Time allowed for a rollback after the run deadline has already passed.
const ROLLBACK_GRACE: Duration = Duration::from_secs(5);

/// A migration applied during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub duration_ms: u64,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Migrations applied by this run, in apply order
    pub applied: Vec<AppliedMigration>,
    /// Migrations skipped because the ledger already had them
    pub skipped: usize,
    /// Highest applied version after the run
    pub current_version: i64,
}

/// Applies migrations from a source to a ledger-backed database.
pub struct Migrator {
    source: Box<dyn MigrationSource>,
    store: Arc<dyn LedgerStore>,
}

impl Migrator {
    pub fn new(source: Box<dyn MigrationSource>, store: Arc<dyn LedgerStore>) -> Self {
        Self { source, store }
    }

    /// Apply every pending migration.
    pub async fn run_all(&self, deadline: Instant) -> MigrateResult<RunSummary> {
        self.run(deadline, None).await
    }

    /// Apply pending migrations with `version <= target_version`.
    pub async fn run_up_to(
        &self,
        deadline: Instant,
        target_version: i64,
    ) -> MigrateResult<RunSummary> {
        self.run(deadline, Some(target_version)).await
    }

    /// Highest applied version, or 0.
    pub async fn current_version(&self, deadline: Instant) -> MigrateResult<i64> {
        self.ensure_ledger(deadline).await?;
        within(deadline, "current_version", None, self.store.current_version())
            .await?
            .map_err(MigrateError::Connection)
    }

    /// Applied / pending snapshot of every discovered migration.
    pub async fn status(&self, deadline: Instant) -> MigrateResult<StatusReport> {
        self.ensure_ledger(deadline).await?;
        let migrations = self.source.load()?;
        let entries = within(deadline, "status", None, self.store.applied_entries())
            .await?
            .map_err(MigrateError::Connection)?;
        Ok(StatusReport::build(
            self.source.describe(),
            &migrations,
            &entries,
        ))
    }

    /// Release database connections. Call once the migrator is no longer used.
    pub async fn close(&self) {
        self.store.close().await;
    }

    async fn ensure_ledger(&self, deadline: Instant) -> MigrateResult<()> {
        within(deadline, "ensure_schema", None, self.store.ensure_schema())
            .await?
            .map_err(MigrateError::Connection)
    }

    async fn run(&self, deadline: Instant, target: Option<i64>) -> MigrateResult<RunSummary> {
        self.ensure_ledger(deadline).await?;

        let migrations = self.source.load()?;
        let applied: BTreeSet<i64> =
            within(deadline, "applied_versions", None, self.store.applied_versions())
                .await?
                .map_err(MigrateError::Connection)?;

        log::debug!(
            "Found {} migration(s) in {}, {} recorded in {} ledger",
            migrations.len(),
            self.source.describe(),
            applied.len(),
            self.store.db_type()
        );

        let mut summary = RunSummary {
            applied: Vec::new(),
            skipped: 0,
            current_version: applied.last().copied().unwrap_or(0),
        };

        for migration in &migrations {
            if target.is_some_and(|t| migration.version > t) {
                break;
            }
            if applied.contains(&migration.version) {
                log::debug!(
                    "Migration {} ({}) already applied, skipping",
                    migration.version,
                    migration.name
                );
                summary.skipped += 1;
                continue;
            }
            check_deadline(deadline, "run", migration.version)?;

            let started = Instant::now();
            self.apply(migration, deadline).await?;
            let elapsed = started.elapsed();

            summary.applied.push(AppliedMigration {
                version: migration.version,
                name: migration.name.clone(),
                duration_ms: elapsed.as_millis() as u64,
            });
            summary.current_version = summary.current_version.max(migration.version);
        }

        Ok(summary)
    }

    /// Apply one migration in its own transaction.
    async fn apply(&self, migration: &Migration, deadline: Instant) -> MigrateResult<()> {
        let version = migration.version;
        log::info!("Applying migration {}: {}", version, migration.name);
        transition(migration, MigrationState::Pending, MigrationState::Applying);

        let mut tx = within(deadline, "begin", Some(version), self.store.begin())
            .await?
            .map_err(|e| transaction_error(migration, e))?;

        match execute_and_record(tx.as_mut(), migration, deadline).await {
            Ok(()) => {}
            Err(err) => {
                transition(migration, MigrationState::Applying, MigrationState::Failed);
                rollback(tx, migration).await;
                return Err(err);
            }
        }

        let committed = within(deadline, "commit", Some(version), tx.commit()).await;
        match committed {
            Ok(Ok(())) => {
                transition(migration, MigrationState::Applying, MigrationState::Applied);
                log::info!("Migration {} applied successfully", version);
                Ok(())
            }
            Ok(Err(e)) => {
                transition(migration, MigrationState::Applying, MigrationState::Failed);
                Err(transaction_error(migration, e))
            }
            Err(deadline_err) => {
                // The commit future was dropped, which rolls the transaction
                // back unless the server already committed it.
                transition(migration, MigrationState::Applying, MigrationState::Failed);
                Err(deadline_err)
            }
        }
    }
}

async fn execute_and_record(
    tx: &mut (dyn LedgerTransaction + '_),
    migration: &Migration,
    deadline: Instant,
) -> MigrateResult<()> {
    let version = migration.version;

    within(deadline, "execute", Some(version), tx.execute_script(&migration.script))
        .await?
        .map_err(|e| transaction_error(migration, e))?;
    check_deadline(deadline, "execute", version)?;

    within(
        deadline,
        "record",
        Some(version),
        tx.record_applied(version, &migration.name),
    )
    .await?
    .map_err(|e| match e {
        DbError::DuplicateKey { .. } => MigrateError::DuplicateKey { version, source: e },
        other => transaction_error(migration, other),
    })?;
    check_deadline(deadline, "record", version)
}

/// Fail if `deadline` passed while a call was running.
///
/// Backends that execute synchronously (DuckDB) complete inside a single
/// poll, so `timeout_at` never observes the expiry on its own.
fn check_deadline(
    deadline: Instant,
    operation: &'static str,
    version: i64,
) -> MigrateResult<()> {
    if Instant::now() >= deadline {
        return Err(MigrateError::DeadlineExceeded {
            operation,
            version: Some(version),
        });
    }
    Ok(())
}

async fn rollback(tx: Box<dyn LedgerTransaction + '_>, migration: &Migration) {
    match tokio::time::timeout(ROLLBACK_GRACE, tx.rollback()).await {
        Ok(Ok(())) => log::warn!("Rolled back migration {}", migration.version),
        Ok(Err(e)) => log::error!(
            "Rollback of migration {} failed: {}",
            migration.version,
            e
        ),
        Err(_) => log::error!(
            "Rollback of migration {} did not finish within {:?}",
            migration.version,
            ROLLBACK_GRACE
        ),
    }
}

fn transaction_error(migration: &Migration, source: DbError) -> MigrateError {
    MigrateError::Transaction {
        version: migration.version,
        name: migration.name.clone(),
        source,
    }
}

fn transition(migration: &Migration, from: MigrationState, to: MigrationState) {
    log::debug!("Migration {}: {} -> {}", migration.version, from, to);
}

/// Bound a ledger call by the run deadline.
async fn within<T, F>(
    deadline: Instant,
    operation: &'static str,
    version: Option<i64>,
    fut: F,
) -> MigrateResult<DbResult<T>>
where
    F: Future<Output = DbResult<T>>,
{
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| MigrateError::DeadlineExceeded { operation, version })
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
