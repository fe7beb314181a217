//! Integration tests for running directory-backed migrations against DuckDB.
//!
//! Each test writes migration files into a temp directory and applies them
//! to a file-backed DuckDB database through the public `Migrator` API.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tm_core::DirectorySource;
use tm_db::{DuckDbLedger, LedgerStore};
use tm_migrate::{MigrateError, MigrationState, Migrator};
use tokio::time::Instant;

// ── Helpers ────────────────────────────────────────────────────────────

struct Fixture {
    _dir: TempDir,
    migrations: std::path::PathBuf,
    store: Arc<DuckDbLedger>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let migrations = dir.path().join("migrations");
        fs::create_dir(&migrations).unwrap();
        let store = Arc::new(DuckDbLedger::from_path(&dir.path().join("app.duckdb")).unwrap());
        Self {
            _dir: dir,
            migrations,
            store,
        }
    }

    fn write(&self, file: &str, sql: &str) {
        fs::write(self.migrations.join(file), sql).unwrap();
    }

    fn migrator(&self) -> Migrator {
        Migrator::new(
            Box::new(DirectorySource::new(&self.migrations)),
            self.store.clone(),
        )
    }

    fn migrations_dir(&self) -> &Path {
        &self.migrations
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

fn scenario_files(fixture: &Fixture) {
    fixture.write("001_init.sql", "CREATE TABLE t(id int)");
    fixture.write("002_add_col.sql", "ALTER TABLE t ADD COLUMN name text");
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_fresh_database_applies_everything() {
    let fixture = Fixture::new();
    scenario_files(&fixture);
    let migrator = fixture.migrator();

    let summary = migrator.run_all(deadline()).await.unwrap();

    let order: Vec<i64> = summary.applied.iter().map(|a| a.version).collect();
    assert_eq!(order, vec![1, 2]);
    assert_eq!(migrator.current_version(deadline()).await.unwrap(), 2);

    let report = migrator.status(deadline()).await.unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.pending, 0);
    assert_eq!(report.total, 2);
    assert_eq!(
        report.source,
        fixture.migrations_dir().display().to_string()
    );

    // Column from 002 exists.
    fixture
        .store
        .execute_batch("INSERT INTO t (id, name) VALUES (1, 'x')")
        .await
        .unwrap();
}

#[tokio::test]
async fn scenario_partially_migrated_database_applies_only_the_rest() {
    let fixture = Fixture::new();
    fixture.write("001_init.sql", "CREATE TABLE t(id int)");
    fixture.migrator().run_all(deadline()).await.unwrap();

    fixture.write("002_add_col.sql", "ALTER TABLE t ADD COLUMN name text");
    let summary = fixture.migrator().run_all(deadline()).await.unwrap();

    assert_eq!(summary.applied.len(), 1);
    assert_eq!(summary.applied[0].version, 2);
    assert_eq!(summary.skipped, 1);
    let versions: Vec<i64> = fixture
        .store
        .applied_versions()
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(versions, vec![1, 2]);
}

#[tokio::test]
async fn scenario_invalid_script_fails_then_succeeds_after_fix() {
    let fixture = Fixture::new();
    fixture.write("001_init.sql", "CREATE TABLE t(id int)");
    fixture.write("002_add_col.sql", "ALTER TABLE t ADD COLUMN name text oops syntax");
    let migrator = fixture.migrator();

    let err = migrator.run_all(deadline()).await.unwrap_err();
    assert_eq!(err.failed_version(), Some(2));
    assert!(err.to_string().contains("Migration 2 (add_col) failed"));
    assert_eq!(migrator.current_version(deadline()).await.unwrap(), 1);

    fixture.write("002_add_col.sql", "ALTER TABLE t ADD COLUMN name text");
    let summary = migrator.run_all(deadline()).await.unwrap();

    assert_eq!(summary.applied.len(), 1);
    assert_eq!(summary.applied[0].version, 2);
    assert_eq!(migrator.current_version(deadline()).await.unwrap(), 2);
}

#[tokio::test]
async fn scenario_empty_directory_is_noop() {
    let fixture = Fixture::new();
    let migrator = fixture.migrator();

    let summary = migrator.run_all(deadline()).await.unwrap();
    assert!(summary.applied.is_empty());

    let report = migrator.status(deadline()).await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.applied, 0);
    assert_eq!(report.pending, 0);
}

// ── Properties ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ledger_order_follows_versions_not_file_names() {
    let fixture = Fixture::new();
    // Lexical order differs from numeric order.
    fixture.write("10_ten.sql", "CREATE TABLE ten (id INT)");
    fixture.write("9_nine.sql", "CREATE TABLE nine (id INT)");
    fixture.write("100_hundred.sql", "CREATE TABLE hundred (id INT)");

    let summary = fixture.migrator().run_all(deadline()).await.unwrap();

    let order: Vec<i64> = summary.applied.iter().map(|a| a.version).collect();
    assert_eq!(order, vec![9, 10, 100]);
    let entries = fixture.store.applied_entries().await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["nine", "ten", "hundred"]);
}

#[tokio::test]
async fn failed_run_leaves_exact_prefix() {
    let fixture = Fixture::new();
    fixture.write("001_a.sql", "CREATE TABLE a (id INT)");
    fixture.write("002_b.sql", "CREATE TABLE b (id INT)");
    fixture.write("003_c.sql", "CREATE TABLE c (id INT); INSERT INTO missing VALUES (1);");
    fixture.write("004_d.sql", "CREATE TABLE d (id INT)");
    let migrator = fixture.migrator();

    let err = migrator.run_all(deadline()).await.unwrap_err();

    assert!(matches!(err, MigrateError::Transaction { version: 3, .. }));
    assert_eq!(migrator.current_version(deadline()).await.unwrap(), 2);
    let report = migrator.status(deadline()).await.unwrap();
    let states: Vec<MigrationState> = report.entries.iter().map(|e| e.state).collect();
    assert_eq!(
        states,
        vec![
            MigrationState::Applied,
            MigrationState::Applied,
            MigrationState::Pending,
            MigrationState::Pending,
        ]
    );
    assert!(!fixture.store.relation_exists("c").await.unwrap());
}

#[tokio::test]
async fn invalid_file_names_are_skipped() {
    let fixture = Fixture::new();
    fixture.write("001_init.sql", "CREATE TABLE t (id INT)");
    fixture.write("draft_next.sql", "CREATE TABLE draft (id INT)");
    fixture.write("002_notes.md", "# not a migration");

    let report = fixture.migrator().status(deadline()).await.unwrap();
    assert_eq!(report.total, 1);
}

#[tokio::test]
async fn missing_directory_is_reported() {
    let fixture = Fixture::new();
    let migrator = Migrator::new(
        Box::new(DirectorySource::new(fixture.migrations_dir().join("nope"))),
        fixture.store.clone(),
    );

    let err = migrator.run_all(deadline()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Source(tm_core::CoreError::DirectoryUnavailable { .. })
    ));
}
