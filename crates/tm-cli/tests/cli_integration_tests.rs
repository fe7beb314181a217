//! End-to-end tests for the `tm` binary against file-backed DuckDB.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled tm binary
fn tm_bin() -> String {
    env!("CARGO_BIN_EXE_tm").to_string()
}

/// Run `tm` inside `project` and return (stdout, stderr, exit code).
fn run_tm(project: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(tm_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("TIDEMARK_DATABASE")
        .env_remove("TIDEMARK_MIGRATIONS_DIR")
        .env_remove("TIDEMARK_TIMEOUT")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute tm with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Project with a config pointing at `app.duckdb` and an empty
/// `migrations/` directory.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tidemark.yml"),
        "database:\n  type: duckdb\n  path: app.duckdb\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("migrations")).unwrap();
    dir
}

fn write_migration(project: &Path, file: &str, sql: &str) {
    fs::write(project.join("migrations").join(file), sql).unwrap();
}

// ── up / status / version ──────────────────────────────────────────────

#[test]
fn test_up_then_status_and_version() {
    let dir = project();
    write_migration(dir.path(), "001_init.sql", "CREATE TABLE t (id INT)");
    write_migration(dir.path(), "002_add_col.sql", "ALTER TABLE t ADD COLUMN name TEXT");

    let (stdout, stderr, code) = run_tm(dir.path(), &["up"]);
    assert_eq!(code, 0, "up failed: {stderr}");
    assert!(stdout.contains("001 init"));
    assert!(stdout.contains("002 add_col"));

    let (stdout, _, code) = run_tm(dir.path(), &["status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("001: init"));
    assert!(stdout.contains("[Applied]"));
    assert!(stdout.contains("Pending migrations: 0"));

    let (stdout, _, code) = run_tm(dir.path(), &["version", "--expect", "2"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Current schema version: 2");
}

#[test]
fn test_failed_migration_exits_one_and_names_version() {
    let dir = project();
    write_migration(dir.path(), "001_init.sql", "CREATE TABLE t (id INT)");
    write_migration(dir.path(), "002_broken.sql", "ALTER TABLE missing ADD COLUMN x INT");

    let (_, stderr, code) = run_tm(dir.path(), &["up"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("002"), "stderr: {stderr}");

    let (stdout, _, _) = run_tm(dir.path(), &["version"]);
    assert_eq!(stdout.trim(), "Current schema version: 1");

    // Fix and rerun: only the failed version is applied.
    write_migration(dir.path(), "002_broken.sql", "ALTER TABLE t ADD COLUMN x INT");
    let (stdout, stderr, code) = run_tm(dir.path(), &["up"]);
    assert_eq!(code, 0, "rerun failed: {stderr}");
    assert!(stdout.contains("Applied 1 migration(s), 1 already applied"));
}

#[test]
fn test_status_json_lists_pending() {
    let dir = project();
    write_migration(dir.path(), "001_init.sql", "CREATE TABLE t (id INT)");

    let (stdout, _, code) = run_tm(dir.path(), &["status", "--output", "json"]);
    assert_eq!(code, 0);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["total"], 1);
    assert_eq!(report["pending"], 1);
    assert_eq!(report["entries"][0]["state"], "pending");
}

#[test]
fn test_version_expect_mismatch() {
    let dir = project();
    let (stdout, stderr, code) = run_tm(dir.path(), &["version", "--expect", "3"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Current schema version: 0"));
    assert!(stderr.contains("expected 3, found 0"));
}

// ── new ────────────────────────────────────────────────────────────────

#[test]
fn test_new_creates_file_picked_up_by_status() {
    let dir = project();
    let (stdout, stderr, code) = run_tm(dir.path(), &["new", "create_users"]);
    assert_eq!(code, 0, "new failed: {stderr}");
    assert!(stdout.contains("_create_users.sql"));

    let (stdout, _, _) = run_tm(dir.path(), &["status", "-o", "json"]);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["total"], 1);
    assert_eq!(report["entries"][0]["name"], "create_users");
}

#[test]
fn test_new_rejects_bad_name() {
    let dir = project();
    let (_, stderr, code) = run_tm(dir.path(), &["new", "bad-name"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("C007"), "stderr: {stderr}");
}

// ── configuration ──────────────────────────────────────────────────────

#[test]
fn test_unknown_config_key_is_rejected() {
    let dir = project();
    fs::write(dir.path().join("tidemark.yml"), "migration_dir: sql\n").unwrap();
    let (_, _, code) = run_tm(dir.path(), &["status"]);
    assert_eq!(code, 1);
}

#[test]
fn test_oversized_timeout_fails_cleanly() {
    let dir = project();
    let (_, stderr, code) = run_tm(
        dir.path(),
        &["--timeout", "18446744073709551615", "version"],
    );
    assert_eq!(code, 1, "stderr: {stderr}");
    assert!(stderr.contains("too large"));
}
