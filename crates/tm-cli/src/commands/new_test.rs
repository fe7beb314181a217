use super::*;
use chrono::NaiveDate;
use tempfile::tempdir;

fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 5, 7)
        .unwrap()
}

#[test]
fn test_creates_timestamped_file_and_directory() {
    let temp_dir = tempdir().unwrap();
    let dir = temp_dir.path().join("db/migrations");

    let path = create_migration_file(&dir, fixed_time(), "add_users").unwrap();

    assert_eq!(path, dir.join("20240309140507_add_users.sql"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_refuses_to_overwrite() {
    let temp_dir = tempdir().unwrap();
    let path = create_migration_file(temp_dir.path(), fixed_time(), "add_users").unwrap();
    fs::write(&path, "CREATE TABLE users (id INT)").unwrap();

    let err = create_migration_file(temp_dir.path(), fixed_time(), "add_users").unwrap_err();

    assert!(err.to_string().contains("already exists"));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "CREATE TABLE users (id INT)"
    );
}

#[test]
fn test_rejects_invalid_name() {
    let temp_dir = tempdir().unwrap();
    for name in ["", "add users", "drop;table"] {
        assert!(create_migration_file(temp_dir.path(), fixed_time(), name).is_err());
    }
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_new_writes_into_resolved_directory() {
    let temp_dir = tempdir().unwrap();
    let global = GlobalArgs {
        verbose: false,
        project_dir: temp_dir.path().to_path_buf(),
        config: None,
        database: None,
        migrations_dir: Some("sql".into()),
        timeout: None,
    };

    execute(
        &NewArgs {
            name: "init".to_string(),
        },
        &global,
    )
    .await
    .unwrap();

    let files: Vec<_> = fs::read_dir(temp_dir.path().join("sql"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("_init.sql"));
}
