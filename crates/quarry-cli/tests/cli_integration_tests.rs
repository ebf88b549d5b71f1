//! CLI integration tests
//!
//! Drive the `quarry` binary against a scratch database.

use std::path::Path;
use std::process::{Command, Output};

use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

fn quarry(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quarry"))
        .current_dir(dir)
        .env_remove("QUARRY_DB")
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_migrate_creates_default_database() {
    // When: `quarry migrate` with no --db
    let temp_dir = TempDir::new().unwrap();
    let output = quarry(temp_dir.path(), &["migrate"]);

    // Then: The default path exists and lists the initial migration
    assert_success(&output);
    assert!(temp_dir.path().join(".quarry/quarry.db").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("001_initial_schema"));
}

#[test]
fn test_seed_then_run_showcase_query() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("q.db");
    let db = db_path.to_str().unwrap();

    // Given: The built-in seed
    assert_success(&quarry(temp_dir.path(), &["seed", "import", "--db", db]));

    // When: Running a parameterised query
    let output = quarry(temp_dir.path(), &["--db", db, "run", "posts-page", "0", "2"]);

    // Then: Pretty JSON with the first two posts
    assert_success(&output);
    let posts: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<i64> = posts
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_write_queries_report_commit() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("q.db");
    let db = db_path.to_str().unwrap();
    assert_success(&quarry(temp_dir.path(), &["seed", "import", "--db", db]));

    // When: Running a read, then a write
    let read = quarry(temp_dir.path(), &["--db", db, "run", "posts-sorted"]);
    let write = quarry(temp_dir.path(), &["--db", db, "run", "delete-user", "3"]);

    // Then: Only the write reports a commit
    assert_success(&read);
    assert_success(&write);
    assert!(!String::from_utf8_lossy(&read.stderr).contains("Committed"));
    assert!(String::from_utf8_lossy(&write.stderr).contains("Committed"));
}

#[test]
fn test_db_path_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("env.db");

    let output = Command::new(env!("CARGO_BIN_EXE_quarry"))
        .current_dir(temp_dir.path())
        .env("QUARRY_DB", &db_path)
        .env("RUST_LOG", "off")
        .args(["seed", "import"])
        .output()
        .unwrap();

    assert_success(&output);
    let conn = Connection::open(&db_path).unwrap();
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        .unwrap();
    assert_eq!(users, 3);
}

#[test]
fn test_failing_query_exits_non_zero() {
    let temp_dir = TempDir::new().unwrap();

    // Deleting a user that does not exist
    let output = quarry(temp_dir.path(), &["run", "delete-user", "42"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: [ERR_NOT_FOUND]"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_query_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let output = quarry(temp_dir.path(), &["run", "drop-everything"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_VALIDATION"));
    assert!(!temp_dir.path().join(".quarry").exists());
}

#[test]
fn test_list_prints_catalogue() {
    let temp_dir = TempDir::new().unwrap();

    let output = quarry(temp_dir.path(), &["list"]);

    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 18);
    assert!(stdout.contains("posts-after <cursor> <size>"));
}
