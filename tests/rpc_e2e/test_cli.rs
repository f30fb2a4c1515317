//! E2E tests: the `migrate-rpc` binary against the mock endpoint.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str;

use super::mock_postgrest::{ANON_KEY, ExecMode, MockPostgrest, SERVICE_KEY};
use super::test_helpers::{shipped_sql_dir, write_sql};

const SQL: &str = "CREATE TABLE IF NOT EXISTS kb_articles (id bigint);\n";

/// Run the binary off the runtime thread so the mock keeps serving.
async fn run_binary(url: String, dir: PathBuf, args: Vec<&'static str>) -> std::process::Output {
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("migrate-rpc")
            .unwrap()
            .current_dir(&dir)
            .env_remove("MIGRATE_FALLBACK")
            .env_remove("MIGRATE_SQL_DIR")
            .env("SUPABASE_URL", url)
            .env("SUPABASE_SERVICE_ROLE_KEY", SERVICE_KEY)
            .env("SUPABASE_ANON_KEY", ANON_KEY)
            .env("MIGRATE_TIMEOUT_SECS", "5")
            .args(args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

#[actix_rt::test]
async fn test_binary_runs_file() {
    let mock = MockPostgrest::start(ExecMode::Execute).await;
    let dir = tempfile::tempdir().unwrap();
    write_sql(dir.path(), "kb.sql", SQL);

    let output = run_binary(mock.url.clone(), dir.path().to_path_buf(), vec!["run", "kb.sql"]).await;

    assert_eq!(output.status.code(), Some(0), "{:?}", output);
    assert!(str::contains("applied (1/1 steps)").eval(&String::from_utf8_lossy(&output.stdout)));
    assert_eq!(mock.calls()[0].sql, SQL);
}

/// Catalog migrations run from any directory with the bundled SQL.
#[actix_rt::test]
async fn test_binary_applies_catalog_outside_crate() {
    let mock = MockPostgrest::start(ExecMode::Execute).await;
    let dir = tempfile::tempdir().unwrap();

    let output = run_binary(
        mock.url.clone(),
        dir.path().to_path_buf(),
        vec!["apply", "feedback-queue"],
    )
    .await;

    assert_eq!(output.status.code(), Some(0), "{:?}", output);
    let shipped = std::fs::read_to_string(shipped_sql_dir().join("001_feedback_queue.sql")).unwrap();
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].sql, shipped);
}

#[actix_rt::test]
async fn test_binary_manual_fallback_exits_nonzero() {
    let mock = MockPostgrest::start(ExecMode::MissingProcedure).await;
    let dir = tempfile::tempdir().unwrap();
    write_sql(dir.path(), "kb.sql", SQL);

    let output = run_binary(
        mock.url.clone(),
        dir.path().to_path_buf(),
        vec!["run", "kb.sql", "--fallback", "manual"],
    )
    .await;

    assert_eq!(output.status.code(), Some(4), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        str::contains(SQL)
            .and(str::contains("Manual steps"))
            .eval(&stdout),
        "{}",
        stdout
    );
}

#[actix_rt::test]
async fn test_binary_check() {
    let mock = MockPostgrest::start(ExecMode::Execute).await;
    let dir = tempfile::tempdir().unwrap();

    let output = run_binary(
        mock.url.clone(),
        dir.path().to_path_buf(),
        vec!["check", "--table", "tickets"],
    )
    .await;

    assert_eq!(output.status.code(), Some(0), "{:?}", output);
    assert!(mock.calls().is_empty());
}
