/*!
 * Database translation tests against on-disk SQLite files
 */

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use speranto::app_config::{DatabaseConfig, TableConfig};
use speranto::database::create_adapter;
use speranto::errors::AppError;
use speranto::providers::mock::MockProvider;
use speranto::translation::{ConcurrencyPolicy, DatabasePipeline, DatabaseRunSummary, TaskScope};

use crate::common;

fn seed(path: &Path) -> Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, body TEXT, views INTEGER);
         INSERT INTO posts VALUES (1, 'Hello', 'First post', 10);
         INSERT INTO posts VALUES (2, 'Bye', NULL, 3);",
    )?;
    Ok(())
}

fn config(path: &Path) -> DatabaseConfig {
    DatabaseConfig::sqlite(
        path.to_string_lossy().to_string(),
        vec![TableConfig::new("posts", &["title", "body"])],
    )
}

async fn run(config: DatabaseConfig, mock: &MockProvider, languages: &[&str]) -> Result<DatabaseRunSummary, AppError> {
    common::init_logging();
    let adapter = create_adapter(&config)?;
    DatabasePipeline::new(adapter, config, common::translators(mock, languages), ConcurrencyPolicy::default())
        .run(&TaskScope::detached("database"))
        .await
}

fn translated(path: &Path, id: &str, lang: &str) -> Result<(String, String)> {
    let conn = Connection::open(path)?;
    Ok(conn.query_row(
        "SELECT title, body FROM posts_translations WHERE source_id = ?1 AND lang = ?2",
        [id, lang],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}

#[tokio::test]
async fn test_rows_should_be_translated_into_every_language() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    seed(&path)?;

    let mock = MockProvider::working();
    let summary = run(config(&path), &mock, &["es", "fr"]).await?;

    assert_eq!(summary.translated(), 4);
    assert_eq!(summary.skipped(), 0);
    assert!(!summary.has_failures());
    assert_eq!(mock.request_count(), 4);
    assert_eq!(
        translated(&path, "1", "es")?,
        ("[translated] Hello".to_string(), "[translated] First post".to_string())
    );
    assert_eq!(translated(&path, "2", "fr")?, ("[translated] Bye".to_string(), String::new()));
    Ok(())
}

#[tokio::test]
async fn test_translated_rows_should_be_skipped_even_when_source_changed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    seed(&path)?;

    let first = MockProvider::working();
    run(config(&path), &first, &["es"]).await?;

    Connection::open(&path)?.execute("UPDATE posts SET title = 'Hello again' WHERE id = 1", [])?;
    let second = MockProvider::working();
    let summary = run(config(&path), &second, &["es"]).await?;

    assert_eq!(summary.translated(), 0);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(second.request_count(), 0);
    assert_eq!(translated(&path, "1", "es")?.0, "[translated] Hello");
    Ok(())
}

#[tokio::test]
async fn test_new_rows_should_be_translated_on_the_next_run() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    seed(&path)?;

    run(config(&path), &MockProvider::working(), &["es"]).await?;
    Connection::open(&path)?.execute("INSERT INTO posts VALUES (3, 'New', 'Fresh', 0)", [])?;

    let mock = MockProvider::working();
    let summary = run(config(&path), &mock, &["es"]).await?;
    assert_eq!(summary.translated(), 1);
    assert_eq!(summary.skipped(), 2);
    assert_eq!(mock.request_count(), 1);
    assert_eq!(translated(&path, "3", "es")?.0, "[translated] New");
    Ok(())
}

#[tokio::test]
async fn test_failed_row_should_not_stop_the_others_and_be_retried_later() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    seed(&path)?;
    Connection::open(&path)?.execute("UPDATE posts SET title = 'Broken' WHERE id = 2", [])?;

    let failing = MockProvider::working().failing_on("Broken");
    let summary = run(config(&path), &failing, &["es"]).await?;
    assert_eq!(summary.translated(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.has_failures());

    let retry = MockProvider::working();
    let summary = run(config(&path), &retry, &["es"]).await?;
    assert_eq!(summary.translated(), 1);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(retry.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_database_file_should_be_a_connectivity_error() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("missing.db");

    let mock = MockProvider::working();
    let result = run(config(&path), &mock, &["es"]).await;
    assert!(matches!(result, Err(AppError::Connectivity(_))));
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_table_name_should_abort_before_translating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    seed(&path)?;

    let mut config = config(&path);
    config.tables.push(TableConfig::new("posts; DROP TABLE posts", &["title"]));

    let mock = MockProvider::working();
    let result = run(config, &mock, &["es"]).await;
    assert!(matches!(result, Err(AppError::Database(_))));
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_source_table_should_fail_that_table_only() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    seed(&path)?;

    let mut config = config(&path);
    config.tables.push(TableConfig::new("pages", &["title"]));

    let mock = MockProvider::working();
    let summary = run(config, &mock, &["es"]).await?;
    assert_eq!(summary.translated(), 2);
    assert!(summary.has_failures());
    let pages = summary.reports.iter().find(|r| r.table == "pages").unwrap();
    assert!(pages.error.is_some());
    Ok(())
}
