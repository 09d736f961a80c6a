/*!
 * Full app lifecycle tests through the controller
 */

use std::sync::Arc;

use anyhow::Result;
use rusqlite::Connection;
use serde_json::{Value, json};
use speranto::app_config::{Config, DatabaseConfig, DatabaseKind, TableConfig};
use speranto::app_controller::Controller;
use speranto::providers::ProviderKind;
use speranto::providers::mock::MockProvider;

use crate::common::{self, RecordingObserver};

fn base_config() -> Config {
    Config {
        provider: ProviderKind::Ollama,
        model: "llama3.1".to_string(),
        target_languages: vec!["es".to_string(), "pt-BR".to_string()],
        ..Config::default()
    }
}

#[tokio::test]
async fn test_translate_files_should_write_every_language_and_report_events() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "src/app.json", r#"{"menu":{"open":"Open","close":"Close"}}"#)?;
    common::create_test_file(root, "src/docs/intro.md", "# Intro\n\nHello.\n")?;

    let mut config = base_config();
    config.files = Some(common::file_config(root));

    let mock = MockProvider::working().with_custom_response(|s| s.to_uppercase());
    let observer = Arc::new(RecordingObserver::default());
    let controller = Controller::with_config(config)?
        .with_gateway(Arc::new(mock.clone()))
        .with_observer(observer.clone());

    let summary = controller.translate_files().await?;
    assert_eq!(summary.written(), 4);
    assert!(!summary.has_failures());
    assert!(root.join("out/pt-BR/docs/intro.md").exists());

    let translated: Value = serde_json::from_str(&std::fs::read_to_string(root.join("out/es/app.json"))?)?;
    assert_eq!(translated, json!({"menu": {"open": "OPEN", "close": "CLOSE"}}));
    assert!(!observer.events().is_empty());

    // a second run finds nothing to do
    let rerun = controller.translate_files().await?;
    assert_eq!(rerun.skipped(), 4);
    assert_eq!(mock.request_count(), 4);
    Ok(())
}

#[tokio::test]
async fn test_translate_files_without_file_section_should_fail() -> Result<()> {
    let controller = Controller::with_config(base_config())?.with_gateway(Arc::new(MockProvider::working()));
    let error = controller.translate_files().await.unwrap_err();
    assert!(format!("{:#}", error).contains("No file source configured"));
    Ok(())
}

#[tokio::test]
async fn test_translate_files_with_invalid_language_should_fail_before_any_request() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "src/app.json", r#"{"a":"A"}"#)?;

    let mut config = base_config();
    config.target_languages = vec!["zz".to_string()];
    config.files = Some(common::file_config(temp_dir.path()));

    let mock = MockProvider::working();
    let controller = Controller::with_config(config)?.with_gateway(Arc::new(mock.clone()));
    assert!(controller.translate_files().await.is_err());
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_translate_database_should_fill_translation_tables() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("app.db");
    Connection::open(&path)?.execute_batch(
        "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO products VALUES (7, 'Chair');",
    )?;

    let mut config = base_config();
    let mut database = DatabaseConfig::sqlite(
        path.to_string_lossy().to_string(),
        vec![TableConfig::new("products", &["name"])],
    );
    database.translation_table_suffix = "_i18n".to_string();
    config.database = Some(database);

    let mock = MockProvider::working();
    let controller = Controller::with_config(config)?.with_gateway(Arc::new(mock.clone()));
    let summary = controller.translate_database().await?;
    assert_eq!(summary.translated(), 2);

    let conn = Connection::open(&path)?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM products_i18n WHERE source_id = '7'", [], |r| r.get(0))?;
    assert_eq!(count, 2);
    let name: String = conn.query_row(
        "SELECT name FROM products_i18n WHERE source_id = '7' AND lang = 'pt-BR'",
        [],
        |r| r.get(0),
    )?;
    assert_eq!(name, "[translated] Chair");
    Ok(())
}

#[tokio::test]
async fn test_translate_database_with_unbundled_driver_should_be_a_configuration_error() -> Result<()> {
    let mut config = base_config();
    let mut database = DatabaseConfig::sqlite("postgres://localhost/app", vec![TableConfig::new("posts", &["title"])]);
    database.kind = DatabaseKind::Postgres;
    config.database = Some(database);

    let mock = MockProvider::working();
    let controller = Controller::with_config(config)?.with_gateway(Arc::new(mock.clone()));
    let error = controller.translate_database().await.unwrap_err();
    assert!(format!("{:#}", error).contains("not supported"));
    assert_eq!(mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_saved_config_should_load_back_identically() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("speranto.json");

    let mut config = base_config();
    config.files = Some(common::file_config(temp_dir.path()));
    config.sequential = true;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.target_languages, config.target_languages);
    assert_eq!(loaded.files, config.files);
    assert!(loaded.sequential);
    Ok(())
}
