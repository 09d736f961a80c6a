/*!
 * Database sources for row translation.
 *
 * This module provides:
 * - The `DatabaseAdapter` contract used by the database pipeline
 * - SQLite support through rusqlite (`SqliteAdapter`)
 * - SQL builders for the per-table translation tables
 */

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::app_config::{DatabaseConfig, DatabaseKind, TableConfig};
use crate::errors::DatabaseError;

pub mod connection;
pub mod schema;
pub mod sqlite;

// Re-export main types
pub use connection::DatabaseConnection;
pub use sqlite::SqliteAdapter;

/// A row of a source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// Primary key rendered as text
    pub id: String,
    /// Translated columns; NULL reads as an empty string
    pub columns: BTreeMap<String, String>,
}

/// A translated row for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRow {
    pub source_id: String,
    pub lang: String,
    pub columns: BTreeMap<String, String>,
}

/// Contract of a database backend
///
/// `connect` and `close` bracket a whole run; the other operations are
/// called concurrently from row tasks and serialize their own writes.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync + std::fmt::Debug {
    async fn connect(&self) -> Result<(), DatabaseError>;

    async fn close(&self) -> Result<(), DatabaseError>;

    /// Create `{table}{suffix}` if it does not exist yet
    async fn ensure_translation_table(&self, table: &TableConfig, suffix: &str) -> Result<(), DatabaseError>;

    async fn get_source_rows(&self, table: &TableConfig) -> Result<Vec<SourceRow>, DatabaseError>;

    /// Ids of the source rows already translated into `lang`
    async fn get_translated_ids(
        &self,
        table: &TableConfig,
        lang: &str,
        suffix: &str,
    ) -> Result<HashSet<String>, DatabaseError>;

    /// Insert the translation, or update it when (source_id, lang) exists
    async fn upsert_translation(
        &self,
        table: &TableConfig,
        row: &TranslationRow,
        suffix: &str,
    ) -> Result<(), DatabaseError>;
}

/// Build the adapter for the configured database type
pub fn create_adapter(config: &DatabaseConfig) -> Result<Arc<dyn DatabaseAdapter>, DatabaseError> {
    match config.kind {
        DatabaseKind::Sqlite => Ok(Arc::new(SqliteAdapter::new(&config.connection))),
        DatabaseKind::Postgres | DatabaseKind::Mysql => Err(DatabaseError::UnsupportedType(format!(
            "{} (no driver bundled; use sqlite)",
            config.kind
        ))),
    }
}
