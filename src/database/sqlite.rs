/*!
 * SQLite adapter.
 */

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use rusqlite::params_from_iter;
use rusqlite::types::ValueRef;

use crate::app_config::TableConfig;
use crate::database::connection::DatabaseConnection;
use crate::database::{DatabaseAdapter, SourceRow, TranslationRow, schema};
use crate::errors::DatabaseError;

/// Adapter over a SQLite file
#[derive(Debug)]
pub struct SqliteAdapter {
    location: String,
    connection: Mutex<Option<DatabaseConnection>>,
}

impl SqliteAdapter {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            connection: Mutex::new(None),
        }
    }

    fn connection(&self) -> Result<DatabaseConnection, DatabaseError> {
        self.connection.lock().clone().ok_or(DatabaseError::NotConnected)
    }
}

/// Render any SQLite value as text
fn text_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn connect(&self) -> Result<(), DatabaseError> {
        let location = self.location.clone();
        let connection = tokio::task::spawn_blocking(move || DatabaseConnection::open_location(&location))
            .await
            .map_err(|e| DatabaseError::Task(e.to_string()))??;
        debug!("Connected to {:?}", connection.path());
        *self.connection.lock() = Some(connection);
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        if self.connection.lock().take().is_some() {
            debug!("Closed database {}", self.location);
        }
        Ok(())
    }

    async fn ensure_translation_table(&self, table: &TableConfig, suffix: &str) -> Result<(), DatabaseError> {
        let statements = schema::create_translation_table(table, suffix)?;
        self.connection()?
            .transaction_async(move |tx| {
                for statement in &statements {
                    tx.execute(statement, [])?;
                }
                Ok(())
            })
            .await
    }

    async fn get_source_rows(&self, table: &TableConfig) -> Result<Vec<SourceRow>, DatabaseError> {
        let sql = schema::select_source_rows(table)?;
        let columns = table.columns.clone();
        self.connection()?
            .execute_async(move |conn| {
                let mut statement = conn.prepare(&sql)?;
                let mut rows = statement.query([])?;
                let mut result = Vec::new();
                while let Some(row) = rows.next()? {
                    let id = text_value(row.get_ref(0)?);
                    let mut values = BTreeMap::new();
                    for (i, column) in columns.iter().enumerate() {
                        values.insert(column.clone(), text_value(row.get_ref(i + 1)?));
                    }
                    result.push(SourceRow { id, columns: values });
                }
                Ok(result)
            })
            .await
    }

    async fn get_translated_ids(
        &self,
        table: &TableConfig,
        lang: &str,
        suffix: &str,
    ) -> Result<HashSet<String>, DatabaseError> {
        let sql = schema::select_translated_ids(table, suffix)?;
        let lang = lang.to_string();
        self.connection()?
            .execute_async(move |conn| {
                let mut statement = conn.prepare(&sql)?;
                let ids = statement
                    .query_map([&lang], |row| row.get::<_, String>(0))?
                    .collect::<Result<HashSet<_>, _>>()?;
                Ok(ids)
            })
            .await
    }

    async fn upsert_translation(
        &self,
        table: &TableConfig,
        row: &TranslationRow,
        suffix: &str,
    ) -> Result<(), DatabaseError> {
        let columns: Vec<&str> = row.columns.keys().map(String::as_str).collect();
        let sql = schema::upsert_translation(table, suffix, &columns)?;

        let mut params = vec![row.source_id.clone(), row.lang.clone()];
        params.extend(row.columns.values().cloned());

        self.connection()?
            .execute_async(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                Ok(())
            })
            .await
    }
}
