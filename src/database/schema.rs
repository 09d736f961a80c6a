/*!
 * SQL for translation tables.
 *
 * Every translated table gets a shadow table `{table}{suffix}` holding one
 * row per (source row, language). Table and column names come from the
 * configuration, so they are validated as plain identifiers and quoted
 * before they reach any statement.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::TableConfig;
use crate::errors::DatabaseError;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

/// Check that a name is a plain SQL identifier
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate and double-quote an identifier
pub fn quote_identifier(name: &str) -> Result<String, DatabaseError> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}

fn qualified(schema: Option<&str>, name: &str) -> Result<String, DatabaseError> {
    match schema {
        Some(schema) => Ok(format!("{}.{}", quote_identifier(schema)?, quote_identifier(name)?)),
        None => quote_identifier(name),
    }
}

/// Name of the shadow table of a table
pub fn translation_table_name(table: &str, suffix: &str) -> String {
    format!("{}{}", table, suffix)
}

/// Quoted, schema-qualified name of the source table
pub fn source_table(table: &TableConfig) -> Result<String, DatabaseError> {
    qualified(table.schema.as_deref(), &table.name)
}

/// Quoted, schema-qualified name of the shadow table
pub fn translation_table(table: &TableConfig, suffix: &str) -> Result<String, DatabaseError> {
    qualified(table.schema.as_deref(), &translation_table_name(&table.name, suffix))
}

/// Statements creating the shadow table and its lookup index, if absent
pub fn create_translation_table(table: &TableConfig, suffix: &str) -> Result<Vec<String>, DatabaseError> {
    let shadow_name = translation_table_name(&table.name, suffix);
    let shadow = translation_table(table, suffix)?;

    let mut columns = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "source_id TEXT NOT NULL".to_string(),
        "lang TEXT NOT NULL".to_string(),
    ];
    for column in &table.columns {
        columns.push(format!("{} TEXT", quote_identifier(column)?));
    }
    columns.push("created_at TEXT NOT NULL DEFAULT (datetime('now'))".to_string());
    columns.push("updated_at TEXT NOT NULL DEFAULT (datetime('now'))".to_string());
    columns.push("UNIQUE (source_id, lang)".to_string());

    let create_table = format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n)", shadow, columns.join(",\n    "));

    // SQLite qualifies the index name, not the indexed table
    let index_name = qualified(table.schema.as_deref(), &format!("idx_{}_source_lang", shadow_name))?;
    let create_index = format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (source_id, lang)",
        index_name,
        quote_identifier(&shadow_name)?
    );

    Ok(vec![create_table, create_index])
}

/// Query returning the id (as text) followed by every translated column
pub fn select_source_rows(table: &TableConfig) -> Result<String, DatabaseError> {
    let id = quote_identifier(&table.id_column)?;
    let columns = table
        .columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(
        "SELECT CAST({id} AS TEXT), {} FROM {} ORDER BY {id}",
        columns.join(", "),
        source_table(table)?,
        id = id
    ))
}

/// Query returning the source ids translated into `?1`
pub fn select_translated_ids(table: &TableConfig, suffix: &str) -> Result<String, DatabaseError> {
    Ok(format!(
        "SELECT source_id FROM {} WHERE lang = ?1",
        translation_table(table, suffix)?
    ))
}

/// Insert-or-update of one translated row; parameters are source_id, lang, then `columns`
pub fn upsert_translation(table: &TableConfig, suffix: &str, columns: &[&str]) -> Result<String, DatabaseError> {
    let quoted = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut names = vec!["source_id".to_string(), "lang".to_string()];
    names.extend(quoted.iter().cloned());
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();

    let mut updates: Vec<String> = quoted.iter().map(|c| format!("{c} = excluded.{c}", c = c)).collect();
    updates.push("updated_at = datetime('now')".to_string());

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (source_id, lang) DO UPDATE SET {}",
        translation_table(table, suffix)?,
        names.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    ))
}
