/*!
 * Database translation pipeline.
 *
 * One row is one key-value unit holding its translatable columns, translated
 * with a single request. Rows whose id already appears in the translation
 * table for a language are skipped, whatever their current content.
 */

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, warn};

use crate::app_config::{DatabaseConfig, TableConfig};
use crate::database::{DatabaseAdapter, SourceRow, TranslationRow};
use crate::errors::{AppError, DatabaseError};
use crate::translation::concurrency::ConcurrencyPolicy;
use crate::translation::tasks::TaskScope;
use crate::translation::translator::Translator;
use crate::translation::unit::{TranslationUnit, UnitMember};

/// Counts for one (table, language) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub language: String,
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the table could not be read at all
    pub error: Option<String>,
}

impl TableReport {
    fn new(table: &str, language: &str) -> Self {
        Self {
            table: table.to_string(),
            language: language.to_string(),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.error.is_none()
    }
}

/// Outcome of a database run
#[derive(Debug, Clone, Default)]
pub struct DatabaseRunSummary {
    pub reports: Vec<TableReport>,
}

impl DatabaseRunSummary {
    pub fn translated(&self) -> usize {
        self.reports.iter().map(|r| r.translated).sum()
    }

    pub fn skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(|r| !r.is_success())
    }
}

/// The key-value unit of a row: one member per column, keyed by column name
pub fn row_unit(table: &str, row: &SourceRow) -> TranslationUnit {
    let members = row
        .columns
        .iter()
        .map(|(column, value)| UnitMember::new(vec![column.clone()], column.clone(), value.clone()))
        .collect();
    TranslationUnit::key_value(format!("{}#{}", table, row.id), members)
}

/// Translates database rows into every target language
#[derive(Debug)]
pub struct DatabasePipeline {
    adapter: Arc<dyn DatabaseAdapter>,
    config: DatabaseConfig,
    translators: Vec<Arc<Translator>>,
    policy: ConcurrencyPolicy,
}

impl DatabasePipeline {
    pub fn new(
        adapter: Arc<dyn DatabaseAdapter>,
        config: DatabaseConfig,
        translators: Vec<Arc<Translator>>,
        policy: ConcurrencyPolicy,
    ) -> Self {
        Self {
            adapter,
            config,
            translators,
            policy,
        }
    }

    fn suffix(&self) -> &str {
        &self.config.translation_table_suffix
    }

    /// Connect, prepare the translation tables, translate, and always close
    ///
    /// A connection or table-preparation failure aborts the run; row
    /// failures are only counted.
    pub async fn run(&self, scope: &TaskScope) -> Result<DatabaseRunSummary, AppError> {
        scope.running();
        let connect = scope.child("connect");
        if let Err(e) = self.adapter.connect().await {
            connect.failed(e.to_string());
            scope.failed("cannot connect");
            return Err(AppError::Connectivity(format!(
                "Cannot open database '{}': {}",
                self.config.connection, e
            )));
        }
        connect.done("connected");

        let result = self.translate_all(scope).await;

        if let Err(e) = self.adapter.close().await {
            warn!("Failed to close database: {}", e);
        }

        match &result {
            Ok(summary) if summary.has_failures() => scope.failed(format!("{} rows failed", summary.failed())),
            Ok(summary) => scope.done(format!(
                "{} rows translated, {} already translated",
                summary.translated(),
                summary.skipped()
            )),
            Err(e) => scope.failed(e.to_string()),
        }
        result
    }

    async fn translate_all(&self, scope: &TaskScope) -> Result<DatabaseRunSummary, AppError> {
        let prepare = scope.child("prepare translation tables");
        prepare.running();
        let prepared = self
            .policy
            .run_bounded(self.config.tables.iter().collect(), |table: &TableConfig| async move {
                self.adapter.ensure_translation_table(table, self.suffix()).await
            })
            .await;
        if let Some(e) = prepared.into_iter().find_map(Result::err) {
            prepare.failed(e.to_string());
            return Err(AppError::Database(e));
        }
        prepare.done(format!("{} tables", self.config.tables.len()));

        let reports = self
            .policy
            .run_bounded(self.translators.iter().collect(), |translator: &Arc<Translator>| {
                self.translate_language(translator, scope)
            })
            .await;

        Ok(DatabaseRunSummary {
            reports: reports.into_iter().flatten().collect(),
        })
    }

    async fn translate_language(&self, translator: &Translator, scope: &TaskScope) -> Vec<TableReport> {
        let scope = scope.child(translator.target_language());
        scope.running();
        let mut reports = Vec::with_capacity(self.config.tables.len());
        for table in &self.config.tables {
            let report = self.translate_table(table, translator, &scope).await;
            reports.push(report);
        }

        if reports.iter().all(TableReport::is_success) {
            scope.done(format!("{} tables", reports.len()));
        } else {
            scope.failed("some rows failed");
        }
        reports
    }

    async fn translate_table(&self, table: &TableConfig, translator: &Translator, scope: &TaskScope) -> TableReport {
        let language = translator.target_language();
        let scope = scope.child(&table.name);
        let mut report = TableReport::new(&table.name, language);

        let pending = match self.pending_rows(table, language).await {
            Ok((pending, skipped)) => {
                report.skipped = skipped;
                pending
            }
            Err(e) => {
                scope.failed(e.to_string());
                report.error = Some(e.to_string());
                return report;
            }
        };

        if pending.is_empty() {
            scope.skipped(format!("{} rows already translated", report.skipped));
            return report;
        }

        let total = pending.len();
        let completed = AtomicUsize::new(0);
        scope.progress(0, total);
        let rows_policy = self.policy.with_limit(self.config.concurrency);
        let outcomes = rows_policy
            .run_bounded(pending, |row| {
                let completed = &completed;
                let scope = &scope;
                async move {
                    let outcome = self.translate_row(table, &row, translator).await;
                    if let Err(e) = &outcome {
                        warn!("{} row {} ({}): {}", table.name, row.id, translator.target_language(), e);
                    }
                    scope.progress(completed.fetch_add(1, Ordering::SeqCst) + 1, total);
                    outcome
                }
            })
            .await;

        report.translated = outcomes.iter().filter(|o| o.is_ok()).count();
        report.failed = outcomes.len() - report.translated;
        if report.failed > 0 {
            scope.failed(format!("{} of {} rows failed", report.failed, total));
        } else {
            info!("{} ({}): translated {} rows", table.name, language, report.translated);
            scope.done(format!("{} rows, {} skipped", report.translated, report.skipped));
        }
        report
    }

    /// Rows without a translation for `language`, and the number skipped
    async fn pending_rows(&self, table: &TableConfig, language: &str) -> Result<(Vec<SourceRow>, usize), DatabaseError> {
        let rows = self.adapter.get_source_rows(table).await?;
        let translated = self.adapter.get_translated_ids(table, language, self.suffix()).await?;
        let total = rows.len();
        let pending: Vec<SourceRow> = rows.into_iter().filter(|row| !translated.contains(&row.id)).collect();
        let skipped = total - pending.len();
        Ok((pending, skipped))
    }

    async fn translate_row(&self, table: &TableConfig, row: &SourceRow, translator: &Translator) -> Result<(), AppError> {
        let unit = row_unit(&table.name, row);
        let result = translator.translate_unit(&unit).await?;

        let columns: BTreeMap<String, String> = unit
            .members
            .iter()
            .map(|m| {
                let value = result.get(&m.identity).unwrap_or(m.source.as_str());
                (m.identity.clone(), value.to_string())
            })
            .collect();
        let translation = TranslationRow {
            source_id: row.id.clone(),
            lang: translator.target_language().to_string(),
            columns,
        };
        self.adapter.upsert_translation(table, &translation, self.suffix()).await?;
        Ok(())
    }
}
