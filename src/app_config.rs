use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::providers::{API_KEY_ENV, ProviderKind, ProviderSettings};
use crate::translation::concurrency::{ConcurrencyPolicy, DEFAULT_CONCURRENCY};
use crate::translation::translator::TranslatorSettings;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "speranto.json";

/// Placeholder replaced by the target language in `files.target_dir`
pub const LANG_PLACEHOLDER: &str = "[lang]";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    // @field: Model name passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Sampling temperature (0.0 - 2.0)
    #[serde(default)]
    pub temperature: f32,

    // @field: Source language code
    #[serde(default = "default_source_language")]
    pub source_language: String,

    // @field: Target language codes
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    // @field: LLM provider
    #[serde(default)]
    pub provider: ProviderKind,

    // @field: API key; falls back to LLM_API_KEY
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    // @field: Provider URL; empty means the provider default
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    // @field: Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Directory holding `{lang}.md` instruction files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_dir: Option<PathBuf>,

    // @field: File translation source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<FileConfig>,

    // @field: Database translation source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    // @field: Ignore existing translations
    #[serde(default)]
    pub retranslate: bool,

    // @field: One file, language and unit at a time
    #[serde(default)]
    pub sequential: bool,

    // @field: Units in flight per file and language
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// File translation configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileConfig {
    // @field: Directory containing source files
    pub source_dir: PathBuf,

    // @field: Output directory pattern, `[lang]` is replaced by the language code
    pub target_dir: String,

    // @field: Name outputs `{lang}.{ext}` (en.json -> es.json)
    #[serde(default)]
    pub use_lang_code_as_filename: bool,

    // @field: Maximum strings per request
    #[serde(default = "default_max_strings_per_group")]
    pub max_strings_per_group: usize,
}

impl FileConfig {
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            use_lang_code_as_filename: false,
            max_strings_per_group: default_max_strings_per_group(),
        }
    }

    /// Output directory for a language
    pub fn target_dir_for(&self, language: &str) -> PathBuf {
        PathBuf::from(self.target_dir.replace(LANG_PLACEHOLDER, language))
    }
}

/// Supported database backends
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    // @kind: SQLite file
    #[default]
    Sqlite,
    // @kind: PostgreSQL server
    Postgres,
    // @kind: MySQL server
    Mysql,
}

impl DatabaseKind {
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Sqlite => "sqlite".to_string(),
            Self::Postgres => "postgres".to_string(),
            Self::Mysql => "mysql".to_string(),
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

/// Database translation configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    // @field: Database type
    #[serde(rename = "type", default)]
    pub kind: DatabaseKind,

    // @field: Connection string (file path for SQLite)
    pub connection: String,

    // @field: Tables to translate
    #[serde(default)]
    pub tables: Vec<TableConfig>,

    // @field: Suffix of the translation tables
    #[serde(default = "default_translation_table_suffix")]
    pub translation_table_suffix: String,

    // @field: Rows translated at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl DatabaseConfig {
    pub fn sqlite(connection: impl Into<String>, tables: Vec<TableConfig>) -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            connection: connection.into(),
            tables,
            translation_table_suffix: default_translation_table_suffix(),
            concurrency: default_concurrency(),
        }
    }
}

/// A database table to translate
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TableConfig {
    // @field: Table name
    pub name: String,

    // @field: Schema (attached database for SQLite)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    // @field: Columns to translate
    pub columns: Vec<String>,

    // @field: Primary key column
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

impl TableConfig {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            id_column: default_id_column(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Which translation source a command needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Files,
    Database,
}

fn default_model() -> String {
    "mistral-large-latest".to_string()
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_languages() -> Vec<String> {
    vec!["es".to_string()]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_max_strings_per_group() -> usize {
    200
}

fn default_translation_table_suffix() -> String {
    "_translations".to_string()
}

fn default_id_column() -> String {
    "id".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, format!("{}\n", content))
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// API key from the config, or from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            kind: self.provider,
            model: self.model.clone(),
            api_key: self.resolved_api_key().unwrap_or_default(),
            endpoint: self.endpoint.trim().to_string(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn translator_settings(&self) -> TranslatorSettings {
        TranslatorSettings::new(self.source_language.clone(), self.temperature)
            .with_instructions_dir(self.instructions_dir.clone())
    }

    pub fn concurrency_policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::new(self.concurrency, self.sequential)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.source_language)?;
        if self.target_languages.is_empty() {
            return Err(anyhow!("At least one target language is required"));
        }
        for language in &self.target_languages {
            crate::language_utils::validate_language_code(language)?;
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", self.temperature));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("A model name is required"));
        }
        if !self.endpoint.trim().is_empty() {
            url::Url::parse(self.endpoint.trim())
                .with_context(|| format!("Invalid provider endpoint: {}", self.endpoint))?;
        }

        if self.provider.requires_api_key() && self.resolved_api_key().is_none() {
            return Err(anyhow!(
                "An API key is required for the {} provider (set api_key, --api-key or {})",
                self.provider.display_name(),
                API_KEY_ENV
            ));
        }

        Ok(())
    }

    /// Validate the configuration for a command translating `source`
    pub fn validate_for(&self, source: Source) -> Result<()> {
        self.validate()?;
        match source {
            Source::Files => {
                let files = self
                    .files
                    .as_ref()
                    .ok_or_else(|| anyhow!("No file source configured: set files.source_dir and files.target_dir"))?;
                if files.target_dir.trim().is_empty() {
                    return Err(anyhow!("files.target_dir must not be empty"));
                }
            }
            Source::Database => {
                let database = self
                    .database
                    .as_ref()
                    .ok_or_else(|| anyhow!("No database configured: add a database section to the config"))?;
                if database.kind != DatabaseKind::Sqlite {
                    return Err(anyhow!(
                        "Database type '{}' is not supported by this build; only sqlite is available",
                        database.kind
                    ));
                }
                if database.connection.trim().is_empty() {
                    return Err(anyhow!("database.connection must point to the SQLite file"));
                }
                if database.tables.is_empty() {
                    return Err(anyhow!("database.tables must list at least one table"));
                }
                for table in &database.tables {
                    if table.columns.is_empty() {
                        return Err(anyhow!("Table '{}' has no columns to translate", table.name));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            model: default_model(),
            temperature: 0.0,
            source_language: default_source_language(),
            target_languages: default_target_languages(),
            provider: ProviderKind::default(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            instructions_dir: None,
            files: None,
            database: None,
            retranslate: false,
            sequential: false,
            concurrency: default_concurrency(),
            log_level: LogLevel::default(),
        }
    }
}
