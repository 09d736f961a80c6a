use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::sync::Arc;

use crate::app_config::{Config, Source};
use crate::database;
use crate::errors::{AppError, DatabaseError};
use crate::file_utils::FileManager;
use crate::providers::{self, LlmGateway};
use crate::translation::database_pipeline::{DatabasePipeline, DatabaseRunSummary};
use crate::translation::file_pipeline::{FilePipeline, FileRunSummary};
use crate::translation::tasks::{LogObserver, TaskObserver, TaskScope};
use crate::translation::translator::Translator;

// @module: Application controller for file and database translation

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Gateway used instead of the configured provider
    gateway: Option<Arc<dyn LlmGateway>>,
    // @field: Receiver of task progress events
    observer: Arc<dyn TaskObserver>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            gateway: None,
            observer: Arc::new(LogObserver),
        })
    }

    /// Use this gateway instead of building one from the configuration
    pub fn with_gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Send task events to this observer instead of the log
    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn gateway(&self) -> Result<Arc<dyn LlmGateway>> {
        if let Some(gateway) = &self.gateway {
            return Ok(Arc::clone(gateway));
        }
        providers::create_gateway(&self.config.provider_settings())
            .map_err(|e| AppError::Connectivity(e.to_string()))
            .with_context(|| format!("Cannot use the {} provider", self.config.provider.display_name()))
    }

    fn translators(&self, gateway: &Arc<dyn LlmGateway>) -> Vec<Arc<Translator>> {
        let settings = self.config.translator_settings();
        self.config
            .target_languages
            .iter()
            .map(|language| Arc::new(Translator::new(Arc::clone(gateway), &settings, language)))
            .collect()
    }

    fn log_usage(translators: &[Arc<Translator>]) {
        for translator in translators {
            let usage = translator.usage();
            if usage.requests > 0 {
                info!("{}: {}", translator.target_language(), usage.summary());
            }
        }
    }

    /// Translate every configured source file into every target language
    pub async fn translate_files(&self) -> Result<FileRunSummary> {
        self.config.validate_for(Source::Files)?;
        let files = self
            .config
            .files
            .clone()
            .ok_or_else(|| anyhow!("No file source configured"))?;

        let sources = FileManager::discover_sources(&files, &self.config.source_language, &self.config.target_languages)?;
        info!(
            "Found {} source files in {:?} for {} languages",
            sources.len(),
            files.source_dir,
            self.config.target_languages.len()
        );

        let gateway = self.gateway()?;
        debug!("Using model {}", gateway.model());
        let translators = self.translators(&gateway);
        let pipeline = FilePipeline::new(files, translators.clone(), self.config.concurrency_policy())
            .with_retranslate(self.config.retranslate);

        let scope = TaskScope::root("files", Arc::clone(&self.observer));
        let summary = pipeline.run(sources, &scope).await;
        Self::log_usage(&translators);
        Ok(summary)
    }

    /// Translate the configured database tables into every target language
    pub async fn translate_database(&self) -> Result<DatabaseRunSummary> {
        self.config.validate_for(Source::Database)?;
        let config = self
            .config
            .database
            .clone()
            .ok_or_else(|| anyhow!("No database configured"))?;

        let adapter = database::create_adapter(&config).map_err(|e| match e {
            DatabaseError::UnsupportedType(kind) => AppError::Configuration(format!("Unsupported database type: {}", kind)),
            other => AppError::Database(other),
        })?;

        let gateway = self.gateway()?;
        let translators = self.translators(&gateway);
        let pipeline = DatabasePipeline::new(adapter, config, translators.clone(), self.config.concurrency_policy());

        let scope = TaskScope::root("database", Arc::clone(&self.observer));
        let summary = pipeline.run(&scope).await?;
        Self::log_usage(&translators);
        Ok(summary)
    }
}
