/*!
 * File translation pipeline.
 *
 * For every source file and target language the pipeline parses the source,
 * reads the existing translation if there is one, runs the unit
 * orchestrator and writes the reconstructed output. Nothing is written when
 * the file is unchanged or when any of its units failed.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::app_config::FileConfig;
use crate::errors::ParseError;
use crate::file_utils::{FileManager, SourceFile};
use crate::parsers::markdown::{attribution_trailer, strip_attribution_trailer};
use crate::parsers::{ContentFormat, ContentParser, JsonParser, MarkdownParser, ScriptParser};
use crate::translation::concurrency::ConcurrencyPolicy;
use crate::translation::orchestrator::{RunOutcome, UnitOrchestrator};
use crate::translation::tasks::TaskScope;
use crate::translation::translator::Translator;
use crate::translation::unit::{TranslationResult, TranslationUnit};

/// What happened to one (file, language) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The translation was written to this path
    Written(PathBuf),
    /// The existing translation is up to date
    Skipped,
    /// Nothing was written
    Failed(String),
}

/// Outcome of one (file, language) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file: String,
    pub language: String,
    pub outcome: FileOutcome,
}

/// Outcome of a whole file run
#[derive(Debug, Clone, Default)]
pub struct FileRunSummary {
    pub reports: Vec<FileReport>,
}

impl FileRunSummary {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Report for a file label and language
    pub fn report(&self, file: &str, language: &str) -> Option<&FileReport> {
        self.reports.iter().find(|r| r.file == file && r.language == language)
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Translates source files into every target language
#[derive(Debug)]
pub struct FilePipeline {
    files: FileConfig,
    translators: Vec<Arc<Translator>>,
    policy: ConcurrencyPolicy,
    retranslate: bool,
}

impl FilePipeline {
    pub fn new(files: FileConfig, translators: Vec<Arc<Translator>>, policy: ConcurrencyPolicy) -> Self {
        Self {
            files,
            translators,
            policy,
            retranslate: false,
        }
    }

    pub fn with_retranslate(mut self, retranslate: bool) -> Self {
        self.retranslate = retranslate;
        self
    }

    pub fn files(&self) -> &FileConfig {
        &self.files
    }

    /// Translate every source file; failures are reported, never raised
    pub async fn run(&self, sources: Vec<SourceFile>, scope: &TaskScope) -> FileRunSummary {
        scope.running();
        let total = sources.len();
        let reports: Vec<FileReport> = self
            .policy
            .run_bounded(sources, |source| async move { self.run_file(&source, scope).await })
            .await
            .into_iter()
            .flatten()
            .collect();

        let summary = FileRunSummary { reports };
        if summary.has_failures() {
            scope.failed(format!("{} of {} translations failed", summary.failed(), summary.reports.len()));
        } else {
            scope.done(format!(
                "{} files: {} written, {} unchanged",
                total,
                summary.written(),
                summary.skipped()
            ));
        }
        summary
    }

    async fn run_file(&self, source: &SourceFile, scope: &TaskScope) -> Vec<FileReport> {
        let scope = scope.child(source.label());
        match source.format {
            ContentFormat::Markdown => self.translate_file(&MarkdownParser::new(), source, &scope).await,
            ContentFormat::Json => self.translate_file(&JsonParser::new(), source, &scope).await,
            ContentFormat::JavaScript => self.translate_file(&ScriptParser::javascript(), source, &scope).await,
            ContentFormat::TypeScript => self.translate_file(&ScriptParser::typescript(), source, &scope).await,
        }
    }

    async fn translate_file<P: ContentParser>(&self, parser: &P, source: &SourceFile, scope: &TaskScope) -> Vec<FileReport> {
        scope.running();
        let parsed = match tokio::fs::read_to_string(&source.path).await {
            Ok(content) => parser.parse(&content).map_err(|e| e.to_string()),
            Err(e) => Err(format!("Failed to read {:?}: {}", source.path, e)),
        };
        let tree = match parsed {
            Ok(tree) => tree,
            Err(message) => {
                scope.failed(message.clone());
                return self
                    .translators
                    .iter()
                    .map(|t| FileReport {
                        file: source.label(),
                        language: t.target_language().to_string(),
                        outcome: FileOutcome::Failed(message.clone()),
                    })
                    .collect();
            }
        };

        let units = parser.extract_units(&tree);
        debug!("{}: {} units", source.label(), units.len());

        let reports = self
            .policy
            .run_bounded(self.translators.iter().collect(), |translator: &Arc<Translator>| {
                self.translate_language(parser, source, &tree, &units, translator, scope)
            })
            .await;

        let failed = reports.iter().filter(|r| matches!(r.outcome, FileOutcome::Failed(_))).count();
        if failed > 0 {
            scope.failed(format!("{} of {} languages failed", failed, reports.len()));
        } else {
            scope.done(format!("{} languages", reports.len()));
        }
        reports
    }

    async fn translate_language<P: ContentParser>(
        &self,
        parser: &P,
        source: &SourceFile,
        tree: &P::Tree,
        units: &[TranslationUnit],
        translator: &Translator,
        scope: &TaskScope,
    ) -> FileReport {
        let language = translator.target_language();
        let scope = scope.child(language);
        let output = FileManager::output_path(&self.files, source, language);

        let existing = if self.retranslate {
            None
        } else {
            read_existing(parser, source.format, tree, &output).await
        };

        let report = UnitOrchestrator::new(translator, self.policy)
            .with_max_group_size(self.files.max_strings_per_group)
            .with_retranslate(self.retranslate)
            .run(units, existing.as_deref(), &scope)
            .await;

        let outcome = match &report.outcome {
            RunOutcome::Skipped => {
                scope.skipped("unchanged");
                FileOutcome::Skipped
            }
            RunOutcome::PartiallyFailed { failures } => {
                let message = format!("{} of {} units failed", failures.len(), report.dispatched);
                scope.failed(message.clone());
                FileOutcome::Failed(message)
            }
            RunOutcome::Completed => {
                let written = match render_output(parser, source.format, tree, &report.result, translator) {
                    Ok(content) => FileManager::write_async(&output, &content).await.map_err(|e| format!("{:#}", e)),
                    Err(e) => Err(e.to_string()),
                };
                match written {
                    Ok(()) => {
                        scope.done(format!("translated {}/{}", report.translated, report.dispatched));
                        FileOutcome::Written(output)
                    }
                    Err(message) => {
                        scope.failed(message.clone());
                        FileOutcome::Failed(message)
                    }
                }
            }
        };

        FileReport {
            file: source.label(),
            language: language.to_string(),
            outcome,
        }
    }
}

/// Units of the existing translation
///
/// Unreadable or unparseable files count as absent, and so does a file whose
/// structure no longer lines up with the source.
async fn read_existing<P: ContentParser>(
    parser: &P,
    format: ContentFormat,
    source: &P::Tree,
    output: &Path,
) -> Option<Vec<TranslationUnit>> {
    let content = match FileManager::read_optional(output).await {
        Ok(Some(content)) => content,
        Ok(None) => return None,
        Err(e) => {
            warn!("Ignoring existing translation: {:#}", e);
            return None;
        }
    };

    let body = match format {
        ContentFormat::Markdown => strip_attribution_trailer(&content),
        _ => content.as_str(),
    };
    match parser.parse(body) {
        Ok(tree) if !parser.is_aligned(source, &tree) => {
            warn!("Existing translation {:?} no longer matches the source layout, translating everything", output);
            None
        }
        Ok(tree) => Some(parser.extract_units(&tree)),
        Err(e) => {
            warn!("Existing translation {:?} cannot be parsed, translating everything: {}", output, e);
            None
        }
    }
}

/// Serialized translated document, with the attribution trailer for Markdown
fn render_output<P: ContentParser>(
    parser: &P,
    format: ContentFormat,
    tree: &P::Tree,
    result: &TranslationResult,
    translator: &Translator,
) -> Result<String, ParseError> {
    let translated = parser.reconstruct(tree, result)?;
    let content = parser.serialize(&translated)?;
    if format != ContentFormat::Markdown {
        return Ok(content);
    }

    let trailer = attribution_trailer(translator.source_name(), translator.model());
    if content.trim().is_empty() {
        Ok(format!("{}\n", trailer))
    } else {
        Ok(format!("{}\n\n{}\n", content.trim_end(), trailer))
    }
}
