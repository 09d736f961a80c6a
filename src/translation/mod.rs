/*!
 * Incremental translation pipeline.
 *
 * This module turns parsed content into translation units and drives them
 * through the model. It is split into several submodules:
 *
 * - `unit`: translation units, members and results
 * - `chunker` / `grouping`: unit extraction for Markdown and key-value trees
 * - `splitter`: size limits for key-value units
 * - `change_detector`: reuse of existing translations
 * - `prompts`: prompt templates and builders
 * - `translator`: per-language requests and response decoding
 * - `orchestrator`: translation of all units of one tree
 * - `concurrency` / `tasks`: bounded execution and progress events
 * - `file_pipeline` / `database_pipeline`: the two translation sources
 */

// Re-export main types for easier usage
pub use self::concurrency::ConcurrencyPolicy;
pub use self::database_pipeline::{DatabasePipeline, DatabaseRunSummary, TableReport};
pub use self::file_pipeline::{FileOutcome, FilePipeline, FileReport, FileRunSummary};
pub use self::orchestrator::{RunOutcome, UnitFailure, UnitOrchestrator, UnitRunReport};
pub use self::tasks::{LogObserver, ProgressObserver, TaskEvent, TaskObserver, TaskScope, TaskState};
pub use self::translator::{Translator, TranslatorSettings, UsageStats};
pub use self::unit::{ChunkContext, TranslationResult, TranslationUnit, UnitKind, UnitMember};

// Re-export prompt types
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod change_detector;
pub mod chunker;
pub mod concurrency;
pub mod database_pipeline;
pub mod file_pipeline;
pub mod grouping;
pub mod orchestrator;
pub mod prompts;
pub mod splitter;
pub mod tasks;
pub mod translator;
pub mod unit;
