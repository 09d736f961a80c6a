/*!
 * # speranto - incremental LLM translation
 *
 * A Rust library for translating content files and database rows with
 * large language models, sending only what changed since the last run.
 *
 * ## Features
 *
 * - Markdown, JSON and JavaScript/TypeScript key-value files
 * - SQLite tables translated into per-language translation tables
 * - Providers:
 *   - Ollama (local LLM)
 *   - OpenAI API
 *   - Mistral API
 *   - Anthropic API
 * - Reuse of existing translations by structure
 * - Bounded concurrency with progress reporting
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `parsers`: Format-specific parsing and serialization
 * - `translation`: Translation units and pipelines:
 *   - `translation::chunker` / `translation::grouping`: unit extraction
 *   - `translation::change_detector`: reuse of existing translations
 *   - `translation::orchestrator`: translation of one content tree
 *   - `translation::file_pipeline` / `translation::database_pipeline`
 * - `database`: Database adapters
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: BCP-47 and ISO language code utilities
 * - `providers`: Client implementations for LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod parsers;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, DatabaseError, ParseError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
