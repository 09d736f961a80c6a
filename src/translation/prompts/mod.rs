/*!
 * Prompt construction for unit translation.
 *
 * This module provides:
 * - Instruction templates for Markdown and key-value units
 * - Context notes for the different kinds of Markdown chunks
 * - A builder adding per-language instructions and the content section
 */

pub mod templates;

pub use templates::{CONTENT_END, CONTENT_START, PromptTemplate, TranslationPromptBuilder, extract_content};
