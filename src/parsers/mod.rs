/*!
 * Structural parsers for translatable content.
 *
 * Every supported format turns raw text into an addressable tree, derives
 * translation units from it and writes translated values back:
 * - `markdown`: block-level Markdown documents with optional frontmatter
 * - `json`: JSON key-value trees
 * - `script`: object literals in JavaScript and TypeScript modules
 */

use std::path::Path;

use crate::errors::ParseError;
use crate::translation::unit::{TranslationResult, TranslationUnit};

pub mod json;
pub mod markdown;
pub mod script;

pub use json::JsonParser;
pub use markdown::{BlockKind, MarkdownBlock, MarkdownDocument, MarkdownParser};
pub use script::{ScriptDialect, ScriptDocument, ScriptLeaf, ScriptParser};

/// Common contract of all structural parsers
///
/// `reconstruct` never mutates the tree it is given; it returns a new tree
/// with the translated values written at their original addresses.
pub trait ContentParser: Send + Sync {
    /// Parsed representation of a document
    type Tree: Clone + Send + Sync;

    /// Parse raw content into a tree
    fn parse(&self, content: &str) -> Result<Self::Tree, ParseError>;

    /// Serialize a tree back into raw content
    fn serialize(&self, tree: &Self::Tree) -> Result<String, ParseError>;

    /// Derive the translation units covering the tree's translatable leaves
    fn extract_units(&self, tree: &Self::Tree) -> Vec<TranslationUnit>;

    /// Build a new tree with `result` applied; leaves without an entry keep their value
    fn reconstruct(&self, tree: &Self::Tree, result: &TranslationResult) -> Result<Self::Tree, ParseError>;

    /// Whether units of `existing` can be matched against units of `source`
    ///
    /// Formats whose member identities are positional must reject an
    /// existing translation laid out differently from the source.
    fn is_aligned(&self, _source: &Self::Tree, _existing: &Self::Tree) -> bool {
        true
    }
}

/// Content formats recognised by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    Markdown,
    Json,
    JavaScript,
    TypeScript,
}

impl ContentFormat {
    /// All extensions picked up when scanning a source directory
    pub const EXTENSIONS: [&'static str; 4] = ["md", "json", "js", "ts"];

    /// Detect the format of a file from its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_lowercase();
        Self::from_extension(&extension)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.') {
            "md" | "markdown" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
        }
    }
}
