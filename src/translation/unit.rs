/*!
 * Translation units.
 *
 * A unit is a batch of related translatable values sent to the model in a
 * single request: a context-aware chunk of Markdown blocks, a group of
 * key-value leaves from a JSON or script tree, or the columns of one
 * database row.
 */

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

/// Prompt context of a Markdown chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkContext {
    Text,
    Section,
    List,
    ListWithContext,
    BlockQuote,
    Code,
    Frontmatter,
}

impl ChunkContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Section => "section",
            Self::List => "list",
            Self::ListWithContext => "list-with-context",
            Self::BlockQuote => "blockquote",
            Self::Code => "code",
            Self::Frontmatter => "frontmatter",
        }
    }
}

impl fmt::Display for ChunkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a unit is rendered for the model and decoded afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Markdown text; the model answers with Markdown
    Markdown(ChunkContext),
    /// Flat `{identity: value}` JSON object; the model answers with the same keys
    KeyValue,
}

/// One addressable leaf covered by a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMember {
    /// Structural locator inside the parsed tree
    pub address: Vec<String>,
    /// Identity used to correlate the leaf across runs and in model responses
    pub identity: String,
    /// Value in the tree the unit was extracted from
    pub source: String,
}

impl UnitMember {
    pub fn new(address: Vec<String>, identity: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            address,
            identity: identity.into(),
            source: source.into(),
        }
    }

    /// Blank values are never sent to the model
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// A batch of members translated together
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Stable key correlating the unit across runs
    pub key: String,
    pub members: Vec<UnitMember>,
    /// Text sent to the model
    pub rendered_text: String,
    pub kind: UnitKind,
}

impl TranslationUnit {
    /// Build a Markdown chunk unit
    pub fn markdown(
        key: impl Into<String>,
        context: ChunkContext,
        members: Vec<UnitMember>,
        rendered_text: String,
    ) -> Self {
        Self {
            key: key.into(),
            members,
            rendered_text,
            kind: UnitKind::Markdown(context),
        }
    }

    /// Build a key-value unit, rendering its non-blank members as a flat JSON object
    pub fn key_value(key: impl Into<String>, members: Vec<UnitMember>) -> Self {
        let rendered_text = render_key_values(&members);
        Self {
            key: key.into(),
            members,
            rendered_text,
            kind: UnitKind::KeyValue,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn context(&self) -> Option<ChunkContext> {
        match self.kind {
            UnitKind::Markdown(context) => Some(context),
            UnitKind::KeyValue => None,
        }
    }

    /// True when no member has anything to translate
    pub fn is_blank(&self) -> bool {
        self.members.iter().all(UnitMember::is_blank)
    }
}

/// Render members as the flat JSON object sent to the model
pub fn render_key_values(members: &[UnitMember]) -> String {
    let mut object = Map::new();
    for member in members.iter().filter(|m| !m.is_blank()) {
        object.insert(member.identity.clone(), Value::String(member.source.clone()));
    }
    // Serializing a map of strings cannot fail.
    serde_json::to_string_pretty(&Value::Object(object)).unwrap_or_default()
}

/// Translated values keyed by member identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationResult {
    values: BTreeMap<String, String>,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: impl Into<String>, value: impl Into<String>) {
        self.values.insert(identity.into(), value.into());
    }

    pub fn get(&self, identity: &str) -> Option<&str> {
        self.values.get(identity).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }
}

impl FromIterator<(String, String)> for TranslationResult {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, String)> for TranslationResult {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}
