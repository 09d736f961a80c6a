/*!
 * Block-level Markdown parser.
 *
 * A document is kept as the ordered list of its top-level blocks, each with
 * the exact source text it was parsed from. Inline markup, links, code and
 * HTML are never touched: a block is either replaced as a whole by its
 * translation or written back verbatim.
 */

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

use crate::errors::ParseError;
use crate::parsers::ContentParser;
use crate::translation::chunker;
use crate::translation::unit::{TranslationResult, TranslationUnit};

const FRONTMATTER_FENCE: &str = "---";
const TRAILER_PREFIX: &str = "_Automatically translated from ";

/// Kind of a top-level Markdown block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Frontmatter,
    Heading(u8),
    Paragraph,
    List,
    BlockQuote,
    CodeBlock,
    Html,
    Table,
    Rule,
    /// Source text outside any CommonMark block (link definitions and the like)
    Other,
}

impl BlockKind {
    /// Short tag used in member identities
    pub fn tag(&self) -> String {
        match self {
            Self::Frontmatter => "frontmatter".to_string(),
            Self::Heading(depth) => format!("heading{}", depth),
            Self::Paragraph => "paragraph".to_string(),
            Self::List => "list".to_string(),
            Self::BlockQuote => "blockquote".to_string(),
            Self::CodeBlock => "code".to_string(),
            Self::Html => "html".to_string(),
            Self::Table => "table".to_string(),
            Self::Rule => "rule".to_string(),
            Self::Other => "other".to_string(),
        }
    }

    /// Blocks counted towards the size of a plain text chunk
    pub fn is_prose(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading(_) | Self::List)
    }
}

/// A top-level block and its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownBlock {
    pub kind: BlockKind,
    pub raw: String,
}

impl MarkdownBlock {
    pub fn new(kind: BlockKind, raw: impl Into<String>) -> Self {
        Self { kind, raw: raw.into() }
    }
}

/// Parsed Markdown document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownDocument {
    pub blocks: Vec<MarkdownBlock>,
}

impl MarkdownDocument {
    pub fn kinds(&self) -> Vec<BlockKind> {
        self.blocks.iter().map(|b| b.kind).collect()
    }
}

/// Identity of the block at `index`, stable as long as the block sequence is
pub fn block_identity(index: usize, kind: BlockKind) -> String {
    format!("{}:{}", index, kind.tag())
}

/// Parser for Markdown documents
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options
    }

    /// Split a document into its top-level blocks
    pub fn parse_blocks(&self, content: &str) -> Vec<MarkdownBlock> {
        let content = content.replace("\r\n", "\n");
        let mut blocks = Vec::new();

        let body = match split_frontmatter(&content) {
            Some((frontmatter, rest)) => {
                blocks.push(MarkdownBlock::new(BlockKind::Frontmatter, frontmatter));
                rest
            }
            None => content.as_str(),
        };

        let mut depth = 0usize;
        let mut cursor = 0usize;
        let mut start = 0usize;
        let mut kind = BlockKind::Other;

        for (event, range) in Parser::new_ext(body, Self::options()).into_offset_iter() {
            match event {
                Event::Start(tag) => {
                    if depth == 0 {
                        start = line_start(body, range.start).max(cursor);
                        push_gap(&mut blocks, &body[cursor..start]);
                        kind = block_kind(&tag);
                    }
                    depth += 1;
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let end = range.end.max(start);
                        push_block(&mut blocks, kind, &body[start..end]);
                        cursor = end;
                    }
                }
                Event::Rule if depth == 0 => {
                    let rule_start = line_start(body, range.start).max(cursor);
                    push_gap(&mut blocks, &body[cursor..rule_start]);
                    push_block(&mut blocks, BlockKind::Rule, &body[rule_start..range.end]);
                    cursor = range.end;
                }
                _ => {}
            }
        }

        push_gap(&mut blocks, &body[cursor..]);
        blocks
    }

    /// Write the blocks of a translated chunk back onto the chunk's members
    ///
    /// When the translation has as many blocks as the chunk has members each
    /// member receives its counterpart. Otherwise the first member carries the
    /// whole translated chunk and the remaining members are emptied, which
    /// drops them on reconstruction.
    pub fn distribute_chunk(&self, unit: &TranslationUnit, translated: &str) -> Vec<(String, String)> {
        let translated_blocks = self.parse_blocks(translated);
        if translated_blocks.len() == unit.members.len() {
            return unit
                .members
                .iter()
                .zip(translated_blocks)
                .map(|(member, block)| (member.identity.clone(), block.raw))
                .collect();
        }

        unit.members
            .iter()
            .enumerate()
            .map(|(i, member)| {
                let value = if i == 0 { translated.trim().to_string() } else { String::new() };
                (member.identity.clone(), value)
            })
            .collect()
    }
}

impl ContentParser for MarkdownParser {
    type Tree = MarkdownDocument;

    fn parse(&self, content: &str) -> Result<MarkdownDocument, ParseError> {
        Ok(MarkdownDocument {
            blocks: self.parse_blocks(content),
        })
    }

    fn serialize(&self, tree: &MarkdownDocument) -> Result<String, ParseError> {
        if tree.blocks.is_empty() {
            return Ok(String::new());
        }
        let body = tree
            .blocks
            .iter()
            .map(|b| b.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(format!("{}\n", body))
    }

    fn extract_units(&self, tree: &MarkdownDocument) -> Vec<TranslationUnit> {
        chunker::chunk_document(tree)
    }

    fn reconstruct(&self, tree: &MarkdownDocument, result: &TranslationResult) -> Result<MarkdownDocument, ParseError> {
        let mut blocks = Vec::with_capacity(tree.blocks.len());
        for (index, block) in tree.blocks.iter().enumerate() {
            match result.get(&block_identity(index, block.kind)) {
                // absorbed into a previous block of the same chunk
                Some(value) if value.trim().is_empty() => {}
                Some(value) => blocks.push(MarkdownBlock::new(block.kind, value.trim_end())),
                None => blocks.push(block.clone()),
            }
        }
        Ok(MarkdownDocument { blocks })
    }

    /// Block identities are positional, so the block sequences must agree
    fn is_aligned(&self, source: &MarkdownDocument, existing: &MarkdownDocument) -> bool {
        source.kinds() == existing.kinds()
    }
}

/// Attribution line appended to every translated Markdown file
pub fn attribution_trailer(source_language: &str, model: &str) -> String {
    format!("{}{} using {}._", TRAILER_PREFIX, source_language, model)
}

/// Remove a trailing attribution line, if present
pub fn strip_attribution_trailer(content: &str) -> &str {
    let trimmed = content.trim_end();
    let last_line_start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let last_line = &trimmed[last_line_start..];
    if last_line.starts_with(TRAILER_PREFIX) && last_line.ends_with("._") {
        trimmed[..last_line_start].trim_end()
    } else {
        content
    }
}

/// Split a leading `---` fenced frontmatter block from the body
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;
    let mut offset = FRONTMATTER_FENCE.len() + 1;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == FRONTMATTER_FENCE {
            return Some((content[..offset].trim_end(), &content[offset..]));
        }
    }
    None
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn push_block(blocks: &mut Vec<MarkdownBlock>, kind: BlockKind, raw: &str) {
    let raw = raw.trim_end();
    if !raw.trim().is_empty() {
        blocks.push(MarkdownBlock::new(kind, raw));
    }
}

fn push_gap(blocks: &mut Vec<MarkdownBlock>, gap: &str) {
    let gap = gap.trim_matches('\n').trim_end();
    if !gap.trim().is_empty() {
        blocks.push(MarkdownBlock::new(BlockKind::Other, gap));
    }
}

fn block_kind(tag: &Tag<'_>) -> BlockKind {
    match tag {
        Tag::Heading { level, .. } => BlockKind::Heading(heading_depth(*level)),
        Tag::Paragraph => BlockKind::Paragraph,
        Tag::List(_) => BlockKind::List,
        Tag::BlockQuote(_) => BlockKind::BlockQuote,
        Tag::CodeBlock(_) => BlockKind::CodeBlock,
        Tag::HtmlBlock => BlockKind::Html,
        Tag::Table(_) => BlockKind::Table,
        _ => BlockKind::Other,
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
