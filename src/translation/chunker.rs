/*!
 * Context-aware chunking of Markdown documents.
 *
 * Blocks are grouped into chunks in document order so that related text is
 * translated together: a section starts at every heading of depth one or
 * two, lists travel with the paragraph that introduces them and the one that
 * follows them, quotes keep their lead-in and code is isolated. Every block
 * belongs to at most one chunk.
 */

use crate::parsers::markdown::{BlockKind, MarkdownDocument, block_identity};
use crate::translation::unit::{ChunkContext, TranslationUnit, UnitMember};

/// Number of prose blocks that closes a plain text chunk
pub const MAX_PROSE_BLOCKS: usize = 4;

struct ChunkBuilder<'a> {
    document: &'a MarkdownDocument,
    consumed: Vec<bool>,
    current: Vec<usize>,
    units: Vec<TranslationUnit>,
}

impl<'a> ChunkBuilder<'a> {
    fn new(document: &'a MarkdownDocument) -> Self {
        Self {
            document,
            consumed: vec![false; document.blocks.len()],
            current: Vec::new(),
            units: Vec::new(),
        }
    }

    fn kind(&self, index: usize) -> BlockKind {
        self.document.blocks[index].kind
    }

    fn take(&mut self, index: usize) {
        self.consumed[index] = true;
        self.current.push(index);
    }

    /// Pull the paragraph right before `index` into the open chunk if nobody owns it yet
    fn take_preceding_paragraph(&mut self, index: usize) {
        if index == 0 {
            return;
        }
        let previous = index - 1;
        if self.kind(previous) == BlockKind::Paragraph && !self.consumed[previous] {
            self.take(previous);
        }
    }

    fn prose_count(&self) -> usize {
        self.current.iter().filter(|&&i| self.kind(i).is_prose()).count()
    }

    fn flush(&mut self, context: ChunkContext) {
        if self.current.is_empty() {
            return;
        }
        let indices = std::mem::take(&mut self.current);
        self.emit(&indices, context);
    }

    fn emit(&mut self, indices: &[usize], context: ChunkContext) {
        let members: Vec<UnitMember> = indices
            .iter()
            .map(|&i| {
                let block = &self.document.blocks[i];
                UnitMember::new(vec![i.to_string()], block_identity(i, block.kind), block.raw.clone())
            })
            .collect();
        let rendered = members
            .iter()
            .map(|m| m.source.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let key = format!("{}:{}", self.units.len(), context);
        self.units.push(TranslationUnit::markdown(key, context, members, rendered));
    }
}

/// Group the blocks of a document into translation chunks
pub fn chunk_document(document: &MarkdownDocument) -> Vec<TranslationUnit> {
    let mut builder = ChunkBuilder::new(document);
    let count = document.blocks.len();
    let mut index = 0;

    if count > 0 && builder.kind(0) == BlockKind::Frontmatter {
        builder.consumed[0] = true;
        builder.emit(&[0], ChunkContext::Frontmatter);
        index = 1;
    }

    while index < count {
        if builder.consumed[index] {
            index += 1;
            continue;
        }

        match builder.kind(index) {
            BlockKind::Heading(depth) => {
                if depth <= 2 {
                    builder.flush(ChunkContext::Section);
                }
                builder.take(index);
            }
            BlockKind::List => {
                if builder.current.is_empty() {
                    builder.take_preceding_paragraph(index);
                }
                builder.take(index);

                let next = index + 1;
                let follows_with_context = next < count
                    && !builder.consumed[next]
                    && matches!(builder.kind(next), BlockKind::Paragraph | BlockKind::BlockQuote);
                if follows_with_context {
                    builder.take(next);
                    builder.flush(ChunkContext::ListWithContext);
                } else {
                    builder.flush(ChunkContext::List);
                }
            }
            BlockKind::BlockQuote => {
                if builder.current.is_empty() {
                    builder.take_preceding_paragraph(index);
                    builder.take(index);
                    builder.flush(ChunkContext::BlockQuote);
                } else {
                    builder.take(index);
                }
            }
            BlockKind::CodeBlock => {
                builder.flush(ChunkContext::Text);
                builder.consumed[index] = true;
                builder.emit(&[index], ChunkContext::Code);
            }
            _ => {
                builder.take(index);
                if builder.prose_count() >= MAX_PROSE_BLOCKS {
                    builder.flush(ChunkContext::Text);
                }
            }
        }
        index += 1;
    }

    builder.flush(ChunkContext::Text);
    builder.units
}
