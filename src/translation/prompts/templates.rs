/*!
 * Prompt templates for unit translation.
 *
 * Every prompt is made of a format-specific instruction block, an optional
 * context note for Markdown chunks, optional per-language instructions and the
 * content itself between fixed delimiters.
 */

use crate::translation::unit::{ChunkContext, UnitKind};

/// Line opening the content section of a prompt
pub const CONTENT_START: &str = "<<<CONTENT>>>";
/// Line closing the content section of a prompt
pub const CONTENT_END: &str = "<<<END CONTENT>>>";

/// Instruction template with `{source_language}` and `{target_language}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub const MARKDOWN_TRANSLATOR: &'static str = r#"You are a professional translator. Translate the following Markdown from {source_language} to {target_language}.

## Rules
- Keep every Markdown construct exactly as it is: headings, list markers, emphasis, tables and blank lines between blocks
- Never translate code spans, URLs, link targets, HTML tags or attribute names
- Keep the same number of blocks, in the same order
- Answer with the translated Markdown only, without explanations or code fences around it"#;

    pub const KEY_VALUE_TRANSLATOR: &'static str = r#"You are a professional translator. Translate the values of the following JSON object from {source_language} to {target_language}.

## Rules
- Keep every key exactly as it is and translate every value
- Keep placeholders such as {name}, {{count}}, %s and :param untouched
- Keep HTML tags and Markdown inside values untouched
- Answer with a single JSON object with exactly the same keys, and nothing else"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Markdown(_) => Self::new(Self::MARKDOWN_TRANSLATOR),
            UnitKind::KeyValue => Self::new(Self::KEY_VALUE_TRANSLATOR),
        }
    }

    /// Render the template with the given languages
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

/// Note describing what a Markdown chunk is
pub fn context_note(context: ChunkContext) -> Option<&'static str> {
    match context {
        ChunkContext::Text => None,
        ChunkContext::Section => Some("This is a complete section of a document, starting with its heading."),
        ChunkContext::List => Some("This is a list, possibly with the sentence introducing it. Keep every item."),
        ChunkContext::ListWithContext => {
            Some("This is a list together with the paragraphs around it. Keep every item and paragraph.")
        }
        ChunkContext::BlockQuote => Some("This is a quotation, possibly with the sentence introducing it. Keep the > markers."),
        ChunkContext::Code => Some("This is a code block. Only translate comments and leave the code unchanged."),
        ChunkContext::Frontmatter => Some(
            "This is YAML frontmatter. Translate only human-readable string values; keep keys, dates, slugs and the --- fences.",
        ),
    }
}

fn kind_note(kind: UnitKind) -> Option<&'static str> {
    match kind {
        UnitKind::Markdown(context) => context_note(context),
        UnitKind::KeyValue => None,
    }
}

/// Builder for translation prompts
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    custom_instructions: Option<String>,
}

impl TranslationPromptBuilder {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            custom_instructions: None,
        }
    }

    /// Append extra instructions for the target language
    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        let trimmed = instructions.trim();
        self.custom_instructions = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Build the prompt for a unit of the given kind
    pub fn build(&self, kind: UnitKind, content: &str) -> String {
        let mut prompt = PromptTemplate::for_kind(kind).render(&self.source_language, &self.target_language);

        if let Some(note) = kind_note(kind) {
            prompt.push_str("\n\n");
            prompt.push_str(note);
        }

        if let Some(instructions) = &self.custom_instructions {
            prompt.push_str(&format!(
                "\n\n## Additional instructions for {}\n{}",
                self.target_language, instructions
            ));
        }

        prompt.push_str(&format!("\n\n{}\n{}\n{}", CONTENT_START, content, CONTENT_END));
        prompt
    }
}

/// The content section of a prompt built by `TranslationPromptBuilder`
pub fn extract_content(prompt: &str) -> Option<&str> {
    let start = prompt.find(&format!("{}\n", CONTENT_START))? + CONTENT_START.len() + 1;
    let end = prompt.rfind(&format!("\n{}", CONTENT_END))?;
    (end >= start).then(|| &prompt[start..end])
}
