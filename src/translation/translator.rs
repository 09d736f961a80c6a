/*!
 * Per-language translator.
 *
 * A `Translator` wraps the shared gateway for one target language. It checks
 * model readiness once per lifetime, loads optional per-language instructions
 * once, builds the prompt for each unit and decodes the model's answer back
 * into values keyed by member identity.
 */

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::errors::{ParseError, ProviderError, TranslationError};
use crate::language_utils;
use crate::parsers::MarkdownParser;
use crate::providers::{GenerateOptions, LlmGateway};
use crate::translation::prompts::TranslationPromptBuilder;
use crate::translation::unit::{ChunkContext, TranslationResult, TranslationUnit, UnitKind};

/// Token usage accumulated by one translator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageStats {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl UsageStats {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn summary(&self) -> String {
        format!(
            "{} requests, {} tokens ({} prompt, {} completion)",
            self.requests,
            self.total_tokens(),
            self.prompt_tokens,
            self.completion_tokens
        )
    }
}

/// Settings shared by the translators of one run
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    pub source_language: String,
    pub temperature: f32,
    /// Directory holding `{lang}.md` instruction files
    pub instructions_dir: Option<PathBuf>,
}

impl TranslatorSettings {
    pub fn new(source_language: impl Into<String>, temperature: f32) -> Self {
        Self {
            source_language: source_language.into(),
            temperature,
            instructions_dir: None,
        }
    }

    pub fn with_instructions_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.instructions_dir = dir;
        self
    }
}

/// Translator for one target language
#[derive(Debug)]
pub struct Translator {
    gateway: Arc<dyn LlmGateway>,
    source_language: String,
    target_language: String,
    source_name: String,
    target_name: String,
    options: GenerateOptions,
    instructions_dir: Option<PathBuf>,
    instructions: OnceCell<Option<String>>,
    ready: OnceCell<bool>,
    usage: Mutex<UsageStats>,
}

impl Translator {
    pub fn new(gateway: Arc<dyn LlmGateway>, settings: &TranslatorSettings, target_language: &str) -> Self {
        Self {
            gateway,
            source_name: language_utils::display_name(&settings.source_language),
            target_name: language_utils::display_name(target_language),
            source_language: settings.source_language.clone(),
            target_language: target_language.to_string(),
            options: GenerateOptions::with_temperature(settings.temperature),
            instructions_dir: settings.instructions_dir.clone(),
            instructions: OnceCell::new(),
            ready: OnceCell::new(),
            usage: Mutex::new(UsageStats::default()),
        }
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Display name of the source language, as used in prompts and trailers
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn model(&self) -> &str {
        self.gateway.model()
    }

    pub fn usage(&self) -> UsageStats {
        self.usage.lock().clone()
    }

    /// Wait until the model is ready; checked once per translator
    ///
    /// A failed check is not cached, so the next unit asks again.
    pub async fn ensure_ready(&self) -> Result<(), ProviderError> {
        let ready = self
            .ready
            .get_or_try_init(|| async {
                debug!("Checking model '{}' for {}", self.gateway.model(), self.target_language);
                self.gateway.is_model_loaded().await
            })
            .await?;

        if *ready {
            Ok(())
        } else {
            Err(ProviderError::ModelUnavailable(self.gateway.model().to_string()))
        }
    }

    async fn instructions(&self) -> Option<&str> {
        self.instructions
            .get_or_init(|| async {
                let dir = self.instructions_dir.as_ref()?;
                let path = dir.join(format!("{}.md", self.target_language));
                match tokio::fs::read_to_string(&path).await {
                    Ok(text) => {
                        debug!("Loaded instructions from {}", path.display());
                        Some(text)
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        warn!("Ignoring instructions file {}: {}", path.display(), e);
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    async fn prompt_builder(&self) -> TranslationPromptBuilder {
        let builder = TranslationPromptBuilder::new(&self.source_name, &self.target_name);
        match self.instructions().await {
            Some(instructions) => builder.with_custom_instructions(instructions),
            None => builder,
        }
    }

    /// Send one piece of content to the model and return its cleaned answer
    ///
    /// Blank content is returned unchanged without a request.
    pub async fn translate_text(&self, kind: UnitKind, label: &str, text: &str) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        self.ensure_ready().await?;
        let prompt = self.prompt_builder().await.build(kind, text);
        let response = self.gateway.generate(&prompt, &self.options).await?;

        {
            let mut usage = self.usage.lock();
            usage.requests += 1;
            if let Some(tokens) = &response.usage {
                usage.prompt_tokens += tokens.prompt_tokens;
                usage.completion_tokens += tokens.completion_tokens;
            }
        }

        let content = strip_code_fences(&response.content);
        if content.trim().is_empty() {
            return Err(TranslationError::EmptyResponse(label.to_string()));
        }
        Ok(content.to_string())
    }

    /// Translate every member of a unit
    ///
    /// Blank members keep their value; code chunks pass through untouched.
    pub async fn translate_unit(&self, unit: &TranslationUnit) -> Result<TranslationResult, TranslationError> {
        if unit.is_blank() {
            return Ok(passthrough(unit));
        }

        match unit.kind {
            UnitKind::Markdown(ChunkContext::Code) => Ok(passthrough(unit)),
            UnitKind::Markdown(_) => {
                let translated = self.translate_text(unit.kind, &unit.key, &unit.rendered_text).await?;
                Ok(MarkdownParser::new()
                    .distribute_chunk(unit, &translated)
                    .into_iter()
                    .collect())
            }
            UnitKind::KeyValue => {
                let translated = self.translate_text(unit.kind, &unit.key, &unit.rendered_text).await?;
                decode_key_values(unit, &translated)
            }
        }
    }
}

fn passthrough(unit: &TranslationUnit) -> TranslationResult {
    unit.members
        .iter()
        .map(|m| (m.identity.clone(), m.source.clone()))
        .collect()
}

/// Remove a Markdown code fence wrapped around a whole answer
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") || !trimmed.ends_with("```") || trimmed.len() < 6 {
        return trimmed;
    }
    let Some(first_newline) = trimmed.find('\n') else {
        return trimmed;
    };
    let body = &trimmed[first_newline + 1..trimmed.len() - 3];
    body.trim()
}

/// Map a key-value answer back onto the unit's members
pub fn decode_key_values(unit: &TranslationUnit, response: &str) -> Result<TranslationResult, TranslationError> {
    let start = response.find('{');
    let end = response.rfind('}');
    let object = match (start, end) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => {
            return Err(ParseError::Response(format!("no JSON object in answer for unit '{}'", unit.key)).into());
        }
    };

    let parsed: Value = serde_json::from_str(object).map_err(|e| {
        ParseError::Response(format!("invalid JSON in answer for unit '{}': {}", unit.key, e))
    })?;
    let Value::Object(map) = parsed else {
        return Err(ParseError::Response(format!("answer for unit '{}' is not an object", unit.key)).into());
    };

    let mut result = TranslationResult::new();
    let mut missing = Vec::new();
    for member in &unit.members {
        if member.is_blank() {
            result.insert(member.identity.clone(), member.source.clone());
            continue;
        }
        match map.get(&member.identity) {
            Some(Value::String(value)) => result.insert(member.identity.clone(), value.clone()),
            Some(Value::Null) | None => missing.push(member.identity.clone()),
            Some(other) => result.insert(member.identity.clone(), other.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(TranslationError::MissingKeys {
            unit: unit.key.clone(),
            keys: missing,
        })
    }
}
