/*!
 * LLM gateway implementations.
 *
 * This module defines the gateway contract every backend implements and the
 * factory resolving a provider kind to a client:
 * - Ollama: local LLM server
 * - OpenAI: OpenAI chat completions API
 * - Mistral: Mistral's OpenAI-compatible chat API
 * - Anthropic: Anthropic messages API
 * - Mock: scripted gateway for tests
 */

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

pub mod anthropic;
pub mod mistral;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Environment variable holding the provider API key
pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// Sampling options for a single generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// System instructions, for backends that take them separately
    pub system: Option<String>,
}

impl GenerateOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }
}

/// Token accounting reported by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Result of a generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Uniform contract over language model backends
///
/// Gateways never retry on their own; a failed `generate` is reported to the
/// caller as is.
#[async_trait]
pub trait LlmGateway: Send + Sync + Debug {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse, ProviderError>;

    /// Whether the configured model is ready to serve requests
    ///
    /// May have side effects such as downloading the model.
    async fn is_model_loaded(&self) -> Result<bool, ProviderError>;

    /// Name of the configured model
    fn model(&self) -> &str;
}

/// Supported backends
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAI,
    #[default]
    Mistral,
    Anthropic,
}

impl ProviderKind {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Mistral => "Mistral",
            Self::Anthropic => "Anthropic",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Mistral => "mistral".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }

    /// Hosted backends refuse requests without a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => ollama::DEFAULT_ENDPOINT,
            Self::OpenAI => openai::DEFAULT_ENDPOINT,
            Self::Mistral => mistral::DEFAULT_ENDPOINT,
            Self::Anthropic => anthropic::DEFAULT_ENDPOINT,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "mistral" => Ok(Self::Mistral),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Everything needed to build a gateway
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    /// Empty when the backend needs no key
    pub api_key: String,
    /// Empty selects the backend's public endpoint
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: 120,
        }
    }

    pub fn endpoint_or_default(&self) -> String {
        if self.endpoint.trim().is_empty() {
            self.kind.default_endpoint().to_string()
        } else {
            self.endpoint.trim_end_matches('/').to_string()
        }
    }
}

/// Build the gateway for the configured backend
pub fn create_gateway(settings: &ProviderSettings) -> Result<Arc<dyn LlmGateway>, ProviderError> {
    if settings.kind.requires_api_key() && settings.api_key.trim().is_empty() {
        return Err(ProviderError::AuthenticationError(format!(
            "{} requires an API key; set it in the config file, pass --api-key or export {}",
            settings.kind.display_name(),
            API_KEY_ENV
        )));
    }

    let endpoint = settings.endpoint_or_default();
    let gateway: Arc<dyn LlmGateway> = match settings.kind {
        ProviderKind::Ollama => Arc::new(ollama::Ollama::new(&settings.model, endpoint, settings.timeout_secs)),
        ProviderKind::OpenAI => Arc::new(openai::OpenAI::new(
            &settings.model,
            &settings.api_key,
            endpoint,
            settings.timeout_secs,
        )),
        ProviderKind::Mistral => Arc::new(mistral::Mistral::new(
            &settings.model,
            &settings.api_key,
            endpoint,
            settings.timeout_secs,
        )),
        ProviderKind::Anthropic => Arc::new(anthropic::Anthropic::new(
            &settings.model,
            &settings.api_key,
            endpoint,
            settings.timeout_secs,
        )),
    };
    Ok(gateway)
}

/// Read a non-success response body and map it to a provider error
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, body);
    ProviderError::from_status(status, body)
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs.max(1)))
        .build()
        .unwrap_or_default()
}
