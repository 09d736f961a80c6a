/*!
 * Ollama gateway.
 *
 * Talks to a local Ollama server: `/api/generate` for completions and
 * `/api/tags` to check that the model is installed. A missing model is pulled
 * through `/api/pull` the first time readiness is checked.
 */

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::{GenerateOptions, LlmGateway, LlmResponse, TokenUsage, error_from_response, http_client};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama client
#[derive(Debug, Clone)]
pub struct Ollama {
    base_url: String,
    model: String,
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
    pub stream: bool,
}

/// Model parameters of a generate request
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Generate response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// Installed models, from `/api/tags`
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: &GenerateOptions) -> Self {
        let generation_options = GenerationOptions {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            num_predict: options.max_tokens,
        };
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: options.system.clone(),
            options: (generation_options != GenerationOptions::default()).then_some(generation_options),
            stream: false,
        }
    }
}

impl Ollama {
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: normalize_base_url(&endpoint.into()),
            model: model.into(),
            client: http_client(timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the installed models
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response("Ollama", response).await);
        }
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Download a model; blocks until the pull completes
    pub async fn pull_model(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/pull", self.base_url);
        info!("Pulling Ollama model {}", self.model);
        let response = self
            .client
            .post(&url)
            .json(&PullRequest {
                name: &self.model,
                stream: false,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response("Ollama", response).await);
        }
        Ok(())
    }
}

/// Model names match with or without the implicit `:latest` tag
pub fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed.strip_suffix(":latest") == Some(wanted)
        || wanted.strip_suffix(":latest") == Some(installed)
}

fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        DEFAULT_ENDPOINT.to_string()
    } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

#[async_trait]
impl LlmGateway for Ollama {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerationRequest::new(&self.model, prompt, options);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response("Ollama", response).await);
        }

        let body = response.text().await?;
        let generated: GenerationResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse Ollama API response: {}", e))
        })?;

        Ok(LlmResponse {
            content: generated.response,
            model: generated.model,
            finish_reason: generated.done_reason,
            usage: match (generated.prompt_eval_count, generated.eval_count) {
                (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                }),
                _ => None,
            },
        })
    }

    async fn is_model_loaded(&self) -> Result<bool, ProviderError> {
        let models = self.list_models().await?;
        if models.iter().any(|m| model_matches(m, &self.model)) {
            debug!("Ollama model {} is installed", self.model);
            return Ok(true);
        }

        self.pull_model().await?;
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| model_matches(m, &self.model)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
