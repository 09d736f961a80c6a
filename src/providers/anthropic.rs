/*!
 * Anthropic messages gateway.
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::{GenerateOptions, LlmGateway, LlmResponse, TokenUsage, error_from_response, http_client};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Anthropic client
#[derive(Debug, Clone)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub model: String,
    pub content: Vec<AnthropicContent>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
}

/// Content block of a response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl AnthropicRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: &GenerateOptions) -> Self {
        Self {
            model: model.into(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            system: options.system.clone(),
            temperature: options.temperature,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: options.top_p,
            top_k: options.top_k,
        }
    }
}

impl AnthropicResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

impl Anthropic {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint,
            model: model.into(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
    }
}

#[async_trait]
impl LlmGateway for Anthropic {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.endpoint);
        let request = AnthropicRequest::new(&self.model, prompt, options);

        let response = self.request(self.client.post(&url)).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response("Anthropic", response).await);
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse Anthropic API response: {}", e))
        })?;
        Ok(LlmResponse {
            content: parsed.text(),
            model: parsed.model.clone(),
            finish_reason: parsed.stop_reason.clone(),
            usage: parsed.usage.as_ref().map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
            }),
        })
    }

    async fn is_model_loaded(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/v1/models", self.endpoint);
        let response = self.request(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response("Anthropic", response).await);
        }
        let models: ModelList = response.json().await?;
        Ok(models.data.iter().any(|m| m.id == self.model || m.id.starts_with(&self.model)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
