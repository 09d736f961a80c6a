/*!
 * OpenAI chat completions gateway.
 *
 * The same wire format is spoken by several hosted backends, so the client
 * carries a provider label used in log and error messages.
 */

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::providers::{GenerateOptions, LlmGateway, LlmResponse, TokenUsage, error_from_response, http_client};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat completion APIs
#[derive(Debug, Clone)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    label: &'static str,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Model listing, from `/models`
#[derive(Debug, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: &GenerateOptions) -> Self {
        let mut messages = Vec::new();
        if let Some(system) = &options.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.into(),
        });
        Self {
            model: model.into(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
        }
    }
}

impl ChatCompletionResponse {
    pub fn into_llm_response(self) -> Result<LlmResponse, ProviderError> {
        let model = self.model;
        let usage = self.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("Response contained no choices".to_string()))?;
        Ok(LlmResponse {
            content: choice.message.content,
            model,
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}

impl OpenAI {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self::with_label("OpenAI", model, api_key, endpoint, timeout_secs)
    }

    /// Client for another backend speaking the same API
    pub fn with_label(
        label: &'static str,
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
            label,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Identifiers of the models the key can use
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.endpoint);
        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(self.label, response).await);
        }
        let models: ModelList = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl LlmGateway for OpenAI {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let request = ChatCompletionRequest::new(&self.model, prompt, options);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(self.label, response).await);
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse {} API response: {}", self.label, e))
        })?;
        completion.into_llm_response()
    }

    async fn is_model_loaded(&self) -> Result<bool, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::AuthenticationError(format!(
                "{} API key is missing",
                self.label
            )));
        }
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == &self.model))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
