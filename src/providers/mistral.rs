/*!
 * Mistral gateway, over Mistral's OpenAI-compatible chat API.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::providers::openai::OpenAI;
use crate::providers::{GenerateOptions, LlmGateway, LlmResponse};

pub const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai/v1";

/// Mistral client
#[derive(Debug, Clone)]
pub struct Mistral {
    inner: OpenAI,
}

impl Mistral {
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
            endpoint
        };
        Self {
            inner: OpenAI::with_label("Mistral", model, api_key, endpoint, timeout_secs),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

#[async_trait]
impl LlmGateway for Mistral {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<LlmResponse, ProviderError> {
        self.inner.generate(prompt, options).await
    }

    async fn is_model_loaded(&self) -> Result<bool, ProviderError> {
        // `*-latest` aliases are accepted by the API but not always listed
        if self.inner.model().ends_with("-latest") {
            self.inner.list_models().await?;
            return Ok(true);
        }
        self.inner.is_model_loaded().await
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
