/*!
 * Mock gateway for testing.
 *
 * This module provides a scripted gateway that simulates different behaviors:
 * - `MockProvider::working()` - Translates every value of the prompt content
 * - `MockProvider::failing()` - Always fails with an API error
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::empty()` / `MockProvider::malformed()` - Useless answers
 *
 * Every request is counted, and the peak number of concurrent requests is
 * tracked so tests can assert concurrency limits.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::providers::{GenerateOptions, LlmGateway, LlmResponse, TokenUsage};
use crate::translation::prompts::extract_content;

/// Behavior mode for the mock gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Always succeeds with a translation of the prompt content
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty completion
    Empty,
    /// Returns text that is neither JSON nor the expected Markdown
    Malformed,
}

/// Counters shared by all clones of a mock
#[derive(Debug, Default)]
struct MockStats {
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    load_checks: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

/// Scripted gateway for tests
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    model: String,
    delay: Option<Duration>,
    model_loaded: bool,
    /// Fixed translations by source text
    dictionary: Arc<HashMap<String, String>>,
    /// Fail requests whose content contains this text
    fail_on: Option<String>,
    /// Custom translation of a single value
    custom_response: Option<fn(&str) -> String>,
    stats: Arc<MockStats>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            model: "mock-model".to_string(),
            delay: None,
            model_loaded: true,
            dictionary: Arc::new(HashMap::new()),
            fail_on: None,
            custom_response: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Wait before answering, so that concurrent requests overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the model as unavailable
    pub fn with_model_unavailable(mut self) -> Self {
        self.model_loaded = false;
        self
    }

    /// Translate these source texts to fixed values
    pub fn with_dictionary<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionary = Arc::new(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Fail every request whose content contains `needle`
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Set a custom translation for values missing from the dictionary
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    pub fn request_count(&self) -> usize {
        self.stats.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were in flight at the same time
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn load_check_count(&self) -> usize {
        self.stats.load_checks.load(Ordering::SeqCst)
    }

    /// Every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.stats.prompts.lock().clone()
    }

    /// Translation of a single value
    pub fn translate_value(&self, value: &str) -> String {
        if let Some(fixed) = self.dictionary.get(value) {
            return fixed.clone();
        }
        match self.custom_response {
            Some(generator) => generator(value),
            None => format!("[translated] {}", value),
        }
    }

    /// Translate prompt content: a JSON object value by value, anything else as a whole
    fn translate_content(&self, content: &str) -> String {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => {
                let translated: serde_json::Map<String, Value> = map
                    .into_iter()
                    .map(|(key, value)| {
                        let value = match value {
                            Value::String(s) => Value::String(self.translate_value(&s)),
                            other => other,
                        };
                        (key, value)
                    })
                    .collect();
                serde_json::to_string_pretty(&Value::Object(translated)).unwrap_or_default()
            }
            _ => self.translate_value(content),
        }
    }

    fn respond(&self, prompt: &str, count: usize) -> Result<String, ProviderError> {
        let content = extract_content(prompt).unwrap_or(prompt);

        if let Some(needle) = &self.fail_on {
            if content.contains(needle.as_str()) {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: format!("Simulated failure for content containing '{}'", needle),
                });
            }
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.translate_content(content)),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(self.translate_content(content))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Malformed => Ok("Sorry, I cannot help with that.".to_string()),
        }
    }
}

#[async_trait]
impl LlmGateway for MockProvider {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<LlmResponse, ProviderError> {
        let count = self.stats.requests.fetch_add(1, Ordering::SeqCst);
        self.stats.prompts.lock().push(prompt.to_string());

        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.respond(prompt, count);
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);

        let content = result?;
        Ok(LlmResponse {
            usage: Some(TokenUsage {
                prompt_tokens: prompt.len() as u64,
                completion_tokens: content.len() as u64,
            }),
            content,
            model: self.model.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn is_model_loaded(&self) -> Result<bool, ProviderError> {
        self.stats.load_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.model_loaded)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
