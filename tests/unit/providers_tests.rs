/*!
 * Tests for the provider factory, request shapes and the mock gateway
 */

use std::str::FromStr;

use serde_json::{Value, json};
use speranto::errors::ProviderError;
use speranto::providers::anthropic::AnthropicRequest;
use speranto::providers::mock::MockProvider;
use speranto::providers::ollama::GenerationRequest;
use speranto::providers::openai::ChatCompletionRequest;
use speranto::providers::{GenerateOptions, LlmGateway, ProviderKind, ProviderSettings, create_gateway};

fn options() -> GenerateOptions {
    GenerateOptions {
        system: Some("You translate.".to_string()),
        ..GenerateOptions::with_temperature(0.2)
    }
}

#[test]
fn test_provider_kind_from_str_should_accept_every_backend() {
    for (name, kind) in [
        ("ollama", ProviderKind::Ollama),
        ("openai", ProviderKind::OpenAI),
        ("mistral", ProviderKind::Mistral),
        ("anthropic", ProviderKind::Anthropic),
    ] {
        assert_eq!(ProviderKind::from_str(name).unwrap(), kind);
        assert_eq!(kind.to_lowercase_string(), name);
    }
    assert!(ProviderKind::from_str("gemini").is_err());
}

#[test]
fn test_create_gateway_should_use_configured_model() {
    let mut settings = ProviderSettings::new(ProviderKind::Mistral, "mistral-small-latest");
    settings.api_key = "key".to_string();
    let gateway = create_gateway(&settings).unwrap();
    assert_eq!(gateway.model(), "mistral-small-latest");
}

#[test]
fn test_create_gateway_with_blank_key_should_fail_for_anthropic() {
    let mut settings = ProviderSettings::new(ProviderKind::Anthropic, "claude-3-5-haiku-latest");
    settings.api_key = "   ".to_string();
    assert!(matches!(create_gateway(&settings), Err(ProviderError::AuthenticationError(_))));
}

#[test]
fn test_ollama_request_should_carry_system_and_disable_streaming() {
    let request = GenerationRequest::new("llama3.1", "Translate", &options());
    let body: Value = serde_json::to_value(&request).unwrap();
    assert_eq!(body["model"], "llama3.1");
    assert_eq!(body["system"], "You translate.");
    assert_eq!(body["stream"], false);
    assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
}

#[test]
fn test_openai_request_should_send_system_then_user_message() {
    let request = ChatCompletionRequest::new("gpt-4o-mini", "Translate", &options());
    let body: Value = serde_json::to_value(&request).unwrap();
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "You translate."},
            {"role": "user", "content": "Translate"}
        ])
    );
    assert!(body.get("max_tokens").is_none());
}

#[test]
fn test_anthropic_request_should_keep_system_out_of_messages() {
    let request = AnthropicRequest::new("claude-3-5-haiku-latest", "Translate", &options());
    let body: Value = serde_json::to_value(&request).unwrap();
    assert_eq!(body["system"], "You translate.");
    assert_eq!(body["messages"], json!([{"role": "user", "content": "Translate"}]));
    assert!(body["max_tokens"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_ollama_gateway_without_server_should_report_connection_error() {
    let mut settings = ProviderSettings::new(ProviderKind::Ollama, "llama3.1");
    settings.endpoint = "http://127.0.0.1:9".to_string();
    settings.timeout_secs = 2;
    let gateway = create_gateway(&settings).unwrap();
    let result = gateway.generate("Hello", &GenerateOptions::default()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_mock_dictionary_should_take_precedence_over_custom_response() {
    let mock = MockProvider::working()
        .with_dictionary([("Home", "Inicio")])
        .with_custom_response(|s| s.to_uppercase());
    assert_eq!(mock.translate_value("Home"), "Inicio");
    assert_eq!(mock.translate_value("About"), "ABOUT");
}

#[tokio::test]
async fn test_mock_unavailable_model_should_be_reported_and_counted() {
    let mock = MockProvider::working().with_model_unavailable();
    assert!(!mock.is_model_loaded().await.unwrap());
    assert_eq!(mock.load_check_count(), 1);
}

#[tokio::test]
async fn test_mock_empty_and_malformed_should_answer_without_error() {
    let empty = MockProvider::empty().generate("x", &GenerateOptions::default()).await.unwrap();
    assert!(empty.content.is_empty());

    let malformed = MockProvider::malformed().generate("x", &GenerateOptions::default()).await.unwrap();
    assert!(serde_json::from_str::<Value>(&malformed.content).is_err());
}
