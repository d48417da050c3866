//! LLM provider factory.
//!
//! Resolves a provider name to a concrete [`LlmClient`].

use std::sync::Arc;
use std::time::Duration;

use askboard_core::{AppError, AppResult};

use crate::client::LlmClient;
use crate::providers::{ollama, OllamaClient, OpenAiClient};
use crate::types::ProviderType;

/// Create an LLM client for `provider`.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom base URL
/// * `api_key` - API key, required for OpenAI
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns `AppError::Config` for an unknown provider and `AppError::Llm`
/// when a required key is missing or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(ollama::DEFAULT_BASE_URL);
            Ok(Arc::new(OllamaClient::new(base_url, timeout)?))
        }
        ProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Llm("OpenAI provider requires API key".to_string())
            })?;
            Ok(Arc::new(OpenAiClient::new(endpoint, api_key, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("openai", None, Some("sk-test"), TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, TIMEOUT) {
            Err(AppError::Llm(msg)) => assert!(msg.contains("requires API key")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            create_client("gguf", None, None, TIMEOUT),
            Err(AppError::Config(_))
        ));
    }
}
