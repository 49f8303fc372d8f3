//! LLM providers and the cache-aware client that fronts them.

pub mod anthropic;
pub mod cached;
pub mod openai;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{params_from, CacheKind, CacheParams};
use crate::config::Config;
use crate::error::{DocgenError, Result};

pub use anthropic::AnthropicProvider;
pub use cached::{CachedClient, Completion};
pub use openai::OpenAIProvider;

/// One generation request. Unset options are left to the provider default
/// and omitted from the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Parameter mapping used for cache lookup and insertion.
    pub fn to_cache_params(&self) -> Result<CacheParams> {
        params_from(self)
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Cache kind responses from this provider are stored under.
    fn cache_kind(&self) -> CacheKind;

    fn default_model(&self) -> &str;

    /// Send one prompt and return the response text.
    async fn generate(&self, params: &GenerationParams) -> Result<String>;
}

/// Providers selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl ProviderKind {
    /// Cache kind this provider's responses are stored under.
    pub fn cache_kind(self) -> CacheKind {
        match self {
            Self::OpenAi => CacheKind::OpenAi,
            Self::Anthropic => CacheKind::Anthropic,
        }
    }
}

/// Build the provider selected by `kind` from configuration.
pub fn create_provider(kind: ProviderKind, config: &Config) -> Result<Box<dyn LLMProvider>> {
    match kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAIProvider::from_config(&config.openai)?)),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::from_config(
            &config.anthropic,
        )?)),
    }
}

/// Reject empty or obviously malformed API keys before any request is made.
pub fn validate_api_key(provider: &str, key: Option<&str>) -> Result<String> {
    let key = key.map(str::trim).unwrap_or_default();
    if key.is_empty() {
        return Err(DocgenError::Config(format!(
            "{} API key must be a non-empty string",
            provider
        )));
    }
    if !key.starts_with("sk-") {
        return Err(DocgenError::Config(format!(
            "{} API key must start with 'sk-'",
            provider
        )));
    }
    Ok(key.to_string())
}

/// Extract a readable message from a provider error body.
///
/// Both OpenAI and Anthropic wrap errors as `{"error": {"message": ...}}`.
pub fn parse_provider_error(status: u16, body: &str) -> DocgenError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().chars().take(200).collect());
    DocgenError::Provider(format!("HTTP {}: {}", status, message))
}

pub(crate) fn build_client() -> Result<Client> {
    Ok(Client::builder().timeout(Duration::from_secs(120)).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_params_omit_unset_options() {
        let mut params = GenerationParams::new("hi", "gpt-4o");
        params.temperature = Some(0.7);
        let map = params.to_cache_params().unwrap();
        assert_eq!(map.get("prompt"), Some(&json!("hi")));
        assert_eq!(map.get("model"), Some(&json!("gpt-4o")));
        assert_eq!(map.get("temperature"), Some(&json!(0.7)));
        assert!(!map.contains_key("top_k"));
        assert!(!map.contains_key("max_tokens"));
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key("OpenAI", Some(" sk-abc ")).unwrap(), "sk-abc");
        assert!(matches!(
            validate_api_key("OpenAI", None),
            Err(DocgenError::Config(ref m)) if m.contains("non-empty")
        ));
        assert!(matches!(
            validate_api_key("OpenAI", Some("abc")),
            Err(DocgenError::Config(ref m)) if m.contains("sk-")
        ));
    }

    #[test]
    fn test_parse_provider_error_json() {
        let err = parse_provider_error(401, r#"{"error": {"message": "Incorrect API key"}}"#);
        assert_eq!(err.to_string(), "Provider error: HTTP 401: Incorrect API key");
    }

    #[test]
    fn test_parse_provider_error_plain_body() {
        let err = parse_provider_error(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "Provider error: HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_provider_kind_cache_kind() {
        assert_eq!(ProviderKind::OpenAi.cache_kind(), CacheKind::OpenAi);
        assert_eq!(ProviderKind::Anthropic.cache_kind(), CacheKind::Anthropic);
        assert_eq!(ProviderKind::default().to_string(), "openai");
    }

    #[test]
    fn test_create_provider_requires_key() {
        let config = Config::default();
        assert!(create_provider(ProviderKind::OpenAi, &config).is_err());

        let mut config = Config::default();
        config.anthropic.api_key = Some("sk-ant-test".into());
        let provider = create_provider(ProviderKind::Anthropic, &config).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.cache_kind(), CacheKind::Anthropic);
    }
}
