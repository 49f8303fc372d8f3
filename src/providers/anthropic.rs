//! Anthropic messages API provider.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::cache::CacheKind;
use crate::config::{AnthropicConfig, DEFAULT_MAX_TOKENS};
use crate::error::{DocgenError, Result};

use super::{build_client, parse_provider_error, validate_api_key, GenerationParams, LLMProvider};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    api_base: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            api_key: validate_api_key("Anthropic", Some(api_key))?,
            api_base: ANTHROPIC_API_BASE.to_string(),
            model: model.to_string(),
            client: build_client()?,
        })
    }

    pub fn from_config(config: &AnthropicConfig) -> Result<Self> {
        let mut provider = Self::new(config.api_key.as_deref().unwrap_or_default(), &config.model)?;
        if let Some(base) = config.api_base.as_deref().filter(|b| !b.is_empty()) {
            provider.api_base = base.trim_end_matches('/').to_string();
        }
        Ok(provider)
    }

    /// Messages API body for a single user turn. `max_tokens` is mandatory
    /// for this API and falls back to 1024.
    pub fn build_request_body(&self, params: &GenerationParams) -> Value {
        let model = if params.model.is_empty() {
            &self.model
        } else {
            &params.model
        };
        let mut body = json!({
            "model": model,
            "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{ "role": "user", "content": params.prompt }],
        });
        if let Some(t) = params.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = params.top_p {
            body["top_p"] = json!(p);
        }
        if let Some(k) = params.top_k {
            body["top_k"] = json!(k);
        }
        body
    }

    /// Concatenate the text blocks of a messages response.
    pub fn parse_response(body: &Value) -> Result<String> {
        let blocks = body["content"].as_array().ok_or_else(|| {
            DocgenError::Provider("Anthropic response has no content".to_string())
        })?;
        let text: String = blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn cache_kind(&self) -> CacheKind {
        CacheKind::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, params: &GenerationParams) -> Result<String> {
        let body = self.build_request_body(params);
        debug!(model = %body["model"], "Sending Anthropic request");

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(parse_provider_error(status.as_u16(), &text));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| DocgenError::Provider(format!("invalid Anthropic response: {}", e)))?;
        Self::parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new("sk-ant-test", "claude-3-5-haiku-latest").unwrap()
    }

    #[test]
    fn test_body_defaults() {
        let body = provider().build_request_body(&GenerationParams::new("Hi", ""));
        assert_eq!(body["model"], "claude-3-5-haiku-latest");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["content"], "Hi");
        assert!(body.get("top_k").is_none());
    }

    #[test]
    fn test_body_sampling_options() {
        let mut params = GenerationParams::new("Hi", "claude-sonnet-4-0");
        params.max_tokens = Some(256);
        params.temperature = Some(0.3);
        params.top_k = Some(40);
        params.frequency_penalty = Some(0.5);
        let body = provider().build_request_body(&params);
        assert_eq!(body["model"], "claude-sonnet-4-0");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["top_k"], 40);
        assert!(body.get("frequency_penalty").is_none());
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Hello " },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "world\n" }
            ]
        });
        assert_eq!(AnthropicProvider::parse_response(&body).unwrap(), "Hello world");
        assert!(AnthropicProvider::parse_response(&json!({})).is_err());
    }
}
