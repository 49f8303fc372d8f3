//! OpenAI chat completions provider.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::cache::CacheKind;
use crate::config::OpenAIConfig;
use crate::error::{DocgenError, Result};

use super::{build_client, parse_provider_error, validate_api_key, GenerationParams, LLMProvider};

/// OpenAI REST API base.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAIProvider {
    api_key: String,
    api_base: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            api_key: validate_api_key("OpenAI", Some(api_key))?,
            api_base: OPENAI_API_BASE.to_string(),
            model: model.to_string(),
            client: build_client()?,
        })
    }

    pub fn from_config(config: &OpenAIConfig) -> Result<Self> {
        let mut provider = Self::new(config.api_key.as_deref().unwrap_or_default(), &config.model)?;
        if let Some(base) = config.api_base.as_deref().filter(|b| !b.is_empty()) {
            provider.api_base = base.trim_end_matches('/').to_string();
        }
        Ok(provider)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// Chat completions body for a single user turn.
    ///
    /// Only options in the OpenAI cache key are sent; `max_tokens` and
    /// `top_k` are dropped so a cached answer always matches its request.
    pub fn build_request_body(&self, params: &GenerationParams) -> Value {
        let model = if params.model.is_empty() {
            &self.model
        } else {
            &params.model
        };
        let mut body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": params.prompt }],
        });
        let options = [
            ("temperature", params.temperature.map(Value::from)),
            ("top_p", params.top_p.map(Value::from)),
            ("frequency_penalty", params.frequency_penalty.map(Value::from)),
            ("presence_penalty", params.presence_penalty.map(Value::from)),
        ];
        for (key, value) in options {
            if let Some(value) = value {
                body[key] = value;
            }
        }
        body
    }

    /// Pull the first choice's text out of a chat completions response.
    pub fn parse_response(body: &Value) -> Result<String> {
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                DocgenError::Provider("OpenAI response has no message content".to_string())
            })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn cache_kind(&self) -> CacheKind {
        CacheKind::OpenAi
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, params: &GenerationParams) -> Result<String> {
        let body = self.build_request_body(params);
        debug!(model = %body["model"], "Sending OpenAI request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(parse_provider_error(status.as_u16(), &text));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| DocgenError::Provider(format!("invalid OpenAI response: {}", e)))?;
        if let Some(usage) = json.get("usage") {
            debug!(
                prompt_tokens = %usage["prompt_tokens"],
                completion_tokens = %usage["completion_tokens"],
                total_tokens = %usage["total_tokens"],
                "OpenAI usage"
            );
        }
        Self::parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new("sk-test", "gpt-3.5-turbo").unwrap()
    }

    #[test]
    fn test_rejects_bad_key() {
        assert!(OpenAIProvider::new("", "gpt-4").is_err());
        assert!(OpenAIProvider::new("key-without-prefix", "gpt-4").is_err());
    }

    #[test]
    fn test_body_uses_default_model() {
        let body = provider().build_request_body(&GenerationParams::new("Hello", ""));
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_body_includes_sampling_options() {
        let params = GenerationParams {
            prompt: "Hello".into(),
            model: "gpt-4o".into(),
            temperature: Some(0.7),
            top_p: Some(0.9),
            frequency_penalty: Some(0.2),
            presence_penalty: Some(0.1),
            max_tokens: Some(10),
            top_k: Some(40),
        };
        let body = provider().build_request_body(&params);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["top_p"], 0.9);
        assert_eq!(body["frequency_penalty"], 0.2);
        assert_eq!(body["presence_penalty"], 0.1);
        // not part of the OpenAI cache key
        assert!(body.get("top_k").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Fake response \n" } }]
        });
        assert_eq!(OpenAIProvider::parse_response(&body).unwrap(), "Fake response");
        assert!(OpenAIProvider::parse_response(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_api_base_override() {
        let config = OpenAIConfig {
            api_key: Some("sk-test".into()),
            api_base: Some("http://localhost:8080/v1/".into()),
            ..OpenAIConfig::default()
        };
        let provider = OpenAIProvider::from_config(&config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", provider());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("REDACTED"));
    }
}
