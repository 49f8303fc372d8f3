//! Cache-aware front for an [`LLMProvider`].
//!
//! Checks the response cache with the full parameter set before every
//! request. On a hit the provider is never called; on a miss the provider's
//! answer is stored under the same parameters.

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::error::Result;

use super::{GenerationParams, LLMProvider};

/// Response text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub cached: bool,
}

pub struct CachedClient {
    provider: Box<dyn LLMProvider>,
    cache: Option<ResponseCache>,
}

impl CachedClient {
    /// `cache` of `None` sends every prompt to the provider.
    pub fn new(provider: Box<dyn LLMProvider>, cache: Option<ResponseCache>) -> Self {
        Self { provider, cache }
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Answer `params`, from cache when possible.
    pub async fn get_response(&mut self, params: &GenerationParams) -> Result<Completion> {
        let mut params = params.clone();
        if params.model.is_empty() {
            params.model = self.provider.default_model().to_string();
        }
        let mut key = params.to_cache_params()?;

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.check_cache(&key) {
                info!(provider = self.provider.name(), "Using cached response");
                return Ok(Completion {
                    text: response_text(hit),
                    cached: true,
                });
            }
        }

        let text = self.provider.generate(&params).await?;
        debug!(
            provider = self.provider.name(),
            chars = text.len(),
            "Received response"
        );

        if let Some(cache) = &mut self.cache {
            key.insert("response".to_string(), Value::String(text.clone()));
            cache.add_entry(&key)?;
        }

        Ok(Completion {
            text,
            cached: false,
        })
    }
}

fn response_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
