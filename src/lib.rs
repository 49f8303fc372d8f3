//! genai-docgen: batch prompts through an LLM API and save the responses.
//!
//! Responses are memoized in a per-provider JSON cache under the user's cache
//! directory so repeated runs with the same prompt and generation parameters
//! do not pay for the same completion twice.

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod providers;

pub use cache::{CacheEntry, CacheKind, CacheParams, ResponseCache};
pub use config::Config;
pub use error::{DocgenError, Result};
pub use providers::{CachedClient, GenerationParams, LLMProvider};
