//! Persistent LLM response caching keyed by prompt and generation parameters.

pub mod entry;
pub mod kind;
pub mod response_cache;
pub mod storage;

pub use entry::{params_from, CacheEntry, CacheParams};
pub use kind::CacheKind;
pub use response_cache::{CacheStats, Invalidation, ResponseCache};
pub use storage::{CacheStorage, JsonFileStorage};
