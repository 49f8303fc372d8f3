//! Cache kinds and their key-field schemas.

use std::fmt;

use crate::error::{DocgenError, Result};

/// Fields that are bookkeeping or payload, never part of a lookup.
pub const NON_SEARCH_FIELDS: &[&str] = &["cache_type", "timestamp", "response"];

const OPENAI_FIELDS: &[&str] = &[
    "cache_type",
    "prompt",
    "model",
    "temperature",
    "top_p",
    "frequency_penalty",
    "presence_penalty",
    "response",
    "timestamp",
];

const ANTHROPIC_FIELDS: &[&str] = &[
    "cache_type",
    "prompt",
    "model",
    "max_tokens",
    "temperature",
    "top_k",
    "top_p",
    "response",
    "timestamp",
];

/// Named category of cache. Determines the backing file name and the set of
/// fields every entry must carry.
///
/// `Azure` and `Custom` take their schema from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKind {
    OpenAi,
    Anthropic,
    Azure(Vec<String>),
    Custom(Vec<String>),
}

impl CacheKind {
    /// Resolve a kind from its name.
    ///
    /// `fields` is required for `azure` and `custom` and ignored otherwise.
    pub fn from_name(name: &str, fields: Option<Vec<String>>) -> Result<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "azure" => Self::Azure(fields.unwrap_or_default()),
            "custom" => Self::Custom(fields.unwrap_or_default()),
            _ => return Err(DocgenError::UnsupportedCacheKind(name.to_string())),
        };
        kind.validate()?;
        Ok(kind)
    }

    /// Check that a caller-supplied schema is usable.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Azure(fields) | Self::Custom(fields) if fields.is_empty() => {
                Err(DocgenError::MissingCacheFields(self.name().to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Azure(_) => "azure",
            Self::Custom(_) => "custom",
        }
    }

    /// Backing file name, e.g. `openai_cache.json`.
    pub fn file_name(&self) -> String {
        format!("{}_cache.json", self.name())
    }

    /// Ordered list of fields every entry of this kind must contain.
    pub fn key_fields(&self) -> Vec<String> {
        match self {
            Self::OpenAi => OPENAI_FIELDS.iter().map(|f| f.to_string()).collect(),
            Self::Anthropic => ANTHROPIC_FIELDS.iter().map(|f| f.to_string()).collect(),
            Self::Azure(fields) | Self::Custom(fields) => fields.clone(),
        }
    }

    /// Key fields minus `cache_type`, `timestamp` and `response`.
    pub fn search_keys(&self) -> Vec<String> {
        self.key_fields()
            .into_iter()
            .filter(|f| !NON_SEARCH_FIELDS.contains(&f.as_str()))
            .collect()
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds_resolve() {
        assert_eq!(
            CacheKind::from_name("openai", None).unwrap(),
            CacheKind::OpenAi
        );
        assert_eq!(
            CacheKind::from_name(" Anthropic ", None).unwrap(),
            CacheKind::Anthropic
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = CacheKind::from_name("gemini", None).unwrap_err();
        assert!(matches!(err, DocgenError::UnsupportedCacheKind(ref k) if k == "gemini"));
    }

    #[test]
    fn test_custom_requires_fields() {
        let err = CacheKind::from_name("custom", None).unwrap_err();
        assert!(matches!(err, DocgenError::MissingCacheFields(_)));

        let err = CacheKind::from_name("azure", Some(vec![])).unwrap_err();
        assert!(matches!(err, DocgenError::MissingCacheFields(_)));

        let kind = CacheKind::from_name(
            "custom",
            Some(vec!["prompt".into(), "model".into(), "response".into()]),
        )
        .unwrap();
        assert_eq!(kind.key_fields(), vec!["prompt", "model", "response"]);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(CacheKind::OpenAi.file_name(), "openai_cache.json");
        assert_eq!(CacheKind::Anthropic.file_name(), "anthropic_cache.json");
        assert_eq!(CacheKind::Custom(vec!["a".into()]).file_name(), "custom_cache.json");
        assert_eq!(CacheKind::Azure(vec!["a".into()]).file_name(), "azure_cache.json");
    }

    #[test]
    fn test_search_keys_exclude_bookkeeping() {
        assert_eq!(
            CacheKind::OpenAi.search_keys(),
            vec![
                "prompt",
                "model",
                "temperature",
                "top_p",
                "frequency_penalty",
                "presence_penalty"
            ]
        );
        assert_eq!(
            CacheKind::Anthropic.search_keys(),
            vec!["prompt", "model", "max_tokens", "temperature", "top_k", "top_p"]
        );
        let custom = CacheKind::Custom(vec![
            "timestamp".into(),
            "prompt".into(),
            "response".into(),
        ]);
        assert_eq!(custom.search_keys(), vec!["prompt"]);
    }
}
