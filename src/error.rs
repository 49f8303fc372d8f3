//! Error types for genai-docgen.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum DocgenError {
    // Configuration errors
    /// A cache kind name that has no known schema.
    #[error("Unsupported cache kind: {0}")]
    UnsupportedCacheKind(String),

    /// A `custom` or `azure` cache was requested without a field list.
    #[error("Cache kind '{0}' requires a non-empty list of key fields")]
    MissingCacheFields(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Storage errors
    /// An entry could not be encoded. The in-memory cache may now be ahead
    /// of what is on disk.
    #[error("Cache entry contains non-serializable data: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Provider errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Batch error: {0}")]
    Batch(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DocgenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DocgenError = io.into();
        assert!(matches!(err, DocgenError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_display_messages() {
        let err = DocgenError::UnsupportedCacheKind("gemini".into());
        assert_eq!(err.to_string(), "Unsupported cache kind: gemini");

        let err = DocgenError::MissingCacheFields("custom".into());
        assert!(err.to_string().contains("custom"));
    }
}
