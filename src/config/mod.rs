//! Configuration loading.
//!
//! Settings come from a TOML file (default `ai.toml` in the working
//! directory), then environment variables fill in what the file leaves out:
//! `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` and `GENAI_DOCGEN_CACHE_DIR`.
//!
//! ```toml
//! [openai]
//! api_key = "sk-..."
//! model = "gpt-4o-mini"
//! temperature = 0.7
//!
//! [cache]
//! max_age_days = 14
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DocgenError, Result};

/// Application directory name under the platform cache dir.
pub const APP_DIR_NAME: &str = "genai_docgen";

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "ai.toml";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_MAX_AGE_DAYS: u32 = 28;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenAI settings. `[chatgpt]` is accepted as an alias.
    #[serde(alias = "chatgpt")]
    pub openai: OpenAIConfig,
    pub anthropic: AnthropicConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Override for the API base URL (proxies, compatible servers).
    pub api_base: Option<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_base: None,
            temperature: 1.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub top_k: Option<u32>,
    pub top_p: Option<f64>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            api_base: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            top_k: None,
            top_p: None,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache directory. Defaults to [`CacheConfig::default_dir`].
    pub dir: Option<PathBuf>,
    /// Age threshold used by `cache clean` when `--days` is not given.
    pub max_age_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

impl CacheConfig {
    /// Platform cache directory for this application, e.g.
    /// `~/.cache/genai_docgen` on Linux.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join(APP_DIR_NAME)
    }

    /// The directory caches are stored in.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(Self::default_dir)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// used if present, otherwise defaults. Environment overrides are applied
    /// in both cases.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load_from_path(default)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file without applying environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DocgenError::Config(format!(
                "config file {} not found",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&data)
            .map_err(|e| DocgenError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml(data: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// Fill gaps from the environment. `lookup` is `std::env::var` outside
    /// tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.openai.api_key.as_deref().map_or(true, str::is_empty) {
            self.openai.api_key = non_empty("OPENAI_API_KEY");
        }
        if self.anthropic.api_key.as_deref().map_or(true, str::is_empty) {
            self.anthropic.api_key = non_empty("ANTHROPIC_API_KEY");
        }
        if let Some(dir) = non_empty("GENAI_DOCGEN_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }
    }
}
