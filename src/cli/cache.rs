//! Response cache maintenance command handler.

use std::path::Path;

use anyhow::{Context, Result};

use genai_docgen::cache::ResponseCache;
use genai_docgen::config::Config;
use genai_docgen::providers::ProviderKind;

use super::CacheSubcommand;

/// Handle `genai-docgen cache` subcommands.
pub(crate) fn cmd_cache(
    config_path: Option<&Path>,
    provider: ProviderKind,
    action: CacheSubcommand,
) -> Result<()> {
    let config = Config::load(config_path).with_context(|| "Failed to load configuration")?;
    apply_cache_action(&config, provider, action)
}

fn apply_cache_action(config: &Config, provider: ProviderKind, action: CacheSubcommand) -> Result<()> {
    let dir = config.cache.resolved_dir();
    let mut cache = ResponseCache::open(provider.cache_kind(), &dir)
        .with_context(|| format!("Failed to open response cache in {}", dir.display()))?;

    match action {
        CacheSubcommand::Clear => {
            cache.reset().with_context(|| "Failed to clear cache")?;
            println!("Cleared {} cache: {}", provider, cache.path().display());
        }
        CacheSubcommand::Clean { days } => {
            let days = days.unwrap_or(config.cache.max_age_days);
            let removed = cache
                .clean_cache(days)
                .with_context(|| "Failed to clean cache")?;
            println!(
                "Removed {} entr{} older than {} day(s); {} remaining.",
                removed,
                if removed == 1 { "y" } else { "ies" },
                days,
                cache.len()
            );
        }
        CacheSubcommand::Stats => {
            let stats = cache.stats();
            println!("{:<10} {}", "Kind", stats.kind);
            println!("{:<10} {}", "File", stats.path.display());
            println!("{:<10} {}", "Entries", stats.total_entries);
            let fmt = |ts: Option<chrono::DateTime<chrono::Utc>>| {
                ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            println!("{:<10} {}", "Oldest", fmt(stats.oldest));
            println!("{:<10} {}", "Newest", fmt(stats.newest));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai_docgen::cache::CacheKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.cache.dir = Some(dir.path().join("cache"));
        config
    }

    fn seed(dir: &TempDir) -> ResponseCache {
        let mut cache = ResponseCache::open(CacheKind::OpenAi, dir.path().join("cache")).unwrap();
        let params = json!({"prompt": "p", "model": "m", "response": "r"});
        cache.add_entry(params.as_object().unwrap()).unwrap();
        cache
    }

    #[test]
    fn test_clear_empties_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = seed(&tmp);
        assert_eq!(cache.len(), 1);

        apply_cache_action(&config_in(&tmp), ProviderKind::OpenAi, CacheSubcommand::Clear).unwrap();

        let reopened = ResponseCache::open(CacheKind::OpenAi, tmp.path().join("cache")).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_clear_recovers_undecodable_file() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        std::fs::create_dir_all(&cache_dir).unwrap();
        let file = cache_dir.join(CacheKind::OpenAi.file_name());
        std::fs::write(&file, b"[\xff]").unwrap();

        apply_cache_action(&config_in(&tmp), ProviderKind::OpenAi, CacheSubcommand::Clear).unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap().trim(), "[]");
    }

    #[test]
    fn test_clean_keeps_fresh_entries() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp);

        apply_cache_action(
            &config_in(&tmp),
            ProviderKind::OpenAi,
            CacheSubcommand::Clean { days: Some(1) },
        )
        .unwrap();

        let reopened = ResponseCache::open(CacheKind::OpenAi, tmp.path().join("cache")).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_clear_other_provider_untouched() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp);

        apply_cache_action(&config_in(&tmp), ProviderKind::Anthropic, CacheSubcommand::Clear).unwrap();

        let openai = ResponseCache::open(CacheKind::OpenAi, tmp.path().join("cache")).unwrap();
        assert_eq!(openai.len(), 1);
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(cmd_cache(Some(&missing), ProviderKind::OpenAi, CacheSubcommand::Stats).is_err());
    }
}
