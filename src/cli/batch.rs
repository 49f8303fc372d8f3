//! Batch command handler.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{error, info};

use genai_docgen::batch::{format_results, load_prompts, BatchOutputFormat, BatchResult};
use genai_docgen::cache::ResponseCache;
use genai_docgen::config::Config;
use genai_docgen::providers::{create_provider, CachedClient, GenerationParams, ProviderKind};

use super::BatchFormat;

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// File of prompts: one per line, or a JSON array of strings (.json)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (default: guessed from the output extension, else markdown)
    #[arg(short, long, value_enum)]
    pub format: Option<BatchFormat>,

    /// Seconds to wait after each live request to stay under rate limits
    #[arg(long, default_value_t = 10)]
    pub sleep: u64,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    /// OpenAI only
    #[arg(long)]
    pub frequency_penalty: Option<f64>,

    /// OpenAI only
    #[arg(long)]
    pub presence_penalty: Option<f64>,

    /// Anthropic only
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Anthropic only
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Bypass the response cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Generation parameters for `provider`: config values, overridden by flags.
pub(crate) fn base_params(provider: ProviderKind, config: &Config, args: &BatchArgs) -> GenerationParams {
    let mut params = match provider {
        ProviderKind::OpenAi => GenerationParams {
            model: config.openai.model.clone(),
            temperature: Some(config.openai.temperature),
            top_p: Some(config.openai.top_p),
            frequency_penalty: Some(config.openai.frequency_penalty),
            presence_penalty: Some(config.openai.presence_penalty),
            ..Default::default()
        },
        ProviderKind::Anthropic => GenerationParams {
            model: config.anthropic.model.clone(),
            max_tokens: Some(config.anthropic.max_tokens),
            temperature: config.anthropic.temperature,
            top_k: config.anthropic.top_k,
            top_p: config.anthropic.top_p,
            ..Default::default()
        },
    };

    if let Some(model) = &args.model {
        params.model = model.clone();
    }
    params.temperature = args.temperature.or(params.temperature);
    params.top_p = args.top_p.or(params.top_p);
    // Only options that are part of the provider's cache key may reach the request.
    match provider {
        ProviderKind::OpenAi => {
            params.frequency_penalty = args.frequency_penalty.or(params.frequency_penalty);
            params.presence_penalty = args.presence_penalty.or(params.presence_penalty);
        }
        ProviderKind::Anthropic => {
            params.max_tokens = args.max_tokens.or(params.max_tokens);
            params.top_k = args.top_k.or(params.top_k);
        }
    }
    params
}

/// Process prompts from a file.
///
/// Stops at the first failed prompt without writing any output.
pub(crate) async fn cmd_batch(
    config_path: Option<&Path>,
    provider_kind: ProviderKind,
    args: BatchArgs,
) -> Result<()> {
    let prompts = load_prompts(&args.input).with_context(|| {
        format!(
            "Failed to load prompts from batch input file {}",
            args.input.display()
        )
    })?;

    let config = Config::load(config_path).with_context(|| "Failed to load configuration")?;
    let provider = create_provider(provider_kind, &config)
        .with_context(|| format!("Failed to initialise {} provider", provider_kind))?;

    let cache = if config.cache.enabled && !args.no_cache {
        let dir = config.cache.resolved_dir();
        let cache = ResponseCache::open(provider.cache_kind(), &dir)
            .with_context(|| format!("Failed to open response cache in {}", dir.display()))?;
        Some(cache)
    } else {
        None
    };

    let base = base_params(provider_kind, &config, &args);
    info!(
        provider = %provider_kind,
        model = %base.model,
        temperature = ?base.temperature,
        top_p = ?base.top_p,
        "Using generation parameters"
    );

    let mut client = CachedClient::new(provider, cache);
    let mut results = Vec::with_capacity(prompts.len());
    let total = prompts.len();

    for (index, prompt) in prompts.into_iter().enumerate() {
        info!(index, total, "Sending prompt");
        let start = Instant::now();
        let params = GenerationParams {
            prompt: prompt.clone(),
            ..base.clone()
        };

        let completion = match client.get_response(&params).await {
            Ok(completion) => completion,
            Err(err) => {
                error!(index, error = %err, "Error generating response");
                return Err(anyhow::Error::from(err)
                    .context(format!("Prompt {} failed: {}", index + 1, prompt)));
            }
        };

        results.push(BatchResult {
            index,
            prompt,
            response: completion.text,
            cached: completion.cached,
            duration_ms: start.elapsed().as_millis() as u64,
        });

        if !completion.cached && args.sleep > 0 && index + 1 < total {
            tokio::time::sleep(Duration::from_secs(args.sleep)).await;
        }
    }

    let output_format = match (args.format, &args.output) {
        (Some(format), _) => BatchOutputFormat::from(format),
        (None, Some(path)) => BatchOutputFormat::from_extension(path),
        (None, None) => BatchOutputFormat::Markdown,
    };
    let rendered = format_results(&results, &output_format);
    let cached = results.iter().filter(|r| r.cached).count();

    if let Some(path) = args.output {
        std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write batch output to {}", path.display()))?;
        println!(
            "Wrote {} result(s) to {} ({} from cache)",
            results.len(),
            path.display(),
            cached
        );
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: BatchArgs,
    }

    fn args(extra: &[&str]) -> BatchArgs {
        let mut argv = vec!["test", "-i", "prompts.txt"];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_openai_params_from_config() {
        let mut config = Config::default();
        config.openai.temperature = 0.7;
        let params = base_params(ProviderKind::OpenAi, &config, &args(&[]));
        assert_eq!(params.model, "gpt-3.5-turbo");
        assert_eq!(params.temperature, Some(0.7));
        assert_eq!(params.top_p, Some(1.0));
        assert_eq!(params.frequency_penalty, Some(0.0));
        assert_eq!(params.presence_penalty, Some(0.0));
        assert_eq!(params.top_k, None);
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config::default();
        let params = base_params(
            ProviderKind::OpenAi,
            &config,
            &args(&["--model", "gpt-4o", "--top-p", "0.9", "--presence-penalty", "0.1"]),
        );
        assert_eq!(params.model, "gpt-4o");
        assert_eq!(params.top_p, Some(0.9));
        assert_eq!(params.presence_penalty, Some(0.1));
        assert_eq!(params.temperature, Some(1.0));
    }

    #[test]
    fn test_anthropic_ignores_penalties() {
        let config = Config::default();
        let params = base_params(
            ProviderKind::Anthropic,
            &config,
            &args(&["--frequency-penalty", "0.5", "--top-k", "40"]),
        );
        assert_eq!(params.max_tokens, Some(1024));
        assert_eq!(params.top_k, Some(40));
        assert_eq!(params.frequency_penalty, None);
        assert_eq!(params.temperature, None);
    }

    #[test]
    fn test_openai_ignores_unkeyed_options() {
        let config = Config::default();
        let params = base_params(
            ProviderKind::OpenAi,
            &config,
            &args(&["--max-tokens", "10", "--top-k", "40"]),
        );
        assert_eq!(params.max_tokens, None);
        assert_eq!(params.top_k, None);

        let map = params.to_cache_params().unwrap();
        assert!(!map.contains_key("max_tokens"));
    }
}
