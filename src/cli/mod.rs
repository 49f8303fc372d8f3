//! Command-line interface definitions and dispatch.

mod batch;
mod cache;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use genai_docgen::batch::BatchOutputFormat;
use genai_docgen::providers::ProviderKind;

pub(crate) use batch::{cmd_batch, BatchArgs};
pub(crate) use cache::cmd_cache;

/// Send a batch of prompts to an LLM and save the responses
#[derive(Parser)]
#[command(name = "genai-docgen")]
#[command(version)]
#[command(about = "Send a batch of prompts to an LLM and save the responses")]
pub(crate) struct Cli {
    /// Path to the TOML config file (default: ./ai.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// LLM provider to use
    #[arg(short, long, value_enum, default_value_t = ProviderArg::Openai, global = true)]
    pub provider: ProviderArg,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Send each prompt in a file and write the responses
    Run(BatchArgs),

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheSubcommand,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheSubcommand {
    /// Delete every cached response for the provider
    Clear,
    /// Remove cached responses older than a number of days
    Clean {
        /// Maximum age in days (default: cache.max_age_days from config)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show cache location and size
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ProviderArg {
    Openai,
    Anthropic,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => ProviderKind::OpenAi,
            ProviderArg::Anthropic => ProviderKind::Anthropic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BatchFormat {
    Markdown,
    Text,
    Jsonl,
}

impl From<BatchFormat> for BatchOutputFormat {
    fn from(format: BatchFormat) -> Self {
        match format {
            BatchFormat::Markdown => BatchOutputFormat::Markdown,
            BatchFormat::Text => BatchOutputFormat::Text,
            BatchFormat::Jsonl => BatchOutputFormat::Jsonl,
        }
    }
}

/// Run the parsed command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let provider = ProviderKind::from(cli.provider);
    match cli.command {
        Command::Run(args) => cmd_batch(cli.config.as_deref(), provider, args).await,
        Command::Cache { action } => cmd_cache(cli.config.as_deref(), provider, action),
    }
}
