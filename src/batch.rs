//! Prompt batches: loading prompt files and rendering results.

use std::path::Path;

use serde::Serialize;

use crate::error::{DocgenError, Result};

/// Outcome of one prompt in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub index: usize,
    pub prompt: String,
    pub response: String,
    /// Whether the response came from the response cache.
    pub cached: bool,
    pub duration_ms: u64,
}

/// Output rendering for a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutputFormat {
    /// `## prompt` heading followed by the response paragraph.
    Markdown,
    Text,
    /// One JSON object per line.
    Jsonl,
}

impl BatchOutputFormat {
    /// Guess a format from an output file extension. Defaults to Markdown.
    pub fn from_extension(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("txt") => Self::Text,
            Some("jsonl") | Some("ndjson") => Self::Jsonl,
            _ => Self::Markdown,
        }
    }
}

/// Load prompts from a file.
///
/// `.json` files must contain an array of strings. Anything else is read as
/// one prompt per line; blank lines and lines starting with `#` are skipped.
pub fn load_prompts(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let prompts = if is_json {
        parse_json_prompts(&data)?
    } else {
        parse_line_prompts(&data)
    };

    if prompts.is_empty() {
        return Err(DocgenError::Batch(format!(
            "no prompts found in {}",
            path.display()
        )));
    }
    Ok(prompts)
}

fn parse_json_prompts(data: &str) -> Result<Vec<String>> {
    let prompts: Vec<String> = serde_json::from_str(data).map_err(|e| {
        DocgenError::Batch(format!("prompt file must be a JSON array of strings: {}", e))
    })?;
    Ok(prompts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect())
}

fn parse_line_prompts(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Render batch results.
pub fn format_results(results: &[BatchResult], format: &BatchOutputFormat) -> String {
    match format {
        BatchOutputFormat::Markdown => results
            .iter()
            .map(|r| format!("## {}\n\n{}\n", single_line(&r.prompt), r.response.trim()))
            .collect::<Vec<_>>()
            .join("\n"),
        BatchOutputFormat::Text => results
            .iter()
            .map(|r| format!("{}\n{}\n", r.prompt, r.response.trim()))
            .collect::<Vec<_>>()
            .join("\n"),
        BatchOutputFormat::Jsonl => results
            .iter()
            .filter_map(|r| serde_json::to_string(r).ok())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Headings cannot span lines.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
