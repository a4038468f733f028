//! Command-line arguments.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Construct a JSON document from any text-generating command, retrying with
/// corrective feedback until the output parses.
#[derive(Debug, Parser)]
#[command(name = "construct", author, version, about, long_about = None)]
pub struct Cli {
    /// Label for the structure being constructed (logs and errors only)
    #[arg(long, default_value = "document")]
    pub target: String,

    /// Prompt text sent to the generator
    #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Schema description embedded in the prompt
    #[arg(long, conflicts_with = "schema_file")]
    pub schema: Option<String>,

    /// Read the schema description from a file
    #[arg(long)]
    pub schema_file: Option<PathBuf>,

    /// Treat the schema as JSON Schema and validate every document against it
    #[arg(long)]
    pub json_schema: bool,

    /// Retries after the first attempt (0 = a single attempt)
    #[arg(long, default_value_t = 2, env = "CONSTRUCT_MAX_RETRIES")]
    pub max_retries: usize,

    /// Wait between attempts, in milliseconds
    #[arg(long, default_value_t = 0, env = "CONSTRUCT_DELAY_MS")]
    pub delay_ms: u64,

    /// How the wait grows between attempts
    #[arg(long, value_enum, default_value_t = Backoff::Fixed)]
    pub backoff: Backoff,

    /// Upper bound for a single exponential wait, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub max_delay_ms: u64,

    /// Per-call generator timeout, in seconds
    #[arg(long, default_value_t = 300, env = "CONSTRUCT_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Pretty-print the document
    #[arg(long)]
    pub pretty: bool,

    /// Log every attempt at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Generator command; `{prompt}` in an argument is replaced by the prompt,
    /// otherwise the prompt is piped to stdin
    #[arg(last = true)]
    pub command: Vec<String>,
}

/// Inter-attempt wait policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backoff {
    /// The same wait before every retry.
    Fixed,
    /// Doubling wait, capped by `--max-delay-ms`.
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_trailing_command() {
        let cli = Cli::try_parse_from([
            "construct", "--prompt", "Return a user", "--", "llm", "-m", "small",
        ])
        .unwrap();
        assert_eq!(cli.target, "document");
        assert_eq!(cli.max_retries, 2);
        assert_eq!(cli.backoff, Backoff::Fixed);
        assert_eq!(cli.command, vec!["llm", "-m", "small"]);
    }

    #[test]
    fn test_prompt_is_required() {
        assert!(Cli::try_parse_from(["construct"]).is_err());
    }

    #[test]
    fn test_prompt_and_prompt_file_conflict() {
        let result = Cli::try_parse_from([
            "construct", "--prompt", "a", "--prompt-file", "b.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_exponential_backoff() {
        let cli = Cli::try_parse_from([
            "construct", "--prompt", "a", "--backoff", "exponential", "--delay-ms", "50",
        ])
        .unwrap();
        assert_eq!(cli.backoff, Backoff::Exponential);
        assert_eq!(cli.delay_ms, 50);
    }
}
