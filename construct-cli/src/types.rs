//! Shared data types for generator command configuration and results.

use std::path::PathBuf;
use std::time::Duration;

/// Argument token replaced by the prompt text. When no argument contains it,
/// the prompt is written to the command's standard input instead.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// How to run the generator command for one attempt.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Resolved executable.
    pub program: PathBuf,
    /// Arguments, possibly containing [`PROMPT_PLACEHOLDER`].
    pub args: Vec<String>,
    /// Maximum execution time per call.
    pub timeout: Duration,
    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Creates a command with the default 300 second timeout.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(300),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the prompt is passed as an argument rather than on stdin.
    #[must_use]
    pub fn prompt_in_args(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(PROMPT_PLACEHOLDER))
    }
}

/// Captured output of one generator call.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}
