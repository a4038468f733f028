//! Metrics tracking and token estimation for construction runs.

use std::time::Duration;

/// Metrics collected during a construction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructMetrics {
    /// Total number of attempts made.
    pub total_attempts: usize,
    /// Wall-clock time elapsed, including inter-attempt delays.
    pub wall_time: Duration,
    /// Estimated tokens across every prompt sent to the generator.
    pub estimated_input_tokens: usize,
    /// Estimated tokens across every response received.
    pub estimated_output_tokens: usize,
}

impl ConstructMetrics {
    pub(crate) fn record_prompt(&mut self, prompt: &str) {
        self.estimated_input_tokens += estimate_tokens(prompt);
    }

    pub(crate) fn record_response(&mut self, response: &str) {
        self.estimated_output_tokens += estimate_tokens(response);
    }
}

/// Estimate token count from text using the standard 4-chars-per-token heuristic.
///
/// Counts chars rather than bytes and rounds up.
///
/// # Examples
///
/// ```
/// use llm_construct::metrics::estimate_tokens;
///
/// assert_eq!(estimate_tokens("hello"), 2);
/// assert_eq!(estimate_tokens("hello world"), 3);
/// ```
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
