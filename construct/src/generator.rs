//! The generator seam: anything that turns a prompt into text.

use thiserror::Error;

/// Failure signalled by a generator call.
///
/// The engine never inspects the message beyond reporting it; any failure is
/// treated as a retryable generator outcome for that attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct GeneratorError(pub String);

impl GeneratorError {
    /// Creates a generator error from any displayable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An external, possibly unreliable text producer (typically an LLM call).
///
/// Calls block until the generator has produced its full response. The engine
/// imposes no locking: implementations shared across threads must be
/// thread-safe on their own.
pub trait Generator: Send + Sync {
    /// Produces a response for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError` when no output could be produced.
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

impl<F, E> Generator for F
where
    F: Fn(&str) -> Result<String, E> + Send + Sync,
    E: std::fmt::Display,
{
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self(prompt).map_err(|e| GeneratorError(e.to_string()))
    }
}
