//! Error types for construction runs with attempt history tracking.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::metrics::ConstructMetrics;

/// Why a single attempt failed. Transient per attempt; kept in history only.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    /// The generator returned nothing but whitespace.
    Empty,
    /// No JSON document could be extracted from the response.
    Parse {
        /// Stage-by-stage description with a bounded preview of the response.
        reason: String,
        /// The per-stage errors alone, without the preview.
        stages: String,
    },
    /// The generator signalled a failure instead of producing text.
    Generator {
        /// The generator's error message.
        message: String,
    },
    /// A document was parsed but the configured validator rejected it.
    Rejected {
        /// Every validation problem found.
        errors: Vec<String>,
        /// The rejected document.
        document: Value,
    },
}

impl AttemptFailure {
    /// The error kind this failure maps to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty => ErrorKind::EmptyResponse,
            Self::Parse { .. } => ErrorKind::ParseFailed,
            Self::Generator { .. } => ErrorKind::GeneratorCallFailed,
            Self::Rejected { .. } => ErrorKind::InvalidStructuredOutput,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Generator returned an empty response"),
            Self::Parse { reason, .. } => write!(f, "Parse failure: {reason}"),
            Self::Generator { message } => write!(f, "Generator call failed: {message}"),
            Self::Rejected { errors, .. } => {
                write!(f, "Document rejected by validator: {}", errors.join("; "))
            }
        }
    }
}

/// Record of a single failed attempt.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// The attempt number (1-indexed).
    pub attempt_number: usize,
    /// Why the attempt failed.
    pub failure: AttemptFailure,
    /// Raw generator output, if the generator produced any.
    pub raw_output: Option<String>,
    /// Elapsed time since the run started, at the end of this attempt.
    pub elapsed: Duration,
}

/// Coarse classification of construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration rejected before any attempt.
    InvalidConfiguration,
    /// The generator produced nothing.
    EmptyResponse,
    /// A response contained no parseable JSON.
    ParseFailed,
    /// A parsed document was rejected by the validator.
    InvalidStructuredOutput,
    /// Every allowed attempt failed.
    MaxRetriesExceeded,
    /// The generator signalled an error.
    GeneratorCallFailed,
    /// Memory for a diagnostic copy or prompt could not be reserved.
    AllocationFailed,
    /// The document could not be converted into the requested type.
    Deserialize,
}

/// Errors that can occur during a construction run.
///
/// Every variant carries enough context (failure stage plus a truncated
/// response preview) to diagnose the problem without re-running.
#[derive(Debug, Error)]
pub enum ConstructError {
    /// The configuration was rejected before any attempt; no hook was called.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The final attempt produced an empty response.
    #[error("Generator returned an empty response for '{target}' after {attempts} attempts")]
    EmptyResponse {
        /// Target label.
        target: String,
        /// Number of attempts made.
        attempts: usize,
        /// Last raw response (whitespace only), kept for diagnostics.
        raw_output: Option<String>,
        /// History of all failed attempts.
        history: Vec<AttemptRecord>,
        /// Metrics tracked across all attempts.
        metrics: ConstructMetrics,
    },

    /// Every allowed attempt failed to produce an acceptable document.
    #[error(
        "Construction of '{target}' failed after {attempts} attempts (max: {max_attempts}): {last_error}"
    )]
    MaxRetriesExceeded {
        /// Target label.
        target: String,
        /// Number of attempts made.
        attempts: usize,
        /// Maximum attempts allowed.
        max_attempts: usize,
        /// Failure of the last attempt.
        last_error: AttemptFailure,
        /// Last raw generator response, never parsed further.
        raw_output: Option<String>,
        /// History of all failed attempts.
        history: Vec<AttemptRecord>,
        /// Metrics tracked across all attempts.
        metrics: ConstructMetrics,
    },

    /// Memory could not be reserved; the run was stopped without retrying.
    #[error("Allocation failed while {stage} at attempt {attempts}")]
    AllocationFailed {
        /// What the engine was doing.
        stage: &'static str,
        /// Attempts made so far.
        attempts: usize,
    },

    /// The constructed document did not match the requested Rust type.
    #[error("Deserialization to target type failed at attempt {attempts}: {message}")]
    Deserialize {
        /// Deserializer message.
        message: String,
        /// Serialized document that failed to deserialize.
        raw_text: String,
        /// Attempt that produced the document.
        attempts: usize,
    },
}

impl ConstructError {
    /// Coarse error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::InvalidConfiguration,
            Self::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            Self::MaxRetriesExceeded { .. } => ErrorKind::MaxRetriesExceeded,
            Self::AllocationFailed { .. } => ErrorKind::AllocationFailed,
            Self::Deserialize { .. } => ErrorKind::Deserialize,
        }
    }

    /// Number of attempts made before the error was returned.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        match self {
            Self::InvalidConfig(_) => 0,
            Self::EmptyResponse { attempts, .. }
            | Self::MaxRetriesExceeded { attempts, .. }
            | Self::AllocationFailed { attempts, .. }
            | Self::Deserialize { attempts, .. } => *attempts,
        }
    }

    /// The last raw generator response, when one was retained.
    #[must_use]
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::EmptyResponse { raw_output, .. }
            | Self::MaxRetriesExceeded { raw_output, .. } => raw_output.as_deref(),
            _ => None,
        }
    }

    /// Failed attempt history, empty for pre-flight and allocation errors.
    #[must_use]
    pub fn history(&self) -> &[AttemptRecord] {
        match self {
            Self::EmptyResponse { history, .. } | Self::MaxRetriesExceeded { history, .. } => {
                history
            }
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_failure_kinds() {
        assert_eq!(AttemptFailure::Empty.kind(), ErrorKind::EmptyResponse);
        assert_eq!(
            AttemptFailure::Generator {
                message: "down".into()
            }
            .kind(),
            ErrorKind::GeneratorCallFailed
        );
        assert_eq!(
            AttemptFailure::Rejected {
                errors: vec![],
                document: Value::Null
            }
            .kind(),
            ErrorKind::InvalidStructuredOutput
        );
    }

    #[test]
    fn test_max_retries_message_includes_last_error() {
        let err = ConstructError::MaxRetriesExceeded {
            target: "user".into(),
            attempts: 3,
            max_attempts: 3,
            last_error: AttemptFailure::Parse {
                reason: "verbatim: expected value".into(),
                stages: "verbatim: expected value".into(),
            },
            raw_output: Some("nope".into()),
            history: Vec::new(),
            metrics: ConstructMetrics::default(),
        };
        let message = err.to_string();
        assert!(message.contains("'user'"));
        assert!(message.contains("3 attempts (max: 3)"));
        assert!(message.contains("Parse failure: verbatim: expected value"));
        assert_eq!(err.kind(), ErrorKind::MaxRetriesExceeded);
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.raw_output(), Some("nope"));
    }

    #[test]
    fn test_invalid_config_has_zero_attempts() {
        let err = ConstructError::InvalidConfig("base prompt is empty".into());
        assert_eq!(err.attempts(), 0);
        assert!(err.history().is_empty());
        assert_eq!(err.raw_output(), None);
    }
}
