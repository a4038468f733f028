//! Error types for the command-line driver.

use std::time::Duration;

use llm_construct::{ConstructError, ErrorKind};
use thiserror::Error;

/// Errors raised while preparing or running a construction from the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// No generator command could be resolved.
    #[error("Generator executable not found: {0}")]
    GeneratorNotFound(String),

    /// Spawning, piping or runtime setup failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The generator command did not finish in time and was killed.
    #[error("Generator timed out after {0:?}")]
    Timeout(Duration),

    /// The generator command exited unsuccessfully.
    #[error("Generator exited with non-zero status: {exit_code}\nSTDERR: {stderr}")]
    NonZeroExit {
        /// Exit code, `-1` when terminated by a signal.
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// Prompt or schema input could not be read or understood.
    #[error("Invalid input: {0}")]
    Input(String),

    /// The construction run failed.
    #[error(transparent)]
    Construct(#[from] ConstructError),

    /// The document could not be serialized for output.
    #[error("Failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// 2 invalid configuration or input, 3 empty response, 4 attempts
    /// exhausted, 5 allocation failure, 1 anything else.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Input(_) => 2,
            Self::Construct(err) => match err.kind() {
                ErrorKind::InvalidConfiguration => 2,
                ErrorKind::EmptyResponse => 3,
                ErrorKind::MaxRetriesExceeded => 4,
                ErrorKind::AllocationFailed => 5,
                _ => 1,
            },
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Input("missing prompt".into()).exit_code(), 2);
        assert_eq!(
            CliError::Construct(ConstructError::InvalidConfig("empty".into())).exit_code(),
            2
        );
        assert_eq!(
            CliError::Construct(ConstructError::AllocationFailed {
                stage: "building the corrective prompt",
                attempts: 1
            })
            .exit_code(),
            5
        );
        assert_eq!(CliError::Timeout(Duration::from_secs(1)).exit_code(), 1);
    }
}
