//! A [`Generator`] backed by an external command.

use llm_construct::{Generator, GeneratorError};
use tokio::runtime::{Builder, Runtime};

use crate::error::CliError;
use crate::process::run_command;
use crate::types::CommandSpec;

/// Runs a command per attempt and returns its standard output.
///
/// The construction loop is synchronous, so the generator owns a
/// current-thread runtime and blocks on each subprocess call. The command's
/// timeout bounds how long a hung generator can stall an attempt.
pub struct CommandGenerator {
    spec: CommandSpec,
    runtime: Runtime,
}

impl CommandGenerator {
    /// Creates a generator for `spec`.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Io` if the runtime cannot be built.
    pub fn new(spec: CommandSpec) -> Result<Self, CliError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { spec, runtime })
    }

    /// The command this generator runs.
    #[must_use]
    pub const fn spec(&self) -> &CommandSpec {
        &self.spec
    }
}

impl std::fmt::Debug for CommandGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGenerator")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.runtime
            .block_on(run_command(&self.spec, prompt))
            .map(|result| result.stdout)
            .map_err(|e| GeneratorError::new(e.to_string()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_becomes_response() {
        let spec = CommandSpec::new(
            "sh",
            vec!["-c".to_string(), "cat >/dev/null; echo '{\"ok\": true}'".to_string()],
        );
        let generator = CommandGenerator::new(spec).unwrap();
        assert_eq!(generator.generate("prompt").unwrap().trim(), "{\"ok\": true}");
    }

    #[test]
    fn test_failure_becomes_generator_error() {
        let spec = CommandSpec::new("sh", vec!["-c".to_string(), "exit 7".to_string()]);
        let generator = CommandGenerator::new(spec).unwrap();
        let err = generator.generate("prompt").unwrap_err();
        assert!(err.to_string().contains("non-zero status: 7"));
    }
}
