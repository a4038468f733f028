//! Discovery and resolution of the generator executable.

use crate::error::CliError;
use std::path::PathBuf;
use which::which;

/// Environment variable that overrides the default generator binary path.
pub const GENERATOR_BIN_ENV_VAR: &str = "CONSTRUCT_GENERATOR_BIN";

/// Generator used when nothing else is configured, run in print mode.
const DEFAULT_GENERATOR: &str = "claude";

/// Locates the generator executable and its base arguments.
///
/// Resolution order:
/// 1. `command` if non-empty: its first element resolved via `$PATH` (or used
///    as-is when it is a path), the rest as arguments.
/// 2. The path in the `CONSTRUCT_GENERATOR_BIN` environment variable, no arguments.
/// 3. `claude` resolved via `$PATH`, run as `claude -p`.
///
/// # Errors
///
/// Returns `CliError::GeneratorNotFound` when no valid executable can be located.
pub fn discover_generator(command: &[String]) -> Result<(PathBuf, Vec<String>), CliError> {
    if let Some((program, args)) = command.split_first() {
        let path = which(program)
            .map_err(|e| CliError::GeneratorNotFound(format!("{program}: {e}")))?;
        return Ok((path, args.to_vec()));
    }

    if let Ok(path_str) = std::env::var(GENERATOR_BIN_ENV_VAR) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok((path, Vec::new()));
        }
        tracing::warn!(
            path = %path.display(),
            "{GENERATOR_BIN_ENV_VAR} points to a missing file, falling back to {DEFAULT_GENERATOR}"
        );
    }

    let path = which(DEFAULT_GENERATOR).map_err(|e| {
        CliError::GeneratorNotFound(format!(
            "{DEFAULT_GENERATOR}: {e}. Pass a generator command after `--` or set {GENERATOR_BIN_ENV_VAR}"
        ))
    })?;
    Ok((path, vec!["-p".to_string()]))
}
