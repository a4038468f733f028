//! Argument list construction for generator invocations.

use crate::types::{CommandSpec, PROMPT_PLACEHOLDER};
use std::ffi::OsString;

/// Builds the argument list for one generator call, substituting
/// [`PROMPT_PLACEHOLDER`] with `prompt` wherever it appears.
#[must_use]
pub fn build_args(prompt: &str, spec: &CommandSpec) -> Vec<OsString> {
    spec.args
        .iter()
        .map(|arg| OsString::from(arg.replace(PROMPT_PLACEHOLDER, prompt)))
        .collect()
}
