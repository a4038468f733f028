//! Command-line driver for `llm-construct`.
//!
//! Runs any text-generating command (an LLM CLI, a script, a local model
//! wrapper) as the generator of a construction run, and prints the resulting
//! JSON document.

/// Wiring from parsed arguments to a construction run.
pub mod app;
/// Command-line arguments.
pub mod args;
/// Argument list construction for generator invocations.
pub mod cmd;
/// Discovery and resolution of the generator executable.
pub mod discovery;
/// Error types returned by the driver.
pub mod error;
/// The command-backed generator.
pub mod generator;
/// Subprocess execution with output capture and timeouts.
pub mod process;
/// Shared data types for command configuration and results.
pub mod types;

pub use app::{build_config, run};
pub use args::{Backoff, Cli};
pub use discovery::{discover_generator, GENERATOR_BIN_ENV_VAR};
pub use error::CliError;
pub use generator::CommandGenerator;
pub use process::run_command;
pub use types::*;
