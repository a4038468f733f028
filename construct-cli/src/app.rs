//! Wiring from parsed arguments to a construction run.

use std::path::Path;
use std::time::Duration;

use llm_construct::{ConstructConfig, Generator, TracingHooks, construct};
use serde_json::Value;

use crate::args::{Backoff, Cli};
use crate::discovery::discover_generator;
use crate::error::CliError;
use crate::generator::CommandGenerator;
use crate::types::CommandSpec;

/// Resolves the generator, runs the construction and renders the document.
///
/// # Errors
///
/// Returns `CliError` for unreadable input, an unresolvable generator, or a
/// failed construction run.
pub fn run(cli: &Cli) -> Result<String, CliError> {
    let (program, args) = discover_generator(&cli.command)?;
    tracing::info!(
        program = %program.display(),
        target_name = %cli.target,
        "Using generator"
    );

    let spec = CommandSpec::new(program, args).with_timeout(Duration::from_secs(cli.timeout_secs));
    let generator = CommandGenerator::new(spec)?;
    let config = build_config(cli, generator)?;

    let constructed = construct(&config)?;
    tracing::info!(
        target_name = %cli.target,
        attempts = constructed.attempts,
        stage = %constructed.stage,
        wall_time_ms = u64::try_from(constructed.metrics.wall_time.as_millis()).unwrap_or(u64::MAX),
        "Document constructed"
    );

    render(&constructed.document, cli.pretty)
}

/// Builds the construction config described by `cli` around `generator`.
///
/// # Errors
///
/// Returns `CliError::Input` when the prompt or schema cannot be read, or the
/// schema is not JSON while `--json-schema` is set, and `CliError::Construct`
/// when the JSON Schema does not compile.
pub fn build_config(
    cli: &Cli,
    generator: impl Generator + 'static,
) -> Result<ConstructConfig, CliError> {
    let prompt = read_input(cli.prompt.as_deref(), cli.prompt_file.as_deref(), "prompt")?
        .ok_or_else(|| CliError::Input("a prompt is required".to_string()))?;
    let schema = read_input(cli.schema.as_deref(), cli.schema_file.as_deref(), "schema")?;

    let delay = Duration::from_millis(cli.delay_ms);
    let mut config = ConstructConfig::new(cli.target.clone(), prompt)
        .with_generator(generator)
        .with_max_retries(cli.max_retries)
        .with_hooks(TracingHooks);
    config = match cli.backoff {
        Backoff::Fixed => config.with_delay(delay),
        Backoff::Exponential => {
            config.with_exponential_backoff(delay, Duration::from_millis(cli.max_delay_ms))
        }
    };

    match schema {
        Some(schema) if cli.json_schema => {
            let value: Value = serde_json::from_str(&schema)
                .map_err(|e| CliError::Input(format!("schema is not valid JSON: {e}")))?;
            Ok(config.with_json_schema(value)?)
        }
        Some(schema) => Ok(config.with_schema(schema)),
        None if cli.json_schema => Err(CliError::Input(
            "--json-schema requires --schema or --schema-file".to_string(),
        )),
        None => Ok(config),
    }
}

fn read_input(
    inline: Option<&str>,
    file: Option<&Path>,
    name: &str,
) -> Result<Option<String>, CliError> {
    if let Some(text) = inline {
        return Ok(Some(text.to_string()));
    }
    file.map(|path| {
        std::fs::read_to_string(path)
            .map_err(|e| CliError::Input(format!("cannot read {name} file {}: {e}", path.display())))
    })
    .transpose()
}

fn render(document: &Value, pretty: bool) -> Result<String, CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    Ok(rendered)
}
