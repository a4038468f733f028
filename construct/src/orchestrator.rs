//! The bounded retry loop with corrective feedback.
//!
//! One run moves through `Init → Attempting → {Success | Retrying → Attempting | Exhausted}`.
//! Attempts are strictly sequential and the run makes at most
//! `max_retries + 1` generator calls. Every failure ends up in the returned
//! `Result`; nothing is retained once the call returns.

use std::collections::TryReserveError;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ConstructConfig;
use crate::error::{AttemptFailure, AttemptRecord, ConstructError};
use crate::extract::{ExtractFailure, ExtractStage, extract_document};
use crate::feedback::{build_corrective_prompt, build_initial_prompt};
use crate::generator::Generator;
use crate::hooks::{AttemptEvent, ConstructHooks};
use crate::metrics::ConstructMetrics;
use crate::validate::DocumentValidator;

/// A successfully constructed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Constructed {
    /// The parsed (and, if configured, validated) document.
    pub document: Value,
    /// Attempt that produced the document (1-indexed).
    pub attempts: usize,
    /// Extraction path that located the document.
    pub stage: ExtractStage,
    /// Metrics tracked across all attempts.
    pub metrics: ConstructMetrics,
}

enum AttemptOutcome {
    Success(Value, ExtractStage),
    Failed {
        failure: AttemptFailure,
        raw: Option<String>,
    },
}

/// Runs the construction loop described by `config`.
///
/// Blocks the calling thread for the duration of every generator call and
/// every inter-attempt delay.
///
/// # Errors
///
/// - `ConstructError::InvalidConfig` before any attempt if the generator is
///   missing or the base prompt is blank. No hook is called.
/// - `ConstructError::EmptyResponse` if the final attempt produced no text.
/// - `ConstructError::MaxRetriesExceeded` if the final attempt failed to parse,
///   was rejected, or the generator failed.
/// - `ConstructError::AllocationFailed` if memory for a diagnostic copy or a
///   corrective prompt could not be reserved. Never retried, and no hook or
///   callback fires.
///
/// # Examples
///
/// ```
/// use llm_construct::{construct, ConstructConfig};
///
/// let config = ConstructConfig::new("user", "Return a user object")
///     .with_schema("{\"name\":\"string\"}")
///     .with_generator(|_: &str| Ok::<_, String>("Sure! ```json\n{\"name\":\"Ann\"}\n```".to_string()));
///
/// let constructed = construct(&config).unwrap();
/// assert_eq!(constructed.document["name"], "Ann");
/// assert_eq!(constructed.attempts, 1);
/// ```
pub fn construct(config: &ConstructConfig) -> Result<Constructed, ConstructError> {
    let generator = config.validate()?;

    let target = config.target_name.as_str();
    let max_attempts = config.max_attempts();
    let hooks = config.hooks.as_deref();
    let validator = config.validator.as_deref();

    let start = Instant::now();
    let mut metrics = ConstructMetrics::default();
    let mut history: Vec<AttemptRecord> = Vec::new();

    let initial_prompt = build_initial_prompt(&config.base_prompt, config.schema.as_deref());
    let mut corrective_prompt: Option<String> = None;
    let mut attempt = 1;

    loop {
        let event = AttemptEvent {
            target,
            attempt,
            max_attempts,
        };
        let prompt = corrective_prompt.as_deref().unwrap_or(&initial_prompt);

        if let Some(hooks) = hooks {
            hooks.on_attempt_start(&event);
        }
        tracing::debug!(target_name = target, attempt, max_attempts, "Invoking generator");

        metrics.record_prompt(prompt);
        let (failure, raw) = match run_attempt(generator, prompt, validator, &mut metrics) {
            AttemptOutcome::Success(document, stage) => {
                if let Some(hooks) = hooks {
                    hooks.on_attempt_success(&event);
                }
                tracing::debug!(target_name = target, attempt, %stage, "Document constructed");

                metrics.total_attempts = attempt;
                metrics.wall_time = start.elapsed();
                return Ok(Constructed {
                    document,
                    attempts: attempt,
                    stage,
                    metrics,
                });
            }
            AttemptOutcome::Failed { failure, raw } => (failure, raw),
        };

        let message = failure.to_string();

        if attempt < max_attempts {
            // Reserve before notifying so an allocation failure fires no callbacks.
            let next_prompt = or_allocation_failed(
                build_corrective_prompt(
                    &initial_prompt,
                    &failure,
                    raw.as_deref(),
                    attempt,
                    max_attempts,
                    config.preview_limit,
                ),
                "building the corrective prompt",
                attempt,
            )?;

            if let Some(hooks) = hooks {
                hooks.on_attempt_retry(&event, &message);
            }
            if let Some(on_error) = &config.on_error {
                on_error.on_error(target, attempt, &message);
            }
            tracing::warn!(
                target_name = target,
                attempt,
                max_attempts,
                error = %message,
                "Attempt failed, retrying"
            );

            let delay = config.retry_delay.before_retry(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            corrective_prompt = Some(next_prompt);
            history.push(AttemptRecord {
                attempt_number: attempt,
                failure,
                raw_output: raw,
                elapsed: start.elapsed(),
            });
            attempt += 1;
            continue;
        }

        let retained = or_allocation_failed(
            raw.as_deref().map(duplicate).transpose(),
            "retaining the raw response",
            attempt,
        )?;

        if let Some(hooks) = hooks {
            hooks.on_final_failure(target, attempt, &message);
        }
        if let Some(on_error) = &config.on_error {
            on_error.on_error(target, attempt, &message);
        }
        tracing::error!(
            target_name = target,
            attempts = attempt,
            error = %message,
            "Construction failed, attempts exhausted"
        );

        history.push(AttemptRecord {
            attempt_number: attempt,
            failure: failure.clone(),
            raw_output: retained,
            elapsed: start.elapsed(),
        });

        metrics.total_attempts = attempt;
        metrics.wall_time = start.elapsed();

        return Err(match failure {
            AttemptFailure::Empty => ConstructError::EmptyResponse {
                target: target.to_string(),
                attempts: attempt,
                raw_output: raw,
                history,
                metrics,
            },
            last_error => ConstructError::MaxRetriesExceeded {
                target: target.to_string(),
                attempts: attempt,
                max_attempts,
                last_error,
                raw_output: raw,
                history,
                metrics,
            },
        });
    }
}

/// Runs [`construct`] and deserializes the document into `T`.
///
/// # Errors
///
/// Everything [`construct`] returns, plus `ConstructError::Deserialize` when
/// the document does not fit `T`.
pub fn construct_typed<T: DeserializeOwned>(
    config: &ConstructConfig,
) -> Result<(T, ConstructMetrics), ConstructError> {
    let constructed = construct(config)?;

    let typed = T::deserialize(&constructed.document).map_err(|e| ConstructError::Deserialize {
        message: e.to_string(),
        raw_text: constructed.document.to_string(),
        attempts: constructed.attempts,
    })?;

    Ok((typed, constructed.metrics))
}

fn run_attempt(
    generator: &Arc<dyn Generator>,
    prompt: &str,
    validator: Option<&dyn DocumentValidator>,
    metrics: &mut ConstructMetrics,
) -> AttemptOutcome {
    let response = match generator.generate(prompt) {
        Ok(response) => response,
        Err(e) => {
            return AttemptOutcome::Failed {
                failure: AttemptFailure::Generator { message: e.0 },
                raw: None,
            };
        }
    };
    metrics.record_response(&response);

    let failure = match extract_document(&response) {
        Ok(extracted) => {
            let errors = validator.map(|v| v.validate(&extracted.value)).unwrap_or_default();
            if errors.is_empty() {
                return AttemptOutcome::Success(extracted.value, extracted.stage);
            }
            AttemptFailure::Rejected {
                errors,
                document: extracted.value,
            }
        }
        Err(ExtractFailure::Empty) => AttemptFailure::Empty,
        Err(ExtractFailure::Parse { reason, stages }) => AttemptFailure::Parse { reason, stages },
    };

    AttemptOutcome::Failed {
        failure,
        raw: Some(response),
    }
}

fn duplicate(text: &str) -> Result<String, TryReserveError> {
    let mut copy = String::new();
    copy.try_reserve_exact(text.len())?;
    copy.push_str(text);
    Ok(copy)
}

/// Maps a failed reservation to `ConstructError::AllocationFailed`.
fn or_allocation_failed<T>(
    result: Result<T, TryReserveError>,
    stage: &'static str,
    attempts: usize,
) -> Result<T, ConstructError> {
    result.map_err(|e| {
        tracing::error!(stage, attempts, error = %e, "Allocation failed, aborting construction");
        ConstructError::AllocationFailed { stage, attempts }
    })
}
