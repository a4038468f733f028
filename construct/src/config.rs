//! Configuration for a construction run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use schemars::{JsonSchema, schema_for};
use serde_json::Value;

use crate::error::ConstructError;
use crate::generator::Generator;
use crate::hooks::{ConstructHooks, ErrorCallback};
use crate::validate::{DocumentValidator, JsonSchemaValidator};

/// Default number of characters of a previous response quoted in a corrective prompt.
pub const DEFAULT_PREVIEW_LIMIT: usize = 500;

/// Wait applied between a failed attempt and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDelay {
    /// The same wait before every retry.
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`.
    Exponential {
        /// Wait before the first retry.
        base: Duration,
        /// Upper bound for any single wait.
        max: Duration,
    },
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::Fixed(Duration::ZERO)
    }
}

impl RetryDelay {
    /// The wait before retry number `retry` (1-indexed: the first retry is 1).
    #[must_use]
    pub fn before_retry(&self, retry: usize) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX).min(30);
                base.saturating_mul(2u32.saturating_pow(exponent)).min(max)
            }
        }
    }
}

/// Configuration for a construction run. Read-only once the run starts.
///
/// A configuration without a generator or with a blank base prompt is rejected
/// before any attempt is made.
///
/// # Examples
///
/// ```
/// use llm_construct::ConstructConfig;
/// use std::time::Duration;
///
/// let config = ConstructConfig::new("user", "Return a user object")
///     .with_schema("{\"name\":\"string\"}")
///     .with_generator(|_prompt: &str| Ok::<_, String>("{\"name\":\"Ann\"}".to_string()))
///     .with_max_retries(2)
///     .with_delay(Duration::from_millis(10));
/// assert_eq!(config.max_attempts(), 3);
/// ```
#[derive(Clone)]
pub struct ConstructConfig {
    /// Label used in logs, hooks and error messages only.
    pub target_name: String,
    /// The request sent to the generator.
    pub base_prompt: String,
    /// Schema description embedded verbatim in the prompt.
    pub schema: Option<String>,
    /// The text producer.
    pub generator: Option<Arc<dyn Generator>>,
    /// Retries after the first attempt; 0 means exactly one attempt.
    pub max_retries: usize,
    /// Wait policy between attempts.
    pub retry_delay: RetryDelay,
    /// Side-channel notified at each retry boundary and at final failure.
    pub on_error: Option<Arc<dyn ErrorCallback>>,
    /// Lifecycle instrumentation.
    pub hooks: Option<Arc<dyn ConstructHooks>>,
    /// Acceptance check for parsed documents.
    pub validator: Option<Arc<dyn DocumentValidator>>,
    /// Characters of a previous response quoted in corrective prompts.
    pub preview_limit: usize,
}

impl Default for ConstructConfig {
    fn default() -> Self {
        Self {
            target_name: "document".to_string(),
            base_prompt: String::new(),
            schema: None,
            generator: None,
            max_retries: 2,
            retry_delay: RetryDelay::default(),
            on_error: None,
            hooks: None,
            validator: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl fmt::Debug for ConstructConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructConfig")
            .field("target_name", &self.target_name)
            .field("base_prompt", &self.base_prompt)
            .field("schema", &self.schema)
            .field("generator", &self.generator.is_some())
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("on_error", &self.on_error.is_some())
            .field("hooks", &self.hooks.is_some())
            .field("validator", &self.validator.is_some())
            .field("preview_limit", &self.preview_limit)
            .finish()
    }
}

impl ConstructConfig {
    /// Creates a configuration for `target_name` with default retry settings.
    #[must_use]
    pub fn new(target_name: impl Into<String>, base_prompt: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            base_prompt: base_prompt.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration whose schema is derived from `T`.
    ///
    /// The derived JSON Schema is embedded in the prompt and every parsed
    /// document is validated against it.
    ///
    /// # Errors
    ///
    /// Returns `ConstructError::InvalidConfig` if the derived schema cannot be compiled.
    pub fn for_type<T: JsonSchema>(
        target_name: impl Into<String>,
        base_prompt: impl Into<String>,
    ) -> Result<Self, ConstructError> {
        let schema = serde_json::to_value(schema_for!(T))
            .map_err(|e| ConstructError::InvalidConfig(format!("Schema derivation failed: {e}")))?;
        Self::new(target_name, base_prompt).with_json_schema(schema)
    }

    /// Sets the generator.
    #[must_use]
    pub fn with_generator(mut self, generator: impl Generator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Sets a shared generator.
    #[must_use]
    pub fn with_shared_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Sets the schema description embedded in the prompt.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Embeds `schema` in the prompt and validates parsed documents against it.
    ///
    /// # Errors
    ///
    /// Returns `ConstructError::InvalidConfig` if `schema` is not a valid JSON Schema.
    pub fn with_json_schema(mut self, schema: Value) -> Result<Self, ConstructError> {
        let description =
            serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
        let validator = JsonSchemaValidator::new(schema)
            .map_err(|e| ConstructError::InvalidConfig(format!("Schema error: {e}")))?;
        self.schema = Some(description);
        self.validator = Some(Arc::new(validator));
        Ok(self)
    }

    /// Sets the maximum number of retries after the first attempt.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets a fixed wait between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = RetryDelay::Fixed(delay);
        self
    }

    /// Sets an exponential wait between attempts.
    #[must_use]
    pub fn with_exponential_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_delay = RetryDelay::Exponential { base, max };
        self
    }

    /// Sets the error side-channel.
    #[must_use]
    pub fn with_error_callback(mut self, callback: impl ErrorCallback + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Sets the lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl ConstructHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Sets a document validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl DocumentValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Sets how many characters of a previous response are quoted on retry.
    #[must_use]
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// Total attempts allowed: `max_retries + 1`.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Checks the configuration and returns its generator.
    ///
    /// # Errors
    ///
    /// Returns `ConstructError::InvalidConfig` when the generator is missing or
    /// the base prompt is blank.
    pub fn validate(&self) -> Result<&Arc<dyn Generator>, ConstructError> {
        if self.base_prompt.trim().is_empty() {
            return Err(ConstructError::InvalidConfig(format!(
                "base prompt for '{}' is empty",
                self.target_name
            )));
        }
        self.generator.as_ref().ok_or_else(|| {
            ConstructError::InvalidConfig(format!(
                "no generator configured for '{}'",
                self.target_name
            ))
        })
    }
}
