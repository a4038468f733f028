//! Resilient structured-output construction from unreliable generators.
//!
//! A generator (typically an LLM call) is asked for a JSON document. Its
//! response is searched for the document (markdown fences, a string-aware
//! bracket scan, then the whole text), and every failure is fed back in a
//! corrective prompt until the attempt budget runs out:
//!
//! - [`construct`] - Synchronous, bounded retry loop with corrective feedback
//! - [`extract_document`] - Pure extraction of JSON from free-form text
//! - [`ConstructConfig`] - Prompt, generator, retry and instrumentation settings
//! - [`ConstructHooks`] - Per-attempt lifecycle callbacks
//! - [`ConstructError`] - Typed error enum with attempt history
//!
//! ## Example
//!
//! ```
//! use llm_construct::prelude::*;
//!
//! let config = ConstructConfig::new("user", "Return a user object")
//!     .with_max_retries(2)
//!     .with_hooks(TracingHooks)
//!     .with_generator(|_prompt: &str| {
//!         Ok::<_, String>("Here it is: {\"name\": \"Ann\"} Anything else?".to_string())
//!     });
//!
//! let constructed = construct(&config)?;
//! assert_eq!(constructed.document["name"], "Ann");
//! # Ok::<(), ConstructError>(())
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod generator;
pub mod hooks;
pub mod metrics;
pub mod orchestrator;
pub mod validate;

pub use config::{ConstructConfig, RetryDelay};
pub use error::{AttemptFailure, AttemptRecord, ConstructError, ErrorKind};
pub use extract::{ExtractFailure, ExtractStage, Extracted, extract_document};
pub use generator::{Generator, GeneratorError};
pub use hooks::{AttemptEvent, ConstructHooks, ErrorCallback, HookSet, TracingHooks};
pub use metrics::{ConstructMetrics, estimate_tokens};
pub use orchestrator::{Constructed, construct, construct_typed};
pub use validate::{DocumentValidator, JsonSchemaValidator};

/// Common types for ergonomic usage.
pub mod prelude {
    pub use crate::config::{ConstructConfig, RetryDelay};
    pub use crate::error::{ConstructError, ErrorKind};
    pub use crate::generator::{Generator, GeneratorError};
    pub use crate::hooks::{ConstructHooks, HookSet, TracingHooks};
    pub use crate::orchestrator::{Constructed, construct, construct_typed};
}
