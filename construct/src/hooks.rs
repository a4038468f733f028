//! Lifecycle instrumentation for construction attempts.
//!
//! Hooks are observers only: they run synchronously on the thread driving the
//! retry loop and have no way to abort or redirect it. Every method has a no-op
//! default, so implementors only override the events they care about.

use std::fmt;
use std::sync::Arc;

/// Identifies the attempt a hook is being notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptEvent<'a> {
    /// Label of the structure being constructed.
    pub target: &'a str,
    /// The attempt number (1-indexed).
    pub attempt: usize,
    /// Total attempts allowed (`max_retries + 1`).
    pub max_attempts: usize,
}

/// Observer for the construction lifecycle.
///
/// Per attempt, `on_attempt_start` fires once, followed by exactly one of
/// `on_attempt_success` or `on_attempt_retry`, except on the final failed
/// attempt where `on_final_failure` fires instead of a retry.
pub trait ConstructHooks: Send + Sync {
    /// Called before the generator is invoked.
    fn on_attempt_start(&self, _event: &AttemptEvent<'_>) {}

    /// Called when the attempt produced a usable document.
    fn on_attempt_success(&self, _event: &AttemptEvent<'_>) {}

    /// Called when the attempt failed and another attempt will follow.
    fn on_attempt_retry(&self, _event: &AttemptEvent<'_>, _error: &str) {}

    /// Called once when all attempts are exhausted.
    fn on_final_failure(&self, _target: &str, _total_attempts: usize, _last_error: &str) {}
}

impl<T: ConstructHooks + ?Sized> ConstructHooks for Arc<T> {
    fn on_attempt_start(&self, event: &AttemptEvent<'_>) {
        (**self).on_attempt_start(event);
    }

    fn on_attempt_success(&self, event: &AttemptEvent<'_>) {
        (**self).on_attempt_success(event);
    }

    fn on_attempt_retry(&self, event: &AttemptEvent<'_>, error: &str) {
        (**self).on_attempt_retry(event, error);
    }

    fn on_final_failure(&self, target: &str, total_attempts: usize, last_error: &str) {
        (**self).on_final_failure(target, total_attempts, last_error);
    }
}

type EventFn = Arc<dyn Fn(&AttemptEvent<'_>) + Send + Sync>;
type RetryFn = Arc<dyn Fn(&AttemptEvent<'_>, &str) + Send + Sync>;
type FailureFn = Arc<dyn Fn(&str, usize, &str) + Send + Sync>;

/// A hook set made of four independent, optional closure slots.
///
/// Unset slots are skipped.
///
/// # Examples
///
/// ```
/// use llm_construct::hooks::HookSet;
///
/// let hooks = HookSet::new()
///     .on_retry(|event, error| eprintln!("{} attempt {}: {error}", event.target, event.attempt));
/// ```
#[derive(Clone, Default)]
pub struct HookSet {
    attempt_start: Option<EventFn>,
    attempt_success: Option<EventFn>,
    attempt_retry: Option<RetryFn>,
    final_failure: Option<FailureFn>,
}

impl HookSet {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt-start slot.
    #[must_use]
    pub fn on_start(mut self, f: impl Fn(&AttemptEvent<'_>) + Send + Sync + 'static) -> Self {
        self.attempt_start = Some(Arc::new(f));
        self
    }

    /// Sets the attempt-success slot.
    #[must_use]
    pub fn on_success(mut self, f: impl Fn(&AttemptEvent<'_>) + Send + Sync + 'static) -> Self {
        self.attempt_success = Some(Arc::new(f));
        self
    }

    /// Sets the attempt-retry slot.
    #[must_use]
    pub fn on_retry(mut self, f: impl Fn(&AttemptEvent<'_>, &str) + Send + Sync + 'static) -> Self {
        self.attempt_retry = Some(Arc::new(f));
        self
    }

    /// Sets the final-failure slot.
    #[must_use]
    pub fn on_failure(mut self, f: impl Fn(&str, usize, &str) + Send + Sync + 'static) -> Self {
        self.final_failure = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("attempt_start", &self.attempt_start.is_some())
            .field("attempt_success", &self.attempt_success.is_some())
            .field("attempt_retry", &self.attempt_retry.is_some())
            .field("final_failure", &self.final_failure.is_some())
            .finish()
    }
}

impl ConstructHooks for HookSet {
    fn on_attempt_start(&self, event: &AttemptEvent<'_>) {
        if let Some(f) = &self.attempt_start {
            f(event);
        }
    }

    fn on_attempt_success(&self, event: &AttemptEvent<'_>) {
        if let Some(f) = &self.attempt_success {
            f(event);
        }
    }

    fn on_attempt_retry(&self, event: &AttemptEvent<'_>, error: &str) {
        if let Some(f) = &self.attempt_retry {
            f(event, error);
        }
    }

    fn on_final_failure(&self, target: &str, total_attempts: usize, last_error: &str) {
        if let Some(f) = &self.final_failure {
            f(target, total_attempts, last_error);
        }
    }
}

/// Hooks that forward every lifecycle event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl ConstructHooks for TracingHooks {
    fn on_attempt_start(&self, event: &AttemptEvent<'_>) {
        tracing::info!(
            target_name = event.target,
            attempt = event.attempt,
            max_attempts = event.max_attempts,
            "Construction attempt started"
        );
    }

    fn on_attempt_success(&self, event: &AttemptEvent<'_>) {
        tracing::info!(
            target_name = event.target,
            attempt = event.attempt,
            "Construction attempt succeeded"
        );
    }

    fn on_attempt_retry(&self, event: &AttemptEvent<'_>, error: &str) {
        tracing::warn!(
            target_name = event.target,
            attempt = event.attempt,
            max_attempts = event.max_attempts,
            error,
            "Construction attempt failed, retrying"
        );
    }

    fn on_final_failure(&self, target: &str, total_attempts: usize, last_error: &str) {
        tracing::error!(
            target_name = target,
            total_attempts,
            last_error,
            "Construction failed"
        );
    }
}

/// Side-channel notification fired at each retry boundary and at final failure.
///
/// Independent from [`ConstructHooks`]; meant for plain error logging.
pub trait ErrorCallback: Send + Sync {
    /// Receives the target label, the failed attempt number and the failure description.
    fn on_error(&self, target: &str, attempt: usize, message: &str);
}

impl<F> ErrorCallback for F
where
    F: Fn(&str, usize, &str) + Send + Sync,
{
    fn on_error(&self, target: &str, attempt: usize, message: &str) {
        self(target, attempt, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_hook_set_skips_unset_slots() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hooks = HookSet::new().on_retry(move |event, error| {
            sink.lock().unwrap().push(format!("{}#{}: {error}", event.target, event.attempt));
        });

        let event = AttemptEvent {
            target: "user",
            attempt: 1,
            max_attempts: 3,
        };
        hooks.on_attempt_start(&event);
        hooks.on_attempt_success(&event);
        hooks.on_attempt_retry(&event, "bad json");
        hooks.on_final_failure("user", 3, "bad json");

        assert_eq!(*seen.lock().unwrap(), vec!["user#1: bad json".to_string()]);
    }

    #[test]
    fn test_hook_set_debug_reports_slots() {
        let hooks = HookSet::new().on_start(|_| {});
        let debug = format!("{hooks:?}");
        assert!(debug.contains("attempt_start: true"));
        assert!(debug.contains("final_failure: false"));
    }

    #[test]
    fn test_error_callback_closure() {
        let seen = Mutex::new(None);
        let callback = |target: &str, attempt: usize, message: &str| {
            *seen.lock().unwrap() = Some(format!("{target}/{attempt}/{message}"));
        };
        callback.on_error("report", 2, "empty");
        assert_eq!(seen.lock().unwrap().as_deref(), Some("report/2/empty"));
    }
}
