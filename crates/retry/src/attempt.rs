//! Attempt records
//!
//! An [`Attempt`] is the immutable snapshot of one invocation of the retried
//! operation: its outcome (value or error), its 1-based ordinal within the
//! sequence, and the time elapsed since the sequence started.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Captured location information for an error outcome.
///
/// Only recorded when the policy enables `wrap_error`. The backtrace is
/// taken at the point the engine captured the error and follows the usual
/// `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE` rules, so it may be disabled.
#[derive(Debug, Clone)]
pub struct ErrorTrace {
    backtrace: Arc<Backtrace>,
}

impl ErrorTrace {
    pub(crate) fn capture() -> Self {
        Self { backtrace: Arc::new(Backtrace::capture()) }
    }

    /// The captured backtrace
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Whether frames were actually captured
    pub fn is_captured(&self) -> bool {
        self.backtrace.status() == BacktraceStatus::Captured
    }
}

/// Outcome of a single attempt within a retry sequence
#[derive(Debug, Clone)]
pub struct Attempt<T, E> {
    outcome: Result<T, E>,
    attempt_number: u32,
    elapsed: Duration,
    trace: Option<ErrorTrace>,
}

impl<T, E> Attempt<T, E> {
    /// Record an outcome. `trace` is only kept for error outcomes.
    pub(crate) fn new(
        outcome: Result<T, E>,
        attempt_number: u32,
        elapsed: Duration,
        trace: Option<ErrorTrace>,
    ) -> Self {
        let trace = if outcome.is_err() { trace } else { None };
        Self { outcome, attempt_number, elapsed, trace }
    }

    /// 1-based ordinal of this attempt within its sequence
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Time since the first attempt started, measured when this attempt
    /// completed
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// [`Attempt::elapsed`] in whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether the operation returned an error
    pub fn has_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// The returned value, if the attempt succeeded
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The returned error, if the attempt failed
    pub fn error(&self) -> Option<&E> {
        self.outcome.as_ref().err()
    }

    /// Type name of the operation's error type, if the attempt failed
    pub fn error_type(&self) -> Option<&'static str> {
        self.has_error().then(std::any::type_name::<E>)
    }

    /// Location information captured for an error outcome
    pub fn trace(&self) -> Option<&ErrorTrace> {
        self.trace.as_ref()
    }

    /// Borrow the raw outcome
    pub fn outcome(&self) -> &Result<T, E> {
        &self.outcome
    }

    /// Consume the record and return the raw outcome
    pub fn into_result(self) -> Result<T, E> {
        self.outcome
    }

    /// Take the error out of a failed attempt; value attempts are returned
    /// unchanged
    pub fn into_error(self) -> Result<E, Self> {
        match self.outcome {
            Err(error) => Ok(error),
            Ok(value) => Err(Self {
                outcome: Ok(value),
                attempt_number: self.attempt_number,
                elapsed: self.elapsed,
                trace: self.trace,
            }),
        }
    }
}

impl<T, E: fmt::Display> Attempt<T, E> {
    /// Rendered error message, if the attempt failed
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}

impl<T: fmt::Debug, E: fmt::Display> fmt::Display for Attempt<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(value) => write!(f, "Attempts: {}, Value: {:?}", self.attempt_number, value),
            Err(error) => {
                write!(f, "Attempts: {}, Error: {}", self.attempt_number, error)?;
                match &self.trace {
                    Some(trace) if trace.is_captured() => {
                        write!(f, "\n{}", trace.backtrace())
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for attempt records.
    use super::*;

    /// Validates accessors for a value outcome.
    ///
    /// Assertions:
    /// - Ensures `!attempt.has_error()` evaluates to true.
    /// - Confirms `attempt.value()` equals `Some(&None)`.
    /// - Confirms the rendered form names the attempt number and value.
    #[test]
    fn test_value_attempt() {
        let attempt: Attempt<Option<bool>, String> =
            Attempt::new(Ok(None), 3, Duration::from_millis(1500), Some(ErrorTrace::capture()));

        assert!(!attempt.has_error());
        assert_eq!(attempt.value(), Some(&None));
        assert!(attempt.error().is_none());
        assert!(attempt.error_type().is_none());
        assert!(attempt.trace().is_none(), "value outcomes never carry a trace");
        assert_eq!(attempt.attempt_number(), 3);
        assert_eq!(attempt.elapsed_ms(), 1500);
        assert_eq!(attempt.to_string(), "Attempts: 3, Value: None");
    }

    /// Validates accessors for an error outcome.
    #[test]
    fn test_error_attempt() {
        let attempt: Attempt<(), std::io::Error> = Attempt::new(
            Err(std::io::Error::other("Hi there, I'm an IOError")),
            2,
            Duration::ZERO,
            None,
        );

        assert!(attempt.has_error());
        assert!(attempt.value().is_none());
        assert_eq!(attempt.error_message().as_deref(), Some("Hi there, I'm an IOError"));
        assert!(attempt.error_type().is_some_and(|name| name.contains("io")));
        assert_eq!(attempt.to_string(), "Attempts: 2, Error: Hi there, I'm an IOError");
        assert!(attempt.into_result().is_err());
    }

    /// Validates an error outcome keeps its trace token.
    #[test]
    fn test_error_attempt_keeps_trace() {
        let attempt: Attempt<(), String> =
            Attempt::new(Err("boom".to_string()), 1, Duration::ZERO, Some(ErrorTrace::capture()));

        assert!(attempt.trace().is_some());
        assert!(attempt.to_string().starts_with("Attempts: 1, Error: boom"));
    }
}
