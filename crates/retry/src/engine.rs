//! Retry engine
//!
//! [`Retrying`] drives an operation under a [`RetryConfig`]. Each call owns a
//! fresh `RetryContext`; the configuration itself is shared and never
//! mutated, so one `Retrying` can serve many concurrent callers.
//!
//! Per attempt the engine runs, in order: before-hook, operation,
//! after-hook, logger, classification. A retryable outcome is checked
//! against the stop strategy; if the sequence continues, the wait strategy
//! picks the delay and the engine sleeps (skipped for a zero delay).
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use pulsearc_retry::{RetryConfig, Retrying};
//!
//! let config = RetryConfig::<u32, String>::builder()
//!     .stop_after_attempt(3)
//!     .wait_fixed(Duration::from_millis(1))
//!     .build()?;
//! let retrying = Retrying::new(config);
//!
//! let mut calls = 0;
//! let value = retrying.call(|| {
//!     calls += 1;
//!     if calls < 3 { Err(format!("attempt {calls} failed")) } else { Ok(calls) }
//! });
//!
//! assert_eq!(value.ok(), Some(3));
//! # Ok::<(), pulsearc_retry::ConfigError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::attempt::{Attempt, ErrorTrace};
use crate::config::RetryConfig;
use crate::error::{ExecutionError, ExecutionResult, RetryError};

/// Outcome of a retried call including summary statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Value or failure of the call
    pub result: ExecutionResult<T, E>,
    /// Number of attempts made (0 if the first before-hook failed)
    pub attempts: u32,
    /// Sum of the delays the engine waited between attempts
    pub total_delay: Duration,
    /// Time from the first attempt to completion
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result
    pub fn into_result(self) -> ExecutionResult<T, E> {
        self.result
    }

    /// Whether the call produced an accepted value
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-call retry state
#[derive(Debug, Clone)]
struct RetryContext {
    /// Number of the attempt about to run or just completed (1-based)
    attempt_number: u32,
    start_time: Instant,
    total_delay: Duration,
    /// Attempts that actually ran
    completed: u32,
}

impl RetryContext {
    fn new(start_time: Instant) -> Self {
        Self { attempt_number: 1, start_time, total_delay: Duration::ZERO, completed: 0 }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    fn advance(&mut self, delay: Duration) {
        self.total_delay = self.total_delay.saturating_add(delay);
        self.attempt_number = self.attempt_number.saturating_add(1);
    }

    fn finish<T, E>(&self, result: ExecutionResult<T, E>, now: Instant) -> RetryOutcome<T, E> {
        RetryOutcome {
            result,
            attempts: self.completed,
            total_delay: self.total_delay,
            elapsed: self.elapsed_at(now),
        }
    }
}

/// What the engine does after an attempt
enum Step<T, E> {
    Accept(T),
    Propagate(E),
    Stop(RetryError<T, E>),
    Wait(Duration),
}

/// Retry engine bound to one policy
pub struct Retrying<T, E> {
    config: Arc<RetryConfig<T, E>>,
}

impl<T, E> Retrying<T, E> {
    /// Create an engine for `config`
    pub fn new(config: RetryConfig<T, E>) -> Self {
        Self { config: Arc::new(config) }
    }

    /// The policy this engine applies
    pub fn config(&self) -> &RetryConfig<T, E> {
        &self.config
    }

    /// Run `operation` until its outcome is accepted, a non-retryable error
    /// occurs, or the stop strategy fires
    ///
    /// # Errors
    /// - [`ExecutionError::Operation`] with the unmodified error if it is not
    ///   retryable
    /// - [`ExecutionError::Retry`] holding the last attempt if the policy
    ///   gave up
    /// - [`ExecutionError::Hook`] if a before/after hook failed
    pub fn call<F>(&self, operation: F) -> ExecutionResult<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.call_with_outcome(operation).into_result()
    }

    /// [`Retrying::call`] plus summary statistics
    pub fn call_with_outcome<F>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let clock = self.config.clock();
        let mut context = RetryContext::new(clock.now());

        loop {
            if let Err(e) = self.config.run_before(context.attempt_number) {
                return context.finish(Err(ExecutionError::Hook(e)), clock.now());
            }

            let outcome = operation();
            context.completed = context.attempt_number;

            let delay = match self.complete_attempt(&context, outcome) {
                Ok(delay) => delay,
                Err(result) => return context.finish(result, clock.now()),
            };

            if !delay.is_zero() {
                self.config.sleeper().sleep(delay);
            }
            context.advance(delay);
        }
    }

    /// Async variant of [`Retrying::call`]; delays use `tokio::time::sleep`
    ///
    /// # Errors
    /// Same as [`Retrying::call`].
    #[cfg(feature = "async")]
    pub async fn call_async<F, Fut>(&self, operation: F) -> ExecutionResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.call_async_with_outcome(operation).await.into_result()
    }

    /// Async variant of [`Retrying::call_with_outcome`]
    #[cfg(feature = "async")]
    pub async fn call_async_with_outcome<F, Fut>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let clock = self.config.clock();
        let mut context = RetryContext::new(clock.now());

        loop {
            if let Err(e) = self.config.run_before(context.attempt_number) {
                return context.finish(Err(ExecutionError::Hook(e)), clock.now());
            }

            let outcome = operation().await;
            context.completed = context.attempt_number;

            let delay = match self.complete_attempt(&context, outcome) {
                Ok(delay) => delay,
                Err(result) => return context.finish(result, clock.now()),
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            context.advance(delay);
        }
    }

    /// Wrap `operation` so every invocation runs under this policy.
    ///
    /// Arguments are cloned for each attempt.
    pub fn wrap<A, F>(&self, operation: F) -> impl Fn(A) -> ExecutionResult<T, E>
    where
        A: Clone,
        F: Fn(A) -> Result<T, E>,
    {
        let retrying = self.clone();
        move |args: A| retrying.call(|| operation(args.clone()))
    }

    /// Record the outcome, run the after-hook and logger, then decide.
    ///
    /// `Ok(delay)` means retry after `delay`; `Err(result)` ends the call.
    fn complete_attempt(
        &self,
        context: &RetryContext,
        outcome: Result<T, E>,
    ) -> Result<Duration, ExecutionResult<T, E>> {
        let trace = (self.config.wrap_error() && outcome.is_err()).then(ErrorTrace::capture);
        let elapsed = context.elapsed_at(self.config.clock().now());
        let attempt = Attempt::new(outcome, context.attempt_number, elapsed, trace);

        if let Err(e) = self.config.run_after(context.attempt_number) {
            return Err(Err(ExecutionError::Hook(e)));
        }
        if let Some(logger) = self.config.logger() {
            logger.log_attempt(&attempt);
        }

        match self.decide(attempt) {
            Step::Accept(value) => Err(Ok(value)),
            Step::Propagate(error) => Err(Err(ExecutionError::Operation(error))),
            Step::Stop(retry) => Err(Err(ExecutionError::Retry(retry))),
            Step::Wait(delay) => Ok(delay),
        }
    }

    fn decide(&self, attempt: Attempt<T, E>) -> Step<T, E> {
        if !self.config.classifier().should_retry(&attempt) {
            return match attempt.into_result() {
                Ok(value) => Step::Accept(value),
                Err(error) => Step::Propagate(error),
            };
        }

        let attempt_number = attempt.attempt_number();
        let elapsed = attempt.elapsed();
        if self.config.stop().should_stop(attempt_number, elapsed) {
            return Step::Stop(RetryError::new(attempt));
        }

        Step::Wait(self.config.wait().delay(attempt_number, elapsed))
    }
}

impl<T, E> Clone for Retrying<T, E> {
    fn clone(&self) -> Self {
        Self { config: Arc::clone(&self.config) }
    }
}

impl<T, E> From<RetryConfig<T, E>> for Retrying<T, E> {
    fn from(config: RetryConfig<T, E>) -> Self {
        Self::new(config)
    }
}

impl<T, E> Default for Retrying<T, E> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<T, E> std::fmt::Debug for Retrying<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrying").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the retry engine.
    use std::cell::Cell;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::config::RetryConfigBuilder;
    use crate::time::MockClock;

    fn builder(clock: &MockClock) -> RetryConfigBuilder<Option<bool>, io::Error> {
        RetryConfig::builder().clock(clock.clone()).sleeper(clock.clone())
    }

    /// Validates `Retrying::call` behavior for the first attempt success
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the value is returned after exactly one call.
    /// - Ensures no sleep happened.
    #[test]
    fn test_success_first_attempt() {
        let clock = MockClock::new();
        let retrying = Retrying::new(builder(&clock).stop_after_attempt(3).build().unwrap());
        let calls = Cell::new(0);

        let result = retrying.call(|| {
            calls.set(calls.get() + 1);
            Ok(Some(true))
        });

        assert_eq!(result.unwrap(), Some(true));
        assert_eq!(calls.get(), 1);
        assert!(clock.sleeps().is_empty());
    }

    /// Validates the loop sleeps the fixed delay between retries and measures
    /// elapsed time with the injected clock.
    #[test]
    fn test_fixed_wait_between_attempts() {
        let clock = MockClock::new();
        let retrying = Retrying::new(
            builder(&clock)
                .retry_on_result(Option::is_none)
                .wait_fixed(Duration::from_millis(50))
                .build()
                .unwrap(),
        );
        let calls = Cell::new(0);

        let outcome = retrying.call_with_outcome(|| {
            calls.set(calls.get() + 1);
            Ok(if calls.get() > 5 { Some(true) } else { None })
        });

        assert_eq!(outcome.result.unwrap(), Some(true));
        assert_eq!(outcome.attempts, 6);
        assert_eq!(outcome.total_delay, Duration::from_millis(250));
        assert_eq!(outcome.elapsed, Duration::from_millis(250));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(50); 5]);
    }

    /// Validates a retryable value that exhausts the attempt limit ends in
    /// `RetryError` holding the last value.
    #[test]
    fn test_stop_on_retryable_value() {
        let clock = MockClock::new();
        let retrying = Retrying::new(
            builder(&clock).retry_on_result(Option::is_none).stop_after_attempt(3).build().unwrap(),
        );

        let err = retrying.call(|| Ok(None)).unwrap_err();
        let retry = err.retry_error().unwrap();

        assert_eq!(retry.attempts(), 3);
        assert!(!retry.last_attempt().has_error());
        assert_eq!(retry.last_attempt().value(), Some(&None));
    }

    /// Validates non-retryable errors propagate unmodified after one call,
    /// with no stop check and no wait.
    #[test]
    fn test_non_retryable_error_propagates() {
        let clock = MockClock::new();
        let retrying = Retrying::new(
            builder(&clock)
                .retry_on_error_kinds([io::ErrorKind::TimedOut])
                .stop_after_attempt(3)
                .wait_fixed(Duration::from_millis(10))
                .wrap_error(true)
                .build()
                .unwrap(),
        );
        let calls = Cell::new(0);

        let err = retrying
            .call(|| {
                calls.set(calls.get() + 1);
                Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt frame"))
            })
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        let error = err.operation_error().unwrap();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert_eq!(error.to_string(), "corrupt frame");
        assert!(clock.sleeps().is_empty());
    }

    /// Validates the delay stop is checked against the injected clock.
    #[test]
    fn test_stop_after_delay_uses_clock() {
        let clock = MockClock::new();
        let retrying = Retrying::new(
            builder(&clock)
                .stop_after_delay(Duration::from_millis(100))
                .wait_fixed(Duration::from_millis(30))
                .build()
                .unwrap(),
        );

        let err = retrying.call(|| Err(io::Error::other("unavailable"))).unwrap_err();
        let retry = err.retry_error().unwrap();

        // 0, 30, 60, 90 → continue; 120 ≥ 100 → stop on the fifth attempt
        assert_eq!(retry.attempts(), 5);
        assert_eq!(retry.last_attempt().elapsed(), Duration::from_millis(120));
    }

    /// Validates hooks and logger run once per attempt in order.
    ///
    /// Assertions:
    /// - Confirms the event sequence is before, after, log for each attempt.
    #[test]
    fn test_side_effect_order() {
        let clock = MockClock::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let (before, after, log) = (Arc::clone(&events), Arc::clone(&events), Arc::clone(&events));

        let retrying = Retrying::new(
            builder(&clock)
                .stop_after_attempt(2)
                .before_attempt(move |n| {
                    before.lock().unwrap().push(format!("before {n}"));
                    Ok(())
                })
                .after_attempt(move |n| {
                    after.lock().unwrap().push(format!("after {n}"));
                    Ok(())
                })
                .logger(move |attempt: &Attempt<Option<bool>, io::Error>| {
                    log.lock().unwrap().push(format!("log {}", attempt.attempt_number()));
                })
                .build()
                .unwrap(),
        );

        let _ = retrying.call(|| Err(io::Error::other("down")));

        assert_eq!(
            *events.lock().unwrap(),
            vec!["before 1", "after 1", "log 1", "before 2", "after 2", "log 2"]
        );
    }

    /// Validates a failing hook ends the call without retrying.
    #[test]
    fn test_hook_failure_is_not_retried() {
        let clock = MockClock::new();
        let retrying = Retrying::new(
            builder(&clock)
                .before_attempt(|n| if n == 2 { Err("quota exceeded".into()) } else { Ok(()) })
                .build()
                .unwrap(),
        );
        let calls = Cell::new(0);

        let outcome = retrying.call_with_outcome(|| {
            calls.set(calls.get() + 1);
            Err(io::Error::other("down"))
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.result, Err(ExecutionError::Hook(ref e)) if e.to_string() == "quota exceeded"));
    }

    /// Validates an after-hook failure ends the call once the operation ran.
    ///
    /// Assertions:
    /// - Confirms the operation ran exactly twice and both attempts counted.
    /// - Ensures the logger never saw the attempt whose after-hook failed.
    #[test]
    fn test_after_hook_failure_is_not_retried() {
        let clock = MockClock::new();
        let logged = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&logged);
        let retrying = Retrying::new(
            builder(&clock)
                .after_attempt(|n| if n == 2 { Err("audit log unavailable".into()) } else { Ok(()) })
                .logger(move |attempt: &Attempt<Option<bool>, io::Error>| {
                    sink.lock().unwrap().push(attempt.attempt_number());
                })
                .build()
                .unwrap(),
        );
        let calls = Cell::new(0);

        let outcome = retrying.call_with_outcome(|| {
            calls.set(calls.get() + 1);
            Err(io::Error::other("down"))
        });

        assert_eq!(calls.get(), 2);
        assert_eq!(outcome.attempts, 2);
        assert!(matches!(
            outcome.result,
            Err(ExecutionError::Hook(ref e)) if e.to_string() == "audit log unavailable"
        ));
        assert_eq!(*logged.lock().unwrap(), vec![1]);
    }

    /// Validates `Retrying::wrap` applies the policy per invocation.
    #[test]
    fn test_wrap() {
        let clock = MockClock::new();
        let retrying: Retrying<u32, io::Error> = Retrying::new(
            RetryConfig::builder()
                .clock(clock.clone())
                .sleeper(clock.clone())
                .stop_after_attempt(5)
                .build()
                .unwrap(),
        );
        let calls = AtomicU32::new(0);

        let fetch = retrying.wrap(|base: u32| {
            if calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(io::Error::other("flaky"))
            } else {
                Ok(base * 2)
            }
        });

        assert_eq!(fetch(21).unwrap(), 42);
        assert_eq!(fetch(5).unwrap(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    /// Validates one engine serves concurrent callers with independent
    /// attempt counters.
    #[test]
    fn test_concurrent_calls_are_independent() {
        let retrying: Retrying<u32, io::Error> = Retrying::new(
            RetryConfig::builder().stop_after_attempt(4).build().unwrap(),
        );

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8_u32)
                .map(|worker| {
                    let retrying = retrying.clone();
                    scope.spawn(move || {
                        let mut calls = 0;
                        let outcome = retrying.call_with_outcome(|| {
                            calls += 1;
                            if calls < 3 { Err(io::Error::other("busy")) } else { Ok(worker) }
                        });
                        (worker, outcome.attempts, outcome.result.ok())
                    })
                })
                .collect();

            for handle in handles {
                let (worker, attempts, value) = handle.join().unwrap();
                assert_eq!(attempts, 3);
                assert_eq!(value, Some(worker));
            }
        });
    }
}
