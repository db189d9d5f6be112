//! Retry policy configuration
//!
//! A [`RetryConfig`] is immutable once built and can be shared by any number
//! of concurrent calls. It is assembled with [`RetryConfigBuilder`], which
//! records the options the caller set and resolves them in
//! [`RetryConfigBuilder::build`]:
//!
//! - **stop**: a custom strategy wins, then a legacy mode name, then the
//!   logical OR of every configured limit (never stop if none is set)
//! - **wait**: a custom strategy wins, then a legacy mode name, then the
//!   longest of every configured wait family plus optional jitter (no wait
//!   if none is set)
//!
//! Invalid combinations fail in `build()`, never at call time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{Classifier, ErrorKind, ErrorPredicate, ResultPredicate};
use crate::error::{BoxedError, ConfigError};
use crate::logging::{AttemptLogger, TracingLogger};
use crate::settings::RetrySettings;
use crate::stop::StopStrategy;
use crate::time::{Clock, Sleeper, SystemClock, ThreadSleeper};
use crate::wait::{WaitParameters, WaitStrategy};

/// Hook run around each attempt with the 1-based attempt number
pub type AttemptHook = Arc<dyn Fn(u32) -> Result<(), BoxedError> + Send + Sync>;

/// Shared attempt sink
pub type SharedLogger<T, E> = Arc<dyn AttemptLogger<T, E>>;

/// Immutable retry policy
pub struct RetryConfig<T, E> {
    stop: StopStrategy,
    wait: WaitStrategy,
    classifier: Classifier<T, E>,
    wrap_error: bool,
    before_attempt: Option<AttemptHook>,
    after_attempt: Option<AttemptHook>,
    logger: Option<SharedLogger<T, E>>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E> RetryConfig<T, E> {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder<T, E> {
        RetryConfigBuilder::new()
    }

    /// Resolved stop strategy
    pub fn stop(&self) -> &StopStrategy {
        &self.stop
    }

    /// Resolved wait strategy
    pub fn wait(&self) -> &WaitStrategy {
        &self.wait
    }

    /// Outcome classifier
    pub fn classifier(&self) -> &Classifier<T, E> {
        &self.classifier
    }

    /// Whether error attempts capture location information
    pub fn wrap_error(&self) -> bool {
        self.wrap_error
    }

    /// Whether attempts are reported to a logger
    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    pub(crate) fn run_before(&self, attempt_number: u32) -> Result<(), BoxedError> {
        self.before_attempt.as_ref().map_or(Ok(()), |hook| hook(attempt_number))
    }

    pub(crate) fn run_after(&self, attempt_number: u32) -> Result<(), BoxedError> {
        self.after_attempt.as_ref().map_or(Ok(()), |hook| hook(attempt_number))
    }

    pub(crate) fn logger(&self) -> Option<&dyn AttemptLogger<T, E>> {
        self.logger.as_deref()
    }
}

impl<T, E> Default for RetryConfig<T, E> {
    /// Never stop, never wait, retry every error, accept every value
    fn default() -> Self {
        Self {
            stop: StopStrategy::Never,
            wait: WaitStrategy::None,
            classifier: Classifier::default(),
            wrap_error: false,
            before_attempt: None,
            after_attempt: None,
            logger: None,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(ThreadSleeper),
        }
    }
}

impl<T, E> Clone for RetryConfig<T, E> {
    fn clone(&self) -> Self {
        Self {
            stop: self.stop.clone(),
            wait: self.wait.clone(),
            classifier: self.classifier.clone(),
            wrap_error: self.wrap_error,
            before_attempt: self.before_attempt.clone(),
            after_attempt: self.after_attempt.clone(),
            logger: self.logger.clone(),
            clock: Arc::clone(&self.clock),
            sleeper: Arc::clone(&self.sleeper),
        }
    }
}

impl<T, E> fmt::Debug for RetryConfig<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("stop", &self.stop)
            .field("wait", &self.wait)
            .field("classifier", &self.classifier)
            .field("wrap_error", &self.wrap_error)
            .field("before_attempt", &self.before_attempt.is_some())
            .field("after_attempt", &self.after_attempt.is_some())
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryConfig`] with fluent API
pub struct RetryConfigBuilder<T, E> {
    stop_mode: Option<String>,
    stop_max_attempt_number: Option<u32>,
    stop_max_delay: Option<Duration>,
    stop_strategy: Option<StopStrategy>,
    wait_mode: Option<String>,
    wait: WaitParameters,
    wait_jitter_max: Option<Duration>,
    wait_strategy: Option<WaitStrategy>,
    retry_on_result: Option<ResultPredicate<T>>,
    retry_on_error: ErrorPredicate<E>,
    wrap_error: bool,
    before_attempt: Option<AttemptHook>,
    after_attempt: Option<AttemptHook>,
    logger: Option<SharedLogger<T, E>>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E> Default for RetryConfigBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> RetryConfigBuilder<T, E> {
    /// Start from the default policy: never stop, never wait, retry every error
    pub fn new() -> Self {
        Self {
            stop_mode: None,
            stop_max_attempt_number: None,
            stop_max_delay: None,
            stop_strategy: None,
            wait_mode: None,
            wait: WaitParameters::default(),
            wait_jitter_max: None,
            wait_strategy: None,
            retry_on_result: None,
            retry_on_error: ErrorPredicate::Always,
            wrap_error: false,
            before_attempt: None,
            after_attempt: None,
            logger: None,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Stop once `attempts` attempts have been made
    pub fn stop_after_attempt(mut self, attempts: u32) -> Self {
        self.stop_max_attempt_number = Some(attempts);
        self
    }

    /// Stop once `delay` has passed since the first attempt
    pub fn stop_after_delay(mut self, delay: Duration) -> Self {
        self.stop_max_delay = Some(delay);
        self
    }

    /// Use an explicit stop strategy, ignoring every other stop option
    pub fn stop_when(mut self, strategy: StopStrategy) -> Self {
        self.stop_strategy = Some(strategy);
        self
    }

    /// Use a custom stop function `(attempt_number, delay) -> stop?`
    pub fn stop_with<F>(self, f: F) -> Self
    where
        F: Fn(u32, Duration) -> bool + Send + Sync + 'static,
    {
        self.stop_when(StopStrategy::custom(f))
    }

    /// Select a stop strategy by legacy name (`never_stop`,
    /// `stop_after_attempt`, `stop_after_delay`)
    pub fn stop_mode(mut self, name: impl Into<String>) -> Self {
        self.stop_mode = Some(name.into());
        self
    }

    /// Wait a constant delay between attempts
    pub fn wait_fixed(mut self, delay: Duration) -> Self {
        self.wait.fixed = Some(delay);
        self
    }

    /// Wait a random delay in `[min, max]`
    pub fn wait_random(mut self, min: Duration, max: Duration) -> Self {
        self.wait.random_min = Some(min);
        self.wait.random_max = Some(max);
        self
    }

    /// Wait a random delay in `[0, max]`
    pub fn wait_random_max(mut self, max: Duration) -> Self {
        self.wait.random_max = Some(max);
        self
    }

    /// Wait `start + increment * (attempt - 1)`
    pub fn wait_incrementing(mut self, start: Duration, increment: Duration) -> Self {
        self.wait.incrementing_start = Some(start);
        self.wait.incrementing_increment = Some(increment);
        self
    }

    /// Cap incrementing waits
    pub fn wait_incrementing_max(mut self, max: Duration) -> Self {
        self.wait.incrementing_max = Some(max);
        self
    }

    /// Wait `min(max, multiplier * 2^attempt)`
    pub fn wait_exponential(mut self, multiplier: Duration, max: Duration) -> Self {
        self.wait.exponential_multiplier = Some(multiplier);
        self.wait.exponential_max = Some(max);
        self
    }

    /// Add up to `max` of random jitter to composed waits
    pub fn wait_jitter_max(mut self, max: Duration) -> Self {
        self.wait_jitter_max = Some(max);
        self
    }

    /// Use an explicit wait strategy, ignoring every other wait option
    pub fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.wait_strategy = Some(strategy);
        self
    }

    /// Use a custom wait function `(attempt_number, delay) -> wait`
    pub fn wait_with<F>(self, f: F) -> Self
    where
        F: Fn(u32, Duration) -> Duration + Send + Sync + 'static,
    {
        self.wait_strategy(WaitStrategy::custom(f))
    }

    /// Select a wait strategy by legacy name (`no_sleep`, `fixed_sleep`,
    /// `random_sleep`, `incrementing_sleep`, `exponential_sleep`)
    pub fn wait_mode(mut self, name: impl Into<String>) -> Self {
        self.wait_mode = Some(name.into());
        self
    }

    /// Retry when a returned value satisfies `predicate`
    pub fn retry_on_result<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.retry_on_result = Some(Arc::new(predicate));
        self
    }

    /// Retry only errors satisfying `predicate`
    pub fn retry_on_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_on_error = ErrorPredicate::function(predicate);
        self
    }

    /// Retry only errors whose kind is listed
    pub fn retry_on_error_kinds<I>(mut self, kinds: I) -> Self
    where
        E: ErrorKind + 'static,
        I: IntoIterator<Item = E::Kind>,
    {
        self.retry_on_error = ErrorPredicate::kinds(kinds);
        self
    }

    /// Capture location information on error attempts
    pub fn wrap_error(mut self, wrap: bool) -> Self {
        self.wrap_error = wrap;
        self
    }

    /// Run `hook` before each attempt; a hook error ends the call
    pub fn before_attempt<F>(mut self, hook: F) -> Self
    where
        F: Fn(u32) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        self.before_attempt = Some(Arc::new(hook));
        self
    }

    /// Run `hook` after each attempt; a hook error ends the call
    pub fn after_attempt<F>(mut self, hook: F) -> Self
    where
        F: Fn(u32) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        self.after_attempt = Some(Arc::new(hook));
        self
    }

    /// Report every attempt to `logger`
    pub fn logger<L>(mut self, logger: L) -> Self
    where
        L: AttemptLogger<T, E> + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Report every attempt to an already shared logger
    pub fn shared_logger(mut self, logger: SharedLogger<T, E>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Disable attempt logging
    pub fn without_logger(mut self) -> Self {
        self.logger = None;
        self
    }

    /// Source of time for elapsed-delay measurements
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Primitive used to block between attempts
    pub fn sleeper(mut self, sleeper: impl Sleeper) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Resolve and validate the policy
    pub fn build(self) -> Result<RetryConfig<T, E>, ConfigError> {
        if self.stop_max_attempt_number == Some(0) {
            return Err(ConfigError::ZeroAttemptLimit);
        }

        let stop = match (self.stop_strategy, self.stop_mode.as_deref()) {
            (Some(strategy), _) => strategy,
            (None, Some(name)) => StopStrategy::from_legacy_name(
                name,
                self.stop_max_attempt_number,
                self.stop_max_delay,
            )?,
            (None, None) => {
                let mut limits = Vec::new();
                if let Some(attempts) = self.stop_max_attempt_number {
                    limits.push(StopStrategy::AfterAttempt(attempts));
                }
                if let Some(delay) = self.stop_max_delay {
                    limits.push(StopStrategy::AfterDelay(delay));
                }
                StopStrategy::any(limits)
            }
        };

        let wait = match (self.wait_strategy, self.wait_mode.as_deref()) {
            (Some(strategy), _) => strategy,
            (None, Some(name)) => WaitStrategy::from_legacy_name(name, &self.wait)?,
            (None, None) => {
                self.wait.compose()?.with_jitter(self.wait_jitter_max.unwrap_or(Duration::ZERO))
            }
        };

        Ok(RetryConfig {
            stop,
            wait,
            classifier: Classifier::new(self.retry_on_result, self.retry_on_error),
            wrap_error: self.wrap_error,
            before_attempt: self.before_attempt,
            after_attempt: self.after_attempt,
            logger: self.logger,
            clock: self.clock,
            sleeper: self.sleeper,
        })
    }
}

impl<T, E> RetryConfigBuilder<T, E>
where
    T: fmt::Debug,
    E: fmt::Display,
{
    /// Toggle the default `tracing` logger
    pub fn use_default_logger(self, enabled: bool) -> Self {
        if enabled {
            self.logger(TracingLogger::default())
        } else {
            self.without_logger()
        }
    }

    /// Log attempts through `tracing`, tagged with `operation_name`
    pub fn tracing_logger(self, operation_name: impl Into<String>) -> Self {
        self.logger(TracingLogger::new(operation_name))
    }

    /// Apply every option present in `settings`; absent options are left
    /// untouched
    pub fn with_settings(mut self, settings: &RetrySettings) -> Self {
        if let Some(name) = &settings.stop {
            self.stop_mode = Some(name.clone());
        }
        if let Some(name) = &settings.wait {
            self.wait_mode = Some(name.clone());
        }
        if let Some(attempts) = settings.stop_max_attempt_number {
            self.stop_max_attempt_number = Some(attempts);
        }

        let millis = |value: Option<u64>| value.map(Duration::from_millis);
        self.stop_max_delay = millis(settings.stop_max_delay).or(self.stop_max_delay);
        self.wait.fixed = millis(settings.wait_fixed).or(self.wait.fixed);
        self.wait.random_min = millis(settings.wait_random_min).or(self.wait.random_min);
        self.wait.random_max = millis(settings.wait_random_max).or(self.wait.random_max);
        self.wait.incrementing_start =
            millis(settings.wait_incrementing_start).or(self.wait.incrementing_start);
        self.wait.incrementing_increment =
            millis(settings.wait_incrementing_increment).or(self.wait.incrementing_increment);
        self.wait.incrementing_max =
            millis(settings.wait_incrementing_max).or(self.wait.incrementing_max);
        self.wait.exponential_multiplier =
            millis(settings.wait_exponential_multiplier).or(self.wait.exponential_multiplier);
        self.wait.exponential_max =
            millis(settings.wait_exponential_max).or(self.wait.exponential_max);
        self.wait_jitter_max = millis(settings.wait_jitter_max).or(self.wait_jitter_max);

        if let Some(wrap) = settings.wrap_error {
            self.wrap_error = wrap;
        }
        match settings.logger {
            Some(enabled) => self.use_default_logger(enabled),
            None => self,
        }
    }
}

impl<T, E> fmt::Debug for RetryConfigBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfigBuilder")
            .field("stop_mode", &self.stop_mode)
            .field("stop_max_attempt_number", &self.stop_max_attempt_number)
            .field("stop_max_delay", &self.stop_max_delay)
            .field("stop_strategy", &self.stop_strategy)
            .field("wait_mode", &self.wait_mode)
            .field("wait", &self.wait)
            .field("wait_jitter_max", &self.wait_jitter_max)
            .field("wait_strategy", &self.wait_strategy)
            .field("retry_on_error", &self.retry_on_error)
            .field("wrap_error", &self.wrap_error)
            .finish_non_exhaustive()
    }
}
