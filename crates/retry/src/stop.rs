//! Stop strategies
//!
//! A [`StopStrategy`] decides, from the attempt number and the delay since
//! the first attempt, whether a retryable outcome should end the sequence.
//! Several primitive conditions combine into [`StopStrategy::Any`], which
//! stops as soon as **any** member fires.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{DEFAULT_STOP_MAX_ATTEMPT_NUMBER, DEFAULT_STOP_MAX_DELAY};
use crate::error::ConfigError;

/// Custom stop predicate: `(attempt_number, delay_since_first_attempt) -> stop?`
pub type StopFn = Arc<dyn Fn(u32, Duration) -> bool + Send + Sync>;

/// Decides when to give up retrying
#[derive(Clone, Default)]
pub enum StopStrategy {
    /// Never stop on a retryable outcome
    #[default]
    Never,
    /// Stop once `attempt_number >= n`
    AfterAttempt(u32),
    /// Stop once the delay since the first attempt reaches the limit
    AfterDelay(Duration),
    /// Caller-supplied predicate, delegated to verbatim
    Custom(StopFn),
    /// Stop when any member strategy stops (logical OR)
    Any(Vec<StopStrategy>),
}

impl StopStrategy {
    /// Build a custom strategy from a closure
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32, Duration) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Combine strategies with logical OR.
    ///
    /// An empty list yields [`StopStrategy::Never`] and a single strategy is
    /// returned unchanged.
    pub fn any(mut strategies: Vec<StopStrategy>) -> Self {
        match strategies.len() {
            0 => Self::Never,
            1 => strategies.remove(0),
            _ => Self::Any(strategies),
        }
    }

    /// Whether the sequence should halt after `attempt_number` attempts and
    /// `delay_since_first_attempt` of elapsed time
    pub fn should_stop(&self, attempt_number: u32, delay_since_first_attempt: Duration) -> bool {
        match self {
            Self::Never => false,
            Self::AfterAttempt(max) => attempt_number >= *max,
            Self::AfterDelay(max) => delay_since_first_attempt >= *max,
            Self::Custom(f) => f(attempt_number, delay_since_first_attempt),
            Self::Any(strategies) => strategies
                .iter()
                .any(|strategy| strategy.should_stop(attempt_number, delay_since_first_attempt)),
        }
    }

    /// Resolve a legacy mode name using explicit parameters where given and
    /// the library defaults otherwise.
    pub fn from_legacy_name(
        name: &str,
        max_attempt_number: Option<u32>,
        max_delay: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let (_, build) = STOP_MODES
            .iter()
            .find(|(mode, _)| *mode == name)
            .ok_or_else(|| ConfigError::UnknownStopMode(name.to_string()))?;
        Ok(build(max_attempt_number, max_delay))
    }
}

type StopModeBuilder = fn(Option<u32>, Option<Duration>) -> StopStrategy;

/// Legacy stop mode names and the strategy each resolves to
const STOP_MODES: &[(&str, StopModeBuilder)] = &[
    ("never_stop", never_stop),
    ("stop_after_attempt", stop_after_attempt),
    ("stop_after_delay", stop_after_delay),
];

fn never_stop(_: Option<u32>, _: Option<Duration>) -> StopStrategy {
    StopStrategy::Never
}

fn stop_after_attempt(attempts: Option<u32>, _: Option<Duration>) -> StopStrategy {
    StopStrategy::AfterAttempt(attempts.unwrap_or(DEFAULT_STOP_MAX_ATTEMPT_NUMBER))
}

fn stop_after_delay(_: Option<u32>, delay: Option<Duration>) -> StopStrategy {
    StopStrategy::AfterDelay(delay.unwrap_or(DEFAULT_STOP_MAX_DELAY))
}

impl FromStr for StopStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_legacy_name(s, None, None)
    }
}

impl fmt::Debug for StopStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "Never"),
            Self::AfterAttempt(n) => f.debug_tuple("AfterAttempt").field(n).finish(),
            Self::AfterDelay(d) => f.debug_tuple("AfterDelay").field(d).finish(),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
            Self::Any(strategies) => f.debug_tuple("Any").field(strategies).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for stop strategies.
    use super::*;

    /// Validates `StopStrategy::Never` behavior for the never stop scenario.
    ///
    /// Assertions:
    /// - Ensures `!strategy.should_stop(3, 6546ms)` evaluates to true.
    #[test]
    fn test_never_stop() {
        let strategy = StopStrategy::default();
        assert!(!strategy.should_stop(3, Duration::from_millis(6546)));
        assert!(!strategy.should_stop(u32::MAX, Duration::MAX));
    }

    /// Validates `StopStrategy::AfterAttempt` behavior for the stop after
    /// attempt scenario.
    ///
    /// Assertions:
    /// - Ensures attempt 2 does not stop.
    /// - Ensures attempts 3 and 4 stop.
    #[test]
    fn test_stop_after_attempt() {
        let strategy = StopStrategy::AfterAttempt(3);
        let delay = Duration::from_millis(6546);

        assert!(!strategy.should_stop(2, delay));
        assert!(strategy.should_stop(3, delay));
        assert!(strategy.should_stop(4, delay));
    }

    /// Validates the attempt threshold for every limit up to 50: false below
    /// `n`, true at and above it.
    #[test]
    fn test_stop_after_attempt_threshold_property() {
        for n in 1..=50 {
            let strategy = StopStrategy::AfterAttempt(n);
            for attempt in 1..=60 {
                assert_eq!(
                    strategy.should_stop(attempt, Duration::ZERO),
                    attempt >= n,
                    "limit {n}, attempt {attempt}"
                );
            }
        }
    }

    /// Validates `StopStrategy::AfterDelay` behavior for the stop after delay
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures 999ms does not stop.
    /// - Ensures 1000ms and 1001ms stop.
    #[test]
    fn test_stop_after_delay() {
        let strategy = StopStrategy::AfterDelay(Duration::from_millis(1000));

        assert!(!strategy.should_stop(2, Duration::from_millis(999)));
        assert!(strategy.should_stop(2, Duration::from_millis(1000)));
        assert!(strategy.should_stop(2, Duration::from_millis(1001)));
    }

    /// Validates the delay threshold across a range of limits.
    #[test]
    fn test_stop_after_delay_threshold_property() {
        for limit in [0_u64, 1, 50, 999, 10_000] {
            let strategy = StopStrategy::AfterDelay(Duration::from_millis(limit));
            for elapsed in [0_u64, 1, 49, 50, 51, 998, 999, 1000, 9_999, 10_000, 10_001] {
                assert_eq!(
                    strategy.should_stop(1, Duration::from_millis(elapsed)),
                    elapsed >= limit,
                    "limit {limit}ms, elapsed {elapsed}ms"
                );
            }
        }
    }

    /// Validates `StopStrategy::custom` delegates verbatim.
    #[test]
    fn test_stop_func() {
        let strategy = StopStrategy::custom(|attempt, delay| {
            u128::from(attempt) == delay.as_millis()
        });

        assert!(!strategy.should_stop(1, Duration::from_millis(3)));
        assert!(!strategy.should_stop(100, Duration::from_millis(99)));
        assert!(strategy.should_stop(101, Duration::from_millis(101)));
    }

    /// Validates that a composite stops when either member fires.
    #[test]
    fn test_any_is_logical_or() {
        let strategy = StopStrategy::any(vec![
            StopStrategy::AfterAttempt(5),
            StopStrategy::AfterDelay(Duration::from_millis(100)),
        ]);

        assert!(!strategy.should_stop(4, Duration::from_millis(99)));
        assert!(strategy.should_stop(5, Duration::from_millis(0)));
        assert!(strategy.should_stop(1, Duration::from_millis(100)));
        assert!(strategy.should_stop(9, Duration::from_millis(900)));
    }

    /// Validates `StopStrategy::any` normalisation of empty and single lists.
    #[test]
    fn test_any_normalisation() {
        assert!(matches!(StopStrategy::any(Vec::new()), StopStrategy::Never));
        assert!(matches!(
            StopStrategy::any(vec![StopStrategy::AfterAttempt(2)]),
            StopStrategy::AfterAttempt(2)
        ));
    }

    /// Validates legacy mode names resolve with defaults and explicit
    /// parameters.
    #[test]
    fn test_legacy_explicit_stop_type() {
        let strategy: StopStrategy = "stop_after_attempt".parse().unwrap();
        assert!(matches!(strategy, StopStrategy::AfterAttempt(DEFAULT_STOP_MAX_ATTEMPT_NUMBER)));

        let strategy = StopStrategy::from_legacy_name("stop_after_attempt", Some(3), None).unwrap();
        assert!(strategy.should_stop(3, Duration::ZERO));

        let strategy: StopStrategy = "stop_after_delay".parse().unwrap();
        assert!(strategy.should_stop(1, DEFAULT_STOP_MAX_DELAY));

        let strategy: StopStrategy = "never_stop".parse().unwrap();
        assert!(!strategy.should_stop(1000, Duration::from_secs(1000)));
    }

    /// Validates unknown legacy names fail fast.
    #[test]
    fn test_unknown_stop_mode() {
        let err = "stop_eventually".parse::<StopStrategy>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStopMode(ref name) if name == "stop_eventually"));
    }
}
