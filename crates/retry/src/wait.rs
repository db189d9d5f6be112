//! Wait (backoff) strategies
//!
//! A [`WaitStrategy`] computes how long the engine blocks before the next
//! attempt. All arithmetic is done on whole milliseconds with saturating
//! operations, so even absurd attempt numbers clamp to the configured
//! maximum instead of overflowing.
//!
//! | Strategy | Delay for attempt `k` |
//! |----------|-----------------------|
//! | `None` | `0` |
//! | `Fixed(d)` | `d` |
//! | `Incrementing { start, increment, max }` | `min(max, start + increment * (k - 1))` |
//! | `Random { min, max }` | uniform in `[min, max]` |
//! | `Exponential { multiplier, max }` | `min(max, multiplier * 2^k)` |
//! | `Longest(..)` | largest member delay |
//! | `Jittered { inner, max_jitter }` | `inner + uniform[0, max_jitter]` |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::constants::{
    DEFAULT_WAIT_EXPONENTIAL_MULTIPLIER, DEFAULT_WAIT_FIXED, DEFAULT_WAIT_INCREMENTING_INCREMENT,
    DEFAULT_WAIT_INCREMENTING_START, DEFAULT_WAIT_RANDOM_MAX, DEFAULT_WAIT_RANDOM_MIN,
    MAX_BACKOFF_EXPONENT, MAX_WAIT,
};
use crate::error::ConfigError;

/// Custom wait function: `(attempt_number, delay_since_first_attempt) -> delay`
pub type WaitFn = Arc<dyn Fn(u32, Duration) -> Duration + Send + Sync>;

/// Computes the delay before the next attempt
#[derive(Clone, Default)]
pub enum WaitStrategy {
    /// Retry immediately
    #[default]
    None,
    /// Constant delay between attempts
    Fixed(Duration),
    /// Linear growth: `start + increment * (attempt - 1)`, capped at `max`
    Incrementing { start: Duration, increment: Duration, max: Duration },
    /// Uniformly random whole-millisecond delay in `[min, max]`
    Random { min: Duration, max: Duration },
    /// Exponential growth: `multiplier * 2^attempt`, capped at `max`
    Exponential { multiplier: Duration, max: Duration },
    /// Caller-supplied function, delegated to verbatim
    Custom(WaitFn),
    /// The longest delay produced by any member
    Longest(Vec<WaitStrategy>),
    /// Adds a uniformly random `[0, max_jitter]` to the inner delay
    Jittered { inner: Box<WaitStrategy>, max_jitter: Duration },
}

impl WaitStrategy {
    /// Build a custom strategy from a closure
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32, Duration) -> Duration + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Random delay with validation of the bounds
    pub fn random(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidRandomRange { min, max });
        }
        Ok(Self::Random { min, max })
    }

    /// Incrementing delay capped at [`MAX_WAIT`]
    pub fn incrementing(start: Duration, increment: Duration) -> Self {
        Self::Incrementing { start, increment, max: MAX_WAIT }
    }

    /// Combine strategies by taking the longest delay.
    ///
    /// An empty list yields [`WaitStrategy::None`] and a single strategy is
    /// returned unchanged.
    pub fn longest(mut strategies: Vec<WaitStrategy>) -> Self {
        match strategies.len() {
            0 => Self::None,
            1 => strategies.remove(0),
            _ => Self::Longest(strategies),
        }
    }

    /// Add random jitter on top of this strategy
    #[must_use]
    pub fn with_jitter(self, max_jitter: Duration) -> Self {
        if max_jitter.is_zero() {
            return self;
        }
        Self::Jittered { inner: Box::new(self), max_jitter }
    }

    /// Delay to block before the attempt following `attempt_number`
    pub fn delay(&self, attempt_number: u32, delay_since_first_attempt: Duration) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => *delay,
            Self::Incrementing { start, increment, max } => {
                let steps = u64::from(attempt_number.saturating_sub(1));
                let grown = as_millis(*increment).saturating_mul(steps);
                let total = as_millis(*start).saturating_add(grown);
                Duration::from_millis(total.min(as_millis(*max)))
            }
            Self::Random { min, max } => {
                random_millis(as_millis(*min), as_millis(*max))
            }
            Self::Exponential { multiplier, max } => {
                exponential_delay(*multiplier, *max, attempt_number)
            }
            Self::Custom(f) => f(attempt_number, delay_since_first_attempt),
            Self::Longest(strategies) => strategies
                .iter()
                .map(|strategy| strategy.delay(attempt_number, delay_since_first_attempt))
                .max()
                .unwrap_or(Duration::ZERO),
            Self::Jittered { inner, max_jitter } => inner
                .delay(attempt_number, delay_since_first_attempt)
                .saturating_add(random_millis(0, as_millis(*max_jitter))),
        }
    }

    /// Resolve a legacy mode name using [`WaitParameters`] for any values the
    /// caller configured and the library defaults otherwise.
    pub fn from_legacy_name(name: &str, params: &WaitParameters) -> Result<Self, ConfigError> {
        let (_, build) = WAIT_MODES
            .iter()
            .find(|(mode, _)| *mode == name)
            .ok_or_else(|| ConfigError::UnknownWaitMode(name.to_string()))?;
        build(params)
    }
}

/// Explicitly configured wait parameters, used when resolving legacy mode
/// names. `None` falls back to the library default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitParameters {
    /// Fixed wait
    pub fixed: Option<Duration>,
    /// Random wait lower bound
    pub random_min: Option<Duration>,
    /// Random wait upper bound
    pub random_max: Option<Duration>,
    /// First incrementing wait
    pub incrementing_start: Option<Duration>,
    /// Increment added per attempt
    pub incrementing_increment: Option<Duration>,
    /// Incrementing wait cap
    pub incrementing_max: Option<Duration>,
    /// Exponential multiplier
    pub exponential_multiplier: Option<Duration>,
    /// Exponential wait cap
    pub exponential_max: Option<Duration>,
}

impl WaitParameters {
    /// Compose every configured primitive into one strategy.
    ///
    /// Each family of parameters contributes a strategy when at least one of
    /// its values is set; the composite waits for the longest of them.
    pub fn compose(&self) -> Result<WaitStrategy, ConfigError> {
        let mut strategies = Vec::new();

        if self.fixed.is_some() {
            strategies.push(fixed_sleep(self)?);
        }
        if self.random_min.is_some() || self.random_max.is_some() {
            strategies.push(random_sleep(self)?);
        }
        if self.incrementing_start.is_some() || self.incrementing_increment.is_some() {
            strategies.push(incrementing_sleep(self)?);
        }
        if self.exponential_multiplier.is_some() || self.exponential_max.is_some() {
            strategies.push(exponential_sleep(self)?);
        }

        Ok(WaitStrategy::longest(strategies))
    }
}

type WaitModeBuilder = fn(&WaitParameters) -> Result<WaitStrategy, ConfigError>;

/// Legacy wait mode names and the strategy each resolves to
const WAIT_MODES: &[(&str, WaitModeBuilder)] = &[
    ("no_sleep", no_sleep),
    ("fixed_sleep", fixed_sleep),
    ("random_sleep", random_sleep),
    ("incrementing_sleep", incrementing_sleep),
    ("exponential_sleep", exponential_sleep),
];

fn no_sleep(_: &WaitParameters) -> Result<WaitStrategy, ConfigError> {
    Ok(WaitStrategy::None)
}

fn fixed_sleep(params: &WaitParameters) -> Result<WaitStrategy, ConfigError> {
    Ok(WaitStrategy::Fixed(params.fixed.unwrap_or(DEFAULT_WAIT_FIXED)))
}

fn random_sleep(params: &WaitParameters) -> Result<WaitStrategy, ConfigError> {
    WaitStrategy::random(
        params.random_min.unwrap_or(DEFAULT_WAIT_RANDOM_MIN),
        params.random_max.unwrap_or(DEFAULT_WAIT_RANDOM_MAX),
    )
}

fn incrementing_sleep(params: &WaitParameters) -> Result<WaitStrategy, ConfigError> {
    Ok(WaitStrategy::Incrementing {
        start: params.incrementing_start.unwrap_or(DEFAULT_WAIT_INCREMENTING_START),
        increment: params.incrementing_increment.unwrap_or(DEFAULT_WAIT_INCREMENTING_INCREMENT),
        max: params.incrementing_max.unwrap_or(MAX_WAIT),
    })
}

fn exponential_sleep(params: &WaitParameters) -> Result<WaitStrategy, ConfigError> {
    Ok(WaitStrategy::Exponential {
        multiplier: params.exponential_multiplier.unwrap_or(DEFAULT_WAIT_EXPONENTIAL_MULTIPLIER),
        max: params.exponential_max.unwrap_or(MAX_WAIT),
    })
}

impl FromStr for WaitStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_legacy_name(s, &WaitParameters::default())
    }
}

impl fmt::Debug for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Incrementing { start, increment, max } => f
                .debug_struct("Incrementing")
                .field("start", start)
                .field("increment", increment)
                .field("max", max)
                .finish(),
            Self::Random { min, max } => {
                f.debug_struct("Random").field("min", min).field("max", max).finish()
            }
            Self::Exponential { multiplier, max } => f
                .debug_struct("Exponential")
                .field("multiplier", multiplier)
                .field("max", max)
                .finish(),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
            Self::Longest(strategies) => f.debug_tuple("Longest").field(strategies).finish(),
            Self::Jittered { inner, max_jitter } => f
                .debug_struct("Jittered")
                .field("inner", inner)
                .field("max_jitter", max_jitter)
                .finish(),
        }
    }
}

/// `min(max, multiplier * 2^attempt)` in whole milliseconds
fn exponential_delay(multiplier: Duration, max: Duration, attempt_number: u32) -> Duration {
    let max_millis = as_millis(max);
    if attempt_number >= MAX_BACKOFF_EXPONENT {
        return if as_millis(multiplier) == 0 { Duration::ZERO } else { max };
    }

    let factor = 1_u64 << attempt_number;
    let delay_millis = as_millis(multiplier).saturating_mul(factor).min(max_millis);
    Duration::from_millis(delay_millis)
}

fn random_millis(min: u64, max: u64) -> Duration {
    if min >= max {
        return Duration::from_millis(min);
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(min..=max))
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
