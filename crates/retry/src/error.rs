// Error types for the retry engine
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::attempt::Attempt;

/// Boxed error returned by attempt hooks
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failure raised when a stop condition fires while the last
/// outcome was still retryable.
///
/// Holds the final [`Attempt`] exactly as produced, so callers can inspect
/// whether it ended in a value or an error and how many attempts ran.
#[derive(Debug, Clone)]
pub struct RetryError<T, E> {
    last_attempt: Attempt<T, E>,
}

impl<T, E> RetryError<T, E> {
    pub(crate) fn new(last_attempt: Attempt<T, E>) -> Self {
        Self { last_attempt }
    }

    /// The attempt that was in progress when the sequence gave up
    pub fn last_attempt(&self) -> &Attempt<T, E> {
        &self.last_attempt
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        self.last_attempt.attempt_number()
    }

    /// Consume the failure and return the final attempt
    pub fn into_last_attempt(self) -> Attempt<T, E> {
        self.last_attempt
    }
}

impl<T: fmt::Debug, E: fmt::Display> fmt::Display for RetryError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RetryError[{}]", self.last_attempt)
    }
}

impl<T, E> std::error::Error for RetryError<T, E>
where
    T: fmt::Debug,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_attempt.error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Failure of a retried call
#[derive(Debug)]
pub enum ExecutionError<T, E> {
    /// The operation returned an error the policy does not retry; passed
    /// through unmodified
    Operation(E),
    /// A stop condition fired while the outcome was still retryable
    Retry(RetryError<T, E>),
    /// A before/after hook failed; hook failures are never retried
    Hook(BoxedError),
}

impl<T, E> ExecutionError<T, E> {
    /// The operation's own error, if it was propagated unmodified
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// The terminal retry failure, if the stop condition fired
    pub fn retry_error(&self) -> Option<&RetryError<T, E>> {
        match self {
            Self::Retry(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this failure came from exhausting the policy
    pub fn is_retry_error(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    /// Recover the operation's error from either an unmodified propagation or
    /// a terminal failure whose last attempt was an error.
    ///
    /// Returns `self` unchanged when no operation error is available.
    pub fn into_operation_error(self) -> Result<E, Self> {
        match self {
            Self::Operation(e) => Ok(e),
            Self::Retry(retry) => {
                retry.into_last_attempt().into_error().map_err(|a| Self::Retry(RetryError::new(a)))
            }
            Self::Hook(e) => Err(Self::Hook(e)),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Display> fmt::Display for ExecutionError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(e) => write!(f, "{e}"),
            Self::Retry(e) => write!(f, "{e}"),
            Self::Hook(e) => write!(f, "Attempt hook failed: {e}"),
        }
    }
}

impl<T, E> std::error::Error for ExecutionError<T, E>
where
    T: fmt::Debug + 'static,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Operation(e) => e.source(),
            Self::Retry(e) => Some(e),
            Self::Hook(e) => Some(e.as_ref()),
        }
    }
}

impl<T, E> From<RetryError<T, E>> for ExecutionError<T, E> {
    fn from(err: RetryError<T, E>) -> Self {
        Self::Retry(err)
    }
}

/// Result type for retried calls
pub type ExecutionResult<T, E> = Result<T, ExecutionError<T, E>>;

/// Invalid retry policy, reported when the policy is built or loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Stop mode name outside the legacy set
    #[error("Unknown stop mode '{0}' (expected never_stop, stop_after_attempt or stop_after_delay)")]
    UnknownStopMode(String),

    /// Wait mode name outside the legacy set
    #[error("Unknown wait mode '{0}' (expected no_sleep, fixed_sleep, random_sleep, incrementing_sleep or exponential_sleep)")]
    UnknownWaitMode(String),

    /// Random wait bounds with `min > max`
    #[error("Random wait minimum {min:?} exceeds maximum {max:?}")]
    InvalidRandomRange { min: Duration, max: Duration },

    /// Attempt limit of zero
    #[error("stop_max_attempt_number must be at least 1")]
    ZeroAttemptLimit,

    /// Setting value that does not parse
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    /// Settings file could not be read
    #[error("Failed to read retry settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is neither `.toml` nor `.json`
    #[error("Unsupported settings file extension for {0} (expected .toml or .json)")]
    UnsupportedFormat(String),

    /// Malformed TOML settings
    #[cfg(feature = "serde")]
    #[error("Failed to parse TOML retry settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON settings
    #[cfg(feature = "serde")]
    #[error("Failed to parse JSON retry settings: {0}")]
    Json(#[from] serde_json::Error),
}
