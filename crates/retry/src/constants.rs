// Default parameters for retry strategies
use std::time::Duration;

/// Attempt limit used by the `stop_after_attempt` mode when no explicit
/// `stop_max_attempt_number` is configured
pub const DEFAULT_STOP_MAX_ATTEMPT_NUMBER: u32 = 5;

/// Delay limit used by the `stop_after_delay` mode when no explicit
/// `stop_max_delay` is configured
pub const DEFAULT_STOP_MAX_DELAY: Duration = Duration::from_millis(100);

/// Default delay for the `fixed_sleep` mode
pub const DEFAULT_WAIT_FIXED: Duration = Duration::from_millis(1000);

/// Default lower bound for the `random_sleep` mode
pub const DEFAULT_WAIT_RANDOM_MIN: Duration = Duration::ZERO;

/// Default upper bound for the `random_sleep` mode
pub const DEFAULT_WAIT_RANDOM_MAX: Duration = Duration::from_millis(1000);

/// Default starting delay for the `incrementing_sleep` mode
pub const DEFAULT_WAIT_INCREMENTING_START: Duration = Duration::ZERO;

/// Default per-attempt increment for the `incrementing_sleep` mode
pub const DEFAULT_WAIT_INCREMENTING_INCREMENT: Duration = Duration::from_millis(100);

/// Default multiplier for the `exponential_sleep` mode
pub const DEFAULT_WAIT_EXPONENTIAL_MULTIPLIER: Duration = Duration::from_millis(1);

/// Upper bound applied to computed waits when no explicit maximum is given
/// (2^30 - 1 milliseconds)
pub const MAX_WAIT: Duration = Duration::from_millis(1_073_741_823);

/// Exponents at or above this value overflow a `u64` millisecond count for
/// any non-zero multiplier
pub const MAX_BACKOFF_EXPONENT: u32 = 64;

/// Operation name reported by the default logger when none is configured
pub const DEFAULT_OPERATION_NAME: &str = "retry";
