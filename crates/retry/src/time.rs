//! Time abstraction for the retry engine
//!
//! The engine never reads the system clock or blocks the thread directly.
//! Both go through the [`Clock`] and [`Sleeper`] seams so that production
//! code uses real time while tests can drive a [`MockClock`] that advances
//! instantly whenever the engine "sleeps".
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use pulsearc_retry::time::{Clock, MockClock, Sleeper};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//!
//! // Sleeping on a mock clock advances it without blocking
//! clock.sleep(Duration::from_millis(250));
//!
//! assert_eq!(clock.now().duration_since(start), Duration::from_millis(250));
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time used to measure delay since the first attempt
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Blocks the current execution context between attempts
pub trait Sleeper: Send + Sync + 'static {
    /// Block for `delay`. The engine never calls this with a zero delay.
    fn sleep(&self, delay: Duration);
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sleeper backed by [`std::thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<T: Sleeper> Sleeper for Arc<T> {
    fn sleep(&self, delay: Duration) {
        (**self).sleep(delay);
    }
}

/// Mock clock for deterministic testing
///
/// Cloned handles share the same elapsed time. Used as a [`Sleeper`], the
/// clock advances by the requested delay and returns immediately, so a retry
/// sequence with multi-second backoff completes instantly while still
/// reporting realistic elapsed times.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }

    /// Every delay passed to [`Sleeper::sleep`], in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }
}

impl Sleeper for MockClock {
    fn sleep(&self, delay: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(delay);
        }
        self.advance(delay);
    }
}
