//! Policy-driven retry engine for PulseArc.
//!
//! Wraps any fallible operation and re-invokes it until its outcome is
//! accepted, an error the policy does not retry occurs, or a stop condition
//! fires. A policy ([`RetryConfig`]) combines:
//!
//! - a [`StopStrategy`] (attempt limit, delay limit, custom, or any of these)
//! - a [`WaitStrategy`] (fixed, random, incrementing, exponential, custom,
//!   the longest of several, optional jitter)
//! - a [`Classifier`] deciding which values and errors are retried
//! - optional attempt hooks and an [`AttemptLogger`]
//!
//! # Feature Flags
//! - `async`: [`Retrying::call_async`] using `tokio` timers
//! - `serde`: deserializable [`RetrySettings`] loaded from TOML or JSON
//!
//! # Examples
//!
//! ```
//! use std::io;
//! use std::time::Duration;
//!
//! use pulsearc_retry::{ExecutionError, RetryConfig, Retrying};
//!
//! let retrying: Retrying<String, io::Error> = Retrying::new(
//!     RetryConfig::builder()
//!         .stop_after_attempt(3)
//!         .wait_exponential(Duration::from_millis(1), Duration::from_millis(10))
//!         .retry_on_error_kinds([io::ErrorKind::TimedOut])
//!         .build()?,
//! );
//!
//! let result = retrying.call(|| Err(io::Error::new(io::ErrorKind::TimedOut, "slow upstream")));
//!
//! match result {
//!     Err(ExecutionError::Retry(err)) => assert_eq!(err.attempts(), 3),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! # Ok::<(), pulsearc_retry::ConfigError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod attempt;
pub mod classify;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod settings;
pub mod stop;
pub mod time;
pub mod wait;

pub use attempt::{Attempt, ErrorTrace};
pub use classify::{Classifier, ErrorKind, ErrorPredicate, KindFilter, KindSet, ResultPredicate};
pub use config::{AttemptHook, RetryConfig, RetryConfigBuilder, SharedLogger};
pub use engine::{RetryOutcome, Retrying};
pub use error::{BoxedError, ConfigError, ExecutionError, ExecutionResult, RetryError};
pub use logging::{AttemptLogger, TracingLogger};
pub use settings::RetrySettings;
pub use stop::{StopFn, StopStrategy};
pub use time::{Clock, MockClock, Sleeper, SystemClock, ThreadSleeper};
pub use wait::{WaitFn, WaitParameters, WaitStrategy};
