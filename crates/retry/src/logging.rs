//! Attempt logging
//!
//! Every attempt the engine makes is handed to an [`AttemptLogger`] before
//! it is classified. The engine emits no other telemetry, so a policy
//! without a logger is completely silent.
//!
//! [`TracingLogger`] is the default sink: one `tracing` event per attempt,
//! `debug!` for values and `warn!` for errors.

use std::fmt;

use tracing::{debug, warn};

use crate::attempt::Attempt;
use crate::constants::DEFAULT_OPERATION_NAME;

/// Sink receiving one record per attempt
pub trait AttemptLogger<T, E>: Send + Sync {
    /// Record a completed attempt. Must not fail.
    fn log_attempt(&self, attempt: &Attempt<T, E>);
}

impl<T, E, F> AttemptLogger<T, E> for F
where
    F: Fn(&Attempt<T, E>) + Send + Sync,
{
    fn log_attempt(&self, attempt: &Attempt<T, E>) {
        self(attempt);
    }
}

/// Default sink: structured `tracing` events
#[derive(Debug, Clone)]
pub struct TracingLogger {
    operation_name: String,
}

impl TracingLogger {
    /// Create a logger that tags events with `operation_name`
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self { operation_name: operation_name.into() }
    }

    /// Operation name attached to every event
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATION_NAME)
    }
}

impl<T, E> AttemptLogger<T, E> for TracingLogger
where
    T: fmt::Debug,
    E: fmt::Display,
{
    fn log_attempt(&self, attempt: &Attempt<T, E>) {
        match attempt.outcome() {
            Ok(value) => debug!(
                operation = %self.operation_name,
                attempt = attempt.attempt_number(),
                elapsed_ms = attempt.elapsed_ms(),
                value = ?value,
                "Retry attempt returned"
            ),
            Err(error) => warn!(
                operation = %self.operation_name,
                attempt = attempt.attempt_number(),
                elapsed_ms = attempt.elapsed_ms(),
                error_type = std::any::type_name::<E>(),
                error = %error,
                "Retry attempt failed"
            ),
        }
    }
}
