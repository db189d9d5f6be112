//! Outcome classification
//!
//! The [`Classifier`] decides whether a completed [`Attempt`] should be
//! retried. Values are checked against a [`ResultPredicate`] (default: never
//! retry a value); errors are checked against an [`ErrorPredicate`]
//! (default: retry every error).
//!
//! Error predicates come in two shapes, resolved once at configuration
//! time:
//! - [`ErrorPredicate::Kinds`]: retry iff the error's [`ErrorKind::kind`] is
//!   in a configured set
//! - [`ErrorPredicate::Function`]: retry iff a caller-supplied function
//!   returns `true`

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::attempt::Attempt;

/// Errors that expose a classification kind for set-based retry predicates
pub trait ErrorKind {
    /// Kind discriminator compared against the retryable set
    type Kind: Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The kind of this error
    fn kind(&self) -> Self::Kind;
}

impl ErrorKind for std::io::Error {
    type Kind = std::io::ErrorKind;

    fn kind(&self) -> Self::Kind {
        std::io::Error::kind(self)
    }
}

/// Membership test of an error against a set of kinds
pub trait KindFilter<E>: Send + Sync {
    /// Whether `error` belongs to the retryable set
    fn matches(&self, error: &E) -> bool;

    /// Human readable description of the set
    fn describe(&self) -> String;
}

/// Set of retryable error kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSet<K: Eq + Hash> {
    kinds: HashSet<K>,
}

impl<K: Eq + Hash> KindSet<K> {
    /// Build a set from any collection of kinds
    pub fn new<I: IntoIterator<Item = K>>(kinds: I) -> Self {
        Self { kinds: kinds.into_iter().collect() }
    }

    /// Whether `kind` is a member
    pub fn contains(&self, kind: &K) -> bool {
        self.kinds.contains(kind)
    }
}

impl<E> KindFilter<E> for KindSet<E::Kind>
where
    E: ErrorKind,
{
    fn matches(&self, error: &E) -> bool {
        self.contains(&error.kind())
    }

    fn describe(&self) -> String {
        format!("{:?}", self.kinds)
    }
}

/// Predicate over a successful value: `true` means retry
pub type ResultPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Decides whether an error outcome is retryable
pub enum ErrorPredicate<E> {
    /// Retry every error
    Always,
    /// Retry iff the error's kind is in the set
    Kinds(Arc<dyn KindFilter<E>>),
    /// Retry iff the function returns `true`
    Function(Arc<dyn Fn(&E) -> bool + Send + Sync>),
}

impl<E> ErrorPredicate<E> {
    /// Retry only errors whose kind is listed
    pub fn kinds<I>(kinds: I) -> Self
    where
        E: ErrorKind + 'static,
        I: IntoIterator<Item = E::Kind>,
    {
        Self::Kinds(Arc::new(KindSet::new(kinds)))
    }

    /// Retry errors for which `f` returns `true`
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Whether `error` should be retried
    pub fn is_retryable(&self, error: &E) -> bool {
        match self {
            Self::Always => true,
            Self::Kinds(filter) => filter.matches(error),
            Self::Function(f) => f(error),
        }
    }
}

impl<E> Default for ErrorPredicate<E> {
    fn default() -> Self {
        Self::Always
    }
}

impl<E> Clone for ErrorPredicate<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Always => Self::Always,
            Self::Kinds(filter) => Self::Kinds(Arc::clone(filter)),
            Self::Function(f) => Self::Function(Arc::clone(f)),
        }
    }
}

impl<E> fmt::Debug for ErrorPredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Kinds(filter) => write!(f, "Kinds({})", filter.describe()),
            Self::Function(_) => write!(f, "Function(<function>)"),
        }
    }
}

/// Combined result and error classification for one policy
pub struct Classifier<T, E> {
    retry_on_result: Option<ResultPredicate<T>>,
    retry_on_error: ErrorPredicate<E>,
}

impl<T, E> Classifier<T, E> {
    pub(crate) fn new(
        retry_on_result: Option<ResultPredicate<T>>,
        retry_on_error: ErrorPredicate<E>,
    ) -> Self {
        Self { retry_on_result, retry_on_error }
    }

    /// Whether the attempt's outcome calls for another attempt
    pub fn should_retry(&self, attempt: &Attempt<T, E>) -> bool {
        match attempt.outcome() {
            Ok(value) => self.retry_on_result.as_ref().is_some_and(|predicate| predicate(value)),
            Err(error) => self.retry_on_error.is_retryable(error),
        }
    }

    /// The configured error predicate
    pub fn error_predicate(&self) -> &ErrorPredicate<E> {
        &self.retry_on_error
    }
}

impl<T, E> Default for Classifier<T, E> {
    fn default() -> Self {
        Self::new(None, ErrorPredicate::Always)
    }
}

impl<T, E> Clone for Classifier<T, E> {
    fn clone(&self) -> Self {
        Self {
            retry_on_result: self.retry_on_result.clone(),
            retry_on_error: self.retry_on_error.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Classifier<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("retry_on_result", &self.retry_on_result.as_ref().map(|_| "<function>"))
            .field("retry_on_error", &self.retry_on_error)
            .finish()
    }
}
