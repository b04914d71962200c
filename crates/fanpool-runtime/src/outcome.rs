//! Tagged job results for pools that isolate transform panics

use fanpool_core::error::TransformFailure;

/// Result slot produced by a pool built with `Pool::with_outcomes`
///
/// A panicking transform yields `Failed` instead of taking the worker down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Transform returned normally
    Done(T),
    /// Transform panicked
    Failed(TransformFailure),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Successful value, dropping failures
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, TransformFailure> {
        match self {
            Outcome::Done(v) => Ok(v),
            Outcome::Failed(f) => Err(f),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, TransformFailure> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_result()
    }
}
