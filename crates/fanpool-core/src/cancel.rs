//! Cancellation token for cooperative cancellation
//!
//! Workers check the token between jobs and stop dequeuing once it is set.
//! The flag is write-once: it moves from "not cancelled" to "cancelled" and
//! never back. Tokens can be linked to form parent-child relationships.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::error::{PoolError, PoolResult};

/// Shared write-once cancellation flag
///
/// Clones share the same flag. A child token reports cancelled when it or
/// any ancestor has been cancelled; cancelling a child leaves the parent
/// untouched.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    /// Cancellation flag (write-once)
    cancelled: AtomicBool,

    /// Parent token (if any)
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Create a new independent cancellation token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// Derive a token that is cancelled whenever this one is
    ///
    /// The pool uses one to halt submitters: cancelling the pool halts
    /// them, and the supervisor can halt them alone.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Whether this token or any ancestor has been cancelled
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        let mut token = self;
        loop {
            if token.inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            match &token.inner.parent {
                Some(parent) => token = parent,
                None => return false,
            }
        }
    }

    /// Request cancellation
    ///
    /// Idempotent. Returns `true` only for the call that flipped the flag.
    /// Only this token's flag is set, never the parent's.
    pub fn cancel(&self) -> bool {
        !self.inner.cancelled.swap(true, Ordering::AcqRel)
    }

    /// `Err(Cancelled)` once cancelled, for use with `?`
    ///
    /// ```ignore
    /// fn step(token: &CancellationToken) -> PoolResult<()> {
    ///     token.check()?;  // Err(Cancelled) once cancelled
    ///     // ... do work ...
    ///     Ok(())
    /// }
    /// ```
    #[inline]
    pub fn check(&self) -> PoolResult<()> {
        if self.is_cancelled() {
            Err(PoolError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Whether two handles share the same flag
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("linked", &self.inner.parent.is_some())
            .finish()
    }
}
