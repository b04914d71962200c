//! Mutex + condvar parking for targets without futex
//!
//! Same epoch protocol as the futex version; the epoch is bumped under the
//! mutex so a parker that checked it cannot sleep through the notify.

use super::Parking;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Portable `Parking` built on `Condvar`
pub struct FallbackParking {
    /// Wake epoch, mirrored in an atomic for lock-free reads
    epoch: AtomicU32,

    /// Mutex for condvar; guards epoch updates
    mutex: Mutex<()>,

    /// Condition variable
    condvar: Condvar,

    /// Count of parked threads
    parked: AtomicUsize,
}

impl FallbackParking {
    /// Create a new fallback parking instance
    pub fn new() -> Self {
        Self {
            epoch: AtomicU32::new(0),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            parked: AtomicUsize::new(0),
        }
    }

    fn bump(&self) {
        // Bump under the lock so a parker between its check and its wait
        // cannot miss the notification.
        let _guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for FallbackParking {
    fn default() -> Self {
        Self::new()
    }
}

impl Parking for FallbackParking {
    #[inline]
    fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn park(&self, seen: u32, timeout: Option<Duration>) -> bool {
        self.parked.fetch_add(1, Ordering::SeqCst);

        // Past the range of Instant the wait is untimed
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);

        while self.epoch.load(Ordering::SeqCst) == seen {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    let (g, _) = self
                        .condvar
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard = g;
                }
                None => {
                    guard = self.condvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        drop(guard);

        self.parked.fetch_sub(1, Ordering::SeqCst);
        self.epoch.load(Ordering::SeqCst) != seen
    }

    fn wake_one(&self) {
        self.bump();
        if self.parked.load(Ordering::SeqCst) == 0 {
            return;
        }
        self.condvar.notify_one();
    }

    fn wake_all(&self) {
        self.bump();
        if self.parked.load(Ordering::SeqCst) == 0 {
            return;
        }
        self.condvar.notify_all();
    }

    fn parked_count(&self) -> usize {
        self.parked.load(Ordering::Relaxed)
    }
}
