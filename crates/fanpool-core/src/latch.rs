//! Countdown latch
//!
//! Fixed-count join primitive: `count_down()` is called once per
//! participant, `wait()` returns once the count reaches zero. The pool
//! supervisor uses it to join the worker set before closing the outtake.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::parking::{new_parking, Parking, PlatformParking};

/// One-shot countdown latch
pub struct CountdownLatch {
    remaining: AtomicUsize,
    parking: PlatformParking,
}

impl CountdownLatch {
    /// Create a latch that opens after `count` calls to `count_down`
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            parking: new_parking(),
        }
    }

    /// Decrement the count; the call that reaches zero wakes all waiters
    ///
    /// Returns `true` for the call that opened the latch. Extra calls after
    /// the latch opened are ignored.
    pub fn count_down(&self) -> bool {
        let prev = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => {
                self.parking.wake_all();
                true
            }
            _ => false,
        }
    }

    /// Remaining count
    pub fn count(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Check whether the latch has opened
    pub fn is_open(&self) -> bool {
        self.count() == 0
    }

    /// Block until the latch opens
    pub fn wait(&self) {
        while !self.is_open() {
            let seen = self.parking.epoch();
            if self.is_open() {
                return;
            }
            self.parking.park(seen, Some(DEFAULT_POLL_INTERVAL * 100));
        }
    }

    /// Block until the latch opens or `timeout` elapses
    ///
    /// Returns `true` if the latch opened. A timeout too large to represent
    /// as an `Instant` waits without limit.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        loop {
            let seen = self.parking.epoch();
            if self.is_open() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.parking.park(seen, Some(deadline - now));
        }
    }
}

impl std::fmt::Debug for CountdownLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownLatch")
            .field("remaining", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_count_is_open() {
        let latch = CountdownLatch::new(0);
        assert!(latch.is_open());
        latch.wait();
        assert!(!latch.count_down());
    }

    #[test]
    fn test_count_down_opens() {
        let latch = CountdownLatch::new(2);

        assert!(!latch.count_down());
        assert!(!latch.is_open());
        assert!(latch.count_down());
        assert!(latch.is_open());

        // Extra calls do not wrap around
        assert!(!latch.count_down());
        assert_eq!(latch.count(), 0);
    }

    #[test]
    fn test_wait_for_threads() {
        let latch = Arc::new(CountdownLatch::new(4));
        let mut handles = vec![];

        for i in 0..4 {
            let latch = Arc::clone(&latch);
            handles.push(thread::spawn(move || {
                thread::sleep(Duration::from_millis(5 * i));
                latch.count_down();
            }));
        }

        latch.wait();
        assert!(latch.is_open());

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_wait_timeout_expires() {
        let latch = CountdownLatch::new(1);
        let start = Instant::now();

        assert!(!latch.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_wait_timeout_opens() {
        let latch = Arc::new(CountdownLatch::new(1));
        let latch2 = Arc::clone(&latch);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            latch2.count_down();
        });

        assert!(latch.wait_timeout(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_unbounded() {
        let latch = Arc::new(CountdownLatch::new(1));
        let latch2 = Arc::clone(&latch);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            latch2.count_down();
        });

        assert!(latch.wait_timeout(Duration::MAX));
        handle.join().unwrap();
    }
}
