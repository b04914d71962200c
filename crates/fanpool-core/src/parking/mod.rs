//! Thread parking for blocking queue operations
//!
//! Every blocking wait in the pool (empty intake, full outtake, latch,
//! drain) goes through a `Parking` instance. Waits are epoch based:
//!
//! 1. Read `epoch()`
//! 2. Re-check the condition being waited on
//! 3. `park(epoch, timeout)` sleeps only while the epoch is unchanged
//!
//! Wakers change state first, then call `wake_one()` / `wake_all()`, which
//! bump the epoch. A wake that lands between steps 1 and 3 makes step 3
//! return immediately, so no wakeup is lost.

use std::time::Duration;

/// Platform-specific parking mechanism
pub trait Parking: Send + Sync {
    /// Current wake epoch; pass it to `park`
    fn epoch(&self) -> u32;

    /// Park the current thread while the epoch equals `seen`
    ///
    /// Returns:
    /// - `true` if the epoch moved (woken, or a wake was already pending)
    /// - `false` on timeout or spurious return
    ///
    /// Callers re-check their condition regardless of return value.
    fn park(&self, seen: u32, timeout: Option<Duration>) -> bool;

    /// Wake one parked thread
    fn wake_one(&self);

    /// Wake all parked threads
    ///
    /// Used on close and cancellation.
    fn wake_all(&self);

    /// Number of currently parked threads (hint, may be stale)
    fn parked_count(&self) -> usize;
}

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexParking as PlatformParking;
    } else {
        mod fallback;
        pub use fallback::FallbackParking as PlatformParking;
    }
}

/// Create a new platform-appropriate parking instance
pub fn new_parking() -> PlatformParking {
    PlatformParking::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_park_timeout() {
        let parking = new_parking();
        let start = std::time::Instant::now();
        let seen = parking.epoch();
        let woken = parking.park(seen, Some(Duration::from_millis(50)));
        let elapsed = start.elapsed();

        assert!(!woken);
        assert!(elapsed >= Duration::from_millis(40)); // Allow some slack
    }

    #[test]
    fn test_stale_epoch_returns_immediately() {
        let parking = new_parking();
        let seen = parking.epoch();
        parking.wake_all();

        let start = std::time::Instant::now();
        assert!(parking.park(seen, Some(Duration::from_secs(5))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_huge_timeout_still_wakes() {
        let parking = Arc::new(new_parking());
        let parking2 = Arc::clone(&parking);
        let seen = parking.epoch();

        let handle = thread::spawn(move || parking2.park(seen, Some(Duration::MAX)));

        thread::sleep(Duration::from_millis(20));
        parking.wake_all();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_wake_one() {
        let parking = Arc::new(new_parking());
        let parking2 = Arc::clone(&parking);

        let handle = thread::spawn(move || {
            let seen = parking2.epoch();
            parking2.park(seen, Some(Duration::from_secs(10)));
        });

        thread::sleep(Duration::from_millis(50));

        let start = std::time::Instant::now();
        parking.wake_one();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wake_all() {
        let parking = Arc::new(new_parking());
        let mut handles = vec![];

        for _ in 0..4 {
            let parking = Arc::clone(&parking);
            handles.push(thread::spawn(move || {
                let seen = parking.epoch();
                parking.park(seen, Some(Duration::from_secs(10)));
            }));
        }

        thread::sleep(Duration::from_millis(50));

        let start = std::time::Instant::now();
        parking.wake_all();
        for h in handles {
            h.join().unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
