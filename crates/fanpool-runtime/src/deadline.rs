//! Time-limited cancellation
//!
//! A `Deadline` overlays a timeout on any `CancellationToken`: a timer
//! thread cancels the token when the duration elapses, unless the deadline
//! is disarmed first. Dropping a `Deadline` disarms it.
//!
//! A duration too large to represent as an `Instant` never fires.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fanpool_core::constants::DEFAULT_POLL_INTERVAL;
use fanpool_core::error::{PoolError, PoolResult};
use fanpool_core::kdebug;
use fanpool_core::{new_parking, CancellationToken, Parking, PlatformParking};

use crate::config::defaults;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const DISARMED: u8 = 2;

struct Timer {
    state: AtomicU8,
    parking: PlatformParking,
}

/// Cancels a token once a duration has elapsed
pub struct Deadline {
    timer: Arc<Timer>,
    /// `None` for a deadline beyond the range of `Instant`
    expires: Option<Instant>,
    handle: Option<JoinHandle<()>>,
}

impl Deadline {
    /// Arm a deadline that cancels `token` after `duration`
    ///
    /// The timer thread is named `fanpool-deadline`; use
    /// `Pool::cancel_after` for one named after the pool's thread prefix.
    pub fn after(duration: Duration, token: &CancellationToken) -> PoolResult<Self> {
        Self::named(duration, token, format!("{}-deadline", defaults::THREAD_PREFIX))
    }

    pub(crate) fn named(
        duration: Duration,
        token: &CancellationToken,
        thread_name: String,
    ) -> PoolResult<Self> {
        let timer = Arc::new(Timer {
            state: AtomicU8::new(ARMED),
            parking: new_parking(),
        });
        let expires = Instant::now().checked_add(duration);

        let handle = {
            let timer = Arc::clone(&timer);
            let token = token.clone();
            thread::Builder::new()
                .name(thread_name)
                .spawn(move || run_timer(&timer, expires, &token))
                .map_err(|e| PoolError::Spawn(e.to_string()))?
        };

        Ok(Self {
            timer,
            expires,
            handle: Some(handle),
        })
    }

    /// Stop the deadline from firing
    ///
    /// Returns `true` if this call disarmed it, `false` if it had already
    /// fired or been disarmed.
    pub fn disarm(&self) -> bool {
        let disarmed = self
            .timer
            .state
            .compare_exchange(ARMED, DISARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if disarmed {
            self.timer.parking.wake_all();
        }
        disarmed
    }

    /// Whether the deadline cancelled its token
    pub fn fired(&self) -> bool {
        self.timer.state.load(Ordering::Acquire) == FIRED
    }

    /// Time left before firing (zero once expired, `Duration::MAX` for a
    /// deadline that never fires)
    pub fn remaining(&self) -> Duration {
        match self.expires {
            Some(expires) => expires.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.disarm();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deadline")
            .field("remaining", &self.remaining())
            .field("fired", &self.fired())
            .finish()
    }
}

fn run_timer(timer: &Timer, expires: Option<Instant>, token: &CancellationToken) {
    loop {
        let seen = timer.parking.epoch();
        if timer.state.load(Ordering::Acquire) != ARMED {
            return;
        }
        match expires {
            Some(expires) => {
                let now = Instant::now();
                if now >= expires {
                    break;
                }
                timer.parking.park(seen, Some(expires - now));
            }
            // Only `disarm` ends this wait
            None => {
                timer.parking.park(seen, None);
            }
        }
    }

    if timer
        .state
        .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        token.cancel();
        kdebug!("deadline fired");
    }
}

/// How `sleep_or_cancel` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// Slept the full duration
    Elapsed,
    /// Token cancelled first
    Cancelled,
}

/// Sleep for `duration` unless `token` is cancelled first
///
/// The token is re-checked at least every poll interval. A duration too
/// large for `Instant` sleeps until the token is cancelled.
pub fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> SleepOutcome {
    let until = Instant::now().checked_add(duration);
    loop {
        if token.is_cancelled() {
            return SleepOutcome::Cancelled;
        }
        let nap = match until {
            Some(until) => {
                let now = Instant::now();
                if now >= until {
                    return SleepOutcome::Elapsed;
                }
                (until - now).min(DEFAULT_POLL_INTERVAL)
            }
            None => DEFAULT_POLL_INTERVAL,
        };
        thread::sleep(nap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_fires() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_millis(20), &token).unwrap();

        assert!(!token.is_cancelled());
        thread::sleep(Duration::from_millis(200));

        assert!(token.is_cancelled());
        assert!(deadline.fired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert!(!deadline.disarm());
    }

    #[test]
    fn test_disarmed_deadline_does_not_fire() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_millis(50), &token).unwrap();

        assert!(deadline.disarm());
        assert!(!deadline.disarm());
        thread::sleep(Duration::from_millis(150));

        assert!(!token.is_cancelled());
        assert!(!deadline.fired());
    }

    #[test]
    fn test_drop_disarms() {
        let token = CancellationToken::new();
        drop(Deadline::after(Duration::from_millis(30), &token).unwrap());
        thread::sleep(Duration::from_millis(100));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_child_deadline_leaves_parent() {
        let parent = CancellationToken::new();
        let child = parent.child();
        let _deadline = Deadline::after(Duration::from_millis(10), &child).unwrap();

        assert_eq!(
            sleep_or_cancel(Duration::from_secs(5), &child),
            SleepOutcome::Cancelled
        );
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_unbounded_deadline_never_fires() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::MAX, &token).unwrap();

        thread::sleep(Duration::from_millis(30));
        assert!(!token.is_cancelled());
        assert!(!deadline.fired());
        assert_eq!(deadline.remaining(), Duration::MAX);

        assert!(deadline.disarm());
        drop(deadline);
    }

    #[test]
    fn test_unbounded_sleep_ends_on_cancel() {
        let token = CancellationToken::new();
        let _deadline = Deadline::after(Duration::from_millis(20), &token).unwrap();

        assert_eq!(sleep_or_cancel(Duration::MAX, &token), SleepOutcome::Cancelled);
    }

    #[test]
    fn test_sleep_elapses() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert_eq!(
            sleep_or_cancel(Duration::from_millis(20), &token),
            SleepOutcome::Elapsed
        );
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
