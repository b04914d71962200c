//! Result collector
//!
//! A dedicated thread drains the outtake until it reports closed-and-empty,
//! appending each result to an unbounded `ResultLog` in arrival order. The
//! caller reads the log through `Drain`, which ends once the collector has
//! observed the outtake close.
//!
//! Because the log has no bound, the outtake only throttles workers against
//! the collector thread. A slow `Drain` reader does not slow the workers;
//! unread results accumulate in memory instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;

use fanpool_core::error::{PoolError, PoolResult};
use fanpool_core::kdebug;
use fanpool_core::{new_parking, BoundedQueue, CountdownLatch, Parking, PlatformParking};

use crate::config::PoolConfig;
use crate::stats::PoolStats;

/// Unbounded, append-only store of collected results
pub(crate) struct ResultLog<R> {
    items: SegQueue<R>,
    /// Set once the collector saw the outtake close
    done: AtomicBool,
    parking: PlatformParking,
    poll_interval: Duration,
}

impl<R> ResultLog<R> {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            items: SegQueue::new(),
            done: AtomicBool::new(false),
            parking: new_parking(),
            poll_interval,
        }
    }

    fn push(&self, item: R) {
        self.items.push(item);
        self.parking.wake_all();
    }

    /// Mark end-of-stream; results pushed before this stay readable
    pub fn finish(&self) {
        self.done.store(true, Ordering::SeqCst);
        self.parking.wake_all();
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Next result, blocking until one arrives, the log finishes, or
    /// `deadline` passes
    fn next_until(&self, deadline: Option<Instant>) -> PoolResult<Option<R>> {
        loop {
            let seen = self.parking.epoch();
            if let Some(item) = self.items.pop() {
                return Ok(Some(item));
            }
            if self.is_done() {
                // Everything was pushed before `done` was set
                return Ok(self.items.pop());
            }

            let mut wait = self.poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(PoolError::Timeout);
                }
                wait = wait.min(deadline - now);
            }
            self.parking.park(seen, Some(wait));
        }
    }
}

/// Spawn the collector thread
///
/// `finished` is counted down after the log is marked done.
pub(crate) fn spawn_collector<R>(
    config: &PoolConfig,
    outtake: Arc<BoundedQueue<R>>,
    log: Arc<ResultLog<R>>,
    stats: Arc<PoolStats>,
    finished: Arc<CountdownLatch>,
) -> PoolResult<JoinHandle<()>>
where
    R: Send + 'static,
{
    thread::Builder::new()
        .name(config.thread_name("collector"))
        .spawn(move || collect_loop(&outtake, &log, &stats, &finished))
        .map_err(|e| PoolError::Spawn(e.to_string()))
}

fn collect_loop<R>(
    outtake: &BoundedQueue<R>,
    log: &ResultLog<R>,
    stats: &PoolStats,
    finished: &CountdownLatch,
) {
    let mut count = 0u64;
    while let Ok(result) = outtake.recv() {
        log.push(result);
        PoolStats::bump(&stats.collected);
        count += 1;
    }
    log.finish();
    finished.count_down();
    kdebug!("collector done after {} result(s)", count);
}

/// Lazy stream of results in arrival order
///
/// Finite: ends once the outtake has closed and every collected result has
/// been yielded. Not restartable; a pool hands out one `Drain`.
///
/// Results are buffered without limit ahead of the reader, so reading
/// slowly never applies backpressure to the workers.
pub struct Drain<R> {
    log: Arc<ResultLog<R>>,
}

impl<R> Drain<R> {
    pub(crate) fn new(log: Arc<ResultLog<R>>) -> Self {
        Self { log }
    }

    /// Next result, waiting at most `timeout`
    ///
    /// `Ok(None)` is end-of-stream; `Err(Timeout)` leaves the stream intact
    /// for a later call. A timeout too large for `Instant` waits like `next`.
    pub fn next_timeout(&mut self, timeout: Duration) -> PoolResult<Option<R>> {
        self.log.next_until(Instant::now().checked_add(timeout))
    }

    /// Next result if one is already collected
    pub fn try_next(&mut self) -> Option<R> {
        self.log.items.pop()
    }

    /// Whether the stream has ended and nothing is left to yield
    pub fn is_finished(&self) -> bool {
        self.log.is_done() && self.log.items.is_empty()
    }
}

impl<R> Iterator for Drain<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        // Without a deadline `next_until` cannot time out
        self.log.next_until(None).unwrap_or(None)
    }
}

impl<R> std::fmt::Debug for Drain<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drain")
            .field("buffered", &self.log.items.len())
            .field("done", &self.log.is_done())
            .finish()
    }
}
