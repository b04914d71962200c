//! Pool supervisor
//!
//! Waits for every worker to exit, harvests their join results, then closes
//! the outtake. The outtake is closed exactly once and only after the last
//! worker thread has been joined.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fanpool_core::error::{PoolError, PoolResult};
use fanpool_core::{kdebug, kerror, kinfo};
use fanpool_core::{AtomicPoolState, BoundedQueue, CancellationToken, CountdownLatch, PoolState};

use crate::config::PoolConfig;
use crate::stats::PoolStats;
use crate::worker::{Ticket, WorkerExit};

pub(crate) struct Supervisor<J, R> {
    pub workers: Vec<JoinHandle<WorkerExit>>,
    /// Counted down once per worker exit
    pub latch: Arc<CountdownLatch>,
    pub intake: Arc<BoundedQueue<Ticket<J>>>,
    pub outtake: Arc<BoundedQueue<R>>,
    /// Fails pending submitters once no worker is left
    pub halt: CancellationToken,
    pub state: Arc<AtomicPoolState>,
    pub stats: Arc<PoolStats>,
    /// Counted down after the pool reaches Closed
    pub finished: Arc<CountdownLatch>,
}

impl<J, R> Supervisor<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    pub fn spawn(self, config: &PoolConfig) -> PoolResult<JoinHandle<()>> {
        thread::Builder::new()
            .name(config.thread_name("supervisor"))
            .spawn(move || self.run())
            .map_err(|e| PoolError::Spawn(e.to_string()))
    }

    fn run(self) {
        self.latch.wait();

        let total = self.workers.len();
        let mut failed = 0usize;
        for (id, handle) in self.workers.into_iter().enumerate() {
            match handle.join() {
                Ok(exit) => kdebug!("worker {} joined ({:?})", id, exit),
                Err(_) => {
                    failed += 1;
                    kerror!("worker {} terminated by panic", id);
                }
            }
        }
        self.stats.failed_workers.store(failed, Ordering::Release);

        self.outtake.close();

        // Nobody consumes the intake any more
        self.halt.cancel();
        self.intake.notify_all();

        self.state.advance(PoolState::Closed);
        kinfo!("pool closed: {} worker(s) exited, {} failed", total, failed);
        self.finished.count_down();
    }
}
