//! Worker threads
//!
//! Each worker loops: dequeue one job from the shared intake, apply the
//! transform, push the result to the shared outtake. It exits when the
//! intake is closed and empty, or when the pool's cancellation token is
//! observed before a dequeue. A job whose transform has started always
//! delivers its result: the outtake push blocks under backpressure and is
//! never cancelled.
//!
//! Workers never close the outtake. Whatever way a worker ends, including
//! unwinding out of a panicking transform, its `LatchGuard` counts the
//! supervisor's latch down exactly once.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fanpool_core::error::{PoolError, PoolResult, RecvError};
use fanpool_core::{kdebug, kerror, ktrace};
use fanpool_core::{BoundedQueue, CancellationToken, CountdownLatch};

use crate::config::PoolConfig;
use crate::stats::PoolStats;

/// Transform as stored by the pool: receives the job's arrival sequence
/// number alongside the job
pub(crate) type Transform<J, R> = dyn Fn(u64, J) -> R + Send + Sync;

/// A job tagged with its arrival order
pub(crate) struct Ticket<J> {
    pub seq: u64,
    pub job: J,
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Intake closed and empty
    Exhausted,
    /// Cancellation observed between jobs
    Cancelled,
    /// Outtake closed underneath the worker (supervisor bug)
    OuttakeClosed,
}

/// Everything a worker shares with the rest of the pool
pub(crate) struct WorkerContext<J, R> {
    pub intake: Arc<BoundedQueue<Ticket<J>>>,
    pub outtake: Arc<BoundedQueue<R>>,
    pub cancel: CancellationToken,
    pub transform: Arc<Transform<J, R>>,
    pub stats: Arc<PoolStats>,
    pub latch: Arc<CountdownLatch>,
}

impl<J, R> Clone for WorkerContext<J, R> {
    fn clone(&self) -> Self {
        Self {
            intake: Arc::clone(&self.intake),
            outtake: Arc::clone(&self.outtake),
            cancel: self.cancel.clone(),
            transform: Arc::clone(&self.transform),
            stats: Arc::clone(&self.stats),
            latch: Arc::clone(&self.latch),
        }
    }
}

/// Counts the latch down when the worker ends, normally or by unwinding
struct LatchGuard(Arc<CountdownLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

/// Spawn worker `id` on its own named OS thread
pub(crate) fn spawn_worker<J, R>(
    id: usize,
    config: &PoolConfig,
    ctx: WorkerContext<J, R>,
) -> PoolResult<JoinHandle<WorkerExit>>
where
    J: Send + 'static,
    R: Send + 'static,
{
    thread::Builder::new()
        .name(config.thread_name(&format!("worker-{}", id)))
        .spawn(move || worker_loop(id, ctx))
        .map_err(|e| PoolError::Spawn(e.to_string()))
}

/// Worker thread main loop
pub(crate) fn worker_loop<J, R>(id: usize, ctx: WorkerContext<J, R>) -> WorkerExit {
    let _guard = LatchGuard(Arc::clone(&ctx.latch));
    let mut handled = 0u64;

    let exit = loop {
        let ticket = match ctx.intake.recv_cancellable(&ctx.cancel) {
            Ok(ticket) => ticket,
            Err(RecvError::Cancelled) => break WorkerExit::Cancelled,
            Err(_) => break WorkerExit::Exhausted,
        };
        PoolStats::bump(&ctx.stats.dequeued);

        let seq = ticket.seq;
        ktrace!("job #{} picked up", seq);
        let result = (ctx.transform)(seq, ticket.job);
        PoolStats::bump(&ctx.stats.processed);
        handled += 1;

        if ctx.outtake.send(result).is_err() {
            kerror!("worker {} lost result of job #{}: outtake closed", id, seq);
            break WorkerExit::OuttakeClosed;
        }
    };

    kdebug!("worker {} exiting ({:?}) after {} job(s)", id, exit, handled);
    exit
}
