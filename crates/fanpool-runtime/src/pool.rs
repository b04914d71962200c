//! Worker pool
//!
//! A `Pool` owns a fixed set of worker threads sharing one bounded intake
//! and one bounded outtake, plus a supervisor and a collector thread.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Running --close_intake / cancel--> Draining --> Closed
//! ```
//!
//! - `start` spawns the workers, the collector and the supervisor.
//! - Jobs enter through `submit`, `try_submit` or a `feed` source thread.
//! - `close_intake` lets the workers finish everything accepted so far.
//! - `cancel` makes workers stop dequeuing; jobs still queued are abandoned.
//! - Once every worker has exited the supervisor closes the outtake and the
//!   pool reaches Closed. `wait` returns after the collector has seen that.
//!
//! Results are read through `drain` in arrival order, either while the pool
//! runs or after `wait`; the collector buffers them without bound so a
//! caller that waits first never stalls the workers. The flip side is that
//! result backpressure stops at the collector: outtake capacity limits how
//! far workers run ahead of the collector thread, not of the `Drain` reader.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use fanpool_core::error::{PoolError, PoolResult, SendError, TransformFailure};
use fanpool_core::{kdebug, kerror, kinfo, kwarn};
use fanpool_core::{AtomicPoolState, BoundedQueue, CancellationToken, CountdownLatch, PoolState};

use crate::collector::{spawn_collector, Drain, ResultLog};
use crate::config::PoolConfig;
use crate::deadline::Deadline;
use crate::outcome::Outcome;
use crate::source::{spawn_source, SourceHandle};
use crate::stats::{PoolStats, Summary};
use crate::supervisor::Supervisor;
use crate::worker::{spawn_worker, Ticket, Transform, WorkerContext, WorkerExit};

// ============================================================================
// Shared state
// ============================================================================

/// Everything the pool handle, its threads and source threads share
struct PoolShared<J, R> {
    config: PoolConfig,
    intake: Arc<BoundedQueue<Ticket<J>>>,
    outtake: Arc<BoundedQueue<R>>,
    log: Arc<ResultLog<R>>,
    transform: Arc<Transform<J, R>>,

    /// Pool-wide cancellation; workers poll it between jobs
    cancel: CancellationToken,
    /// Child of `cancel`, also fired by the supervisor when no worker is left
    halt: CancellationToken,

    state: Arc<AtomicPoolState>,
    stats: Arc<PoolStats>,
    /// One count per worker
    workers_exited: Arc<CountdownLatch>,
    /// Supervisor and collector
    finished: Arc<CountdownLatch>,

    next_seq: AtomicU64,
    drain_taken: AtomicBool,
}

impl<J, R> PoolShared<J, R> {
    /// Why a submission was refused after `halt` fired
    fn rejection(&self) -> PoolError {
        if self.intake.is_closed() {
            PoolError::Closed
        } else if self.cancel.is_cancelled() {
            PoolError::Cancelled
        } else {
            PoolError::NoWorkers
        }
    }

    fn submit_with(
        &self,
        job: J,
        send: impl FnOnce(Ticket<J>) -> Result<(), SendError<Ticket<J>>>,
    ) -> PoolResult<()> {
        if self.halt.is_cancelled() {
            return Err(self.rejection());
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        // Counted before the push so `abandoned` never sees a dequeue first
        self.stats.submitted.fetch_add(1, Ordering::AcqRel);

        match send(Ticket { seq, job }) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stats.submitted.fetch_sub(1, Ordering::AcqRel);
                Err(match e {
                    SendError::Cancelled(_) => self.rejection(),
                    other => other.into(),
                })
            }
        }
    }

    fn submit(&self, job: J) -> PoolResult<()> {
        self.submit_with(job, |ticket| self.intake.send_cancellable(ticket, &self.halt))
    }

    fn try_submit(&self, job: J) -> PoolResult<()> {
        self.submit_with(job, |ticket| self.intake.try_send(ticket))
    }

    fn close_intake(&self) -> PoolResult<()> {
        if !self.intake.close() {
            return Err(PoolError::Closed);
        }
        self.state.transition(PoolState::Running, PoolState::Draining);
        kdebug!("intake closed after {} job(s)", self.stats.submitted.load(Ordering::Acquire));
        Ok(())
    }

    fn cancel(&self) {
        if self.cancel.cancel() {
            self.state.transition(PoolState::Running, PoolState::Draining);
            kinfo!("pool cancelled");
        }
        // Blocked workers and submitters re-check their tokens now
        self.intake.notify_all();
    }

    fn worker_context(&self) -> WorkerContext<J, R> {
        WorkerContext {
            intake: Arc::clone(&self.intake),
            outtake: Arc::clone(&self.outtake),
            cancel: self.cancel.clone(),
            transform: Arc::clone(&self.transform),
            stats: Arc::clone(&self.stats),
            latch: Arc::clone(&self.workers_exited),
        }
    }
}

// ============================================================================
// Pool
// ============================================================================

/// Bounded worker pool applying one transform to every job
///
/// `J` is the job type, `R` the result type. Submitters are throttled by
/// the intake; results are buffered in memory until drained.
pub struct Pool<J, R> {
    shared: Arc<PoolShared<J, R>>,
    /// Supervisor and collector, joined by `wait`
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<J, R> Pool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Create an idle pool
    ///
    /// A panic inside `transform` terminates the worker running it; `wait`
    /// then reports `WorkersFailed`. See `with_outcomes` for a pool that
    /// survives panicking transforms.
    pub fn new<F>(config: PoolConfig, transform: F) -> PoolResult<Self>
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        Self::from_transform(config, Arc::new(move |_seq: u64, job: J| transform(job)))
    }

    /// Create an idle pool and start it
    pub fn run<F>(config: PoolConfig, transform: F) -> PoolResult<Self>
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let pool = Self::new(config, transform)?;
        pool.start()?;
        Ok(pool)
    }

    fn from_transform(config: PoolConfig, transform: Arc<Transform<J, R>>) -> PoolResult<Self> {
        config.validate()?;

        let poll = config.poll_interval;
        let cancel = CancellationToken::new();
        let halt = cancel.child();
        let shared = PoolShared {
            intake: Arc::new(BoundedQueue::with_poll_interval(config.intake_capacity, poll)),
            outtake: Arc::new(BoundedQueue::with_poll_interval(config.outtake_capacity, poll)),
            log: Arc::new(ResultLog::new(poll)),
            transform,
            cancel,
            halt,
            state: Arc::new(AtomicPoolState::new()),
            stats: Arc::new(PoolStats::default()),
            workers_exited: Arc::new(CountdownLatch::new(config.num_workers)),
            finished: Arc::new(CountdownLatch::new(2)),
            next_seq: AtomicU64::new(0),
            drain_taken: AtomicBool::new(false),
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
            threads: Mutex::new(Vec::with_capacity(2)),
        })
    }

    /// Spawn workers, collector and supervisor (Idle -> Running)
    pub fn start(&self) -> PoolResult<()> {
        let shared = &self.shared;
        if !shared.state.transition(PoolState::Idle, PoolState::Running) {
            return Err(PoolError::AlreadyStarted);
        }

        let config = &shared.config;
        let mut workers = Vec::with_capacity(config.num_workers);
        for id in 0..config.num_workers {
            match spawn_worker(id, config, shared.worker_context()) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    self.abort_start(workers);
                    return Err(e);
                }
            }
        }

        let collector = match spawn_collector(
            config,
            Arc::clone(&shared.outtake),
            Arc::clone(&shared.log),
            Arc::clone(&shared.stats),
            Arc::clone(&shared.finished),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.abort_start(workers);
                return Err(e);
            }
        };

        let supervisor = Supervisor {
            workers,
            latch: Arc::clone(&shared.workers_exited),
            intake: Arc::clone(&shared.intake),
            outtake: Arc::clone(&shared.outtake),
            halt: shared.halt.clone(),
            state: Arc::clone(&shared.state),
            stats: Arc::clone(&shared.stats),
            finished: Arc::clone(&shared.finished),
        };
        let supervisor = match supervisor.spawn(config) {
            Ok(handle) => handle,
            Err(e) => {
                // Worker handles were dropped with the supervisor; the
                // detached workers still need to stop.
                shared.cancel();
                shared.outtake.close();
                shared.halt.cancel();
                shared.state.advance(PoolState::Closed);
                shared.finished.count_down();
                self.lock_threads().push(collector);
                return Err(e);
            }
        };

        self.lock_threads().extend([collector, supervisor]);
        kinfo!(
            "pool started: {} worker(s), intake={} outtake={}",
            config.num_workers,
            config.intake_capacity,
            config.outtake_capacity
        );
        Ok(())
    }

    /// Tear down a pool whose collector and supervisor never started
    fn abort_start(&self, workers: Vec<JoinHandle<WorkerExit>>) {
        let shared = &self.shared;
        kerror!("pool start failed after {} worker(s); shutting down", workers.len());

        // No collector: close first so workers blocked on a full outtake return
        shared.cancel();
        shared.outtake.close();
        for handle in workers {
            let _ = handle.join();
        }
        shared.halt.cancel();

        shared.log.finish();
        shared.state.advance(PoolState::Closed);
        shared.finished.count_down();
        shared.finished.count_down();
    }

    fn lock_threads(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Submit a job, blocking while the intake is full
    ///
    /// Fails with `Closed` after `close_intake`, `Cancelled` after `cancel`
    /// and `NoWorkers` once every worker has exited. A pool that has not
    /// been started buffers jobs up to the intake capacity.
    pub fn submit(&self, job: J) -> PoolResult<()> {
        self.shared.submit(job)
    }

    /// Submit a job without blocking; `Full` when the intake is at capacity
    ///
    /// On a handoff intake (capacity 0) one job may sit in the handoff slot
    /// without a worker present, so an idle handoff pool accepts one job.
    pub fn try_submit(&self, job: J) -> PoolResult<()> {
        self.shared.try_submit(job)
    }

    /// Submit every item of `jobs` from a dedicated source thread, then
    /// close the intake
    ///
    /// The source stops early, leaving the intake open, when a submission
    /// fails.
    pub fn feed<I>(&self, jobs: I) -> PoolResult<SourceHandle>
    where
        I: IntoIterator<Item = J> + Send + 'static,
    {
        let submit_to = Arc::clone(&self.shared);
        let close_on = Arc::clone(&self.shared);
        spawn_source(
            &self.shared.config,
            jobs,
            move |job| submit_to.submit(job),
            move || close_on.close_intake(),
        )
    }

    /// Signal that no more jobs will be submitted
    ///
    /// A second call fails with `Closed`.
    pub fn close_intake(&self) -> PoolResult<()> {
        self.shared.close_intake()
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Stop workers from taking further jobs
    ///
    /// Transforms already running finish and deliver their results. Calling
    /// this more than once has no further effect.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Clone of the pool's cancellation token
    ///
    /// Cancelling it (directly or through a `Deadline`) is equivalent to
    /// `cancel`, observed within one poll interval.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Cancel the pool once `duration` has elapsed
    ///
    /// The timer thread follows the configured thread prefix. Dropping or
    /// disarming the returned `Deadline` stops it.
    pub fn cancel_after(&self, duration: Duration) -> PoolResult<Deadline> {
        Deadline::named(
            duration,
            &self.shared.cancel,
            self.shared.config.thread_name("deadline"),
        )
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Take the result stream
    ///
    /// Only one `Drain` exists per pool; later calls fail with `DrainTaken`.
    pub fn drain(&self) -> PoolResult<Drain<R>> {
        if self.shared.drain_taken.swap(true, Ordering::AcqRel) {
            return Err(PoolError::DrainTaken);
        }
        Ok(Drain::new(Arc::clone(&self.shared.log)))
    }

    /// Take the result stream and read it to the end
    pub fn collect(&self) -> PoolResult<Vec<R>> {
        Ok(self.drain()?.collect())
    }

    /// Block until the pool is Closed and every result has been collected
    pub fn wait(&self) -> PoolResult<Summary> {
        if self.shared.state.load() == PoolState::Idle {
            return Err(PoolError::NotStarted);
        }
        self.shared.finished.wait();
        self.finish()
    }

    /// As `wait`, giving up with `Timeout` after `timeout`
    ///
    /// A timeout leaves the pool untouched.
    pub fn wait_timeout(&self, timeout: Duration) -> PoolResult<Summary> {
        if self.shared.state.load() == PoolState::Idle {
            return Err(PoolError::NotStarted);
        }
        if !self.shared.finished.wait_timeout(timeout) {
            return Err(PoolError::Timeout);
        }
        self.finish()
    }

    fn finish(&self) -> PoolResult<Summary> {
        let handles: Vec<_> = self.lock_threads().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                kerror!("pool thread panicked during shutdown");
            }
        }

        let summary = self.summary();
        if summary.failed_workers > 0 {
            return Err(PoolError::WorkersFailed {
                failed: summary.failed_workers,
            });
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        let shared = &self.shared;
        match shared.state.load() {
            // A token cancelled from outside never touches the state word
            PoolState::Running if shared.intake.is_closed() || shared.cancel.is_cancelled() => {
                PoolState::Draining
            }
            state => state,
        }
    }

    /// Snapshot of the pool's counters
    pub fn summary(&self) -> Summary {
        self.shared.stats.snapshot(self.shared.cancel.is_cancelled())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

impl<J, R> Pool<J, Outcome<R>>
where
    J: Send + 'static,
    R: Send + 'static,
{
    /// Create an idle pool whose workers survive panicking transforms
    ///
    /// Each job yields `Outcome::Done` or, if the transform panicked,
    /// `Outcome::Failed` carrying the job's sequence number.
    pub fn with_outcomes<F>(config: PoolConfig, transform: F) -> PoolResult<Self>
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let guarded = move |seq: u64, job: J| match catch_unwind(AssertUnwindSafe(|| transform(job))) {
            Ok(result) => Outcome::Done(result),
            Err(payload) => {
                let failure = TransformFailure::from_panic(seq, &*payload);
                kwarn!("{}", failure);
                Outcome::Failed(failure)
            }
        };
        Self::from_transform(config, Arc::new(guarded))
    }
}

impl<J, R> Drop for Pool<J, R> {
    fn drop(&mut self) {
        // Workers and source threads are detached; an open intake would keep
        // them blocked forever, started or not
        if !self.shared.intake.is_closed() {
            self.shared.cancel();
        }
    }
}

impl<J, R> std::fmt::Debug for Pool<J, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("state", &self.shared.state.load())
            .field("workers", &self.shared.config.num_workers)
            .field("summary", &self.shared.stats.snapshot(self.shared.cancel.is_cancelled()))
            .finish()
    }
}
