//! # fanpool - Bounded Worker Pool
//!
//! A fixed set of worker threads applies one transform to a stream of jobs.
//!
//! ## Features
//!
//! - **Backpressure**: a bounded intake blocks producers when workers fall
//!   behind; a bounded outtake paces workers against the collector thread,
//!   which buffers results in memory until they are drained
//! - **Graceful shutdown**: close the intake and every accepted job still
//!   yields exactly one result before the pool closes
//! - **Cancellation**: cooperative, between jobs; in-flight transforms finish
//! - **Deadlines**: cancel any token after a duration
//! - **Panic isolation**: `Pool::with_outcomes` turns transform panics into
//!   `Outcome::Failed`
//!
//! ## Quick Start
//!
//! ```ignore
//! use fanpool::{Pool, PoolConfig};
//!
//! fn main() -> fanpool::PoolResult<()> {
//!     let config = PoolConfig::new().num_workers(2).capacities(2, 2);
//!     let pool = Pool::run(config, |x: u64| x * 2)?;
//!
//!     for x in 1..=5 {
//!         pool.submit(x)?;
//!     }
//!     pool.close_intake()?;
//!
//!     let summary = pool.wait()?;
//!     let mut doubled = pool.collect()?;
//!     doubled.sort();
//!     assert_eq!(doubled, vec![2, 4, 6, 8, 10]);
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   submit / feed
//!        │
//!        ▼
//! ┌──────────────┐    ┌──────────┐    ┌───────────────┐    ┌───────────┐
//! │ intake queue │ ─▶ │ worker×N │ ─▶ │ outtake queue │ ─▶ │ collector │ ─▶ drain
//! └──────────────┘    └──────────┘    └───────────────┘    └───────────┘
//!                          │                  ▲
//!                          ▼                  │ close once all exited
//!                     ┌────────────┐          │
//!                     │ supervisor │ ─────────┘
//!                     └────────────┘
//! ```

// Re-export core types
pub use fanpool_core::{
    BoundedQueue,
    CancellationToken,
    CountdownLatch,
    PoolState,
    PoolError,
    PoolResult,
    RecvError,
    SendError,
    TransformFailure,
};

// Re-export kprint macros for debug logging
pub use fanpool_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use fanpool_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use fanpool_core::{env_get, env_get_bool, env_get_micros, env_get_opt, env_get_str};

// Re-export runtime types
pub use fanpool_runtime::{
    Pool,
    PoolConfig,
    Drain,
    Summary,
    Outcome,
    WorkerExit,
    SourceHandle,
    SourceReport,
    Deadline,
    SleepOutcome,
    sleep_or_cancel,
};
pub use fanpool_runtime::config::defaults;

/// Run `transform` over `jobs` on a pool built from `config` and return the
/// results in arrival order
///
/// Convenience for the common submit-everything-then-wait shape.
pub fn map<J, R, I, F>(config: PoolConfig, jobs: I, transform: F) -> PoolResult<Vec<R>>
where
    J: Send + 'static,
    R: Send + 'static,
    I: IntoIterator<Item = J> + Send + 'static,
    F: Fn(J) -> R + Send + Sync + 'static,
{
    let pool = Pool::run(config, transform)?;
    let source = pool.feed(jobs)?;
    let results = pool.collect()?;

    let report = source.join()?;
    if let Some(err) = report.stopped {
        return Err(err);
    }
    pool.wait()?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map() {
        let config = PoolConfig::new().num_workers(3).capacities(4, 4);
        let mut out = map(config, 0..100u32, |x: u32| x + 1).unwrap();
        out.sort_unstable();
        assert_eq!(out, (1..=100).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_reports_worker_panic() {
        let config = PoolConfig::new().num_workers(2).capacities(64, 64);
        let err = map(config, 0..10u32, |x: u32| if x == 5 { panic!("five") } else { x });
        assert_eq!(err, Err(PoolError::WorkersFailed { failed: 1 }));
    }
}
