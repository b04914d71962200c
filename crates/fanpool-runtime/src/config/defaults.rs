//! Library defaults for `PoolConfig`
//!
//! Every value can be overridden at runtime via the matching `FP_*`
//! environment variable (see `PoolConfig::from_env`).

/// Worker threads per pool
pub const NUM_WORKERS: usize = 4;

/// Intake queue capacity (0 = handoff)
pub const INTAKE_CAPACITY: usize = 64;

/// Outtake queue capacity (0 = handoff)
pub const OUTTAKE_CAPACITY: usize = 64;

/// Longest a blocked queue operation parks before re-checking (us)
///
/// Every idle worker wakes once per interval. `Pool::cancel` and
/// `close_intake` wake waiters directly; the interval only bounds how long
/// a token cancelled from outside the pool (a clone, a `Deadline`) goes
/// unnoticed. Raise it for pools that sit idle for long stretches.
pub const POLL_INTERVAL_US: u64 = 1_000;

/// Prefix for pool thread names
pub const THREAD_PREFIX: &str = "fanpool";
