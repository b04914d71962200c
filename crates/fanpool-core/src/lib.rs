//! # fanpool-core
//!
//! Platform-agnostic primitives for the fanpool worker pool.
//!
//! Nothing here knows about workers or transforms; the runtime crate
//! composes these pieces into a pool.
//!
//! ## Modules
//!
//! - `queue` - Bounded, closable MPMC queue with blocking/cancellable/timed ops
//! - `cancel` - Write-once cancellation token with parent-child linking
//! - `latch` - Countdown latch used to join a fixed set of threads
//! - `state` - Pool lifecycle state machine
//! - `parking` - Epoch-based sleep/wake (futex on Linux, condvar elsewhere)
//! - `error` - Error types
//! - `kprint` - Kernel-style leveled logging macros
//! - `env` - Environment variable utilities

pub mod queue;
pub mod cancel;
pub mod latch;
pub mod state;
pub mod parking;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use queue::BoundedQueue;
pub use cancel::CancellationToken;
pub use latch::CountdownLatch;
pub use state::{AtomicPoolState, PoolState};
pub use parking::{new_parking, Parking, PlatformParking};
pub use error::{panic_message, PoolError, PoolResult, RecvError, SendError, TransformFailure};
pub use env::{env_get, env_get_bool, env_get_micros, env_get_opt, env_get_str};

/// Shared constants
pub mod constants {
    use std::time::Duration;

    /// Longest a blocked queue operation parks before re-checking
    /// closure and cancellation
    ///
    /// Parked threads wake at this rate even when nothing happens.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Upper bound on workers per pool
    pub const MAX_WORKERS: usize = 1024;
}
