//! # fanpool-runtime
//!
//! Thread-backed implementation of the fanpool worker pool.
//!
//! This crate provides:
//! - Pool configuration (compile-time defaults + `FP_*` environment overrides)
//! - Worker threads sharing a bounded intake and outtake
//! - Supervisor that closes the outtake once every worker has exited
//! - Collector that buffers results for the `Drain` iterator
//! - Source threads feeding an iterator into a pool
//! - Deadlines that cancel a token after a duration

pub mod config;
pub mod pool;
pub mod deadline;
pub mod outcome;
pub mod source;
pub mod stats;
pub mod worker;

mod collector;
mod supervisor;

// Re-exports
pub use config::PoolConfig;
pub use pool::Pool;
pub use collector::Drain;
pub use deadline::{sleep_or_cancel, Deadline, SleepOutcome};
pub use outcome::Outcome;
pub use source::{SourceHandle, SourceReport};
pub use stats::Summary;
pub use worker::WorkerExit;
