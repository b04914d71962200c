//! Pool configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env`)
//! 3. Library defaults (`defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use fanpool_runtime::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .num_workers(8)
//!     .intake_capacity(16);
//! ```

pub mod defaults;

use std::time::Duration;

use fanpool_core::constants::MAX_WORKERS;
use fanpool_core::env::{env_get, env_get_micros, env_get_str};
use fanpool_core::error::{PoolError, PoolResult};

/// Pool configuration with builder pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads (fixed for the pool's lifetime)
    pub num_workers: usize,
    /// Intake queue capacity; 0 hands each job directly to a worker
    pub intake_capacity: usize,
    /// Outtake queue capacity; 0 hands each result directly to the collector
    pub outtake_capacity: usize,
    /// Longest a blocked queue operation parks before re-checking
    /// cancellation; also the wake-up rate of each idle worker
    pub poll_interval: Duration,
    /// Prefix for thread names (`<prefix>-worker-<i>`, ...)
    pub thread_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `FP_WORKERS` - Number of worker threads
    /// - `FP_INTAKE_CAPACITY` - Intake queue capacity
    /// - `FP_OUTTAKE_CAPACITY` - Outtake queue capacity
    /// - `FP_POLL_INTERVAL_US` - Poll interval in microseconds
    /// - `FP_THREAD_PREFIX` - Thread name prefix
    pub fn from_env() -> Self {
        Self {
            num_workers: env_get("FP_WORKERS", defaults::NUM_WORKERS),
            intake_capacity: env_get("FP_INTAKE_CAPACITY", defaults::INTAKE_CAPACITY),
            outtake_capacity: env_get("FP_OUTTAKE_CAPACITY", defaults::OUTTAKE_CAPACITY),
            poll_interval: env_get_micros(
                "FP_POLL_INTERVAL_US",
                Duration::from_micros(defaults::POLL_INTERVAL_US),
            ),
            thread_prefix: env_get_str("FP_THREAD_PREFIX", defaults::THREAD_PREFIX),
        }
    }

    /// Create config with library defaults only (no env override).
    /// Useful for tests.
    pub fn new() -> Self {
        Self {
            num_workers: defaults::NUM_WORKERS,
            intake_capacity: defaults::INTAKE_CAPACITY,
            outtake_capacity: defaults::OUTTAKE_CAPACITY,
            poll_interval: Duration::from_micros(defaults::POLL_INTERVAL_US),
            thread_prefix: defaults::THREAD_PREFIX.to_string(),
        }
    }

    // Builder methods

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn intake_capacity(mut self, cap: usize) -> Self {
        self.intake_capacity = cap;
        self
    }

    pub fn outtake_capacity(mut self, cap: usize) -> Self {
        self.outtake_capacity = cap;
        self
    }

    /// Set both queue capacities at once
    pub fn capacities(self, intake: usize, outtake: usize) -> Self {
        self.intake_capacity(intake).outtake_capacity(outtake)
    }

    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    pub fn thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> PoolResult<()> {
        if self.num_workers == 0 {
            return Err(PoolError::InvalidConfig("num_workers must be > 0"));
        }
        if self.num_workers > MAX_WORKERS {
            return Err(PoolError::InvalidConfig("num_workers exceeds MAX_WORKERS"));
        }
        if self.poll_interval.is_zero() {
            return Err(PoolError::InvalidConfig("poll_interval must be > 0"));
        }
        Ok(())
    }

    /// Thread name for a pool role (`worker-3`, `supervisor`, ...)
    pub(crate) fn thread_name(&self, role: &str) -> String {
        format!("{}-{}", self.thread_prefix, role)
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("fanpool configuration:");
        eprintln!("  num_workers:       {}", self.num_workers);
        eprintln!("  intake_capacity:   {}", self.intake_capacity);
        eprintln!("  outtake_capacity:  {}", self.outtake_capacity);
        eprintln!("  poll_interval:     {:?}", self.poll_interval);
        eprintln!("  thread_prefix:     {}", self.thread_prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PoolConfig::new();
        assert_eq!(config.num_workers, defaults::NUM_WORKERS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new()
            .num_workers(2)
            .capacities(0, 5)
            .poll_interval(Duration::from_micros(200))
            .thread_prefix("jobs");

        assert_eq!(config.num_workers, 2);
        assert_eq!(config.intake_capacity, 0);
        assert_eq!(config.outtake_capacity, 5);
        assert_eq!(config.poll_interval, Duration::from_micros(200));
        assert_eq!(config.thread_name("worker-1"), "jobs-worker-1");
    }

    #[test]
    fn test_validation() {
        let config = PoolConfig::new().num_workers(0);
        assert_eq!(
            config.validate(),
            Err(PoolError::InvalidConfig("num_workers must be > 0"))
        );

        let config = PoolConfig::new().num_workers(MAX_WORKERS + 1);
        assert!(config.validate().is_err());

        let config = PoolConfig::new().poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("FP_OUTTAKE_CAPACITY", "7");
        let config = PoolConfig::from_env();
        std::env::remove_var("FP_OUTTAKE_CAPACITY");

        assert_eq!(config.outtake_capacity, 7);
        assert!(config.validate().is_ok());
    }
}
