//! Pool counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters shared by every pool thread
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    /// Jobs accepted into the intake
    pub submitted: AtomicU64,
    /// Jobs taken off the intake by a worker
    pub dequeued: AtomicU64,
    /// Transforms that returned
    pub processed: AtomicU64,
    /// Results appended to the result log
    pub collected: AtomicU64,
    /// Workers that ended by panicking
    pub failed_workers: AtomicUsize,
}

impl PoolStats {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, cancelled: bool) -> Summary {
        let submitted = self.submitted.load(Ordering::Acquire);
        let dequeued = self.dequeued.load(Ordering::Acquire);
        Summary {
            submitted,
            processed: self.processed.load(Ordering::Acquire),
            collected: self.collected.load(Ordering::Acquire),
            abandoned: submitted.saturating_sub(dequeued),
            failed_workers: self.failed_workers.load(Ordering::Acquire),
            cancelled,
        }
    }
}

/// Point-in-time view of a pool's counters
///
/// After `wait()` the numbers are final. Without cancellation or worker
/// failures `collected == submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    /// Jobs accepted into the intake
    pub submitted: u64,
    /// Jobs whose transform returned
    pub processed: u64,
    /// Results handed to the collector
    pub collected: u64,
    /// Jobs never dequeued (left behind by cancellation or dead workers)
    pub abandoned: u64,
    /// Workers that terminated by panicking
    pub failed_workers: usize,
    /// Whether cancellation fired
    pub cancelled: bool,
}

impl Summary {
    /// Every accepted job produced a collected result
    pub fn is_complete(&self) -> bool {
        self.collected == self.submitted
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "submitted={} processed={} collected={} abandoned={} failed_workers={} cancelled={}",
            self.submitted,
            self.processed,
            self.collected,
            self.abandoned,
            self.failed_workers,
            self.cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_abandoned() {
        let stats = PoolStats::default();
        for _ in 0..10 {
            PoolStats::bump(&stats.submitted);
        }
        for _ in 0..4 {
            PoolStats::bump(&stats.dequeued);
            PoolStats::bump(&stats.processed);
            PoolStats::bump(&stats.collected);
        }

        let summary = stats.snapshot(true);
        assert_eq!(summary.abandoned, 6);
        assert!(summary.cancelled);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_complete_summary() {
        let summary = Summary {
            submitted: 3,
            processed: 3,
            collected: 3,
            ..Summary::default()
        };
        assert!(summary.is_complete());
        assert_eq!(
            summary.to_string(),
            "submitted=3 processed=3 collected=3 abandoned=0 failed_workers=0 cancelled=false"
        );
    }
}
