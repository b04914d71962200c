//! Job source thread
//!
//! Feeds an iterator into the pool in order, then closes the intake. A
//! source that hits an error (cancellation, dead workers, intake already
//! closed) stops where it is and leaves the intake as it found it.

use std::thread::{self, JoinHandle};

use fanpool_core::error::{panic_message, PoolError, PoolResult};
use fanpool_core::{kdebug, kwarn};

use crate::config::PoolConfig;

/// How a source thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    /// Jobs accepted into the intake
    pub submitted: u64,
    /// Error that stopped the source early; `None` if it ran to the end
    /// and closed the intake
    pub stopped: Option<PoolError>,
}

impl SourceReport {
    /// The iterator was exhausted and the intake closed
    pub fn is_complete(&self) -> bool {
        self.stopped.is_none()
    }
}

/// Handle to a running source thread
#[derive(Debug)]
pub struct SourceHandle {
    handle: JoinHandle<SourceReport>,
}

impl SourceHandle {
    /// Whether the source thread has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the source to finish
    ///
    /// Fails with `SourceFailed` if the iterator panicked.
    pub fn join(self) -> PoolResult<SourceReport> {
        self.handle
            .join()
            .map_err(|payload| PoolError::SourceFailed(panic_message(&*payload)))
    }
}

/// Spawn a source thread
///
/// `submit` is called once per item; the first error stops the source.
/// `close` runs only after every item was accepted.
pub(crate) fn spawn_source<I, S, C>(
    config: &PoolConfig,
    jobs: I,
    submit: S,
    close: C,
) -> PoolResult<SourceHandle>
where
    I: IntoIterator + Send + 'static,
    S: Fn(I::Item) -> PoolResult<()> + Send + 'static,
    C: FnOnce() -> PoolResult<()> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(config.thread_name("source"))
        .spawn(move || feed(jobs, submit, close))
        .map_err(|e| PoolError::Spawn(e.to_string()))?;
    Ok(SourceHandle { handle })
}

fn feed<I, S, C>(jobs: I, submit: S, close: C) -> SourceReport
where
    I: IntoIterator,
    S: Fn(I::Item) -> PoolResult<()>,
    C: FnOnce() -> PoolResult<()>,
{
    let mut submitted = 0u64;
    for job in jobs {
        if let Err(e) = submit(job) {
            kwarn!("source stopped after {} job(s): {}", submitted, e);
            return SourceReport {
                submitted,
                stopped: Some(e),
            };
        }
        submitted += 1;
    }

    let stopped = close().err();
    kdebug!("source done: {} job(s), stopped={:?}", submitted, stopped);
    SourceReport { submitted, stopped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fanpool_core::BoundedQueue;

    #[test]
    fn test_feeds_then_closes() {
        let queue = Arc::new(BoundedQueue::new(8));
        let (q1, q2) = (Arc::clone(&queue), Arc::clone(&queue));

        let handle = spawn_source(
            &PoolConfig::new(),
            1..=5u32,
            move |job: u32| q1.send(job).map_err(PoolError::from),
            move || if q2.close() { Ok(()) } else { Err(PoolError::Closed) },
        )
        .unwrap();

        let report = handle.join().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.submitted, 5);
        assert!(queue.is_closed());
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_stops_on_first_error() {
        let report = feed(
            0..10u32,
            |job: u32| if job < 3 { Ok(()) } else { Err(PoolError::Cancelled) },
            || panic!("close must not run after an error"),
        );
        assert_eq!(report.submitted, 3);
        assert_eq!(report.stopped, Some(PoolError::Cancelled));
    }

    #[test]
    fn test_panicking_iterator() {
        let jobs = (0..3u32).map(|i| if i == 1 { panic!("bad input") } else { i });
        let handle = spawn_source(&PoolConfig::new(), jobs, |_: u32| Ok(()), || Ok(())).unwrap();

        assert_eq!(
            handle.join(),
            Err(PoolError::SourceFailed("bad input".to_string()))
        );
    }
}
