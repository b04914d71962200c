//! Error types for the worker pool

use core::fmt;

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors that can occur in pool operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Intake (or outtake) already closed
    Closed,

    /// Submission refused because the pool was cancelled
    Cancelled,

    /// Intake is at capacity (non-blocking submit only)
    Full,

    /// Every worker has exited; nothing will consume the intake
    NoWorkers,

    /// Pool was never started
    NotStarted,

    /// Pool already started
    AlreadyStarted,

    /// The result stream was already handed out
    DrainTaken,

    /// A timed wait expired
    Timeout,

    /// One or more workers terminated abnormally
    WorkersFailed { failed: usize },

    /// Configuration rejected by validation
    InvalidConfig(&'static str),

    /// OS refused to spawn a pool thread
    Spawn(String),

    /// A feeding thread panicked while producing jobs
    SourceFailed(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Closed => write!(f, "queue closed"),
            PoolError::Cancelled => write!(f, "pool cancelled"),
            PoolError::Full => write!(f, "intake full"),
            PoolError::NoWorkers => write!(f, "no live workers"),
            PoolError::NotStarted => write!(f, "pool not started"),
            PoolError::AlreadyStarted => write!(f, "pool already started"),
            PoolError::DrainTaken => write!(f, "result stream already taken"),
            PoolError::Timeout => write!(f, "operation timed out"),
            PoolError::WorkersFailed { failed } => {
                write!(f, "{} worker(s) terminated abnormally", failed)
            }
            PoolError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            PoolError::Spawn(msg) => write!(f, "failed to spawn thread: {}", msg),
            PoolError::SourceFailed(msg) => write!(f, "job source failed: {}", msg),
        }
    }
}

impl std::error::Error for PoolError {}

/// A transform panic caught by a worker running in outcome mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure {
    /// Arrival sequence number of the job that failed
    pub seq: u64,
    /// Panic payload rendered as text
    pub message: String,
}

impl TransformFailure {
    /// Build a failure from a `catch_unwind` payload
    pub fn from_panic(seq: u64, payload: &(dyn std::any::Any + Send)) -> Self {
        Self {
            seq,
            message: panic_message(payload),
        }
    }
}

/// Render a `catch_unwind` / `join` panic payload as text
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job #{} failed: {}", self.seq, self.message)
    }
}

impl std::error::Error for TransformFailure {}

/// Error returned by queue sends; hands the rejected value back
#[derive(Clone, PartialEq, Eq)]
pub enum SendError<T> {
    /// Queue closed before the value could be enqueued
    Closed(T),
    /// Cancellation observed while waiting for space
    Cancelled(T),
    /// Queue at capacity (try_send only)
    Full(T),
}

impl<T> SendError<T> {
    /// Recover the value that could not be sent
    pub fn into_inner(self) -> T {
        match self {
            SendError::Closed(v) | SendError::Cancelled(v) | SendError::Full(v) => v,
        }
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => write!(f, "Closed(..)"),
            SendError::Cancelled(_) => write!(f, "Cancelled(..)"),
            SendError::Full(_) => write!(f, "Full(..)"),
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => write!(f, "send on closed queue"),
            SendError::Cancelled(_) => write!(f, "send cancelled"),
            SendError::Full(_) => write!(f, "queue full"),
        }
    }
}

impl<T> From<SendError<T>> for PoolError {
    fn from(e: SendError<T>) -> Self {
        match e {
            SendError::Closed(_) => PoolError::Closed,
            SendError::Cancelled(_) => PoolError::Cancelled,
            SendError::Full(_) => PoolError::Full,
        }
    }
}

/// Error returned by queue receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// Queue closed and fully drained
    Closed,
    /// Cancellation observed while waiting for a value
    Cancelled,
    /// Queue empty (try_recv only)
    Empty,
    /// Timed receive expired
    Timeout,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvError::Closed => write!(f, "queue closed and empty"),
            RecvError::Cancelled => write!(f, "receive cancelled"),
            RecvError::Empty => write!(f, "queue empty"),
            RecvError::Timeout => write!(f, "receive timed out"),
        }
    }
}

impl std::error::Error for RecvError {}

impl From<RecvError> for PoolError {
    fn from(e: RecvError) -> Self {
        match e {
            RecvError::Closed | RecvError::Empty => PoolError::Closed,
            RecvError::Cancelled => PoolError::Cancelled,
            RecvError::Timeout => PoolError::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PoolError::Closed;
        assert_eq!(format!("{}", e), "queue closed");

        let e = PoolError::WorkersFailed { failed: 2 };
        assert_eq!(format!("{}", e), "2 worker(s) terminated abnormally");
    }

    #[test]
    fn test_send_error_conversion() {
        let err: PoolError = SendError::Closed(7).into();
        assert_eq!(err, PoolError::Closed);

        let err: PoolError = SendError::Cancelled(7).into();
        assert_eq!(err, PoolError::Cancelled);
    }

    #[test]
    fn test_send_error_returns_value() {
        let err = SendError::Full(String::from("job"));
        assert_eq!(err.into_inner(), "job");
    }

    #[test]
    fn test_failure_from_panic_payload() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 3)).unwrap_err();
        let failure = TransformFailure::from_panic(9, payload.as_ref());
        assert_eq!(failure.seq, 9);
        assert_eq!(failure.message, "boom 3");

        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        let failure = TransformFailure::from_panic(1, payload.as_ref());
        assert_eq!(failure.message, "static");
    }
}
