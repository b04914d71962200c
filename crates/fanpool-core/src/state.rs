//! Pool lifecycle state

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a pool
///
/// Transitions only move forward: `Idle → Running → Draining → Closed`.
/// `Running` may jump straight to `Closed` when the intake drains before
/// anyone observes `Draining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PoolState {
    /// Constructed, no workers started
    Idle = 0,

    /// Workers active, consuming intake
    Running = 1,

    /// Intake closed or cancellation fired; workers finishing in-flight work
    Draining = 2,

    /// All workers exited, outtake closed (terminal)
    Closed = 3,
}

impl PoolState {
    /// Check if workers have been started
    #[inline]
    pub const fn is_started(&self) -> bool {
        !matches!(self, PoolState::Idle)
    }

    /// Check if the pool reached its terminal state
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, PoolState::Closed)
    }
}

impl From<u8> for PoolState {
    fn from(v: u8) -> Self {
        match v {
            0 => PoolState::Idle,
            1 => PoolState::Running,
            2 => PoolState::Draining,
            _ => PoolState::Closed,
        }
    }
}

impl From<PoolState> for u8 {
    fn from(state: PoolState) -> u8 {
        state as u8
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolState::Idle => "idle",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Atomic cell holding a `PoolState` that only moves forward
#[derive(Debug)]
pub struct AtomicPoolState {
    value: AtomicU8,
}

impl AtomicPoolState {
    /// Create a cell in `Idle`
    pub const fn new() -> Self {
        Self {
            value: AtomicU8::new(PoolState::Idle as u8),
        }
    }

    /// Current state
    #[inline]
    pub fn load(&self) -> PoolState {
        PoolState::from(self.value.load(Ordering::Acquire))
    }

    /// Move from exactly `from` to `to`
    ///
    /// Returns `true` if this call performed the transition.
    pub fn transition(&self, from: PoolState, to: PoolState) -> bool {
        debug_assert!(from < to, "state may only move forward");
        self.value
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Advance to `to` unless already at or past it
    ///
    /// Returns the previous state.
    pub fn advance(&self, to: PoolState) -> PoolState {
        PoolState::from(self.value.fetch_max(to as u8, Ordering::AcqRel))
    }
}

impl Default for AtomicPoolState {
    fn default() -> Self {
        Self::new()
    }
}
