//! Bounded, closable MPMC queue
//!
//! Storage is a lock-free `ArrayQueue`; blocking is layered on top with two
//! parking instances (`not_empty` for receivers, `not_full` for senders).
//! Each value is popped by exactly one receiver.
//!
//! Closing is explicit and one-shot. After `close()`:
//! - sends fail with `SendError::Closed`
//! - receivers keep draining buffered values, then get `RecvError::Closed`
//!
//! Capacity 0 gives handoff semantics: a single slot holds the value and the
//! sender waits until a receiver has picked it up.
//!
//! Blocking waits park for at most the poll interval before re-checking
//! closure and cancellation, so a token cancelled from anywhere is observed
//! within one poll cycle even if nobody wakes the queue.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;

use crate::cancel::CancellationToken;
use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::error::{RecvError, SendError};
use crate::parking::{new_parking, Parking, PlatformParking};

/// One buffered value; `ack` is set for handoff (capacity 0) sends
struct Slot<T> {
    value: T,
    ack: Option<Arc<AtomicBool>>,
}

/// Bounded multi-producer/multi-consumer FIFO with explicit close
pub struct BoundedQueue<T> {
    /// Buffered values
    slots: ArrayQueue<Slot<T>>,

    /// Requested capacity (0 = handoff)
    capacity: usize,

    /// Closed flag (one-way)
    closed: AtomicBool,

    /// Senders between their closed check and their push
    inflight: AtomicUsize,

    /// Receivers wait here for values
    not_empty: PlatformParking,

    /// Senders wait here for space
    not_full: PlatformParking,

    /// Handoff senders wait here for pickup
    picked_up: PlatformParking,

    /// Upper bound on a single park
    poll_interval: Duration,
}

impl<T> BoundedQueue<T> {
    /// Create a queue with the default poll interval
    pub fn new(capacity: usize) -> Self {
        Self::with_poll_interval(capacity, DEFAULT_POLL_INTERVAL)
    }

    /// Create a queue with an explicit poll interval
    pub fn with_poll_interval(capacity: usize, poll_interval: Duration) -> Self {
        Self {
            slots: ArrayQueue::new(capacity.max(1)),
            capacity,
            closed: AtomicBool::new(false),
            inflight: AtomicUsize::new(0),
            not_empty: new_parking(),
            not_full: new_parking(),
            picked_up: new_parking(),
            poll_interval: poll_interval.max(Duration::from_micros(1)),
        }
    }

    /// Configured capacity (0 for handoff queues)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered values
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no values are buffered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check if the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the queue
    ///
    /// Returns `true` for the call that closed it, `false` if it was
    /// already closed. Wakes every blocked sender and receiver.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.not_empty.wake_all();
        self.not_full.wake_all();
        self.picked_up.wake_all();
        true
    }

    /// Wake every blocked party so it re-checks its cancellation token
    pub fn notify_all(&self) {
        self.not_empty.wake_all();
        self.not_full.wake_all();
        self.picked_up.wake_all();
    }

    // ------------------------------------------------------------------
    // Send side
    // ------------------------------------------------------------------

    /// Try to send without blocking
    ///
    /// On a handoff queue this only places the value in the free slot;
    /// it does not wait for the pickup, so one value can be accepted with
    /// no receiver present.
    pub fn try_send(&self, value: T) -> Result<(), SendError<T>> {
        match self.push(Slot { value, ack: None }) {
            Ok(()) => Ok(()),
            Err((slot, true)) => Err(SendError::Closed(slot.value)),
            Err((slot, false)) => Err(SendError::Full(slot.value)),
        }
    }

    /// Send a value, blocking while the queue is full
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.send_inner(value, None)
    }

    /// Send a value, blocking while full unless `token` is cancelled
    pub fn send_cancellable(&self, value: T, token: &CancellationToken) -> Result<(), SendError<T>> {
        self.send_inner(value, Some(token))
    }

    fn send_inner(&self, value: T, token: Option<&CancellationToken>) -> Result<(), SendError<T>> {
        let ack = if self.capacity == 0 {
            Some(Arc::new(AtomicBool::new(false)))
        } else {
            None
        };
        let mut slot = Slot { value, ack: ack.clone() };

        loop {
            // Epoch first: a cancel after this read still ends the park
            let seen = self.not_full.epoch();
            if token.map_or(false, |t| t.is_cancelled()) {
                return Err(SendError::Cancelled(slot.value));
            }

            match self.push(slot) {
                Ok(()) => break,
                Err((returned, true)) => return Err(SendError::Closed(returned.value)),
                Err((returned, false)) => {
                    slot = returned;
                    self.not_full.park(seen, Some(self.poll_interval));
                }
            }
        }

        if let Some(ack) = ack {
            self.await_pickup(&ack, token);
        }
        Ok(())
    }

    /// Push one slot; on failure returns it with `true` if the queue is closed
    fn push(&self, slot: Slot<T>) -> Result<(), (Slot<T>, bool)> {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            return Err((slot, true));
        }

        let result = self.slots.push(slot);
        self.inflight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.not_empty.wake_one();
                Ok(())
            }
            Err(slot) => Err((slot, false)),
        }
    }

    /// Wait until a receiver took the handed-off value, the queue closes,
    /// or the token is cancelled
    fn await_pickup(&self, ack: &AtomicBool, token: Option<&CancellationToken>) {
        loop {
            let seen = self.picked_up.epoch();
            if ack.load(Ordering::Acquire)
                || self.is_closed()
                || token.map_or(false, |t| t.is_cancelled())
            {
                return;
            }
            self.picked_up.park(seen, Some(self.poll_interval));
        }
    }

    // ------------------------------------------------------------------
    // Receive side
    // ------------------------------------------------------------------

    /// Try to receive without blocking
    pub fn try_recv(&self) -> Result<T, RecvError> {
        if let Some(slot) = self.slots.pop() {
            return Ok(self.taken(slot));
        }
        // A sender that passed its closed check before close() may still be
        // pushing; report Empty until it lands so the value is not lost.
        if self.drained() {
            return Err(RecvError::Closed);
        }
        Err(RecvError::Empty)
    }

    /// Receive a value, blocking while the queue is empty and open
    pub fn recv(&self) -> Result<T, RecvError> {
        self.recv_inner(None, None)
    }

    /// Receive a value unless `token` is cancelled first
    ///
    /// The token is checked before every dequeue attempt.
    pub fn recv_cancellable(&self, token: &CancellationToken) -> Result<T, RecvError> {
        self.recv_inner(Some(token), None)
    }

    /// Receive a value, giving up after `timeout`
    ///
    /// A timeout past the representable range of `Instant` behaves like
    /// `recv`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvError> {
        self.recv_inner(None, Instant::now().checked_add(timeout))
    }

    fn recv_inner(
        &self,
        token: Option<&CancellationToken>,
        deadline: Option<Instant>,
    ) -> Result<T, RecvError> {
        loop {
            let seen = self.not_empty.epoch();
            if token.map_or(false, |t| t.is_cancelled()) {
                return Err(RecvError::Cancelled);
            }

            match self.try_recv() {
                Ok(value) => return Ok(value),
                Err(RecvError::Empty) => {}
                Err(e) => return Err(e),
            }

            let mut wait = self.poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(RecvError::Timeout);
                }
                wait = wait.min(deadline - now);
            }
            self.not_empty.park(seen, Some(wait));
        }
    }

    /// Closed, no sender mid-push, nothing buffered
    fn drained(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
            && self.inflight.load(Ordering::SeqCst) == 0
            && self.slots.is_empty()
    }

    fn taken(&self, slot: Slot<T>) -> T {
        self.not_full.wake_one();
        if let Some(ack) = slot.ack {
            ack.store(true, Ordering::Release);
            self.picked_up.wake_all();
        }
        slot.value
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_basic_send_recv() {
        let q = BoundedQueue::new(10);

        q.try_send(42).unwrap();
        assert_eq!(q.try_recv().unwrap(), 42);
    }

    #[test]
    fn test_fifo_order() {
        let q = BoundedQueue::new(10);

        for i in 0..5 {
            q.send(i).unwrap();
        }

        for i in 0..5 {
            assert_eq!(q.recv().unwrap(), i);
        }
    }

    #[test]
    fn test_buffer_full() {
        let q = BoundedQueue::new(2);

        q.try_send(1).unwrap();
        q.try_send(2).unwrap();

        assert!(matches!(q.try_send(3), Err(SendError::Full(3))));

        q.try_recv().unwrap();
        q.try_send(3).unwrap();
    }

    #[test]
    fn test_empty_recv() {
        let q = BoundedQueue::<i32>::new(10);
        assert_eq!(q.try_recv(), Err(RecvError::Empty));
    }

    #[test]
    fn test_close_drains_then_reports_closed() {
        let q = BoundedQueue::new(10);

        q.send(1).unwrap();
        q.send(2).unwrap();
        assert!(q.close());
        assert!(!q.close());

        assert_eq!(q.recv().unwrap(), 1);
        assert_eq!(q.recv().unwrap(), 2);
        assert_eq!(q.recv(), Err(RecvError::Closed));
        assert_eq!(q.try_recv(), Err(RecvError::Closed));
    }

    #[test]
    fn test_send_after_close() {
        let q = BoundedQueue::new(4);
        q.close();

        match q.send(5) {
            Err(SendError::Closed(v)) => assert_eq!(v, 5),
            other => panic!("expected Closed, got {:?}", other),
        }
        assert!(matches!(q.try_send(6), Err(SendError::Closed(6))));
    }

    #[test]
    fn test_blocked_sender_resumes_after_recv() {
        let q = Arc::new(BoundedQueue::new(1));
        q.send(1).unwrap();

        let q2 = Arc::clone(&q);
        let handle = thread::spawn(move || q2.send(2));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(q.len(), 1);
        assert_eq!(q.recv().unwrap(), 1);

        handle.join().unwrap().unwrap();
        assert_eq!(q.recv().unwrap(), 2);
    }

    #[test]
    fn test_blocked_receiver_sees_close() {
        let q = Arc::new(BoundedQueue::<u32>::new(2));
        let q2 = Arc::clone(&q);

        let handle = thread::spawn(move || q2.recv());

        thread::sleep(Duration::from_millis(20));
        q.close();

        assert_eq!(handle.join().unwrap(), Err(RecvError::Closed));
    }

    #[test]
    fn test_cancel_unblocks_sender() {
        let q = Arc::new(BoundedQueue::new(1));
        q.send(0).unwrap();

        let token = CancellationToken::new();
        let (q2, t2) = (Arc::clone(&q), token.clone());
        let handle = thread::spawn(move || q2.send_cancellable(7, &t2));

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        match handle.join().unwrap() {
            Err(SendError::Cancelled(v)) => assert_eq!(v, 7),
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_unblocks_receiver() {
        let q = Arc::new(BoundedQueue::<u32>::new(1));
        let token = CancellationToken::new();
        let (q2, t2) = (Arc::clone(&q), token.clone());

        let handle = thread::spawn(move || q2.recv_cancellable(&t2));

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        assert_eq!(handle.join().unwrap(), Err(RecvError::Cancelled));
    }

    #[test]
    fn test_cancelled_receiver_stops_dequeuing() {
        let q = BoundedQueue::new(4);
        q.send(1).unwrap();

        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(q.recv_cancellable(&token), Err(RecvError::Cancelled));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_recv_timeout() {
        let q = BoundedQueue::<u8>::new(1);
        let start = Instant::now();

        assert_eq!(q.recv_timeout(Duration::from_millis(30)), Err(RecvError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_recv_timeout_unbounded() {
        let q = Arc::new(BoundedQueue::new(1));
        let q2 = Arc::clone(&q);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            q2.send(3u8).unwrap();
        });

        assert_eq!(q.recv_timeout(Duration::MAX), Ok(3));
        handle.join().unwrap();

        q.close();
        assert_eq!(q.recv_timeout(Duration::MAX), Err(RecvError::Closed));
    }

    #[test]
    fn test_handoff_waits_for_pickup() {
        let q = Arc::new(BoundedQueue::new(0));
        let q2 = Arc::clone(&q);

        let handle = thread::spawn(move || {
            q2.send(11).unwrap();
            Instant::now()
        });

        thread::sleep(Duration::from_millis(50));
        let picked = Instant::now();
        assert_eq!(q.recv().unwrap(), 11);

        let returned = handle.join().unwrap();
        assert!(returned >= picked);
    }

    #[test]
    fn test_handoff_holds_one_value() {
        let q = BoundedQueue::new(0);
        assert_eq!(q.capacity(), 0);

        q.try_send(1).unwrap();
        assert!(matches!(q.try_send(2), Err(SendError::Full(2))));
    }

    #[test]
    fn test_mpmc_exactly_once() {
        let q = Arc::new(BoundedQueue::new(8));
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let mut producers = vec![];
        for p in 0..PRODUCERS {
            let q = Arc::clone(&q);
            producers.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    q.send(p * PER_PRODUCER + i).unwrap();
                }
            }));
        }

        let mut consumers = vec![];
        for _ in 0..3 {
            let q = Arc::clone(&q);
            consumers.push(thread::spawn(move || {
                let mut got = vec![];
                while let Ok(v) = q.recv() {
                    got.push(v);
                }
                got
            }));
        }

        for h in producers {
            h.join().unwrap();
        }
        q.close();

        let mut seen = HashSet::new();
        let mut total = 0;
        for h in consumers {
            for v in h.join().unwrap() {
                assert!(seen.insert(v), "value {} delivered twice", v);
                total += 1;
            }
        }
        assert_eq!(total, PRODUCERS * PER_PRODUCER);
    }
}
