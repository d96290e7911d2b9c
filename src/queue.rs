//! Fixed-capacity blocking queue shared between caller threads and the
//! agent thread.
//!
//! The queue is a circular buffer guarded by one mutex and two conditions,
//! one per direction. Every successful send or receive broadcasts to all
//! waiters on the opposite condition rather than waking a single thread.
//! Under heavy contention that costs some spurious wakeups, but it keeps the
//! wait loops trivial and cannot strand a waiter; single-wake is not worth
//! the complexity at the queue depths this crate runs at.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Multi-producer multi-consumer bounded queue with timed blocking
/// send and receive.
///
/// Items move through the queue by value, strictly FIFO. A send into a full
/// queue and a receive from an empty queue block up to a caller-supplied
/// timeout; the deadline is computed once at call entry and holds across
/// spurious wakeups.
pub struct SyncQueue<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
    slot_freed: Condvar,
    item_ready: Condvar,
}

struct Ring<T> {
    items: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> SyncQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// `Error::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity("queue capacity cannot be zero"));
        }
        let mut items = Vec::new();
        items.resize_with(capacity, || None);
        Ok(Self {
            ring: Mutex::new(Ring {
                items,
                head: 0,
                tail: 0,
                len: 0,
            }),
            capacity,
            slot_freed: Condvar::new(),
            item_ready: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.lock_ring().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends `item`, blocking while the queue is full.
    ///
    /// A zero `timeout` makes this a try-send. On timeout the item is handed
    /// back unchanged in `Err` and the queue is not mutated.
    pub fn send(&self, item: T, timeout: Duration) -> std::result::Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut ring = self.lock_ring();
        while ring.len == self.capacity {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(item);
            }
            ring = self.wait_on(&self.slot_freed, ring, remaining);
        }

        let tail = ring.tail;
        ring.items[tail] = Some(item);
        ring.tail = (tail + 1) % self.capacity;
        ring.len += 1;
        drop(ring);

        self.item_ready.notify_all();
        Ok(())
    }

    /// Receives the oldest item, blocking while the queue is empty.
    ///
    /// A zero `timeout` makes this a try-receive. Returns `None` when the
    /// deadline passes with the queue still empty.
    pub fn recv(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut ring = self.lock_ring();
        while ring.len == 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            ring = self.wait_on(&self.item_ready, ring, remaining);
        }

        let head = ring.head;
        let item = ring.items[head]
            .take()
            .expect("queue invariant: occupied slot at head");
        ring.head = (head + 1) % self.capacity;
        ring.len -= 1;
        drop(ring);

        self.slot_freed.notify_all();
        Some(item)
    }

    // Ring mutations are straight-line moves that cannot panic, so a lock
    // poisoned by a panicking waiter still guards a consistent ring.
    fn lock_ring(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait_on<'a>(
        &self,
        cond: &Condvar,
        ring: MutexGuard<'a, Ring<T>>,
        remaining: Duration,
    ) -> MutexGuard<'a, Ring<T>> {
        let (ring, _timed_out) = cond
            .wait_timeout(ring, remaining)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ring
    }
}
