//! One-shot auto-resetting synchronization event.
//!
//! A `SyncEvent` pairs a boolean flag with a condition variable. `set`
//! raises the flag and wakes every waiter; the first waiter to observe the
//! raised flag consumes it, so exactly one successful `wait` is released per
//! `set`. Threads that lose the race go back to waiting. This is the
//! completion-signal half of the bridge: the agent thread sets, the caller
//! thread waits.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub struct SyncEvent {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl SyncEvent {
    /// Creates an event with the flag cleared.
    pub fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Blocks until the event is set or `timeout` expires.
    ///
    /// The deadline is computed once at call entry and is not extended by
    /// spurious wakeups. Returns `true` after consuming a set flag, `false`
    /// on expiry with the flag left untouched. A zero `timeout` polls and,
    /// when the flag happens to be set, still consumes it.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.lock_flag();
        while !*flag {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _timed_out) = self
                .cond
                .wait_timeout(flag, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            flag = guard;
        }
        *flag = false;
        true
    }

    /// Sets the flag and wakes all waiters. Idempotent when already set.
    pub fn set(&self) {
        let mut flag = self.lock_flag();
        *flag = true;
        drop(flag);
        self.cond.notify_all();
    }

    fn lock_flag(&self) -> MutexGuard<'_, bool> {
        self.flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SyncEvent {
    fn default() -> Self {
        Self::new()
    }
}
