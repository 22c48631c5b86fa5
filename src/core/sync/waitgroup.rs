/*!
 * WaitGroup
 *
 * Countdown synchronizer: `add` raises the counter, `done` lowers it, and
 * `wait` blocks until it reaches zero.
 *
 * The counter and the number of blocked waiters share one `u64` (counter in
 * the high half, waiters in the low half) so that the transition to zero and
 * the decision to wake waiters are a single atomic step.
 */

use super::wait::{QueueOrder, Sema};
use crate::core::errors::{fatal, SyncError};
use std::sync::atomic::{AtomicU64, Ordering};

#[inline(always)]
fn counter(state: u64) -> i32 {
    (state >> 32) as i32
}

#[inline(always)]
fn waiters(state: u64) -> u32 {
    state as u32
}

/// Waits for a collection of tasks to finish
#[derive(Debug)]
pub struct WaitGroup {
    state: AtomicU64,
    sema: Sema,
}

impl WaitGroup {
    pub const fn new() -> Self {
        Self {
            state: AtomicU64::new(0),
            sema: Sema::new(0),
        }
    }

    /// Adjust the counter by `delta`, which may be negative
    ///
    /// Positive deltas that start a new round must happen before `wait`.
    /// A negative counter is fatal misuse.
    pub fn add(&self, delta: i32) {
        let shifted = (delta as i64 as u64) << 32;
        let state = self
            .state
            .fetch_add(shifted, Ordering::AcqRel)
            .wrapping_add(shifted);
        let v = counter(state);
        let w = waiters(state);

        if v < 0 {
            fatal(SyncError::NegativeWaitGroupCounter);
        }
        if w != 0 && delta > 0 && v == delta {
            fatal(SyncError::AddConcurrentWithWait);
        }
        if v > 0 || w == 0 {
            return;
        }

        // Counter is zero with waiters registered. Nobody may change the
        // state now: adds must not race with wait, and wait does not
        // register on a zero counter. Recheck to catch misuse.
        if self.state.load(Ordering::Acquire) != state {
            fatal(SyncError::AddConcurrentWithWait);
        }
        self.state.store(0, Ordering::Release);
        for _ in 0..w {
            self.sema.release(false);
        }
    }

    /// Decrement the counter by one
    #[inline]
    pub fn done(&self) {
        self.add(-1);
    }

    /// Block until the counter reaches zero
    pub fn wait(&self) {
        let mut state = self.state.load(Ordering::Acquire);
        loop {
            if counter(state) == 0 {
                return;
            }
            if waiters(state) == u32::MAX {
                fatal(SyncError::WaiterOverflow("WaitGroup"));
            }
            match self.state.compare_exchange_weak(
                state,
                state + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.sema.acquire(QueueOrder::Fifo);
                    if self.state.load(Ordering::Acquire) != 0 {
                        fatal(SyncError::WaitGroupReused);
                    }
                    return;
                }
                Err(actual) => state = actual,
            }
        }
    }

    /// Current counter value (diagnostics only)
    pub fn counter(&self) -> i32 {
        counter(self.state.load(Ordering::Relaxed))
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}
