/*!
 * Fair Mutex
 *
 * Mutual exclusion lock with a starvation-avoidance protocol.
 *
 * # State Word
 *
 * A single `i32`, updated with one atomic instruction on every path:
 * - bit 0: locked
 * - bit 1: woken (a waiter is awake and competing; do not wake another)
 * - bit 2: starving (ownership is handed off in FIFO order)
 * - bits 3..: number of parked waiters
 *
 * # Fairness
 *
 * In normal mode a woken waiter competes with newly arriving lockers, who
 * usually win because they are already running. A waiter that fails to get
 * the lock for longer than the starvation threshold switches the mutex to
 * starvation mode: unlock then hands the lock straight to the waiter at the
 * front of the queue, and new arrivals neither spin nor grab the lock. The
 * new owner switches back to normal mode if it is the last waiter or if it
 * waited less than the threshold.
 */

use super::config;
use super::locker::Locker;
use super::wait::{can_spin, do_spin, QueueOrder, Sema};
use crate::core::errors::{fatal, SyncError};
use crate::core::limits::{MUTEX_MAX_WAITERS, MUTEX_WAITER_SHIFT};
use parking_lot::lock_api::{self, GuardSend};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Instant;

const MUTEX_LOCKED: i32 = 1;
const MUTEX_WOKEN: i32 = 1 << 1;
const MUTEX_STARVING: i32 = 1 << 2;
const MUTEX_WAITER: i32 = 1 << MUTEX_WAITER_SHIFT;

#[inline(always)]
fn waiters(state: i32) -> i32 {
    state >> MUTEX_WAITER_SHIFT
}

#[inline(always)]
fn locked_or_starving(state: i32) -> i32 {
    state & (MUTEX_LOCKED | MUTEX_STARVING)
}

/// Raw fair mutex protecting externally owned data
///
/// Must not be moved while any thread may be blocked on it; borrowing
/// rules already guarantee this for safe code.
#[derive(Debug)]
pub struct RawMutex {
    state: AtomicI32,
    sema: Sema,
}

impl RawMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicI32::new(0),
            sema: Sema::new(0),
        }
    }

    /// Acquire the lock, blocking until it is available
    #[inline]
    pub fn lock(&self) {
        // Fast path: grab unlocked mutex.
        if self
            .state
            .compare_exchange(0, MUTEX_LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        self.lock_slow();
    }

    /// Acquire the lock only if it is free and not starving
    #[inline]
    pub fn try_lock(&self) -> bool {
        let old = self.state.load(Ordering::Relaxed);
        if locked_or_starving(old) != 0 {
            return false;
        }
        // A racing locker may take it first; trying is not waiting.
        self.state
            .compare_exchange(old, old | MUTEX_LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Whether the lock is currently held (diagnostics only)
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & MUTEX_LOCKED != 0
    }

    #[cold]
    fn lock_slow(&self) {
        let threshold = config().starvation_threshold;
        let mut wait_start: Option<Instant> = None;
        let mut starving = false;
        let mut awoke = false;
        let mut iter = 0u32;
        let mut old = self.state.load(Ordering::Relaxed);

        loop {
            // Don't spin in starvation mode, ownership is handed off to waiters.
            if locked_or_starving(old) == MUTEX_LOCKED && can_spin(iter) {
                // Set the woken flag so unlock does not wake another waiter
                // while we are about to take the lock ourselves.
                if !awoke
                    && old & MUTEX_WOKEN == 0
                    && waiters(old) != 0
                    && self
                        .state
                        .compare_exchange(
                            old,
                            old | MUTEX_WOKEN,
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                {
                    awoke = true;
                }
                do_spin();
                iter += 1;
                old = self.state.load(Ordering::Relaxed);
                continue;
            }

            let mut new = old;
            // New arrivals must queue in starvation mode.
            if old & MUTEX_STARVING == 0 {
                new |= MUTEX_LOCKED;
            }
            if locked_or_starving(old) != 0 {
                if waiters(old) >= MUTEX_MAX_WAITERS {
                    fatal(SyncError::WaiterOverflow("Mutex"));
                }
                new += MUTEX_WAITER;
            }
            // Only switch to starvation mode while the lock is held; an
            // unlocked mutex in starvation mode would have nobody to hand to.
            if starving && old & MUTEX_LOCKED != 0 {
                new |= MUTEX_STARVING;
            }
            if awoke {
                if new & MUTEX_WOKEN == 0 {
                    fatal(SyncError::InconsistentMutexState);
                }
                new &= !MUTEX_WOKEN;
            }

            match self
                .state
                .compare_exchange(old, new, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    if locked_or_starving(old) == 0 {
                        break; // locked the mutex with CAS
                    }

                    // Requeued waiters go to the front so they keep their place.
                    let order = if wait_start.is_some() {
                        QueueOrder::Lifo
                    } else {
                        QueueOrder::Fifo
                    };
                    let started = *wait_start.get_or_insert_with(Instant::now);
                    self.sema.acquire(order);

                    if !starving && started.elapsed() > threshold {
                        starving = true;
                        tracing::trace!(
                            waited_us = started.elapsed().as_micros() as u64,
                            "mutex waiter exceeded starvation threshold"
                        );
                    }

                    old = self.state.load(Ordering::Acquire);
                    if old & MUTEX_STARVING != 0 {
                        // Ownership was handed off to us, but the locked bit
                        // is not set and we are still counted as a waiter.
                        if old & (MUTEX_LOCKED | MUTEX_WOKEN) != 0 || waiters(old) == 0 {
                            fatal(SyncError::InconsistentMutexState);
                        }
                        let mut delta = MUTEX_LOCKED - MUTEX_WAITER;
                        if !starving || waiters(old) == 1 {
                            // Exit starvation mode before it degrades into a
                            // lock-step convoy.
                            delta -= MUTEX_STARVING;
                        }
                        self.state.fetch_add(delta, Ordering::AcqRel);
                        break;
                    }
                    awoke = true;
                    iter = 0;
                }
                Err(actual) => old = actual,
            }
        }
    }

    /// Release the lock
    ///
    /// Unlocking an unlocked mutex is fatal. The mutex is not tied to a
    /// thread: one thread may lock it and another unlock it.
    #[inline]
    pub fn unlock(&self) {
        // Fast path: drop lock bit.
        let new = self
            .state
            .fetch_sub(MUTEX_LOCKED, Ordering::Release)
            .wrapping_sub(MUTEX_LOCKED);
        if new != 0 {
            self.unlock_slow(new);
        }
    }

    #[cold]
    fn unlock_slow(&self, new: i32) {
        if new.wrapping_add(MUTEX_LOCKED) & MUTEX_LOCKED == 0 {
            fatal(SyncError::UnlockOfUnlockedMutex);
        }

        if new & MUTEX_STARVING == 0 {
            let mut old = new;
            loop {
                // Nobody to wake, or someone already woken, locked or
                // handed the lock: nothing to do.
                if waiters(old) == 0
                    || old & (MUTEX_LOCKED | MUTEX_WOKEN | MUTEX_STARVING) != 0
                {
                    return;
                }
                let new = (old - MUTEX_WAITER) | MUTEX_WOKEN;
                match self
                    .state
                    .compare_exchange(old, new, Ordering::Release, Ordering::Relaxed)
                {
                    Ok(_) => {
                        self.sema.release(false);
                        return;
                    }
                    Err(actual) => old = actual,
                }
            }
        } else {
            // Starving mode: hand ownership to the next waiter. The locked
            // bit stays clear; the waiter sets it. New arrivals still see
            // the starving bit and queue instead of taking the lock.
            self.sema.release(true);
        }
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Locker for RawMutex {
    #[inline]
    fn lock(&self) {
        RawMutex::lock(self)
    }

    #[inline]
    fn unlock(&self) {
        RawMutex::unlock(self)
    }
}

// SAFETY: `lock`/`try_lock` establish exclusive ownership through the locked
// bit with acquire ordering, and `unlock` releases it with release ordering.
unsafe impl lock_api::RawMutex for RawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        RawMutex::lock(self)
    }

    #[inline]
    fn try_lock(&self) -> bool {
        RawMutex::try_lock(self)
    }

    #[inline]
    unsafe fn unlock(&self) {
        RawMutex::unlock(self)
    }

    #[inline]
    fn is_locked(&self) -> bool {
        RawMutex::is_locked(self)
    }
}

/// Fair mutex owning its data
pub type Mutex<T> = lock_api::Mutex<RawMutex, T>;

/// RAII guard for [`Mutex`]
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, RawMutex, T>;
