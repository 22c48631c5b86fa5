/*!
 * Condition Variable
 *
 * A rendezvous point for threads waiting for, or announcing, an event,
 * associated with a caller-supplied [`Locker`]. `wait` releases the lock,
 * parks, and re-acquires it before returning; a wake-up does not mean the
 * awaited condition holds, so callers loop:
 *
 * ```ignore
 * lock.lock();
 * while !condition() {
 *     cond.wait();
 * }
 * // ... make use of condition ...
 * lock.unlock();
 * ```
 *
 * `signal` and `broadcast` may be called with or without the lock held.
 */

use super::locker::Locker;
use super::wait::NotifyList;

/// Condition variable bound to a lock
#[derive(Debug)]
pub struct Cond<L: Locker> {
    locker: L,
    notify: NotifyList,
}

impl<L: Locker> Cond<L> {
    pub const fn new(locker: L) -> Self {
        Self {
            locker,
            notify: NotifyList::new(),
        }
    }

    /// The associated lock
    #[inline]
    pub fn locker(&self) -> &L {
        &self.locker
    }

    /// Atomically unlock, park until signalled, then re-lock
    ///
    /// The caller must hold the associated lock.
    pub fn wait(&self) {
        // Take the ticket while still holding the lock, so a signal sent
        // after we unlock is not missed.
        let ticket = self.notify.add();
        self.locker.unlock();
        self.notify.wait(ticket);
        self.locker.lock();
    }

    /// Wake one waiting thread, if any
    #[inline]
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Wake all waiting threads
    #[inline]
    pub fn broadcast(&self) {
        self.notify.notify_all();
    }
}
