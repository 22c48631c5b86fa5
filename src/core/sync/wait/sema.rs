/*!
 * Semaphore
 *
 * The blocking primitive under every lock in this crate: `acquire` parks
 * until a matching `release`, with FIFO or LIFO queueing and optional
 * direct handoff.
 *
 * # Design
 *
 * A `Sema` is just a 32-bit count, so locks stay one or two words wide.
 * Blocked threads queue in a fixed table of roots indexed by the address of
 * the count, in the style of a futex hash table:
 * - Zero allocations for the table after initialization
 * - Several semaphores may share a root; the queue is filtered by address
 * - The root's waiter count lets `release` skip the root lock when nobody waits
 */

use super::park::{Wake, Waiter};
use crate::core::limits::SEMTABLE_SIZE;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Queueing discipline for a blocked acquirer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    /// Append behind existing waiters
    Fifo,
    /// Jump to the front (a waiter that already waited once)
    Lifo,
}

struct SemaEntry {
    key: usize,
    waiter: Arc<Waiter>,
}

#[repr(C, align(64))]
struct SemaRoot {
    nwait: AtomicU32,
    queue: Mutex<VecDeque<SemaEntry>>,
}

impl SemaRoot {
    const fn new() -> Self {
        Self {
            nwait: AtomicU32::new(0),
            queue: parking_lot::const_mutex(VecDeque::new()),
        }
    }
}

static SEMTABLE: [SemaRoot; SEMTABLE_SIZE] = [const { SemaRoot::new() }; SEMTABLE_SIZE];

/// Counting semaphore with park/unpark semantics
#[derive(Debug)]
pub struct Sema {
    count: AtomicU32,
}

impl Sema {
    pub const fn new(initial: u32) -> Self {
        Self {
            count: AtomicU32::new(initial),
        }
    }

    #[inline]
    fn key(&self) -> usize {
        &self.count as *const AtomicU32 as usize
    }

    #[inline]
    fn root(&self) -> &'static SemaRoot {
        &SEMTABLE[(self.key() >> 3) % SEMTABLE_SIZE]
    }

    /// Take one unit if available, without blocking
    #[inline]
    pub fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::SeqCst);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Block until a unit is available and take it
    pub fn acquire(&self, order: QueueOrder) {
        if self.try_acquire() {
            return;
        }

        let root = self.root();
        let waiter = Arc::new(Waiter::new());

        loop {
            let mut queue = root.queue.lock();
            // Register before the final check so a concurrent release
            // cannot miss us.
            root.nwait.fetch_add(1, Ordering::SeqCst);
            if self.try_acquire() {
                root.nwait.fetch_sub(1, Ordering::SeqCst);
                return;
            }

            waiter.reset();
            let entry = SemaEntry {
                key: self.key(),
                waiter: Arc::clone(&waiter),
            };
            match order {
                QueueOrder::Fifo => queue.push_back(entry),
                QueueOrder::Lifo => queue.push_front(entry),
            }
            drop(queue);

            if waiter.park() == Wake::Handoff || self.try_acquire() {
                return;
            }
        }
    }

    /// Add one unit and wake the first waiter, if any
    ///
    /// With `handoff`, the unit is claimed on the waiter's behalf so that
    /// no newly arriving acquirer can take it first.
    pub fn release(&self, handoff: bool) {
        let root = self.root();
        self.count.fetch_add(1, Ordering::SeqCst);

        if root.nwait.load(Ordering::SeqCst) == 0 {
            return;
        }

        let mut queue = root.queue.lock();
        if root.nwait.load(Ordering::SeqCst) == 0 {
            return;
        }

        let key = self.key();
        let waiter = queue
            .iter()
            .position(|entry| entry.key == key)
            .and_then(|idx| queue.remove(idx))
            .map(|entry| entry.waiter);
        if waiter.is_some() {
            root.nwait.fetch_sub(1, Ordering::SeqCst);
        }
        drop(queue);

        if let Some(waiter) = waiter {
            if handoff && self.try_acquire() {
                waiter.wake(Wake::Handoff);
                // Let the new owner run before we compete again.
                std::thread::yield_now();
            } else {
                waiter.wake(Wake::Woken);
            }
        }
    }

    /// Units currently available (diagnostics only)
    #[inline]
    pub fn available(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Sema {
    fn default() -> Self {
        Self::new(0)
    }
}
