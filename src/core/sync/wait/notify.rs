/*!
 * Notify List
 *
 * Ticket-based wait queue backing `Cond`. A waiter takes a ticket before it
 * releases its lock and parks on that ticket afterwards, so a notification
 * issued in between is not lost: `wait` sees the ticket already notified
 * and returns immediately.
 */

use super::park::{Wake, Waiter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Wrap-around safe `a < b` for ticket numbers
#[inline(always)]
fn ticket_before(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Ticket-ordered list of parked waiters
#[derive(Debug)]
pub struct NotifyList {
    /// Next ticket to hand out
    wait: AtomicU32,
    /// Next ticket to notify
    notify: AtomicU32,
    queue: Mutex<VecDeque<(u32, Arc<Waiter>)>>,
}

impl NotifyList {
    pub const fn new() -> Self {
        Self {
            wait: AtomicU32::new(0),
            notify: AtomicU32::new(0),
            queue: parking_lot::const_mutex(VecDeque::new()),
        }
    }

    /// Take a ticket; must precede `wait`
    #[inline]
    pub fn add(&self) -> u32 {
        self.wait.fetch_add(1, Ordering::SeqCst)
    }

    /// Park until `ticket` has been notified
    pub fn wait(&self, ticket: u32) {
        let mut queue = self.queue.lock();
        if ticket_before(ticket, self.notify.load(Ordering::SeqCst)) {
            return;
        }

        let waiter = Arc::new(Waiter::new());
        queue.push_back((ticket, Arc::clone(&waiter)));
        drop(queue);

        waiter.park();
    }

    /// Wake the oldest outstanding ticket
    pub fn notify_one(&self) {
        // Fast path: nothing handed out since the last notify.
        if self.wait.load(Ordering::SeqCst) == self.notify.load(Ordering::SeqCst) {
            return;
        }

        let mut queue = self.queue.lock();
        let ticket = self.notify.load(Ordering::SeqCst);
        if ticket == self.wait.load(Ordering::SeqCst) {
            return;
        }
        self.notify.store(ticket.wrapping_add(1), Ordering::SeqCst);

        // The ticket holder may not have parked yet; it will then see the
        // ticket notified and return on its own.
        let waiter = queue
            .iter()
            .position(|(t, _)| *t == ticket)
            .and_then(|idx| queue.remove(idx))
            .map(|(_, waiter)| waiter);
        drop(queue);

        if let Some(waiter) = waiter {
            waiter.wake(Wake::Woken);
        }
    }

    /// Wake every outstanding ticket
    pub fn notify_all(&self) {
        if self.wait.load(Ordering::SeqCst) == self.notify.load(Ordering::SeqCst) {
            return;
        }

        let mut queue = self.queue.lock();
        self.notify
            .store(self.wait.load(Ordering::SeqCst), Ordering::SeqCst);
        let waiters = std::mem::take(&mut *queue);
        drop(queue);

        for (_, waiter) in waiters {
            waiter.wake(Wake::Woken);
        }
    }

    /// Tickets handed out but not yet notified (diagnostics only)
    pub fn pending(&self) -> u32 {
        self.wait
            .load(Ordering::Relaxed)
            .wrapping_sub(self.notify.load(Ordering::Relaxed))
    }
}

impl Default for NotifyList {
    fn default() -> Self {
        Self::new()
    }
}
