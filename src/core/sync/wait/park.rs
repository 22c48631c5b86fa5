/*!
 * Parked Waiter
 *
 * A single blocked thread, parked through parking_lot_core on its own
 * address. The waker records why the waiter was released before unparking,
 * so a wake that races with the park is never lost: parking_lot_core runs
 * the validate callback under the same bucket lock `unpark_one` takes.
 */

use parking_lot_core::{park, unpark_one, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use std::sync::atomic::{AtomicU8, Ordering};

const WAITING: u8 = 0;
const WOKEN: u8 = 1;
const HANDOFF: u8 = 2;

/// How a parked waiter was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Woken, but must compete for the resource again
    Woken,
    /// Ownership was transferred directly by the releaser
    Handoff,
}

/// Parking cell for one blocked thread
#[repr(C, align(64))]
#[derive(Debug)]
pub struct Waiter {
    state: AtomicU8,
}

impl Waiter {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(WAITING),
        }
    }

    /// Re-arm before enqueueing again
    #[inline]
    pub fn reset(&self) {
        self.state.store(WAITING, Ordering::Relaxed);
    }

    #[inline]
    fn key(&self) -> usize {
        self as *const Self as usize
    }

    /// Block until [`Waiter::wake`] is called
    pub fn park(&self) -> Wake {
        loop {
            match self.state.load(Ordering::Acquire) {
                WAITING => {}
                HANDOFF => return Wake::Handoff,
                _ => return Wake::Woken,
            }

            // SAFETY: the key is the address of this waiter, which outlives
            // the park call; the callbacks do not panic or call into
            // parking_lot_core.
            unsafe {
                park(
                    self.key(),
                    || self.state.load(Ordering::Acquire) == WAITING,
                    || {},
                    |_, _| {},
                    DEFAULT_PARK_TOKEN,
                    None,
                );
            }
        }
    }

    /// Release the parked thread
    ///
    /// The caller must keep the waiter alive until this returns.
    pub fn wake(&self, how: Wake) {
        let state = match how {
            Wake::Woken => WOKEN,
            Wake::Handoff => HANDOFF,
        };
        self.state.store(state, Ordering::Release);

        // SAFETY: same key as `park`; the callback is trivial.
        unsafe {
            unpark_one(self.key(), |_| DEFAULT_UNPARK_TOKEN);
        }
    }
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}
