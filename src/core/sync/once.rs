/*!
 * Once
 *
 * One-shot execution gate. The done flag is set only after the body has
 * returned (or unwound), so every `call_once` that returns has observed the
 * body's completion, not just its start. Racing callers wait on the
 * internal mutex for the body to finish.
 */

use super::mutex::RawMutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Performs exactly one action
#[derive(Debug)]
pub struct Once {
    done: AtomicU32,
    m: RawMutex,
}

/// Sets the done flag on drop, so a panicking body still closes the gate
struct MarkDone<'a>(&'a AtomicU32);

impl Drop for MarkDone<'_> {
    fn drop(&mut self) {
        self.0.store(1, Ordering::Release);
    }
}

struct Unlock<'a>(&'a RawMutex);

impl Drop for Unlock<'_> {
    fn drop(&mut self) {
        self.0.unlock();
    }
}

impl Once {
    pub const fn new() -> Self {
        Self {
            done: AtomicU32::new(0),
            m: RawMutex::new(),
        }
    }

    /// Run `f` if and only if this is the first call on this `Once`
    ///
    /// If `f` panics the gate is still considered executed and later calls
    /// return without running their closure.
    #[inline]
    pub fn call_once<F: FnOnce()>(&self, f: F) {
        if self.done.load(Ordering::Acquire) == 0 {
            // Outlined slow-path to allow inlining of the fast-path.
            self.call_once_slow(f);
        }
    }

    #[cold]
    fn call_once_slow<F: FnOnce()>(&self, f: F) {
        self.m.lock();
        let _unlock = Unlock(&self.m);
        if self.done.load(Ordering::Relaxed) == 0 {
            // Dropped before `_unlock`: done is visible before the mutex frees.
            let _mark = MarkDone(&self.done);
            f();
        }
    }

    /// Whether the action has completed
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.done.load(Ordering::Acquire) != 0
    }
}

impl Default for Once {
    fn default() -> Self {
        Self::new()
    }
}
