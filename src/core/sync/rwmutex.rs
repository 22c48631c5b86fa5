/*!
 * Reader/Writer Mutex
 *
 * Many readers or one writer. Writers serialize on an embedded [`RawMutex`]
 * and announce themselves by subtracting `RWMUTEX_MAX_READERS` from the
 * reader count, which makes it negative; readers arriving after that park
 * until the writer unlocks. The writer itself waits only for the readers
 * that were already inside when it arrived.
 *
 * A reader must not take a second read lock while holding one: if a writer
 * arrives in between, the inner read lock waits for the writer, which waits
 * for the outer read lock. That deadlock is inherent to writer preference.
 */

use super::locker::Locker;
use super::mutex::RawMutex;
use super::wait::{QueueOrder, Sema};
use crate::core::errors::{fatal, SyncError};
use crate::core::limits::RWMUTEX_MAX_READERS;
use parking_lot::lock_api::{self, GuardSend};
use std::sync::atomic::{AtomicI32, Ordering};

/// Raw reader/writer mutex protecting externally owned data
#[derive(Debug)]
pub struct RawRwMutex {
    /// Held by the writer for the whole write section
    w: RawMutex,
    /// Writer waits here for departing readers
    writer_sem: Sema,
    /// Readers wait here for the writer to finish
    reader_sem: Sema,
    /// Readers inside or queued; negative while a writer is pending
    reader_count: AtomicI32,
    /// Readers the pending writer still waits for
    reader_wait: AtomicI32,
}

impl RawRwMutex {
    pub const fn new() -> Self {
        Self {
            w: RawMutex::new(),
            writer_sem: Sema::new(0),
            reader_sem: Sema::new(0),
            reader_count: AtomicI32::new(0),
            reader_wait: AtomicI32::new(0),
        }
    }

    /// Acquire a shared lock
    #[inline]
    pub fn rlock(&self) {
        if self.reader_count.fetch_add(1, Ordering::AcqRel) + 1 < 0 {
            // A writer is pending, wait for it.
            self.reader_sem.acquire(QueueOrder::Fifo);
        }
    }

    /// Acquire a shared lock only if no writer holds or awaits it
    #[inline]
    pub fn try_rlock(&self) -> bool {
        let mut c = self.reader_count.load(Ordering::Relaxed);
        loop {
            if c < 0 {
                return false;
            }
            match self.reader_count.compare_exchange_weak(
                c,
                c + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => c = actual,
            }
        }
    }

    /// Release a shared lock
    #[inline]
    pub fn runlock(&self) {
        let r = self.reader_count.fetch_sub(1, Ordering::AcqRel) - 1;
        if r < 0 {
            // Outlined slow-path to allow the fast-path to be inlined
            self.runlock_slow(r);
        }
    }

    #[cold]
    fn runlock_slow(&self, r: i32) {
        if r + 1 == 0 || r + 1 == -RWMUTEX_MAX_READERS {
            fatal(SyncError::RUnlockOfUnlockedRwMutex);
        }
        // A writer is pending; the last departing reader lets it in.
        if self.reader_wait.fetch_sub(1, Ordering::AcqRel) - 1 == 0 {
            self.writer_sem.release(false);
        }
    }

    /// Acquire the exclusive lock
    pub fn lock(&self) {
        // First, resolve competition with other writers.
        self.w.lock();
        // Announce to readers there is a pending writer.
        let r = self
            .reader_count
            .fetch_sub(RWMUTEX_MAX_READERS, Ordering::AcqRel);
        // Wait for active readers.
        if r != 0 && self.reader_wait.fetch_add(r, Ordering::AcqRel) + r != 0 {
            self.writer_sem.acquire(QueueOrder::Fifo);
        }
    }

    /// Acquire the exclusive lock only if nobody holds it in either mode
    pub fn try_lock(&self) -> bool {
        if !self.w.try_lock() {
            return false;
        }
        if self
            .reader_count
            .compare_exchange(0, -RWMUTEX_MAX_READERS, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.w.unlock();
            return false;
        }
        true
    }

    /// Release the exclusive lock
    pub fn unlock(&self) {
        // Announce to readers there is no active writer.
        let r = self
            .reader_count
            .fetch_add(RWMUTEX_MAX_READERS, Ordering::AcqRel)
            + RWMUTEX_MAX_READERS;
        if r >= RWMUTEX_MAX_READERS {
            fatal(SyncError::UnlockOfUnlockedRwMutex);
        }
        // Unblock readers that queued behind the writer.
        for _ in 0..r {
            self.reader_sem.release(false);
        }
        // Allow other writers to proceed.
        self.w.unlock();
    }

    /// Whether a writer holds or awaits the lock (diagnostics only)
    pub fn is_write_pending(&self) -> bool {
        self.reader_count.load(Ordering::Relaxed) < 0
    }

    /// Locker view of the shared side
    pub fn rlocker(&self) -> RLocker<'_> {
        RLocker(self)
    }
}

impl Default for RawRwMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Locker for RawRwMutex {
    #[inline]
    fn lock(&self) {
        RawRwMutex::lock(self)
    }

    #[inline]
    fn unlock(&self) {
        RawRwMutex::unlock(self)
    }
}

/// Locker whose lock/unlock take and release the shared side
#[derive(Debug, Clone, Copy)]
pub struct RLocker<'a>(&'a RawRwMutex);

impl Locker for RLocker<'_> {
    #[inline]
    fn lock(&self) {
        self.0.rlock()
    }

    #[inline]
    fn unlock(&self) {
        self.0.runlock()
    }
}

// SAFETY: the shared side admits readers only while the reader count is
// non-negative, the exclusive side holds `w` and waits out every reader that
// entered before it announced itself.
unsafe impl lock_api::RawRwLock for RawRwMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock_shared(&self) {
        self.rlock()
    }

    #[inline]
    fn try_lock_shared(&self) -> bool {
        self.try_rlock()
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        self.runlock()
    }

    #[inline]
    fn lock_exclusive(&self) {
        RawRwMutex::lock(self)
    }

    #[inline]
    fn try_lock_exclusive(&self) -> bool {
        RawRwMutex::try_lock(self)
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        RawRwMutex::unlock(self)
    }
}

/// Reader/writer mutex owning its data
pub type RwMutex<T> = lock_api::RwLock<RawRwMutex, T>;

/// Shared guard for [`RwMutex`]
pub type RwMutexReadGuard<'a, T> = lock_api::RwLockReadGuard<'a, RawRwMutex, T>;

/// Exclusive guard for [`RwMutex`]
pub type RwMutexWriteGuard<'a, T> = lock_api::RwLockWriteGuard<'a, RawRwMutex, T>;
