/*!
 * Synchronization Primitives
 *
 * Blocking primitives for threads sharing memory:
 * - [`Mutex`]: fair exclusive lock with a starvation mode
 * - [`RwMutex`]: writer-preferring reader/writer lock
 * - [`WaitGroup`]: countdown that releases waiters at zero
 * - [`Once`]: one-shot execution gate
 * - [`Cond`]: condition variable over any [`Locker`]
 * - [`Map`]: concurrent map with lock-free reads of stable keys
 *
 * # Architecture
 *
 * Every blocking path goes through the semaphore table in [`wait`], which
 * parks threads on parking_lot_core. Fast paths are a single atomic
 * instruction on a packed state word and never touch the table.
 *
 * # Misuse
 *
 * Unlocking an unlocked lock, driving a `WaitGroup` counter negative and
 * similar logic errors corrupt state shared with every other user, so they
 * are fatal: the error is logged and the calling thread panics.
 */

mod cond;
mod config;
mod locker;
mod map;
mod mutex;
mod once;
mod rwmutex;
mod waitgroup;

pub mod wait;

pub use cond::Cond;
pub use config::{config, SyncConfig};
pub use locker::Locker;
pub use map::Map;
pub use mutex::{Mutex, MutexGuard, RawMutex};
pub use once::Once;
pub use rwmutex::{RLocker, RawRwMutex, RwMutex, RwMutexReadGuard, RwMutexWriteGuard};
pub use waitgroup::WaitGroup;
