/*!
 * Locker Trait
 *
 * Minimal lock/unlock interface shared by the raw locks, used where a
 * primitive is associated with a caller-supplied lock (`Cond`).
 */

use std::sync::Arc;

/// An object that can be locked and unlocked
///
/// Unlocking a lock the caller does not hold is fatal misuse, not an error.
pub trait Locker: Send + Sync {
    fn lock(&self);
    fn unlock(&self);
}

impl<L: Locker + ?Sized> Locker for &L {
    #[inline]
    fn lock(&self) {
        (**self).lock()
    }

    #[inline]
    fn unlock(&self) {
        (**self).unlock()
    }
}

impl<L: Locker + ?Sized> Locker for Arc<L> {
    #[inline]
    fn lock(&self) {
        (**self).lock()
    }

    #[inline]
    fn unlock(&self) {
        (**self).unlock()
    }
}
