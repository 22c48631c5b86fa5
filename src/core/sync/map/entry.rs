/*!
 * Map Entry
 *
 * One per key. The slot is swapped atomically, so reads and in-place updates
 * of keys already in the snapshot never take the map lock.
 *
 * Slot states:
 * - `Valid(v)`: the key maps to `v`
 * - `Deleted`: removed, but the key is still listed in the dirty map (if any)
 * - `Tombstoned`: removed and absent from the dirty map; only the map lock
 *   may move an entry out of this state
 */

use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Debug)]
pub(super) enum Slot<V> {
    Valid(V),
    Deleted,
    Tombstoned,
}

/// Outcome of [`Entry::try_load_or_store`]
pub(super) enum LoadOrStore<V> {
    /// The entry already held this value
    Loaded(V),
    /// The given value was stored
    Stored(V),
    /// The entry is tombstoned; the value is handed back untouched
    Expunged(V),
}

pub(super) struct Entry<V> {
    slot: ArcSwap<Slot<V>>,
}

impl<V: Clone> Entry<V> {
    pub(super) fn new(slot: Arc<Slot<V>>) -> Self {
        Self {
            slot: ArcSwap::new(slot),
        }
    }

    #[inline]
    pub(super) fn load(&self) -> Option<V> {
        match &**self.slot.load() {
            Slot::Valid(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Store `slot` unless the entry is tombstoned
    ///
    /// A tombstoned entry must be revived under the map lock first, so the
    /// slot is handed back for the locked path.
    pub(super) fn try_store(&self, slot: Arc<Slot<V>>) -> Result<(), Arc<Slot<V>>> {
        loop {
            let current = self.slot.load_full();
            if matches!(*current, Slot::Tombstoned) {
                return Err(slot);
            }
            let prev = self.slot.compare_and_swap(&current, Arc::clone(&slot));
            if Arc::ptr_eq(&prev, &current) {
                return Ok(());
            }
        }
    }

    /// Turn a tombstone back into a deletion marker
    ///
    /// Returns true if the entry was tombstoned; the caller must then add it
    /// back to the dirty map before releasing the lock.
    pub(super) fn unexpunge_locked(&self) -> bool {
        let current = self.slot.load_full();
        if !matches!(*current, Slot::Tombstoned) {
            return false;
        }
        let prev = self
            .slot
            .compare_and_swap(&current, Arc::new(Slot::Deleted));
        Arc::ptr_eq(&prev, &current)
    }

    /// Unconditionally store `slot`; the entry must not be tombstoned
    #[inline]
    pub(super) fn store_locked(&self, slot: Arc<Slot<V>>) {
        self.slot.store(slot);
    }

    /// Load the current value, or store `value` if the entry is deleted
    pub(super) fn try_load_or_store(&self, value: V) -> LoadOrStore<V> {
        loop {
            let current = self.slot.load_full();
            match &*current {
                Slot::Valid(existing) => return LoadOrStore::Loaded(existing.clone()),
                Slot::Tombstoned => return LoadOrStore::Expunged(value),
                Slot::Deleted => {
                    let prev = self
                        .slot
                        .compare_and_swap(&current, Arc::new(Slot::Valid(value.clone())));
                    if Arc::ptr_eq(&prev, &current) {
                        return LoadOrStore::Stored(value);
                    }
                }
            }
        }
    }

    /// Mark the entry deleted, returning the value it held
    pub(super) fn delete(&self) -> Option<V> {
        loop {
            let current = self.slot.load_full();
            let Slot::Valid(value) = &*current else {
                return None;
            };
            let prev = self
                .slot
                .compare_and_swap(&current, Arc::new(Slot::Deleted));
            if Arc::ptr_eq(&prev, &current) {
                return Some(value.clone());
            }
        }
    }

    /// Tombstone a deleted entry while the dirty map is being rebuilt
    ///
    /// Returns true if the entry is (now) tombstoned and must be left out of
    /// the new dirty map.
    pub(super) fn try_expunge_locked(&self) -> bool {
        loop {
            let current = self.slot.load_full();
            match &*current {
                Slot::Valid(_) => return false,
                Slot::Tombstoned => return true,
                Slot::Deleted => {
                    let prev = self
                        .slot
                        .compare_and_swap(&current, Arc::new(Slot::Tombstoned));
                    if Arc::ptr_eq(&prev, &current) {
                        return true;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(super) fn is_tombstoned(&self) -> bool {
        matches!(**self.slot.load(), Slot::Tombstoned)
    }
}
