/*!
 * Concurrent Map
 *
 * Key/value store tuned for two patterns: keys written once and read many
 * times, and threads working on disjoint key sets. Other workloads are
 * usually better served by a sharded map or a plain `Mutex<HashMap>`.
 *
 * # Design
 *
 * Reads hit an immutable snapshot published through `ArcSwap` and never
 * take the lock. New keys go to a lock-protected dirty map, which is a
 * superset of the live snapshot keys. Lookups that miss the snapshot but
 * hit the dirty map are counted; once the misses reach the size of the
 * dirty map, the dirty map is promoted wholesale to be the new snapshot.
 * Updating or deleting a key already in the snapshot is an atomic swap on
 * its shared entry, visible through both maps.
 */

mod entry;

use super::mutex::Mutex;
use ahash::RandomState;
use arc_swap::ArcSwap;
use entry::{Entry, LoadOrStore, Slot};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

type Entries<K, V> = HashMap<K, Arc<Entry<V>>, RandomState>;

/// Immutable snapshot
struct ReadOnly<K, V> {
    m: Arc<Entries<K, V>>,
    /// The dirty map holds keys missing from `m`
    amended: bool,
}

impl<K, V> ReadOnly<K, V> {
    fn empty() -> Self {
        Self {
            m: Arc::new(HashMap::with_hasher(RandomState::new())),
            amended: false,
        }
    }
}

struct Dirty<K, V> {
    map: Option<Entries<K, V>>,
    /// Lookups since the last promotion that had to take the lock
    misses: usize,
}

/// Concurrent map with lock-free reads of stable keys
pub struct Map<K, V> {
    read: ArcSwap<ReadOnly<K, V>>,
    dirty: Mutex<Dirty<K, V>>,
}

impl<K, V> Map<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            read: ArcSwap::from_pointee(ReadOnly::empty()),
            dirty: Mutex::new(Dirty {
                map: None,
                misses: 0,
            }),
        }
    }

    /// Value stored for `key`, if any
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let read = self.read.load();
        let mut entry = read.m.get(key).cloned();
        if entry.is_none() && read.amended {
            let mut dirty = self.dirty.lock();
            // The dirty map may have been promoted while we waited.
            let read = self.read.load();
            entry = read.m.get(key).cloned();
            if entry.is_none() && read.amended {
                entry = dirty.map.as_ref().and_then(|m| m.get(key)).cloned();
                // Count the miss whether or not the key exists: it will take
                // this path until the dirty map is promoted.
                self.miss_locked(&mut dirty);
            }
        }
        entry?.load()
    }

    /// Set the value for `key`
    pub fn store(&self, key: K, value: V) {
        let mut slot = Arc::new(Slot::Valid(value));
        if let Some(entry) = self.read.load().m.get(&key) {
            match entry.try_store(slot) {
                Ok(()) => return,
                Err(back) => slot = back,
            }
        }

        let mut guard = self.dirty.lock();
        let dirty = &mut *guard;
        let read = self.read.load_full();
        if let Some(entry) = read.m.get(&key) {
            if entry.unexpunge_locked() {
                // The entry was tombstoned, so the dirty map exists and
                // does not list it.
                if let Some(map) = dirty.map.as_mut() {
                    map.insert(key, Arc::clone(entry));
                }
            }
            entry.store_locked(slot);
        } else if let Some(entry) = dirty.map.as_ref().and_then(|m| m.get(&key)) {
            entry.store_locked(slot);
        } else {
            if !read.amended {
                // First new key since the last promotion.
                self.dirty_locked(dirty, &read);
                self.read.store(Arc::new(ReadOnly {
                    m: Arc::clone(&read.m),
                    amended: true,
                }));
            }
            dirty
                .map
                .get_or_insert_with(|| HashMap::with_hasher(RandomState::new()))
                .insert(key, Arc::new(Entry::new(slot)));
        }
    }

    /// Existing value for `key`, or store and return `value`
    ///
    /// The flag is true if the value was loaded, false if stored.
    pub fn load_or_store(&self, key: K, value: V) -> (V, bool) {
        let mut value = value;
        if let Some(entry) = self.read.load().m.get(&key) {
            match entry.try_load_or_store(value) {
                LoadOrStore::Loaded(actual) => return (actual, true),
                LoadOrStore::Stored(actual) => return (actual, false),
                LoadOrStore::Expunged(back) => value = back,
            }
        }

        let mut guard = self.dirty.lock();
        let dirty = &mut *guard;
        let read = self.read.load_full();
        if let Some(entry) = read.m.get(&key) {
            if entry.unexpunge_locked() {
                if let Some(map) = dirty.map.as_mut() {
                    map.insert(key, Arc::clone(entry));
                }
            }
            Self::resolve_locked(entry, value)
        } else if let Some(entry) = dirty.map.as_ref().and_then(|m| m.get(&key)).cloned() {
            let result = Self::resolve_locked(&entry, value);
            self.miss_locked(dirty);
            result
        } else {
            if !read.amended {
                self.dirty_locked(dirty, &read);
                self.read.store(Arc::new(ReadOnly {
                    m: Arc::clone(&read.m),
                    amended: true,
                }));
            }
            let slot = Arc::new(Slot::Valid(value.clone()));
            dirty
                .map
                .get_or_insert_with(|| HashMap::with_hasher(RandomState::new()))
                .insert(key, Arc::new(Entry::new(slot)));
            (value, false)
        }
    }

    /// Load-or-store on an entry that cannot be tombstoned (lock held)
    fn resolve_locked(entry: &Entry<V>, value: V) -> (V, bool) {
        match entry.try_load_or_store(value) {
            LoadOrStore::Loaded(actual) => (actual, true),
            LoadOrStore::Stored(actual) | LoadOrStore::Expunged(actual) => (actual, false),
        }
    }

    /// Remove `key`, returning the value it held
    pub fn load_and_delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let read = self.read.load();
        let mut entry = read.m.get(key).cloned();
        if entry.is_none() && read.amended {
            let mut dirty = self.dirty.lock();
            let read = self.read.load();
            entry = read.m.get(key).cloned();
            if entry.is_none() && read.amended {
                entry = dirty.map.as_mut().and_then(|m| m.remove(key));
                self.miss_locked(&mut dirty);
            }
        }
        entry?.delete()
    }

    /// Remove `key`
    #[inline]
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.load_and_delete(key);
    }

    /// Call `f` for each key and value until it returns false
    ///
    /// No key is visited more than once. A key present for the whole call
    /// is visited; a key stored or deleted concurrently may or may not be.
    /// If the map is amended, the dirty map is promoted first so the scan
    /// runs lock-free over a stable snapshot.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut read = self.read.load_full();
        if read.amended {
            let mut dirty = self.dirty.lock();
            read = self.read.load_full();
            if read.amended {
                if let Some(map) = dirty.map.take() {
                    read = Arc::new(ReadOnly {
                        m: Arc::new(map),
                        amended: false,
                    });
                    self.read.store(Arc::clone(&read));
                }
                dirty.misses = 0;
            }
        }

        for (key, entry) in read.m.iter() {
            if let Some(value) = entry.load() {
                if !f(key, &value) {
                    break;
                }
            }
        }
    }

    fn miss_locked(&self, dirty: &mut Dirty<K, V>) {
        dirty.misses += 1;
        let len = dirty.map.as_ref().map_or(0, HashMap::len);
        if dirty.misses < len {
            return;
        }
        if let Some(map) = dirty.map.take() {
            trace!(
                entries = map.len(),
                misses = dirty.misses,
                "promoting map dirty overlay"
            );
            self.read.store(Arc::new(ReadOnly {
                m: Arc::new(map),
                amended: false,
            }));
        }
        dirty.misses = 0;
    }

    /// Materialize the dirty map as a copy of the live snapshot keys
    fn dirty_locked(&self, dirty: &mut Dirty<K, V>, read: &ReadOnly<K, V>) {
        if dirty.map.is_some() {
            return;
        }
        let mut map = HashMap::with_capacity_and_hasher(read.m.len(), RandomState::new());
        for (key, entry) in read.m.iter() {
            if !entry.try_expunge_locked() {
                map.insert(key.clone(), Arc::clone(entry));
            }
        }
        dirty.map = Some(map);
    }
}

impl<K, V> Default for Map<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let read = self.read.load();
        f.debug_struct("Map")
            .field("snapshot_len", &read.m.len())
            .field("amended", &read.amended)
            .finish_non_exhaustive()
    }
}
