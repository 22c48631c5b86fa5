/*!
 * Sharded Object Pool
 *
 * A set of temporary objects that may be individually saved and retrieved,
 * to relieve pressure on the allocator for objects that are expensive to
 * build. Any cached object may be dropped at any time without notice: the
 * pool ages its contents out over collection cycles.
 *
 * # Layout
 *
 * A generation is an array indexed by shard id. Each shard has a private
 * slot, used only by the owner, and a shared chain: the owner works its
 * head, other shards steal from its tail.
 *
 * # Eviction
 *
 * Each collection cycle moves the whole primary generation into the victim
 * slot and drops the previous victim. An untouched object therefore
 * survives at most one extra cycle. `get` looks in the victim only after
 * every primary shard, so victims age out if at all possible.
 *
 * # Example
 *
 * ```ignore
 * let registry = PoolRegistry::attach(&collector);
 * let buffers = Pool::with_factory(&registry, || Vec::<u8>::with_capacity(4096));
 *
 * let mut buf = buffers.get().unwrap_or_default();
 * buf.extend_from_slice(b"data");
 * buf.clear();
 * buffers.put(buf);
 * ```
 */

mod chain;
mod registry;

pub use registry::{PoolRegistry, Sweep};

use crate::core::shard_manager::{self, ShardManager};
use arc_swap::ArcSwapOption;
use chain::PoolChain;
use parking_lot::Mutex;
use registry::Rotate;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Per-shard cache, padded to its own cache lines
#[repr(align(128))]
struct PoolLocal<T> {
    private: Mutex<Option<T>>,
    shared: Mutex<PoolChain<T>>,
}

impl<T> PoolLocal<T> {
    fn new() -> Self {
        Self {
            private: Mutex::new(None),
            shared: Mutex::new(PoolChain::new()),
        }
    }
}

/// One generation of per-shard caches
struct Generation<T> {
    locals: Box<[PoolLocal<T>]>,
}

impl<T> Generation<T> {
    fn new(shards: usize) -> Self {
        Self {
            locals: (0..shards.max(1)).map(|_| PoolLocal::new()).collect(),
        }
    }

    #[inline]
    fn shard(&self, id: usize) -> &PoolLocal<T> {
        &self.locals[id % self.locals.len()]
    }

    #[inline]
    fn size(&self) -> usize {
        self.locals.len()
    }

    fn cached(&self) -> usize {
        self.locals
            .iter()
            .map(|local| usize::from(local.private.lock().is_some()) + local.shared.lock().len())
            .sum()
    }
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct PoolInner<T> {
    local: ArcSwapOption<Generation<T>>,
    victim: ArcSwapOption<Generation<T>>,
    factory: Option<Factory<T>>,
    registry: Arc<PoolRegistry>,
}

impl<T: Send + 'static> PoolInner<T> {
    /// Primary generation, allocating and registering one if needed
    #[inline]
    fn generation(self: &Arc<Self>) -> Arc<Generation<T>> {
        match self.local.load_full() {
            Some(generation) => generation,
            None => self.generation_slow(),
        }
    }

    #[cold]
    fn generation_slow(self: &Arc<Self>) -> Arc<Generation<T>> {
        // Retry under the registry lock; a sweep cannot run meanwhile.
        let mut pools = self.registry.lock();
        if let Some(generation) = self.local.load_full() {
            return generation;
        }

        let shards = ShardManager::shard_count();
        let generation = Arc::new(Generation::new(shards));
        self.local.store(Some(Arc::clone(&generation)));
        let weak = Arc::downgrade(self) as Weak<dyn Rotate>;
        pools.all.push(weak);
        debug!(shards, "pool generation allocated");
        generation
    }

    /// Steal from other shards, then fall back to the victim generation
    fn get_slow(&self, local: &Generation<T>, id: usize) -> Option<T> {
        let size = local.size();
        for i in 0..size {
            let other = local.shard(id + i + 1);
            // Skip shards that are busy; the pool must never block.
            if let Some(value) = other.shared.try_lock().and_then(|mut shared| shared.pop_tail()) {
                return Some(value);
            }
        }

        let victim = self.victim.load_full();
        let generation = victim.as_deref()?;
        let mut skipped = false;
        match generation.shard(id).private.try_lock() {
            Some(mut private) => {
                if let Some(value) = private.take() {
                    return Some(value);
                }
            }
            None => skipped = true,
        }
        for i in 0..generation.size() {
            match generation.shard(id + i).shared.try_lock() {
                Some(mut shared) => {
                    if let Some(value) = shared.pop_tail() {
                        return Some(value);
                    }
                }
                None => skipped = true,
            }
        }

        // Victim is drained: later gets need not look at it. A busy shard
        // may still hold objects, so keep the victim if any was skipped.
        if !skipped {
            self.victim.compare_and_swap(&victim, None::<Arc<Generation<T>>>);
        }
        None
    }
}

impl<T: Send> Rotate for PoolInner<T> {
    fn rotate(&self) -> bool {
        let primary = self.local.swap(None);
        let rotated = primary.is_some();
        self.victim.store(primary);
        rotated
    }

    fn drop_victim(&self) -> bool {
        self.victim.swap(None).is_some()
    }
}

/// Sharded cache of reusable objects
///
/// Cloning yields another handle to the same pool.
pub struct Pool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Send + 'static> Pool<T> {
    /// Pool whose `get` returns `None` when empty
    pub fn new(registry: &Arc<PoolRegistry>) -> Self {
        Self::build(registry, None)
    }

    /// Pool whose `get` builds a fresh object with `factory` when empty
    ///
    /// Fresh objects are handed out, not cached.
    pub fn with_factory<F>(registry: &Arc<PoolRegistry>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(registry, Some(Box::new(factory)))
    }

    fn build(registry: &Arc<PoolRegistry>, factory: Option<Factory<T>>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                local: ArcSwapOption::empty(),
                victim: ArcSwapOption::empty(),
                factory,
                registry: Arc::clone(registry),
            }),
        }
    }

    /// Add `value` to the pool
    pub fn put(&self, value: T) {
        let pin = shard_manager::pin();
        let generation = self.inner.generation();
        let local = generation.shard(pin.id());

        let mut private = local.private.lock();
        if private.is_none() {
            *private = Some(value);
            return;
        }
        drop(private);
        local.shared.lock().push_head(value);
    }

    /// Remove an arbitrary object from the pool
    ///
    /// Falls back to the factory, if any, when nothing is cached. Callers
    /// must not assume any relation between the objects passed to `put`
    /// and the ones returned by `get`.
    pub fn get(&self) -> Option<T> {
        let pin = shard_manager::pin();
        let id = pin.id();
        let generation = self.inner.generation();
        let local = generation.shard(id);

        let mut value = local.private.lock().take();
        if value.is_none() {
            // Prefer the head for temporal locality of reuse.
            value = local.shared.lock().pop_head();
        }
        if value.is_none() {
            value = self.inner.get_slow(&generation, id);
        }
        drop(pin);

        value.or_else(|| self.inner.factory.as_ref().map(|factory| factory()))
    }

    /// Objects cached in both generations (diagnostics only)
    pub fn cached(&self) -> usize {
        let primary = self.inner.local.load_full();
        let victim = self.inner.victim.load_full();
        primary.map_or(0, |g| g.cached()) + victim.map_or(0, |g| g.cached())
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("has_primary", &self.inner.local.load().is_some())
            .field("has_victim", &self.inner.victim.load().is_some())
            .field("has_factory", &self.inner.factory.is_some())
            .finish()
    }
}
