/*!
 * Pool Registry
 *
 * Tracks the pools whose caches are populated so a collection cycle can
 * age them out. A pool registers itself when it allocates a primary
 * generation; each cycle then:
 * 1. drops the victim generation of every pool rotated last cycle
 * 2. moves every primary generation into the victim slot
 * 3. remembers the rotated pools for the next cycle
 *
 * Generations are reference counted, so a thread still holding one from
 * before the rotation keeps it alive until it is done; no thread needs to
 * be stopped.
 */

use crate::memory::gc::{Collector, CycleHook, GcStats};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Generation rotation, implemented by every pool
pub(super) trait Rotate: Send + Sync {
    /// Move the primary generation into the victim slot
    fn rotate(&self) -> bool;

    /// Drop the victim generation
    fn drop_victim(&self) -> bool;
}

#[derive(Default)]
pub(super) struct Pools {
    /// Pools with a primary generation
    pub(super) all: Vec<Weak<dyn Rotate>>,
    /// Pools that may have a victim generation
    old: Vec<Weak<dyn Rotate>>,
}

/// Outcome of one registry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sweep {
    pub pools_rotated: usize,
    pub victims_dropped: usize,
}

/// Set of pools swept at each collection cycle
#[derive(Default)]
pub struct PoolRegistry {
    pools: Mutex<Pools>,
}

impl PoolRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a registry swept by every cycle of `collector`
    pub fn attach(collector: &Collector) -> Arc<Self> {
        let registry = Self::new();
        collector.register_cycle_hook(registry.clone());
        registry
    }

    /// Lock the pool lists; pools allocate generations under this lock
    #[inline]
    pub(super) fn lock(&self) -> parking_lot::MutexGuard<'_, Pools> {
        self.pools.lock()
    }

    /// Age every registered pool by one generation
    pub fn sweep(&self) -> Sweep {
        let mut pools = self.pools.lock();
        let mut sweep = Sweep::default();

        for pool in pools.old.drain(..).filter_map(|weak| weak.upgrade()) {
            if pool.drop_victim() {
                sweep.victims_dropped += 1;
            }
        }

        for pool in pools.all.iter().filter_map(Weak::upgrade) {
            if pool.rotate() {
                sweep.pools_rotated += 1;
            }
        }

        // Every rotated pool now has a victim and no primary generation.
        pools.old = std::mem::take(&mut pools.all);

        debug!(
            rotated = sweep.pools_rotated,
            dropped = sweep.victims_dropped,
            "pool generations rotated"
        );
        sweep
    }

    /// Pools currently holding a primary generation (diagnostics only)
    pub fn active_pools(&self) -> usize {
        self.pools
            .lock()
            .all
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl CycleHook for PoolRegistry {
    fn name(&self) -> &'static str {
        "pool_registry"
    }

    fn on_cycle(&self, stats: &mut GcStats) {
        let sweep = self.sweep();
        stats.pools_rotated += sweep.pools_rotated;
        stats.victims_dropped += sweep.victims_dropped;
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pools = self.pools.lock();
        f.debug_struct("PoolRegistry")
            .field("all", &pools.all.len())
            .field("old", &pools.old.len())
            .finish()
    }
}
