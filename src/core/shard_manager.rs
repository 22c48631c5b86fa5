/*!
 * Shard Identification
 *
 * Maps the calling thread to a processing shard, used to index per-shard
 * caches without cross-thread locking on the fast path.
 *
 * # Design
 *
 * Threads are not bound to processors, so each thread is assigned a shard
 * id round-robin the first time it asks and keeps it for its lifetime.
 * [`pin`] hands out a `!Send` guard carrying that id; holding the guard
 * for the duration of a pool operation is the equivalent of disabling
 * preemption on the shard.
 */

use crate::core::limits::MAX_SHARDS;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

static CPU_COUNT: OnceLock<usize> = OnceLock::new();
static NEXT_SHARD: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_SHARD: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Hardware-aware shard configuration
pub struct ShardManager;

impl ShardManager {
    /// Get CPU count (detected once)
    #[inline]
    pub fn cpu_count() -> usize {
        *CPU_COUNT.get_or_init(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or_else(|_| {
                    tracing::warn!("Failed to detect CPU count, defaulting to 8");
                    8
                })
        })
    }

    /// Number of shards per-shard caches are sized for
    #[inline]
    pub fn shard_count() -> usize {
        crate::core::sync::config().shard_count()
    }

    /// Shard id of the calling thread, assigning one on first use
    #[inline]
    pub fn current_shard_id() -> usize {
        let raw = CURRENT_SHARD.with(|slot| match slot.get() {
            Some(id) => id,
            None => {
                let id = NEXT_SHARD.fetch_add(1, Ordering::Relaxed) % MAX_SHARDS;
                slot.set(Some(id));
                id
            }
        });
        raw % Self::shard_count()
    }

    /// Bind the calling thread to a specific shard
    ///
    /// The id is reduced modulo the shard count when used.
    pub fn bind_current_thread(id: usize) {
        CURRENT_SHARD.with(|slot| slot.set(Some(id)));
    }
}

/// Proof that the caller is pinned to a shard
///
/// Not `Send`: a pinned operation cannot migrate to another thread.
#[derive(Debug)]
pub struct ShardPin {
    id: usize,
    _not_send: PhantomData<*const ()>,
}

impl ShardPin {
    /// Shard id this pin refers to
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Pin the calling thread to its shard until the guard is dropped
#[inline]
pub fn pin() -> ShardPin {
    ShardPin {
        id: ShardManager::current_shard_id(),
        _not_send: PhantomData,
    }
}
