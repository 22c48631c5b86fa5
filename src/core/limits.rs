/*!
 * System Limits and Constants
 *
 * Centralized location for the tuning constants and packed-state limits of
 * the synchronization primitives.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Defaults that can be overridden through `SyncConfig` are marked with [TUNABLE]
 */

use std::time::Duration;

// =============================================================================
// MUTEX
// =============================================================================

/// Wait time after which a mutex waiter switches the lock to starvation mode
/// [TUNABLE] Calibrated for a scheduler with sub-millisecond wake latency
pub const STARVATION_THRESHOLD: Duration = Duration::from_millis(1);

/// Active spin iterations before a contended locker parks
/// [TUNABLE] [PERF]
pub const ACTIVE_SPIN: u32 = 4;

/// CPU pause hints issued per active spin iteration
/// [TUNABLE] [PERF]
pub const ACTIVE_SPIN_CYCLES: u32 = 30;

/// Bits of the mutex state word below the waiter count
pub const MUTEX_WAITER_SHIFT: u32 = 3;

/// Largest waiter count the mutex state word can hold
pub const MUTEX_MAX_WAITERS: i32 = i32::MAX >> MUTEX_WAITER_SHIFT;

// =============================================================================
// RWMUTEX
// =============================================================================

/// Offset a pending writer subtracts from the reader count
pub const RWMUTEX_MAX_READERS: i32 = 1 << 30;

// =============================================================================
// SEMAPHORE TABLE
// =============================================================================

/// Number of semaphore roots shared by all primitives
/// Prime so that word-aligned addresses spread evenly
pub const SEMTABLE_SIZE: usize = 251;

// =============================================================================
// POOL
// =============================================================================

/// Alignment of one per-shard pool slot
/// [PERF] Two cache lines, so adjacent prefetching does not cause false sharing
pub const POOL_LOCAL_ALIGN: usize = 128;

/// Initial capacity of a shard's shared chain
pub const POOL_CHAIN_INITIAL: usize = 8;

/// Minimum shard count (avoid degenerate pools on exotic targets)
pub const MIN_SHARDS: usize = 1;

/// Maximum shard count
pub const MAX_SHARDS: usize = 1024;

// =============================================================================
// COLLECTOR
// =============================================================================

/// Minimum interval between automatic collection cycles
pub const DEFAULT_GC_MIN_INTERVAL: Duration = Duration::from_secs(5);
