/*!
 * Core Module
 * Synchronization primitives, object pooling and their error handling
 */

pub mod errors;
pub mod limits;
pub mod memory;
pub mod shard_manager;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use memory::{Pool, PoolRegistry};
pub use shard_manager::{pin, ShardManager, ShardPin};
pub use sync::{
    Cond, Locker, Map, Mutex, MutexGuard, Once, RLocker, RawMutex, RawRwMutex, RwMutex,
    RwMutexReadGuard, RwMutexWriteGuard, SyncConfig, WaitGroup,
};
