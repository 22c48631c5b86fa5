/*!
 * AI-OS Sync Library
 * Concurrency primitives for threads sharing memory
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{ConfigError, ConfigResult, SyncError};
pub use crate::core::memory::{Pool, PoolRegistry};
pub use crate::core::sync::{
    Cond, Locker, Map, Mutex, MutexGuard, Once, RLocker, RawMutex, RawRwMutex, RwMutex,
    RwMutexReadGuard, RwMutexWriteGuard, SyncConfig, WaitGroup,
};
pub use memory::{Collector, CycleHook, GcStats};
pub use monitoring::init_tracing;
