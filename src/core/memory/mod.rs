/*!
 * Memory Utilities
 *
 * Object pooling for zero-allocation patterns: frequently allocated and
 * released objects (buffers, scratch space) are cached per shard and aged
 * out by collection cycles.
 */

mod pool;

pub use pool::{Pool, PoolRegistry, Sweep};
