/*!
 * Garbage Collection
 * Collection-cycle driver and its hooks
 */

pub mod collector;

pub use collector::{Collector, CycleHook, GcStats};
