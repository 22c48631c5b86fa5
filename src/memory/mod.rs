/*!
 * Memory Module
 * Collection cycles that age out cached memory
 */

pub mod gc;

// Re-export for convenience
pub use gc::{Collector, CycleHook, GcStats};
