/*!
 * Collection Cycle Driver
 * Runs registered cycle hooks (pool generation rotation and the like)
 */

use crate::core::limits::DEFAULT_GC_MIN_INTERVAL;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

fn is_zero_usize(value: &usize) -> bool {
    *value == 0
}

/// Work done by one collection cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GcStats {
    pub cycle: u64,
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub pools_rotated: usize,
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub victims_dropped: usize,
    #[serde(default)]
    pub hooks_run: usize,
    #[serde(default)]
    pub duration_us: u64,
}

impl GcStats {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    /// Whether the cycle aged out any cached objects
    pub fn reclaimed_any(&self) -> bool {
        self.pools_rotated > 0 || self.victims_dropped > 0
    }
}

/// Callback run at the start of every collection cycle
pub trait CycleHook: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Do this hook's share of the cycle, recording it in `stats`
    fn on_cycle(&self, stats: &mut GcStats);
}

/// Drives collection cycles over a set of hooks
pub struct Collector {
    hooks: RwLock<Vec<Arc<dyn CycleHook>>>,
    /// Serializes cycles
    running: Mutex<()>,
    cycles: AtomicU64,
    last_cycle: RwLock<Instant>,
    /// Minimum time between automatic cycles
    min_interval: Duration,
}

impl Collector {
    pub fn new() -> Self {
        Self::with_min_interval(DEFAULT_GC_MIN_INTERVAL)
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        info!(?min_interval, "collector initialized");
        Self {
            hooks: RwLock::new(Vec::new()),
            running: Mutex::new(()),
            cycles: AtomicU64::new(0),
            last_cycle: RwLock::new(Instant::now()),
            min_interval,
        }
    }

    /// Run `hook` at the start of every later cycle, in registration order
    pub fn register_cycle_hook(&self, hook: Arc<dyn CycleHook>) {
        debug!(hook = hook.name(), "cycle hook registered");
        self.hooks.write().push(hook);
    }

    /// Run one collection cycle now
    pub fn collect(&self) -> GcStats {
        let _running = self.running.lock();
        let start = Instant::now();
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let span = info_span!("gc_cycle", cycle);
        let _entered = span.enter();
        // Hooks may register further hooks; do not hold the list lock.
        let hooks = self.hooks.read().clone();
        info!(cycle, hooks = hooks.len(), "starting collection cycle");

        let mut stats = GcStats::new(cycle);
        for hook in &hooks {
            debug!(cycle, hook = hook.name(), "running cycle hook");
            hook.on_cycle(&mut stats);
            stats.hooks_run += 1;
        }

        *self.last_cycle.write() = Instant::now();
        stats.duration_us = start.elapsed().as_micros() as u64;
        info!(
            cycle,
            pools_rotated = stats.pools_rotated,
            victims_dropped = stats.victims_dropped,
            duration_us = stats.duration_us,
            "collection cycle completed"
        );
        stats
    }

    /// Whether the minimum interval since the last cycle has passed
    pub fn should_collect(&self) -> bool {
        self.last_cycle.read().elapsed() >= self.min_interval
    }

    /// Run a cycle if the minimum interval has passed
    pub fn auto_collect(&self) -> Option<GcStats> {
        if !self.should_collect() {
            return None;
        }
        Some(self.collect())
    }

    /// Cycles run so far
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn time_since_last_cycle(&self) -> Duration {
        self.last_cycle.read().elapsed()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("hooks", &self.hook_count())
            .field("cycles", &self.cycles())
            .field("min_interval", &self.min_interval)
            .finish()
    }
}
