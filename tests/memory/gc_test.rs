/*!
 * Collector Tests
 */

use crate::setup;
use ai_os_sync::{Collector, CycleHook, GcStats, Pool, PoolRegistry};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct CountingHook;

impl CycleHook for CountingHook {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn on_cycle(&self, stats: &mut GcStats) {
        stats.victims_dropped += 10;
    }
}

#[test]
fn test_cycles_accumulate_hook_stats() {
    setup();
    let collector = Collector::new();
    let registry = PoolRegistry::attach(&collector);
    collector.register_cycle_hook(Arc::new(CountingHook));
    assert_eq!(collector.hook_count(), 2);

    let pools: Vec<Pool<u64>> = (0..3).map(|_| Pool::new(&registry)).collect();
    for (i, pool) in pools.iter().enumerate() {
        pool.put(i as u64);
    }

    let stats = collector.collect();
    assert_eq!(stats.cycle, 1);
    assert_eq!(stats.hooks_run, 2);
    assert_eq!(stats.pools_rotated, 3);
    assert_eq!(stats.victims_dropped, 10);

    let stats = collector.collect();
    assert_eq!(stats.cycle, 2);
    assert_eq!(stats.pools_rotated, 0);
    assert_eq!(stats.victims_dropped, 13);
    assert_eq!(collector.cycles(), 2);
}

#[test]
fn test_dropped_pool_is_forgotten() {
    setup();
    let collector = Collector::new();
    let registry = PoolRegistry::attach(&collector);
    {
        let pool = Pool::new(&registry);
        pool.put(String::from("short-lived"));
        assert_eq!(registry.active_pools(), 1);
    }
    assert_eq!(registry.active_pools(), 0);
    let stats = collector.collect();
    assert_eq!(stats.pools_rotated, 0);
}

#[test]
fn test_auto_collect_interval() {
    let collector = Collector::with_min_interval(Duration::from_millis(20));
    assert_eq!(collector.auto_collect(), None);
    std::thread::sleep(Duration::from_millis(30));
    assert!(collector.time_since_last_cycle() >= Duration::from_millis(30));
    assert!(collector.auto_collect().is_some());
    // The cycle resets the clock
    assert!(collector.time_since_last_cycle() < Duration::from_millis(20));
    assert_eq!(collector.auto_collect(), None);
}

#[test]
fn test_stats_json_round_trip() {
    let stats = GcStats {
        cycle: 4,
        pools_rotated: 2,
        victims_dropped: 1,
        hooks_run: 1,
        duration_us: 12,
    };
    let json = serde_json::to_string(&stats).unwrap();
    let back: GcStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stats);
}
