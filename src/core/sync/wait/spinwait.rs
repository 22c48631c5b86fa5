/*!
 * Active Spinning Policy
 *
 * Decides whether a contended locker should busy-wait instead of parking.
 * Spinning only pays off when the lock holder is running on another CPU
 * and the wait is expected to be shorter than a park/unpark round trip, so
 * it is bounded to a few iterations of a few dozen pause hints each.
 */

use crate::core::shard_manager::ShardManager;
use crate::core::sync::config;

/// Whether spinning iteration `iter` is still worthwhile
#[inline]
pub fn can_spin(iter: u32) -> bool {
    // On a single CPU the holder cannot make progress while we spin.
    iter < config().active_spin && ShardManager::cpu_count() > 1
}

/// One spin iteration: a burst of CPU pause hints
#[inline]
pub fn do_spin() {
    for _ in 0..config().spin_cycles {
        std::hint::spin_loop();
    }
}
