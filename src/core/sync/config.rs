/*!
 * Synchronization Configuration
 *
 * Process-wide tuning for the lock slow paths and the pool shard layout.
 * The mutex state word has no room for per-instance settings, so the
 * configuration is installed once and read on slow paths only.
 */

use crate::core::errors::{ConfigError, ConfigResult};
use crate::core::limits::{
    ACTIVE_SPIN, ACTIVE_SPIN_CYCLES, MAX_SHARDS, MIN_SHARDS, STARVATION_THRESHOLD,
};
use crate::core::shard_manager::ShardManager;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

static CONFIG: OnceLock<SyncConfig> = OnceLock::new();

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SyncConfig {
    /// Wait time after which a mutex switches to starvation mode
    pub starvation_threshold: Duration,
    /// Active spin iterations before a contended locker parks
    pub active_spin: u32,
    /// CPU pause hints per spin iteration
    pub spin_cycles: u32,
    /// Number of pool shards (defaults to the CPU count)
    pub shards: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            starvation_threshold: STARVATION_THRESHOLD,
            active_spin: ACTIVE_SPIN,
            spin_cycles: ACTIVE_SPIN_CYCLES,
            shards: None,
        }
    }
}

impl SyncConfig {
    /// Configuration that never spins (single-core or oversubscribed hosts)
    pub const fn no_spin() -> Self {
        Self {
            starvation_threshold: STARVATION_THRESHOLD,
            active_spin: 0,
            spin_cycles: 0,
            shards: None,
        }
    }

    /// Build from environment variables, falling back to defaults
    ///
    /// Environment variables:
    /// - SYNC_STARVATION_THRESHOLD_US: starvation threshold in microseconds
    /// - SYNC_ACTIVE_SPIN: spin iterations before parking
    /// - SYNC_SPIN_CYCLES: pause hints per spin iteration
    /// - SYNC_SHARDS: pool shard count
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(us) = env_value::<u64>("SYNC_STARVATION_THRESHOLD_US") {
            config.starvation_threshold = Duration::from_micros(us);
        }
        if let Some(spin) = env_value("SYNC_ACTIVE_SPIN") {
            config.active_spin = spin;
        }
        if let Some(cycles) = env_value("SYNC_SPIN_CYCLES") {
            config.spin_cycles = cycles;
        }
        if let Some(shards) = env_value("SYNC_SHARDS") {
            config.shards = Some(shards);
        }

        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "Ignoring sync configuration from environment");
                Self::default()
            }
        }
    }

    /// Check the configuration for values the primitives cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.starvation_threshold.is_zero() {
            return Err(ConfigError::Invalid(
                "starvation_threshold must be non-zero".into(),
            ));
        }
        if let Some(shards) = self.shards {
            if !(MIN_SHARDS..=MAX_SHARDS).contains(&shards) {
                return Err(ConfigError::Invalid(format!(
                    "shards must be within {}..={}, got {}",
                    MIN_SHARDS, MAX_SHARDS, shards
                )));
            }
        }
        Ok(())
    }

    /// Install as the process-wide configuration
    ///
    /// Must happen before the first slow-path lock or pool access, which
    /// lazily installs `from_env()`.
    pub fn install(self) -> ConfigResult<()> {
        self.validate()?;
        CONFIG
            .set(self)
            .map_err(|_| ConfigError::AlreadyInstalled)?;
        debug!(config = ?CONFIG.get(), "Sync configuration installed");
        Ok(())
    }

    /// Shard count, resolving the CPU-count default
    pub fn shard_count(&self) -> usize {
        self.shards
            .unwrap_or_else(ShardManager::cpu_count)
            .clamp(MIN_SHARDS, MAX_SHARDS)
    }
}

/// Active process-wide configuration
#[inline]
pub fn config() -> &'static SyncConfig {
    CONFIG.get_or_init(SyncConfig::from_env)
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}
