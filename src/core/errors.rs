/*!
 * Error Types
 * Misuse taxonomy for the synchronization primitives, with miette diagnostics
 *
 * None of the primitives return these as recoverable results. A misuse
 * means the shared state word is already corrupted, so the error is logged
 * and raised through [`fatal`].
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-side misuse of a synchronization primitive
#[derive(Error, Debug, Clone, Copy, Serialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("sync: unlock of unlocked mutex")]
    #[diagnostic(
        code(sync::mutex::unlock_of_unlocked),
        help("Every unlock must pair with a lock taken by the same logical owner.")
    )]
    UnlockOfUnlockedMutex,

    #[error("sync: inconsistent mutex state")]
    #[diagnostic(
        code(sync::mutex::inconsistent_state),
        help("The mutex state word was modified outside the lock protocol.")
    )]
    InconsistentMutexState,

    #[error("sync: RUnlock of unlocked RWMutex")]
    #[diagnostic(
        code(sync::rwmutex::runlock_of_unlocked),
        help("A read unlock was issued without a matching read lock.")
    )]
    RUnlockOfUnlockedRwMutex,

    #[error("sync: Unlock of unlocked RWMutex")]
    #[diagnostic(
        code(sync::rwmutex::unlock_of_unlocked),
        help("A write unlock was issued without a matching write lock.")
    )]
    UnlockOfUnlockedRwMutex,

    #[error("sync: negative WaitGroup counter")]
    #[diagnostic(
        code(sync::waitgroup::negative_counter),
        help("done() was called more times than add() accounted for.")
    )]
    NegativeWaitGroupCounter,

    #[error("sync: WaitGroup misuse: Add called concurrently with Wait")]
    #[diagnostic(
        code(sync::waitgroup::add_during_wait),
        help("Positive add() calls must happen before wait() is called.")
    )]
    AddConcurrentWithWait,

    #[error("sync: WaitGroup is reused before previous Wait has returned")]
    #[diagnostic(
        code(sync::waitgroup::reused),
        help("Let every waiter return before reusing the WaitGroup.")
    )]
    WaitGroupReused,

    #[error("sync: too many waiters on {0}")]
    #[diagnostic(
        code(sync::waiter_overflow),
        help("The packed waiter count is exhausted. Reduce the number of blocked tasks.")
    )]
    WaiterOverflow(&'static str),
}

/// Configuration errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Invalid sync configuration: {0}")]
    #[diagnostic(
        code(sync::config::invalid),
        help("Thresholds and shard counts must be non-zero.")
    )]
    Invalid(String),

    #[error("Sync configuration already installed")]
    #[diagnostic(
        code(sync::config::already_installed),
        help("Install the configuration once, before the first contended lock.")
    )]
    AlreadyInstalled,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Report a misuse and raise an unrecoverable fault
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(err: SyncError) -> ! {
    tracing::error!(error = %err, code = ?err.code().map(|c| c.to_string()), "fatal sync misuse");
    panic!("{}", err)
}
