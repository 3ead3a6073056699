//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Session Defaults
// ============================================================================

/// Default idle time after which a session expires (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 1800;

// ============================================================================
// Refill Defaults
// ============================================================================

/// Default lower bound a sweep refills balances up to.
pub const DEFAULT_MINIMUM_CREDITS: u64 = 5;
/// Default upper bound a sweep clamps balances down to.
pub const DEFAULT_MAXIMUM_CREDITS: u64 = 20;
/// Default interval between refill sweeps (1 hour).
pub const DEFAULT_REFILL_INTERVAL_SECS: u64 = 3600;
/// Default number of users reconciled concurrently within one sweep.
pub const DEFAULT_REFILL_CONCURRENCY: usize = 16;

// ============================================================================
// Persistence Defaults
// ============================================================================

/// Default attempts for a retried ledger write.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
/// Default wait between failed ledger attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
/// Default time allowed for pending writes to drain at shutdown.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Ledger Simulation Defaults
// ============================================================================

/// Default simulated latency of a single ledger call.
pub const DEFAULT_LEDGER_LATENCY_MS: u64 = 100;

/// Balances the simulated ledger starts with when none are configured.
pub const DEFAULT_SEED_BALANCES: &[(&str, u64)] =
    &[("user1", 10), ("user2", 5), ("user3", 0), ("user4", 100)];
