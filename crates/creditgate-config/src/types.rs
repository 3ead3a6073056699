//! Configuration type definitions for sessions, refill, persistence, the
//! ledger simulation, and logging.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session expires.
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefillConfig {
    /// Balances below this are raised to it.
    #[serde(default = "default_minimum_credits")]
    pub minimum_credits: u64,
    /// Balances above this are lowered to it.
    #[serde(default = "default_maximum_credits")]
    pub maximum_credits: u64,
    /// Time between two sweeps.
    #[serde(default = "default_refill_interval_secs")]
    pub interval_secs: u64,
    /// Users reconciled at once within a sweep.
    #[serde(default = "default_refill_concurrency")]
    pub concurrency: usize,
}

impl RefillConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefillConfig {
    fn default() -> Self {
        Self {
            minimum_credits: default_minimum_credits(),
            maximum_credits: default_maximum_credits(),
            interval_secs: default_refill_interval_secs(),
            concurrency: default_refill_concurrency(),
        }
    }
}

/// Background persistence of deductions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// How long shutdown waits for pending writes before cancelling them.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl PersistenceConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

/// In-memory ledger simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Latency added to every ledger call.
    #[serde(default = "default_ledger_latency_ms")]
    pub latency_ms: u64,
    /// Starting balances keyed by user id.
    #[serde(default = "default_ledger_balances")]
    pub balances: BTreeMap<String, u64>,
}

impl LedgerConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_ledger_latency_ms(),
            balances: default_ledger_balances(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"creditgate_cache": "debug"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
