//! In-memory ledger with simulated latency.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::LedgerError;
use crate::traits::LedgerStore;

/// Number of calls a ledger has served, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCalls {
    pub reads: u64,
    pub sets: u64,
    pub deducts: u64,
}

impl LedgerCalls {
    /// Writes of any kind (overwrites and deductions).
    #[inline]
    pub fn writes(&self) -> u64 {
        self.sets + self.deducts
    }
}

/// Ledger kept in process memory.
///
/// Every call sleeps for the configured latency before touching the store,
/// which makes it a stand-in for a slow database. Balances of unknown users
/// read as 0. Failures can be injected per user to exercise retry and
/// sweep-isolation paths.
#[derive(Debug)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<String, u64>>,
    /// Remaining injected failures per user (`u32::MAX` = fail forever).
    failures: Mutex<HashMap<String, u32>>,
    /// Users whose calls fail with a backend error until healed.
    rejected: Mutex<HashSet<String>>,
    latency: Duration,
    reads: AtomicU64,
    sets: AtomicU64,
    deducts: AtomicU64,
}

impl MemoryLedger {
    /// Create an empty ledger with the given per-call latency.
    pub fn new(latency: Duration) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashSet::new()),
            latency,
            reads: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deducts: AtomicU64::new(0),
        }
    }

    /// Seed balances.
    pub fn with_balances<I, S>(self, balances: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        {
            let mut map = self.balances.lock();
            for (user, credits) in balances {
                map.insert(user.into(), credits);
            }
        }
        self
    }

    /// Make the next `times` calls for `user_id` fail with a transient error.
    pub fn fail_next(&self, user_id: &str, times: u32) {
        self.failures.lock().insert(user_id.to_string(), times);
    }

    /// Make every call for `user_id` fail until [`heal`](Self::heal) is called.
    pub fn fail_always(&self, user_id: &str) {
        self.fail_next(user_id, u32::MAX);
    }

    /// Make every call for `user_id` fail with a non-transient backend
    /// error until [`heal`](Self::heal) is called.
    pub fn fail_permanently(&self, user_id: &str) {
        self.rejected.lock().insert(user_id.to_string());
    }

    /// Remove injected failures for `user_id`.
    pub fn heal(&self, user_id: &str) {
        self.failures.lock().remove(user_id);
        self.rejected.lock().remove(user_id);
    }

    /// Read a balance without latency or call accounting.
    pub fn peek(&self, user_id: &str) -> Option<u64> {
        self.balances.lock().get(user_id).copied()
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> LedgerCalls {
        LedgerCalls {
            reads: self.reads.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deducts: self.deducts.load(Ordering::Relaxed),
        }
    }

    async fn simulate(&self, user_id: &str) -> Result<(), LedgerError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.rejected.lock().contains(user_id) {
            trace!(user_id, "injected backend failure");
            return Err(LedgerError::backend(format!("account {user_id} is locked")));
        }

        let mut failures = self.failures.lock();
        if let Some(remaining) = failures.get_mut(user_id) {
            if *remaining == 0 {
                failures.remove(user_id);
                return Ok(());
            }
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            trace!(user_id, "injected ledger failure");
            return Err(LedgerError::Transient(format!(
                "simulated failure for {user_id}"
            )));
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(Duration::from_millis(
            creditgate_core::defaults::DEFAULT_LEDGER_LATENCY_MS,
        ))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get_credits(&self, user_id: &str) -> Result<u64, LedgerError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.simulate(user_id).await?;
        Ok(self.balances.lock().get(user_id).copied().unwrap_or(0))
    }

    async fn set_credits(&self, user_id: &str, credits: u64) -> Result<(), LedgerError> {
        self.sets.fetch_add(1, Ordering::Relaxed);
        self.simulate(user_id).await?;
        self.balances.lock().insert(user_id.to_string(), credits);
        Ok(())
    }

    async fn deduct(&self, user_id: &str, amount: u64) -> Result<bool, LedgerError> {
        self.deducts.fetch_add(1, Ordering::Relaxed);
        self.simulate(user_id).await?;
        let mut map = self.balances.lock();
        match map.get_mut(user_id) {
            Some(current) if *current >= amount => {
                *current -= amount;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                map.insert(user_id.to_string(), 0);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(Duration::ZERO).with_balances([("user1", 10), ("user3", 0)])
    }

    #[tokio::test]
    async fn test_unknown_user_reads_zero() {
        let ledger = ledger();
        assert_eq!(ledger.get_credits("nobody").await.unwrap(), 0);
        assert_eq!(ledger.peek("nobody"), None);
    }

    #[tokio::test]
    async fn test_deduct() {
        let ledger = ledger();
        assert!(ledger.deduct("user1", 3).await.unwrap());
        assert_eq!(ledger.peek("user1"), Some(7));

        assert!(!ledger.deduct("user1", 8).await.unwrap());
        assert_eq!(ledger.peek("user1"), Some(7));

        assert!(!ledger.deduct("user3", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_deduct_unknown_user_creates_empty_account() {
        let ledger = ledger();
        assert!(!ledger.deduct("new", 1).await.unwrap());
        assert_eq!(ledger.peek("new"), Some(0));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let ledger = ledger();
        ledger.set_credits("user1", 42).await.unwrap();
        assert_eq!(ledger.get_credits("user1").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_call_counters() {
        let ledger = ledger();
        ledger.get_credits("user1").await.unwrap();
        ledger.get_credits("user1").await.unwrap();
        ledger.set_credits("user1", 1).await.unwrap();
        ledger.deduct("user1", 1).await.unwrap();

        let calls = ledger.calls();
        assert_eq!(calls.reads, 2);
        assert_eq!(calls.sets, 1);
        assert_eq!(calls.deducts, 1);
        assert_eq!(calls.writes(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_run_out() {
        let ledger = ledger();
        ledger.fail_next("user1", 2);

        assert!(ledger.get_credits("user1").await.unwrap_err().is_transient());
        assert!(ledger.deduct("user1", 1).await.is_err());
        assert_eq!(ledger.get_credits("user1").await.unwrap(), 10);
        // Other users are unaffected
        assert_eq!(ledger.get_credits("user3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fail_always_until_healed() {
        let ledger = ledger();
        ledger.fail_always("user1");
        for _ in 0..5 {
            assert!(ledger.get_credits("user1").await.is_err());
        }
        ledger.heal("user1");
        assert_eq!(ledger.get_credits("user1").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_transient() {
        let ledger = ledger();
        ledger.fail_permanently("user1");

        let err = ledger.deduct("user1", 1).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, LedgerError::Backend(_)));
        assert_eq!(ledger.peek("user1"), Some(10));

        ledger.heal("user1");
        assert!(ledger.deduct("user1", 1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let ledger = MemoryLedger::new(Duration::from_millis(100));
        let start = tokio::time::Instant::now();
        ledger.get_credits("user1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
