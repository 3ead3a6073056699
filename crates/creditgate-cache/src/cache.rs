//! Write-through credit cache over a slow ledger.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use creditgate_core::labels::{OP_LEDGER_READ, OP_LEDGER_SET, deduct_operation_name};
use creditgate_ledger::{LedgerError, LedgerStore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::entry::EntryTable;
use crate::error::CreditError;
use crate::retry::{RetryError, RetryExecutor};

/// Cache statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Users with an entry (initialized or not).
    pub entries: usize,
    /// Balance reads served from memory.
    pub hits: u64,
    /// Balance reads that went to the ledger.
    pub misses: u64,
    /// Background deductions not yet finished.
    pub pending_persists: usize,
    /// Background deductions that exhausted their retries.
    pub persist_failures: u64,
    /// Background deductions the ledger refused for lack of funds.
    pub divergences: u64,
}

impl CacheStats {
    /// Fraction of balance reads answered without the ledger.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    persist_failures: AtomicU64,
    divergences: AtomicU64,
}

/// Per-user credit balances cached in memory, backed by a [`LedgerStore`].
///
/// Every operation on a user runs under that user's async lock, so concurrent
/// deductions can never overspend. Only the first access to a user and
/// explicit sets wait on the ledger; deductions are persisted by tracked
/// background tasks.
pub struct CreditCache<L: LedgerStore + ?Sized + 'static> {
    ledger: Arc<L>,
    retry: RetryExecutor,
    entries: EntryTable,
    persist_tasks: TaskTracker,
    shutdown: CancellationToken,
    counters: Arc<Counters>,
}

impl<L: LedgerStore + ?Sized + 'static> CreditCache<L> {
    pub fn new(ledger: Arc<L>, retry: RetryExecutor) -> Self {
        Self {
            ledger,
            retry,
            entries: EntryTable::default(),
            persist_tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// The ledger behind this cache.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Consume one credit if the user has any.
    ///
    /// Returns `Ok(false)` without touching state when the balance is zero.
    /// On success the ledger deduction is dispatched in the background and
    /// never awaited here. Errors only come from the first-access load.
    pub async fn try_deduct(&self, user_id: &str) -> Result<bool, CreditError> {
        let entry = self.entries.get_or_insert(user_id);
        let mut slot = entry.lock().await;
        let balance = self.load(user_id, &mut slot).await?;

        if balance == 0 {
            debug!(user_id, "insufficient credits");
            return Ok(false);
        }

        let remaining = balance - 1;
        *slot = Some(remaining);
        self.persist_deduction(user_id);
        trace!(user_id, remaining, "credit deducted");
        Ok(true)
    }

    /// Overwrite a user's balance.
    ///
    /// The ledger is written first; the cached value only changes once that
    /// write succeeded, so a failure leaves both sides on the old value.
    pub async fn set_credits(&self, user_id: &str, credits: u64) -> Result<(), CreditError> {
        let entry = self.entries.get_or_insert(user_id);
        let mut slot = entry.lock().await;
        self.ledger
            .set_credits(user_id, credits)
            .await
            .inspect_err(|e| {
                warn!(operation = OP_LEDGER_SET, user_id, error = %e, "failed to set credits")
            })?;
        *slot = Some(credits);
        debug!(user_id, credits, "credits set");
        Ok(())
    }

    /// Read a user's balance, loading it from the ledger on first access.
    pub async fn get_credits(&self, user_id: &str) -> Result<u64, CreditError> {
        let entry = self.entries.get_or_insert(user_id);
        let mut slot = entry.lock().await;
        self.load(user_id, &mut slot).await
    }

    /// Cached balance without loading or waiting. `None` when the user has
    /// no initialized entry or the entry is locked right now.
    pub fn cached_credits(&self, user_id: &str) -> Option<u64> {
        self.entries.get(user_id).and_then(|entry| entry.try_peek())
    }

    /// Drop a user's entry. The next access reloads from the ledger.
    ///
    /// Returns `false` if there is no entry or an operation on the user is in
    /// flight; a busy entry is kept so its lock stays the only one.
    pub fn evict(&self, user_id: &str) -> bool {
        let removed = self.entries.remove_unused(user_id);
        if removed {
            debug!(user_id, "cache entry evicted");
        } else {
            trace!(user_id, "cache entry absent or busy, not evicted");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            pending_persists: self.persist_tasks.len(),
            persist_failures: self.counters.persist_failures.load(Ordering::Relaxed),
            divergences: self.counters.divergences.load(Ordering::Relaxed),
        }
    }

    /// Wait until no background deduction is pending.
    ///
    /// Deductions dispatched while draining are waited for as well, so under
    /// continuous traffic this only returns once traffic pauses. Callers that
    /// need a bound wrap it in a timeout. After [`shutdown`](Self::shutdown)
    /// the tracker stays closed.
    pub async fn drain(&self) {
        self.persist_tasks.close();
        self.persist_tasks.wait().await;
        if !self.shutdown.is_cancelled() {
            self.persist_tasks.reopen();
        }
    }

    /// Cancel pending persistence retries and wait for the tasks to stop.
    ///
    /// Deductions still waiting to be retried are abandoned and logged.
    pub async fn shutdown(&self) {
        let pending = self.persist_tasks.len();
        info!(pending, "shutting down credit cache");
        self.shutdown.cancel();
        self.persist_tasks.close();
        self.persist_tasks.wait().await;
    }

    async fn load(&self, user_id: &str, slot: &mut Option<u64>) -> Result<u64, CreditError> {
        if let Some(balance) = *slot {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(balance);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let balance = self
            .ledger
            .get_credits(user_id)
            .await
            .inspect_err(|e| {
                warn!(operation = OP_LEDGER_READ, user_id, error = %e, "failed to load balance")
            })?;
        *slot = Some(balance);
        debug!(user_id, balance, "balance loaded from ledger");
        Ok(balance)
    }

    fn persist_deduction(&self, user_id: &str) {
        let ledger = Arc::clone(&self.ledger);
        let retry = self.retry;
        let cancel = self.shutdown.clone();
        let counters = Arc::clone(&self.counters);
        let user_id = user_id.to_string();

        self.persist_tasks.spawn(async move {
            let operation = deduct_operation_name(&user_id);
            let result = retry
                .execute_if(
                    || ledger.deduct(&user_id, 1),
                    &operation,
                    &cancel,
                    LedgerError::is_transient,
                )
                .await;

            match result {
                Ok(true) => trace!(user_id = %user_id, "deduction persisted"),
                Ok(false) => {
                    counters.divergences.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        user_id = %user_id,
                        "ledger refused deduction, balance diverged until next refill"
                    );
                }
                Err(RetryError::Cancelled) => {
                    warn!(user_id = %user_id, "deduction persistence cancelled");
                }
                Err(RetryError::Exhausted { attempts, last }) => {
                    counters.persist_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        user_id = %user_id,
                        attempts,
                        error = %last,
                        "deduction lost, ledger unreachable"
                    );
                }
                Err(RetryError::Permanent { attempts, last }) => {
                    counters.persist_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        user_id = %user_id,
                        attempts,
                        error = %last,
                        "deduction lost, ledger rejected it"
                    );
                }
            }
        });
    }
}

impl<L: LedgerStore + ?Sized + 'static> std::fmt::Debug for CreditCache<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditCache")
            .field("retry", &self.retry)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
