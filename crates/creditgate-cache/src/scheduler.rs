//! Periodic refill loop.

use std::sync::Arc;
use std::time::Duration;

use creditgate_core::labels::OP_REFILL_SWEEP;
use creditgate_ledger::{LedgerStore, UserDirectory};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CreditError;
use crate::refill::{ReconcileReport, RefillReconciler};

/// Runs a [`RefillReconciler`] pass over every known user at a fixed interval.
pub struct RefillScheduler<L: LedgerStore + ?Sized + 'static, D: UserDirectory + ?Sized> {
    reconciler: Arc<RefillReconciler<L>>,
    directory: Arc<D>,
    interval: Duration,
}

impl<L, D> RefillScheduler<L, D>
where
    L: LedgerStore + ?Sized + 'static,
    D: UserDirectory + ?Sized,
{
    /// `interval` is raised to one millisecond if zero.
    pub fn new(reconciler: Arc<RefillReconciler<L>>, directory: Arc<D>, interval: Duration) -> Self {
        Self {
            reconciler,
            directory,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one pass over the current user list.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<ReconcileReport, CreditError> {
        let users = self.directory.all_user_ids().await?;
        debug!(operation = OP_REFILL_SWEEP, users = users.len(), "starting refill pass");
        self.reconciler.reconcile(&users, cancel).await
    }

    /// Loop until `shutdown` is cancelled.
    ///
    /// The first pass runs immediately. A failing pass is logged and the loop
    /// waits for the next tick.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(interval_secs = self.interval.as_secs(), "refill scheduler started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("refill scheduler shutting down");
                    return;
                }

                _ = ticker.tick() => {
                    match self.run_once(&shutdown).await {
                        Ok(report) => info!(
                            scanned = report.scanned,
                            adjusted = report.adjusted,
                            unchanged = report.unchanged,
                            failed = report.failed,
                            "refill pass complete"
                        ),
                        Err(CreditError::Cancelled) => {
                            debug!("refill pass interrupted by shutdown");
                        }
                        Err(e) => warn!(error = %e, "refill pass failed"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use creditgate_ledger::{DirectoryError, MemoryLedger, StaticUserDirectory};

    use crate::cache::CreditCache;
    use crate::refill::RefillPolicy;
    use crate::retry::RetryExecutor;

    struct FailingDirectory;

    #[async_trait]
    impl UserDirectory for FailingDirectory {
        async fn all_user_ids(&self) -> Result<Vec<String>, DirectoryError> {
            Err(DirectoryError::Unavailable("offline".into()))
        }
    }

    fn reconciler(ledger: &Arc<MemoryLedger>) -> Arc<RefillReconciler<MemoryLedger>> {
        let cache = Arc::new(CreditCache::new(ledger.clone(), RetryExecutor::default()));
        Arc::new(RefillReconciler::new(cache, RefillPolicy::default()))
    }

    #[tokio::test]
    async fn test_run_once_uses_directory() {
        let ledger = Arc::new(
            MemoryLedger::new(Duration::ZERO).with_balances([("user1", 0), ("user2", 50)]),
        );
        let directory = Arc::new(StaticUserDirectory::new(["user1", "user2", "user3"]));
        let scheduler =
            RefillScheduler::new(reconciler(&ledger), directory, Duration::from_secs(60));

        let report = scheduler.run_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.adjusted, 3);
        assert_eq!(ledger.peek("user1"), Some(5));
        assert_eq!(ledger.peek("user2"), Some(20));
        assert_eq!(ledger.peek("user3"), Some(5));
    }

    #[tokio::test]
    async fn test_directory_failure_is_reported() {
        let ledger = Arc::new(MemoryLedger::new(Duration::ZERO));
        let scheduler = RefillScheduler::new(
            reconciler(&ledger),
            Arc::new(FailingDirectory),
            Duration::from_secs(60),
        );
        let err = scheduler.run_once(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CreditError::Directory(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_on_every_tick_until_cancelled() {
        let ledger = Arc::new(MemoryLedger::new(Duration::ZERO).with_balances([("user1", 0)]));
        let directory = Arc::new(StaticUserDirectory::new(["user1"]));
        let scheduler =
            RefillScheduler::new(reconciler(&ledger), directory, Duration::from_secs(60));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        // First pass runs right away
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ledger.peek("user1"), Some(5));

        ledger.set_credits("user1", 1).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ledger.peek("user1"), Some(5));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_is_raised() {
        let ledger = Arc::new(MemoryLedger::new(Duration::ZERO));
        let scheduler = RefillScheduler::new(
            reconciler(&ledger),
            Arc::new(StaticUserDirectory::default()),
            Duration::ZERO,
        );
        assert_eq!(scheduler.interval(), Duration::from_millis(1));
    }
}
