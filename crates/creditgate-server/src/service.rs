//! Service assembly and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use creditgate_cache::{
    Admission, CancellationToken, CreditCache, CreditGate, RefillPolicy, RefillReconciler,
    RefillScheduler, RetryExecutor, RetryPolicy, SessionAuthenticator,
};
use creditgate_config::Config;
use creditgate_ledger::{MemoryLedger, StaticUserDirectory};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::ServerError;

/// Every long-lived component of a running creditgate instance.
#[derive(Debug)]
pub struct CreditService {
    ledger: Arc<MemoryLedger>,
    cache: Arc<CreditCache<MemoryLedger>>,
    gate: CreditGate<MemoryLedger>,
    reconciler: Arc<RefillReconciler<MemoryLedger>>,
    directory: Arc<StaticUserDirectory>,
    refill_interval: Duration,
    drain_timeout: Duration,
}

/// Outcome counts of a burst of admissions for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub admitted: usize,
    pub rejected: usize,
    pub errors: usize,
    /// Cached balance after the burst.
    pub balance: u64,
    /// Ledger balance once background writes have drained.
    pub ledger_balance: u64,
}

impl CreditService {
    /// Build the service from a validated config.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let ledger = Arc::new(
            MemoryLedger::new(config.ledger.latency())
                .with_balances(config.ledger.balances.iter().map(|(u, c)| (u.clone(), *c))),
        );

        let retry = RetryExecutor::new(RetryPolicy::new(
            config.persistence.max_retry_attempts,
            config.persistence.retry_delay(),
        ));
        let cache = Arc::new(CreditCache::new(ledger.clone(), retry));
        let sessions = Arc::new(SessionAuthenticator::new(config.session.timeout()));
        let gate = CreditGate::new(sessions, cache.clone());

        let policy = RefillPolicy::new(config.refill.minimum_credits, config.refill.maximum_credits)?;
        let reconciler = Arc::new(
            RefillReconciler::new(cache.clone(), policy).with_concurrency(config.refill.concurrency),
        );
        let directory = Arc::new(StaticUserDirectory::new(config.known_users()));

        Ok(Self {
            ledger,
            cache,
            gate,
            reconciler,
            directory,
            refill_interval: config.refill.interval(),
            drain_timeout: config.persistence.drain_timeout(),
        })
    }

    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }

    pub fn cache(&self) -> &Arc<CreditCache<MemoryLedger>> {
        &self.cache
    }

    pub fn gate(&self) -> &CreditGate<MemoryLedger> {
        &self.gate
    }

    pub fn known_users(&self) -> usize {
        self.directory.len()
    }

    /// A scheduler sweeping every known user at the configured interval.
    pub fn refill_scheduler(&self) -> RefillScheduler<MemoryLedger, StaticUserDirectory> {
        RefillScheduler::new(
            self.reconciler.clone(),
            self.directory.clone(),
            self.refill_interval,
        )
    }

    /// Admit `requests` concurrent requests for `user_id`.
    pub async fn probe(&self, user_id: &str, requests: usize) -> ProbeSummary {
        let mut tasks = JoinSet::new();
        for _ in 0..requests {
            let gate = self.gate.clone();
            let user_id = user_id.to_string();
            tasks.spawn(async move { gate.admit(&user_id).await });
        }

        let mut summary = ProbeSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Admission::Admitted)) => summary.admitted += 1,
                Ok(Ok(Admission::InsufficientCredits)) => summary.rejected += 1,
                Ok(Err(e)) => {
                    warn!(user_id, error = %e, "admission failed");
                    summary.errors += 1;
                }
                Err(e) => {
                    warn!(user_id, error = %e, "admission task failed");
                    summary.errors += 1;
                }
            }
        }

        self.cache.drain().await;
        summary.balance = self.cache.cached_credits(user_id).unwrap_or_default();
        summary.ledger_balance = self.ledger.peek(user_id).unwrap_or_default();
        summary
    }

    /// Drain pending ledger writes, cancelling whatever is left after the
    /// drain timeout.
    pub async fn shutdown(&self) {
        if tokio::time::timeout(self.drain_timeout, self.cache.drain())
            .await
            .is_err()
        {
            warn!(
                pending = self.cache.stats().pending_persists,
                timeout_secs = self.drain_timeout.as_secs(),
                "pending deductions did not drain in time, cancelling"
            );
        }
        self.cache.shutdown().await;

        let stats = self.cache.stats();
        info!(
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            persist_failures = stats.persist_failures,
            divergences = stats.divergences,
            "credit cache stopped"
        );
    }
}

/// Run the service until `shutdown` is cancelled.
pub async fn run_with_shutdown(config: Config, shutdown: CancellationToken) -> Result<(), ServerError> {
    let service = CreditService::from_config(&config)?;
    info!(
        users = service.known_users(),
        minimum_credits = config.refill.minimum_credits,
        maximum_credits = config.refill.maximum_credits,
        refill_interval_secs = config.refill.interval_secs,
        session_timeout_secs = config.session.timeout_secs,
        "creditgate started"
    );

    let scheduler = tokio::spawn(service.refill_scheduler().run(shutdown.clone()));
    shutdown.cancelled().await;
    info!("shutting down");

    scheduler.await?;
    service.shutdown().await;
    Ok(())
}
