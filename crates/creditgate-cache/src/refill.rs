//! Refill sweep: clamp every ledger balance into the allowed range.

use std::sync::Arc;

use creditgate_core::defaults::{
    DEFAULT_MAXIMUM_CREDITS, DEFAULT_MINIMUM_CREDITS, DEFAULT_REFILL_CONCURRENCY,
};
use creditgate_ledger::LedgerStore;
use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::CreditCache;
use crate::error::CreditError;

/// Allowed balance range after a refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillPolicy {
    minimum_credits: u64,
    maximum_credits: u64,
}

impl RefillPolicy {
    pub fn new(minimum_credits: u64, maximum_credits: u64) -> Result<Self, CreditError> {
        if minimum_credits > maximum_credits {
            return Err(CreditError::InvalidRefillPolicy {
                minimum: minimum_credits,
                maximum: maximum_credits,
            });
        }
        Ok(Self {
            minimum_credits,
            maximum_credits,
        })
    }

    pub fn minimum_credits(&self) -> u64 {
        self.minimum_credits
    }

    pub fn maximum_credits(&self) -> u64 {
        self.maximum_credits
    }

    #[inline]
    pub fn clamp(&self, credits: u64) -> u64 {
        credits.clamp(self.minimum_credits, self.maximum_credits)
    }
}

impl Default for RefillPolicy {
    fn default() -> Self {
        Self {
            minimum_credits: DEFAULT_MINIMUM_CREDITS,
            maximum_credits: DEFAULT_MAXIMUM_CREDITS,
        }
    }
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub adjusted: usize,
    pub unchanged: usize,
    pub failed: usize,
}

enum UserOutcome {
    Unchanged,
    Adjusted,
    Failed,
    Cancelled,
}

/// Brings ledger balances back into the [`RefillPolicy`] range and pushes
/// every correction into the cache.
pub struct RefillReconciler<L: LedgerStore + ?Sized + 'static> {
    cache: Arc<CreditCache<L>>,
    policy: RefillPolicy,
    concurrency: usize,
}

impl<L: LedgerStore + ?Sized + 'static> RefillReconciler<L> {
    pub fn new(cache: Arc<CreditCache<L>>, policy: RefillPolicy) -> Self {
        Self {
            cache,
            policy,
            concurrency: DEFAULT_REFILL_CONCURRENCY,
        }
    }

    /// Limit how many users are reconciled at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn policy(&self) -> RefillPolicy {
        self.policy
    }

    /// Reconcile every user in `users`.
    ///
    /// Users are processed in parallel. A failure for one user is logged and
    /// counted without stopping the others. Returns
    /// [`CreditError::Cancelled`] if `cancel` fired during the pass.
    pub async fn reconcile(
        &self,
        users: &[String],
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, CreditError> {
        if cancel.is_cancelled() {
            return Err(CreditError::Cancelled);
        }

        let pending: Vec<_> = users
            .iter()
            .map(|user_id| self.reconcile_user(user_id, cancel))
            .collect();
        let outcomes: Vec<UserOutcome> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ReconcileReport {
            scanned: users.len(),
            ..Default::default()
        };
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                UserOutcome::Unchanged => report.unchanged += 1,
                UserOutcome::Adjusted => report.adjusted += 1,
                UserOutcome::Failed => report.failed += 1,
                UserOutcome::Cancelled => cancelled = true,
            }
        }

        if cancelled || cancel.is_cancelled() {
            info!(
                adjusted = report.adjusted,
                failed = report.failed,
                "refill pass cancelled"
            );
            return Err(CreditError::Cancelled);
        }
        Ok(report)
    }

    async fn reconcile_user(&self, user_id: &str, cancel: &CancellationToken) -> UserOutcome {
        if cancel.is_cancelled() {
            return UserOutcome::Cancelled;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return UserOutcome::Cancelled,
            result = self.clamp_user(user_id) => result,
        };

        match result {
            Ok(None) => UserOutcome::Unchanged,
            Ok(Some((from, to))) => {
                info!(user_id, from, to, "credits refilled");
                UserOutcome::Adjusted
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to refill credits");
                UserOutcome::Failed
            }
        }
    }

    /// Returns the `(old, new)` balance when a write was needed.
    async fn clamp_user(&self, user_id: &str) -> Result<Option<(u64, u64)>, CreditError> {
        let credits = self.cache.ledger().get_credits(user_id).await?;
        let clamped = self.policy.clamp(credits);
        if clamped == credits {
            debug!(user_id, credits, "balance within range");
            return Ok(None);
        }
        self.cache.set_credits(user_id, clamped).await?;
        Ok(Some((credits, clamped)))
    }
}

impl<L: LedgerStore + ?Sized + 'static> std::fmt::Debug for RefillReconciler<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefillReconciler")
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
