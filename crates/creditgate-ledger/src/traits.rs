//! Ledger and directory traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DirectoryError, LedgerError};

/// The authoritative balance store.
///
/// Every call is expected to be slow (on the order of 100ms). Implementations
/// must be thread-safe (`Send + Sync`) as they are called concurrently from
/// request handlers, background persistence tasks and refill sweeps.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the current balance of a user. Unknown users have a balance of 0.
    async fn get_credits(&self, user_id: &str) -> Result<u64, LedgerError>;

    /// Overwrite the balance of a user.
    async fn set_credits(&self, user_id: &str, credits: u64) -> Result<(), LedgerError>;

    /// Atomically subtract `amount` from a user's balance.
    ///
    /// Returns `Ok(false)` without changing anything when the ledger balance
    /// is lower than `amount`.
    async fn deduct(&self, user_id: &str, amount: u64) -> Result<bool, LedgerError>;
}

#[async_trait]
impl<L: LedgerStore + ?Sized> LedgerStore for Arc<L> {
    #[inline]
    async fn get_credits(&self, user_id: &str) -> Result<u64, LedgerError> {
        (**self).get_credits(user_id).await
    }

    #[inline]
    async fn set_credits(&self, user_id: &str, credits: u64) -> Result<(), LedgerError> {
        (**self).set_credits(user_id, credits).await
    }

    #[inline]
    async fn deduct(&self, user_id: &str, amount: u64) -> Result<bool, LedgerError> {
        (**self).deduct(user_id, amount).await
    }
}

#[async_trait]
impl<L: LedgerStore + ?Sized> LedgerStore for Box<L> {
    #[inline]
    async fn get_credits(&self, user_id: &str) -> Result<u64, LedgerError> {
        (**self).get_credits(user_id).await
    }

    #[inline]
    async fn set_credits(&self, user_id: &str, credits: u64) -> Result<(), LedgerError> {
        (**self).set_credits(user_id, credits).await
    }

    #[inline]
    async fn deduct(&self, user_id: &str, amount: u64) -> Result<bool, LedgerError> {
        (**self).deduct(user_id, amount).await
    }
}

/// Source of every user id a refill sweep should visit.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// List all known user ids. An empty list is a valid answer.
    async fn all_user_ids(&self) -> Result<Vec<String>, DirectoryError>;
}

#[async_trait]
impl<D: UserDirectory + ?Sized> UserDirectory for Arc<D> {
    #[inline]
    async fn all_user_ids(&self) -> Result<Vec<String>, DirectoryError> {
        (**self).all_user_ids().await
    }
}
