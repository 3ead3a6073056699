//! Credit admission error types.

use std::time::Duration;

use creditgate_ledger::{DirectoryError, LedgerError};

/// Error raised by the credit cache, the authenticator and the refill sweep.
///
/// Running out of credits is not an error: it is the `false` outcome of
/// [`CreditCache::try_deduct`](crate::CreditCache::try_deduct).
#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    /// The user was idle for longer than the session timeout.
    #[error("session expired for user {user_id} after {idle:?} of inactivity")]
    SessionExpired { user_id: String, idle: Duration },

    /// A ledger call failed.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// The known-user list could not be read.
    #[error("directory: {0}")]
    Directory(#[from] DirectoryError),

    /// The operation observed cancellation and stopped.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller supplied an empty user id.
    #[error("user id is empty")]
    InvalidUser,

    /// Refill bounds are inverted.
    #[error("invalid refill policy: minimum {minimum} exceeds maximum {maximum}")]
    InvalidRefillPolicy { minimum: u64, maximum: u64 },
}

impl CreditError {
    /// Whether this is a session expiry (mapped to "unauthorized" by callers).
    #[inline]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}
