//! Ledger error types.

/// Error raised by a [`LedgerStore`](crate::LedgerStore) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The call failed but may succeed if repeated.
    #[error("transient ledger failure: {0}")]
    Transient(String),

    /// The backend rejected the call or is unreachable.
    #[error("ledger backend error: {0}")]
    Backend(String),
}

impl LedgerError {
    /// Create a transient error from any error type.
    #[inline]
    pub fn transient<E: std::fmt::Display>(err: E) -> Self {
        Self::Transient(err.to_string())
    }

    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Whether repeating the call may succeed.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Error raised while enumerating known users.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}
