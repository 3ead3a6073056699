//! Request admission: authenticate, then spend one credit.

use std::sync::Arc;

use creditgate_ledger::LedgerStore;
use tracing::debug;

use crate::cache::CreditCache;
use crate::error::CreditError;
use crate::session::SessionAuthenticator;

/// Result of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A credit was consumed; forward the request.
    Admitted,
    /// The user has no credits left; nothing was consumed.
    InsufficientCredits,
}

impl Admission {
    #[inline]
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Glue between the authenticator and the credit cache.
pub struct CreditGate<L: LedgerStore + ?Sized + 'static> {
    sessions: Arc<SessionAuthenticator>,
    cache: Arc<CreditCache<L>>,
}

impl<L: LedgerStore + ?Sized + 'static> Clone for CreditGate<L> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<L: LedgerStore + ?Sized + 'static> CreditGate<L> {
    pub fn new(sessions: Arc<SessionAuthenticator>, cache: Arc<CreditCache<L>>) -> Self {
        Self { sessions, cache }
    }

    pub fn cache(&self) -> &Arc<CreditCache<L>> {
        &self.cache
    }

    pub fn sessions(&self) -> &Arc<SessionAuthenticator> {
        &self.sessions
    }

    /// Admit one request for `user_id`.
    ///
    /// An expired session fails before any credit is touched.
    pub async fn admit(&self, user_id: &str) -> Result<Admission, CreditError> {
        if user_id.trim().is_empty() {
            return Err(CreditError::InvalidUser);
        }

        self.sessions.authenticate(user_id)?;

        let admission = if self.cache.try_deduct(user_id).await? {
            Admission::Admitted
        } else {
            Admission::InsufficientCredits
        };
        debug!(user_id, ?admission, "request admission decided");
        Ok(admission)
    }

    /// Current balance of `user_id`.
    pub async fn balance(&self, user_id: &str) -> Result<u64, CreditError> {
        if user_id.trim().is_empty() {
            return Err(CreditError::InvalidUser);
        }
        self.cache.get_credits(user_id).await
    }
}

impl<L: LedgerStore + ?Sized + 'static> std::fmt::Debug for CreditGate<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditGate")
            .field("sessions", &self.sessions)
            .field("cache", &self.cache)
            .finish()
    }
}
