//! Sliding-expiration session check.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CreditError;

/// Tracks the last activity of every user and rejects users that have been
/// idle for longer than the timeout.
///
/// Each successful call renews the session. An expired session stays expired:
/// the stale timestamp is kept, so every later call fails as well until the
/// record is evicted.
#[derive(Debug)]
pub struct SessionAuthenticator {
    sessions: DashMap<String, Instant>,
    timeout: Duration,
}

impl SessionAuthenticator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check and renew the session of `user_id`.
    ///
    /// The check and the renewal happen under the map shard's write lock, so
    /// two concurrent calls for the same user cannot both pass a stale check.
    pub fn authenticate(&self, user_id: &str) -> Result<(), CreditError> {
        let now = Instant::now();

        if let Some(mut last) = self.sessions.get_mut(user_id) {
            return self.renew(user_id, &mut last, now);
        }

        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => self.renew(user_id, entry.get_mut(), now),
            Entry::Vacant(entry) => {
                entry.insert(now);
                debug!(user_id, "session started");
                Ok(())
            }
        }
    }

    /// When `user_id` was last seen, if ever.
    pub fn last_activity(&self, user_id: &str) -> Option<Instant> {
        self.sessions.get(user_id).map(|last| *last)
    }

    /// Forget a user's session. The next call starts a fresh one.
    pub fn evict(&self, user_id: &str) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn renew(&self, user_id: &str, last: &mut Instant, now: Instant) -> Result<(), CreditError> {
        let idle = now.saturating_duration_since(*last);
        if idle > self.timeout {
            warn!(user_id, idle_secs = idle.as_secs(), "session expired");
            return Err(CreditError::SessionExpired {
                user_id: user_id.to_string(),
                idle,
            });
        }
        *last = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::Barrier;

    const TIMEOUT: Duration = Duration::from_secs(30 * 60);

    #[tokio::test(start_paused = true)]
    async fn test_first_call_starts_session() {
        let auth = SessionAuthenticator::new(TIMEOUT);
        assert!(auth.last_activity("user1").is_none());

        auth.authenticate("user1").unwrap();
        assert_eq!(auth.last_activity("user1"), Some(Instant::now()));
        assert_eq!(auth.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_slides_the_window() {
        let auth = SessionAuthenticator::new(TIMEOUT);
        auth.authenticate("user1").unwrap();

        // Three calls 20 minutes apart: 60 minutes total, never idle for 30
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(20 * 60)).await;
            auth.authenticate("user1").unwrap();
        }
        assert_eq!(auth.last_activity("user1"), Some(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_at_timeout_is_still_valid() {
        let auth = SessionAuthenticator::new(TIMEOUT);
        auth.authenticate("user1").unwrap();
        tokio::time::advance(TIMEOUT).await;
        assert!(auth.authenticate("user1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires_and_stays_expired() {
        let auth = SessionAuthenticator::new(TIMEOUT);
        auth.authenticate("user1").unwrap();
        let started = auth.last_activity("user1").unwrap();

        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        let err = auth.authenticate("user1").unwrap_err();
        assert!(err.is_session_expired());
        match err {
            CreditError::SessionExpired { user_id, idle } => {
                assert_eq!(user_id, "user1");
                assert_eq!(idle, Duration::from_secs(31 * 60));
            }
            other => panic!("unexpected error: {other}"),
        }

        // The stale timestamp is not reset
        assert_eq!(auth.last_activity("user1"), Some(started));
        assert!(auth.authenticate("user1").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_starts_fresh_session() {
        let auth = SessionAuthenticator::new(TIMEOUT);
        auth.authenticate("user1").unwrap();
        tokio::time::advance(TIMEOUT * 2).await;
        assert!(auth.authenticate("user1").is_err());

        assert!(auth.evict("user1"));
        assert!(auth.authenticate("user1").is_ok());
    }

    async fn authenticate_concurrently(
        auth: &Arc<SessionAuthenticator>,
        user_id: &'static str,
        calls: usize,
    ) -> Vec<Result<(), CreditError>> {
        let barrier = Arc::new(Barrier::new(calls));
        let handles: Vec<_> = (0..calls)
            .map(|_| {
                let auth = auth.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    auth.authenticate(user_id)
                })
            })
            .collect();

        let mut results = Vec::with_capacity(calls);
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_on_stale_session_all_fail() {
        let auth = Arc::new(SessionAuthenticator::new(Duration::from_millis(20)));
        auth.authenticate("user1").unwrap();
        let started = auth.last_activity("user1").unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let results = authenticate_concurrently(&auth, "user1", 32).await;
        assert!(results.iter().all(|r| matches!(r, Err(e) if e.is_session_expired())));
        assert_eq!(auth.last_activity("user1"), Some(started));
        assert_eq!(auth.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_renewals_keep_one_record() {
        let auth = Arc::new(SessionAuthenticator::new(TIMEOUT));
        let before = Instant::now();

        // First touch and renewals race on the same key
        let results = authenticate_concurrently(&auth, "user1", 32).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(auth.len(), 1);

        let last = auth.last_activity("user1").unwrap();
        assert!(last >= before);
        assert!(last <= Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_are_independent() {
        let auth = SessionAuthenticator::new(TIMEOUT);
        auth.authenticate("user1").unwrap();
        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        auth.authenticate("user2").unwrap();
        tokio::time::advance(Duration::from_secs(20 * 60)).await;

        assert!(auth.authenticate("user1").is_err());
        assert!(auth.authenticate("user2").is_ok());
    }
}
