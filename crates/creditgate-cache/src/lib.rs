//! Credit admission core for creditgate.
//!
//! This crate keeps API admission fast while the authoritative balance lives
//! in a slow ledger:
//!
//! - [`CreditCache`]: per-user cached balance guarded by a per-user async
//!   lock; deductions are answered from memory and persisted in the background
//! - [`RetryExecutor`]: bounded, cancellable retry for ledger operations
//! - [`SessionAuthenticator`]: sliding-expiration activity check per user
//! - [`RefillReconciler`] / [`RefillScheduler`]: periodic sweep clamping
//!   every ledger balance into the allowed range and pushing corrections into
//!   the cache
//! - [`CreditGate`]: the request flow: authenticate, then deduct
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use creditgate_cache::{Admission, CreditCache, CreditGate, RetryExecutor, SessionAuthenticator};
//! use creditgate_ledger::MemoryLedger;
//!
//! # async fn example() -> Result<(), creditgate_cache::CreditError> {
//! let ledger = Arc::new(MemoryLedger::new(Duration::ZERO).with_balances([("user1", 1)]));
//! let cache = Arc::new(CreditCache::new(ledger, RetryExecutor::default()));
//! let sessions = Arc::new(SessionAuthenticator::new(Duration::from_secs(1800)));
//! let gate = CreditGate::new(sessions, cache);
//!
//! assert_eq!(gate.admit("user1").await?, Admission::Admitted);
//! assert_eq!(gate.admit("user1").await?, Admission::InsufficientCredits);
//! # Ok(())
//! # }
//! ```

mod cache;
mod entry;
mod error;
mod gate;
mod refill;
mod retry;
mod scheduler;
mod session;

pub use cache::{CacheStats, CreditCache};
pub use error::CreditError;
pub use gate::{Admission, CreditGate};
pub use refill::{ReconcileReport, RefillPolicy, RefillReconciler};
pub use retry::{RetryError, RetryExecutor, RetryPolicy};
pub use scheduler::RefillScheduler;
pub use session::SessionAuthenticator;

pub use tokio_util::sync::CancellationToken;
