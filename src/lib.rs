//! # creditgate
//!
//! Credit-gated API admission with a write-through cache in front of a slow
//! ledger.
//!
//! ## Crates
//!
//! - [`creditgate_core`] - Default values and log labels
//! - [`creditgate_ledger`] - Ledger and user-directory contracts
//! - [`creditgate_cache`] - Credit cache, sessions, retry and refill sweep
//! - [`creditgate_config`] - Configuration loading and validation
//! - [`creditgate_server`] - Service wiring and CLI

pub use creditgate_cache as cache;
pub use creditgate_config as config;
pub use creditgate_core as core;
pub use creditgate_ledger as ledger;
pub use creditgate_server as server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use creditgate_cache::{
        Admission, CancellationToken, CreditCache, CreditError, CreditGate, RefillPolicy,
        RefillReconciler, RefillScheduler, RetryExecutor, RetryPolicy, SessionAuthenticator,
    };
    pub use creditgate_config::{Config, load_config, validate_config};
    pub use creditgate_ledger::{LedgerStore, MemoryLedger, UserDirectory};
    pub use creditgate_server::{CreditService, ServerError, run_with_shutdown};
}
