//! Ledger contracts for creditgate.
//!
//! The ledger is the slow, authoritative balance store that the credit cache
//! sits in front of. This crate defines the contract ([`LedgerStore`]), the
//! source of known users for refill sweeps ([`UserDirectory`]), and
//! in-memory implementations of both.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use creditgate_ledger::{LedgerStore, MemoryLedger};
//!
//! # async fn example() -> Result<(), creditgate_ledger::LedgerError> {
//! let ledger = MemoryLedger::new(Duration::ZERO).with_balances([("user1", 10)]);
//!
//! assert!(ledger.deduct("user1", 1).await?);
//! assert_eq!(ledger.get_credits("user1").await?, 9);
//! # Ok(())
//! # }
//! ```

mod directory;
mod error;
mod memory;
mod traits;

pub use directory::StaticUserDirectory;
pub use error::{DirectoryError, LedgerError};
pub use memory::{LedgerCalls, MemoryLedger};
pub use traits::{LedgerStore, UserDirectory};
