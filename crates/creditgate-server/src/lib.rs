//! Creditgate service library.
//!
//! Wires the ledger, credit cache, session authenticator and refill scheduler
//! together from a [`Config`](creditgate_config::Config), and exposes the
//! command-line entry points.

pub mod cli;
mod error;
mod service;

pub use cli::{ProbeArgs, ServerArgs};
pub use error::ServerError;
pub use service::{CreditService, ProbeSummary, run_with_shutdown};
pub use creditgate_cache::CancellationToken;
