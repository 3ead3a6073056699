//! Core constants shared across creditgate crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Log field labels for ledger operations
//! - Common project metadata

pub mod defaults;
pub mod labels;

pub use defaults::*;
pub use labels::*;

/// Project name.
pub const PROJECT_NAME: &str = "creditgate";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
