//! Configuration loading and CLI definitions.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, ConfigFormat, load_config};
pub use types::*;
pub use validate::validate_config;

/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub refill: RefillConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Users visited by each refill sweep. Ledger seed users are always
    /// included.
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Configured users followed by seeded ledger users, without duplicates.
    pub fn known_users(&self) -> Vec<String> {
        let mut seen = HashSet::with_capacity(self.users.len() + self.ledger.balances.len());
        self.users
            .iter()
            .chain(self.ledger.balances.keys())
            .filter(|user| seen.insert(user.as_str()))
            .cloned()
            .collect()
    }
}
