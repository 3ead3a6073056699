//! Server error types.

use creditgate_cache::CreditError;
use creditgate_config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("credit: {0}")]
    Credit(#[from] CreditError),
    #[error("task: {0}")]
    Join(#[from] tokio::task::JoinError),
}
