//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const VALID_OUTPUTS: [&str; 2] = ["stdout", "stderr"];

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.session.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "session.timeout_secs must be > 0".into(),
        ));
    }
    if config.refill.minimum_credits > config.refill.maximum_credits {
        return Err(ConfigError::Validation(format!(
            "refill.minimum_credits ({}) cannot be greater than refill.maximum_credits ({})",
            config.refill.minimum_credits, config.refill.maximum_credits
        )));
    }
    if config.refill.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "refill.interval_secs must be > 0".into(),
        ));
    }
    if config.refill.concurrency == 0 {
        return Err(ConfigError::Validation(
            "refill.concurrency must be > 0".into(),
        ));
    }
    if config.persistence.max_retry_attempts == 0 {
        return Err(ConfigError::Validation(
            "persistence.max_retry_attempts must be >= 1".into(),
        ));
    }
    if let Some(user) = config.users.iter().find(|u| u.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "users contains an empty id ({user:?})"
        )));
    }
    if config.ledger.balances.keys().any(|u| u.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "ledger.balances contains an empty user id".into(),
        ));
    }
    if let Some(level) = &config.logging.level
        && !VALID_LEVELS.contains(&level.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.level must be one of: {:?}",
            VALID_LEVELS
        )));
    }
    if let Some(format) = &config.logging.format
        && !VALID_FORMATS.contains(&format.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.format must be one of: {:?}",
            VALID_FORMATS
        )));
    }
    if let Some(output) = &config.logging.output
        && !VALID_OUTPUTS.contains(&output.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.output must be one of: {:?}",
            VALID_OUTPUTS
        )));
    }
    Ok(())
}
