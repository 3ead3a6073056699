//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override session idle timeout (seconds)
    #[arg(long)]
    pub session_timeout_secs: Option<u64>,
    /// Override refill lower bound
    #[arg(long)]
    pub minimum_credits: Option<u64>,
    /// Override refill upper bound
    #[arg(long)]
    pub maximum_credits: Option<u64>,
    /// Override refill sweep interval (seconds)
    #[arg(long)]
    pub refill_interval_secs: Option<u64>,
    /// Override number of users reconciled at once
    #[arg(long)]
    pub refill_concurrency: Option<usize>,
    /// Override attempts per ledger write
    #[arg(long)]
    pub max_retry_attempts: Option<u32>,
    /// Override delay between ledger write attempts (milliseconds)
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
    /// Override simulated ledger latency (milliseconds)
    #[arg(long)]
    pub ledger_latency_ms: Option<u64>,
    /// Override known user list (repeatable or comma-separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub users: Option<Vec<String>>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override log format (pretty/json/compact)
    #[arg(long)]
    pub log_format: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = overrides.session_timeout_secs {
        config.session.timeout_secs = v;
    }
    if let Some(v) = overrides.minimum_credits {
        config.refill.minimum_credits = v;
    }
    if let Some(v) = overrides.maximum_credits {
        config.refill.maximum_credits = v;
    }
    if let Some(v) = overrides.refill_interval_secs {
        config.refill.interval_secs = v;
    }
    if let Some(v) = overrides.refill_concurrency {
        config.refill.concurrency = v;
    }
    if let Some(v) = overrides.max_retry_attempts {
        config.persistence.max_retry_attempts = v;
    }
    if let Some(v) = overrides.retry_delay_ms {
        config.persistence.retry_delay_ms = v;
    }
    if let Some(v) = overrides.ledger_latency_ms {
        config.ledger.latency_ms = v;
    }
    if let Some(v) = &overrides.users {
        config.users = v.clone();
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = Some(v.clone());
    }
}
