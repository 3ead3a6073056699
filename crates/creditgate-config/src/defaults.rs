//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `creditgate_core::defaults`.

use std::collections::BTreeMap;

use creditgate_core::defaults;

/// Generate default value functions that forward to creditgate_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

default_fns! {
    default_session_timeout_secs  => DEFAULT_SESSION_TIMEOUT_SECS: u64,
    default_minimum_credits       => DEFAULT_MINIMUM_CREDITS: u64,
    default_maximum_credits       => DEFAULT_MAXIMUM_CREDITS: u64,
    default_refill_interval_secs  => DEFAULT_REFILL_INTERVAL_SECS: u64,
    default_refill_concurrency    => DEFAULT_REFILL_CONCURRENCY: usize,
    default_max_retry_attempts    => DEFAULT_MAX_RETRY_ATTEMPTS: u32,
    default_retry_delay_ms        => DEFAULT_RETRY_DELAY_MS: u64,
    default_drain_timeout_secs    => DEFAULT_DRAIN_TIMEOUT_SECS: u64,
    default_ledger_latency_ms     => DEFAULT_LEDGER_LATENCY_MS: u64,
}

pub(crate) fn default_ledger_balances() -> BTreeMap<String, u64> {
    defaults::DEFAULT_SEED_BALANCES
        .iter()
        .map(|(user, credits)| (user.to_string(), *credits))
        .collect()
}
