//! CLI module for creditgate.
//!
//! Entry points behind the `run`, `check` and `probe` subcommands of the
//! `creditgate` binary.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use creditgate_config::{
    CliOverrides, Config, LoggingConfig, apply_overrides, load_config, validate_config,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::service::{CreditService, run_with_shutdown};
use crate::CancellationToken;

/// Arguments shared by every subcommand that reads a config file.
#[derive(Parser, Debug, Clone)]
pub struct ServerArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Arguments of the `probe` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// User to admit requests for
    #[arg(long)]
    pub user: String,

    /// Number of concurrent requests
    #[arg(long, default_value_t = 10)]
    pub requests: usize,
}

fn load(args: &ServerArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Run the service until SIGINT or SIGTERM.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&args)?;
    init_tracing(&config.logging);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();

    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!(signal, "shutdown signal received, draining pending deductions");
        signal_token.cancel();
    });

    run_with_shutdown(config, shutdown).await?;
    Ok(())
}

/// Load and validate a config file without starting anything.
pub async fn check(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&args)?;
    println!("{}: ok", args.config.display());
    println!(
        "  session timeout: {}s, refill: {}..={} every {}s, users: {}",
        config.session.timeout_secs,
        config.refill.minimum_credits,
        config.refill.maximum_credits,
        config.refill.interval_secs,
        config.known_users().len()
    );
    Ok(())
}

/// Fire a burst of concurrent admissions for one user and print the outcome.
pub async fn probe(args: ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(&args.server)?;
    init_tracing(&config.logging);

    let service = CreditService::from_config(&config)?;
    let summary = service.probe(&args.user, args.requests).await;
    service.shutdown().await;

    println!("user:           {}", args.user);
    println!("requests:       {}", args.requests);
    println!("admitted:       {}", summary.admitted);
    println!("rejected:       {}", summary.rejected);
    println!("errors:         {}", summary.errors);
    println!("balance:        {}", summary.balance);
    println!("ledger balance: {}", summary.ledger_balance);
    Ok(())
}

/// Resolve with the name of the first shutdown signal received.
///
/// A signal that cannot be listened for is logged and never fires; the
/// other one still stops the service.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGINT");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}

/// Build the filter directive from the base level and per-module filters.
fn filter_directive(config: &LoggingConfig) -> String {
    let mut filter = config.level.as_deref().unwrap_or("info").to_string();
    for (module, level) in &config.filters {
        filter.push(',');
        filter.push_str(module);
        filter.push('=');
        filter.push_str(level);
    }
    filter
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
///
/// Only the first call installs a subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_new(filter_directive(config)).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = match (format, output) {
        ("json", "stdout") => registry
            .with(fmt::layer().json().with_writer(io::stdout))
            .try_init(),
        ("json", _) => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        ("compact", "stdout") => registry
            .with(fmt::layer().compact().with_writer(io::stdout))
            .try_init(),
        ("compact", _) => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init(),
        (_, "stdout") => registry.with(fmt::layer().with_writer(io::stdout)).try_init(),
        _ => registry.with(fmt::layer().with_writer(io::stderr)).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filter_directive() {
        let config = LoggingConfig {
            level: Some("warn".into()),
            filters: HashMap::from([("creditgate_cache".to_string(), "debug".to_string())]),
            ..Default::default()
        };
        assert_eq!(filter_directive(&config), "warn,creditgate_cache=debug");
        assert_eq!(filter_directive(&LoggingConfig::default()), "info");
    }

    #[test]
    fn test_probe_args_parse() {
        let args = ProbeArgs::try_parse_from([
            "probe",
            "-c",
            "creditgate.toml",
            "--user",
            "user1",
            "--requests",
            "25",
            "--ledger-latency-ms",
            "0",
        ])
        .unwrap();
        assert_eq!(args.user, "user1");
        assert_eq!(args.requests, 25);
        assert_eq!(args.server.config, PathBuf::from("creditgate.toml"));
        assert_eq!(args.server.overrides.ledger_latency_ms, Some(0));
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(&LoggingConfig::default());
        init_tracing(&LoggingConfig {
            format: Some("json".into()),
            ..Default::default()
        });
    }
}
