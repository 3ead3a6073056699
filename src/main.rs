//! Creditgate CLI.
//!
//! - `creditgate run` - Run the credit service until SIGINT/SIGTERM
//! - `creditgate check` - Validate a config file
//! - `creditgate probe` - Admit a burst of requests for one user

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Creditgate command-line interface.
#[derive(Parser)]
#[command(
    name = "creditgate",
    version,
    about = "Credit-gated API admission over a slow ledger",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the credit service.
    #[command(name = "run", alias = "serve")]
    Run(Box<creditgate_server::ServerArgs>),

    /// Load and validate a config file.
    #[command(name = "check")]
    Check(Box<creditgate_server::ServerArgs>),

    /// Admit concurrent requests for one user and print the outcome.
    #[command(name = "probe")]
    Probe(Box<creditgate_server::ProbeArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => creditgate_server::cli::run(*args).await,
        Commands::Check(args) => creditgate_server::cli::check(*args).await,
        Commands::Probe(args) => creditgate_server::cli::probe(*args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
