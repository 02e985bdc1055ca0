//! Unified hopchain CLI.
//!
//! - `hopchain route` - print the route selected for a target
//! - `hopchain probe` - connect to a target through the chain

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Hopchain unified CLI.
#[derive(Parser)]
#[command(
    name = "hopchain",
    version,
    about = "Multi-hop proxy chain tools",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the route selected for a target.
    #[command(name = "route")]
    Route(hopchain::cli::RouteArgs),

    /// Connect to a target through the chain.
    #[command(name = "probe", alias = "dial")]
    Probe(hopchain::cli::ProbeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Route(args) => hopchain::cli::run_route(args).await,
        Commands::Probe(args) => hopchain::cli::run_probe(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
