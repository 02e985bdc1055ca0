//! CLI commands for inspecting and probing a chain file.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::load_config;

/// Show the route a target would take.
#[derive(Parser, Debug, Clone)]
#[command(name = "hopchain-route", version, about = "Print the route selected for a target")]
pub struct RouteArgs {
    /// Config file path (toml).
    #[arg(short, long, default_value = "chain.toml")]
    pub config: PathBuf,

    /// Target address (host:port).
    pub target: String,

    /// Log level override (e.g. "info", "debug", "trace").
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Dial a target through the chain.
#[derive(Parser, Debug, Clone)]
#[command(name = "hopchain-probe", version, about = "Connect to a target through the chain")]
pub struct ProbeArgs {
    /// Config file path (toml).
    #[arg(short, long, default_value = "chain.toml")]
    pub config: PathBuf,

    /// Target address (host:port).
    pub target: String,

    /// Attempts, overriding the file's `retries`.
    #[arg(long)]
    pub retries: Option<usize>,

    /// Log level override (e.g. "info", "debug", "trace").
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Select a route for the target and print it, or `direct`.
pub async fn run_route(args: RouteArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.log_level.as_deref());

    let config = load_config(&args.config)?;
    let chain = config.build_chain()?;
    let route = chain.select_route_for(&args.target)?;

    if route.is_empty() {
        println!("direct -> {}", args.target);
    } else {
        println!("{} -> {}", route, args.target);
    }
    Ok(())
}

/// Dial the target and report how long it took.
pub async fn run_probe(args: ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.log_level.as_deref());

    let config = load_config(&args.config)?;
    let chain = config.build_chain()?;
    let mut opts = config.chain_options()?;
    if let Some(retries) = args.retries {
        opts.retries = retries;
    }

    let started = Instant::now();
    let _conn = chain.dial(&args.target, &opts).await?;
    let elapsed = started.elapsed();

    info!(target_addr = %args.target, elapsed_ms = elapsed.as_millis() as u64, "probe succeeded");
    println!("connected to {} in {} ms", args.target, elapsed.as_millis());
    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let level = level.unwrap_or("info");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .try_init();
}
