//! drip-cli: Command-line driver for the Drip reward ledger.
//!
//! Replays staking scenarios against an in-memory pool and answers quick
//! questions about funding rates, without any external token or chain.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use drip_core::constants::DEFAULT_REWARD_DURATION;
use drip_core::types::{Amount, RolloverPolicy};
use drip_ledger::{PoolAccumulator, PoolConfig};

use crate::scenario::Scenario;

/// Drip reward ledger tools.
#[derive(Parser, Debug)]
#[command(name = "drip-cli")]
#[command(version, about = "Proportional reward accrual over funded periods.")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON scenario and print a JSON report.
    Simulate(SimulateArgs),
    /// Show the per-second rate a funding amount produces.
    Rate(RateArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Path to the scenario file.
    #[arg(short, long)]
    scenario: PathBuf,

    /// Pool configuration file (default: <config dir>/drip/pool.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RateArgs {
    /// Reward units to distribute.
    #[arg(short, long)]
    amount: Amount,

    /// Period length in seconds.
    #[arg(short, long, default_value_t = DEFAULT_REWARD_DURATION)]
    duration: u64,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct RateReport {
    amount: Amount,
    duration: u64,
    reward_rate: Amount,
    distributable: Amount,
    /// Lost to integer division of the rate.
    dust: Amount,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Rate(args) => {
            let report = rate(args.amount, args.duration)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drip")
        .join("pool.toml")
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = PoolConfig::load(Some(&config_path))
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    info!(
        duration = config.reward_duration,
        rollover = ?config.rollover,
        custody = %config.custody,
        "pool config"
    );

    let scenario = Scenario::load(&args.scenario)?;
    let report = scenario.run(config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn rate(amount: Amount, duration: u64) -> Result<RateReport> {
    ensure!(duration > 0, "duration must be greater than zero");
    let plan = PoolAccumulator::new()
        .plan_funding(amount, 0, duration, RolloverPolicy::Additive)
        .context("Cannot fund a period with these parameters")?;
    let distributable = amount - (amount % Amount::from(duration));
    Ok(RateReport {
        amount,
        duration,
        reward_rate: plan.reward_rate,
        distributable,
        dust: amount - distributable,
    })
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so the JSON report on stdout stays machine-readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
