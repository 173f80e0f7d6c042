//! # groupdb_app: demo runner
//!
//! Drives the group database submission pipeline from a fixed-rate tick
//! loop. Each tick a spawner builds entities and enqueues structural
//! operations; the scheduler decides when a submission pass commits them.
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments and load the submission config (JSON, optional).
//! 2. Register the demo engines.
//! 3. Enter the fixed-timestep tick loop and print the run totals.

mod demo;
mod scheduler;
mod tick;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use groupdb_submission::SubmissionConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tick::{TickConfig, TickLoop};

#[derive(Parser)]
#[command(name = "groupdb_app", about = "Tick-driven group database submission demo")]
struct Args {
    /// Target ticks per second
    #[arg(short, long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Number of ticks to run (0 = unlimited)
    #[arg(short, long, default_value_t = 600)]
    max_ticks: u64,

    /// Run a submission pass every N ticks
    #[arg(short, long, default_value_t = 1)]
    submit_every: u64,

    /// Path to a JSON submission config
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("groupdb_app=info".parse()?))
        .init();

    let args = Args::parse();
    if !(args.tick_rate.is_finite() && args.tick_rate > 0.0) {
        anyhow::bail!("tick rate must be a positive number, got {}", args.tick_rate);
    }

    let submission = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading submission config");
            SubmissionConfig::from_file(path)
                .with_context(|| format!("invalid submission config {}", path.display()))?
        }
        None => SubmissionConfig::default(),
    };

    let config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.max_ticks,
    };
    let mut tick_loop = TickLoop::new(config, submission, scheduler::from_interval(args.submit_every))?;
    tick_loop.run()?;

    let database = tick_loop.root().database();
    info!(
        ticks = tick_loop.tick_id(),
        groups = database.group_count(),
        stats = %serde_json::to_string(tick_loop.stats())?,
        "run complete"
    );
    Ok(())
}
