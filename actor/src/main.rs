//! Actor - self-play harness for the Tavern decision engine
//!
//! A batch process that:
//! 1. Builds one agent per seat (MCTS or random)
//! 2. Plays full Skirmish games until the requested number is counted
//! 3. Writes run statistics to `<data_dir>/selfplay_stats.json`
//! 4. Optionally appends labelled positions to `<data_dir>/training_data.csv`

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod agent;
mod config;
mod export;
mod selfplay;
mod stats;

use crate::config::Config;
use crate::selfplay::SelfPlay;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    info!(
        games = config.games,
        player1 = %config.player1,
        player2 = %config.player2,
        iterations = config.num_iterations,
        rollout = %config.rollout_policy,
        evaluator = %config.evaluator,
        seed = ?config.seed(),
        "Actor starting"
    );

    let result = SelfPlay::new(config).and_then(|mut selfplay| selfplay.run());

    match result {
        Ok(snapshot) => {
            info!(
                games = snapshot.games_played,
                runtime_secs = format!("{:.1}", snapshot.runtime_seconds),
                "Actor completed successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!("Actor failed: {:#}", e);
            Err(e)
        }
    }
}
