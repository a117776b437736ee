//! Configuration for the self-play harness
//!
//! Configuration is loaded from config.toml with `TAVERN_*` environment
//! variable overrides. CLI arguments take highest priority, followed by env
//! vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use engine_config::{load_config, CentralConfig};
use mcts::{EvaluatorSettings, MctsConfig, RolloutPolicy};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

use crate::agent::AgentKind;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_games() -> u32 {
    CENTRAL_CONFIG.selfplay.games
}

fn default_max_turns() -> u32 {
    CENTRAL_CONFIG.selfplay.max_turns
}

fn default_player1() -> String {
    CENTRAL_CONFIG.selfplay.player1.clone()
}

fn default_player2() -> String {
    CENTRAL_CONFIG.selfplay.player2.clone()
}

fn default_export() -> bool {
    CENTRAL_CONFIG.selfplay.export_training_data
}

fn default_repeat_draws() -> bool {
    CENTRAL_CONFIG.selfplay.repeat_draws
}

fn default_log_interval() -> u32 {
    CENTRAL_CONFIG.selfplay.log_interval
}

fn default_num_iterations() -> u32 {
    CENTRAL_CONFIG.mcts.num_iterations
}

fn default_rollout_policy() -> String {
    CENTRAL_CONFIG.mcts.rollout_policy.clone()
}

fn default_epsilon() -> f64 {
    CENTRAL_CONFIG.mcts.epsilon
}

fn default_evaluator() -> String {
    CENTRAL_CONFIG.evaluator.backend.clone()
}

fn default_evaluator_host() -> String {
    CENTRAL_CONFIG.evaluator.host.clone()
}

fn default_evaluator_port() -> u16 {
    CENTRAL_CONFIG.evaluator.port
}

fn default_connect_timeout() -> u64 {
    CENTRAL_CONFIG.evaluator.connect_timeout_secs
}

#[derive(Parser, Debug, Clone)]
#[command(name = "actor")]
#[command(about = "Tavern self-play harness")]
#[command(
    long_about = "Plays full games of the skirmish card game between two agents
(mcts or random), records win/draw statistics and optionally exports
labelled training positions.

Configuration is loaded from config.toml with TAVERN_* environment variable
overrides. CLI arguments take highest priority."
)]
pub struct Config {
    /// Data directory for statistics and training data
    #[arg(long, default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Number of valid games to play
    #[arg(long, default_value_t = default_games())]
    pub games: u32,

    /// Turn cap; a game reaching it ends without a winner
    #[arg(long, default_value_t = default_max_turns())]
    pub max_turns: u32,

    /// RNG seed for reproducible runs (defaults to the config file, else entropy)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Agent for player 1 (mcts or random)
    #[arg(long, default_value_t = default_player1())]
    pub player1: String,

    /// Agent for player 2 (mcts or random)
    #[arg(long, default_value_t = default_player2())]
    pub player2: String,

    /// MCTS iterations per decision
    #[arg(long, default_value_t = default_num_iterations())]
    pub num_iterations: u32,

    /// Rollout policy (random, greedy, epsilon-greedy)
    #[arg(long, default_value_t = default_rollout_policy())]
    pub rollout_policy: String,

    /// Random-step probability for epsilon-greedy rollouts
    #[arg(long, default_value_t = default_epsilon())]
    pub epsilon: f64,

    /// Evaluator backend (heuristic or remote)
    #[arg(long, default_value_t = default_evaluator())]
    pub evaluator: String,

    /// Remote evaluator host
    #[arg(long, default_value_t = default_evaluator_host())]
    pub evaluator_host: String,

    /// Remote evaluator port
    #[arg(long, default_value_t = default_evaluator_port())]
    pub evaluator_port: u16,

    /// Remote evaluator connect timeout in seconds
    #[arg(long, default_value_t = default_connect_timeout())]
    pub connect_timeout_secs: u64,

    /// Append labelled positions to <data_dir>/training_data.csv
    #[arg(long, default_value_t = default_export(), action = ArgAction::Set)]
    pub export_training_data: bool,

    /// Replay games that hit the turn cap instead of counting them
    #[arg(long, default_value_t = default_repeat_draws(), action = ArgAction::Set)]
    pub repeat_draws: bool,

    /// Log progress every N games (0 to disable)
    #[arg(long, default_value_t = default_log_interval())]
    pub log_interval: u32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            return Err(anyhow!("games must be greater than 0"));
        }

        if self.max_turns == 0 {
            return Err(anyhow!("max_turns must be greater than 0"));
        }

        if self.num_iterations == 0 {
            return Err(anyhow!("num_iterations must be greater than 0"));
        }

        self.agents()?;
        self.mcts_config()?;
        self.evaluator_settings()?;

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }

    /// Agent kinds for player 1 and player 2.
    pub fn agents(&self) -> Result<[AgentKind; 2]> {
        Ok([self.player1.parse()?, self.player2.parse()?])
    }

    pub fn mcts_config(&self) -> Result<MctsConfig> {
        let policy = RolloutPolicy::from_name(&self.rollout_policy, self.epsilon)
            .map_err(|e| anyhow!(e))?;
        Ok(MctsConfig::default()
            .with_iterations(self.num_iterations)
            .with_rollout_policy(policy))
    }

    pub fn evaluator_settings(&self) -> Result<EvaluatorSettings> {
        Ok(EvaluatorSettings::from_config(
            &self.evaluator,
            &self.evaluator_host,
            self.evaluator_port,
            self.connect_timeout_secs,
        )?)
    }

    /// CLI seed, else the config file seed.
    pub fn seed(&self) -> Option<u64> {
        self.seed.or(CENTRAL_CONFIG.selfplay.seed)
    }

    pub fn stats_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("selfplay_stats.json")
    }

    pub fn training_data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("training_data.csv")
    }
}
