//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_num_iterations() -> u32 {
    defaults::num_iterations()
}
fn d_rollout_policy() -> String {
    defaults::rollout_policy().into()
}
fn d_epsilon() -> f64 {
    defaults::epsilon()
}
fn d_backend() -> String {
    defaults::evaluator_backend().into()
}
fn d_host() -> String {
    defaults::evaluator_host().into()
}
fn d_port() -> u16 {
    defaults::evaluator_port()
}
fn d_connect_timeout() -> u64 {
    defaults::connect_timeout_secs()
}
fn d_games() -> u32 {
    defaults::games()
}
fn d_max_turns() -> u32 {
    defaults::max_turns()
}
fn d_player1() -> String {
    defaults::player1().into()
}
fn d_player2() -> String {
    defaults::player2().into()
}
fn d_export() -> bool {
    defaults::export_training_data()
}
fn d_repeat_draws() -> bool {
    defaults::repeat_draws()
}
fn d_log_interval() -> u32 {
    defaults::log_interval()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub selfplay: SelfPlayConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Search settings. Parsed into `mcts::MctsConfig` by the consumer.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MctsConfig {
    #[serde(default = "d_num_iterations")]
    pub num_iterations: u32,
    /// `random`, `greedy` or `epsilon-greedy`
    #[serde(default = "d_rollout_policy")]
    pub rollout_policy: String,
    #[serde(default = "d_epsilon")]
    pub epsilon: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_iterations: defaults::num_iterations(),
            rollout_policy: defaults::rollout_policy().into(),
            epsilon: defaults::epsilon(),
        }
    }
}

/// Position evaluator backend selection
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// `heuristic` or `remote`
    #[serde(default = "d_backend")]
    pub backend: String,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            backend: defaults::evaluator_backend().into(),
            host: defaults::evaluator_host().into(),
            port: defaults::evaluator_port(),
            connect_timeout_secs: defaults::connect_timeout_secs(),
        }
    }
}

/// Self-play harness configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelfPlayConfig {
    #[serde(default = "d_games")]
    pub games: u32,
    #[serde(default = "d_max_turns")]
    pub max_turns: u32,
    /// Fixed RNG seed; `None` seeds from entropy
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "d_player1")]
    pub player1: String,
    #[serde(default = "d_player2")]
    pub player2: String,
    #[serde(default = "d_export")]
    pub export_training_data: bool,
    /// Replay games that hit the turn cap instead of counting them
    #[serde(default = "d_repeat_draws")]
    pub repeat_draws: bool,
    #[serde(default = "d_log_interval")]
    pub log_interval: u32,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            games: defaults::games(),
            max_turns: defaults::max_turns(),
            seed: None,
            player1: defaults::player1().into(),
            player2: defaults::player2().into(),
            export_training_data: defaults::export_training_data(),
            repeat_draws: defaults::repeat_draws(),
            log_interval: defaults::log_interval(),
        }
    }
}
