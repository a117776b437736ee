//! Default configuration values loaded from config.defaults.toml.
//!
//! The shared TOML file is embedded at compile time so every binary agrees on
//! the same defaults.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    mcts: MctsDefaults,
    evaluator: EvaluatorDefaults,
    selfplay: SelfPlayDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    num_iterations: u32,
    rollout_policy: String,
    epsilon: f64,
}

#[derive(Debug, Deserialize)]
struct EvaluatorDefaults {
    backend: String,
    host: String,
    port: u16,
    connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SelfPlayDefaults {
    games: u32,
    max_turns: u32,
    player1: String,
    player2: String,
    export_training_data: bool,
    repeat_draws: bool,
    log_interval: u32,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// MCTS
pub fn num_iterations() -> u32 {
    DEFAULTS.mcts.num_iterations
}
pub fn rollout_policy() -> &'static str {
    &DEFAULTS.mcts.rollout_policy
}
pub fn epsilon() -> f64 {
    DEFAULTS.mcts.epsilon
}

// Evaluator
pub fn evaluator_backend() -> &'static str {
    &DEFAULTS.evaluator.backend
}
pub fn evaluator_host() -> &'static str {
    &DEFAULTS.evaluator.host
}
pub fn evaluator_port() -> u16 {
    DEFAULTS.evaluator.port
}
pub fn connect_timeout_secs() -> u64 {
    DEFAULTS.evaluator.connect_timeout_secs
}

// Self-play
pub fn games() -> u32 {
    DEFAULTS.selfplay.games
}
pub fn max_turns() -> u32 {
    DEFAULTS.selfplay.max_turns
}
pub fn player1() -> &'static str {
    &DEFAULTS.selfplay.player1
}
pub fn player2() -> &'static str {
    &DEFAULTS.selfplay.player2
}
pub fn export_training_data() -> bool {
    DEFAULTS.selfplay.export_training_data
}
pub fn repeat_draws() -> bool {
    DEFAULTS.selfplay.repeat_draws
}
pub fn log_interval() -> u32 {
    DEFAULTS.selfplay.log_interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        assert_eq!(data_dir(), "./data");
        assert_eq!(log_level(), "info");
    }

    #[test]
    fn test_mcts_defaults() {
        assert_eq!(num_iterations(), 100);
        assert_eq!(rollout_policy(), "random");
        assert!((epsilon() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evaluator_defaults() {
        assert_eq!(evaluator_backend(), "heuristic");
        assert_eq!(evaluator_host(), "127.0.0.1");
        assert_eq!(evaluator_port(), 5050);
        assert_eq!(connect_timeout_secs(), 5);
    }

    #[test]
    fn test_selfplay_defaults() {
        assert_eq!(games(), 100);
        assert_eq!(max_turns(), 50);
        assert_eq!(player1(), "mcts");
        assert_eq!(player2(), "random");
        assert!(!export_training_data());
        assert!(repeat_draws());
    }
}
