//! Locating and reading config.toml, then applying `TAVERN_*` overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "TAVERN_CONFIG";

/// Checked in order when `TAVERN_CONFIG` is unset or missing. The second entry
/// covers running a binary from its crate directory.
pub const CONFIG_SEARCH_PATHS: &[&str] = &["config.toml", "../config.toml"];

/// The config file to load, if any exists.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{}={} not found, searching defaults", CONFIG_ENV, path.display());
    }

    CONFIG_SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Load the central configuration: file (if found) or built-in defaults,
/// then env overrides.
pub fn load_config() -> CentralConfig {
    match config_path() {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_from_path(&path)
        }
        None => {
            debug!("No config.toml found, using built-in defaults");
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Load `path`, falling back to the defaults when it cannot be read or parsed.
pub fn load_from_path(path: &Path) -> CentralConfig {
    let config = read_config(path).unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        CentralConfig::default()
    });
    apply_env_overrides(config)
}

fn read_config(path: &Path) -> Result<CentralConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn override_string(field: &mut String, key: &str) {
    if let Ok(v) = std::env::var(key) {
        *field = v;
    }
}

fn override_parsed<T: FromStr>(field: &mut T, key: &str) {
    if let Some(v) = parsed_env(key) {
        *field = v;
    }
}

fn override_optional<T: FromStr>(field: &mut Option<T>, key: &str) {
    if let Some(v) = parsed_env(key) {
        *field = Some(v);
    }
}

/// Parsed value of `key`; unparseable values are ignored with a warning.
fn parsed_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring unparseable {}={}", key, raw);
            None
        }
    }
}

/// Apply `TAVERN_<SECTION>_<KEY>` environment overrides.
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    let common = &mut config.common;
    override_string(&mut common.data_dir, "TAVERN_COMMON_DATA_DIR");
    override_string(&mut common.log_level, "TAVERN_COMMON_LOG_LEVEL");

    let mcts = &mut config.mcts;
    override_parsed(&mut mcts.num_iterations, "TAVERN_MCTS_NUM_ITERATIONS");
    override_string(&mut mcts.rollout_policy, "TAVERN_MCTS_ROLLOUT_POLICY");
    override_parsed(&mut mcts.epsilon, "TAVERN_MCTS_EPSILON");

    let evaluator = &mut config.evaluator;
    override_string(&mut evaluator.backend, "TAVERN_EVALUATOR_BACKEND");
    override_string(&mut evaluator.host, "TAVERN_EVALUATOR_HOST");
    override_parsed(&mut evaluator.port, "TAVERN_EVALUATOR_PORT");
    override_parsed(
        &mut evaluator.connect_timeout_secs,
        "TAVERN_EVALUATOR_CONNECT_TIMEOUT_SECS",
    );

    let selfplay = &mut config.selfplay;
    override_parsed(&mut selfplay.games, "TAVERN_SELFPLAY_GAMES");
    override_parsed(&mut selfplay.max_turns, "TAVERN_SELFPLAY_MAX_TURNS");
    override_optional(&mut selfplay.seed, "TAVERN_SELFPLAY_SEED");
    override_string(&mut selfplay.player1, "TAVERN_SELFPLAY_PLAYER1");
    override_string(&mut selfplay.player2, "TAVERN_SELFPLAY_PLAYER2");
    override_parsed(
        &mut selfplay.export_training_data,
        "TAVERN_SELFPLAY_EXPORT_TRAINING_DATA",
    );
    override_parsed(&mut selfplay.repeat_draws, "TAVERN_SELFPLAY_REPEAT_DRAWS");
    override_parsed(&mut selfplay.log_interval, "TAVERN_SELFPLAY_LOG_INTERVAL");

    config
}
