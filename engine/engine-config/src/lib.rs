//! Tavern configuration: `config.defaults.toml` compiled in, an optional
//! `config.toml` on top, and `TAVERN_<SECTION>_<KEY>` env vars over both
//! (e.g. `TAVERN_MCTS_NUM_ITERATIONS=400`, `TAVERN_EVALUATOR_BACKEND=remote`).

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, config_path, load_config, load_from_path, CONFIG_ENV,
    CONFIG_SEARCH_PATHS,
};
pub use structs::*;
