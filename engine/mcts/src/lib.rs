//! Monte Carlo Tree Search decision engine for turn-based card games.
//!
//! This crate is game-agnostic: it drives any state implementing the
//! `engine-core` [`GameState`](engine_core::GameState) trait and scores
//! positions through a pluggable [`Evaluator`].
//!
//! # Overview
//!
//! One search plans the controller's remaining moves within its current turn.
//! Each iteration consists of four phases:
//!
//! 1. **Selection**: descend the tree by UCT until a node without children
//! 2. **Expansion**: materialize every non-pass successor of that node in one
//!    batched `apply` call and pick a random seed child
//! 3. **Rollout**: play the seed forward with the configured
//!    [`RolloutPolicy`] until passing, then score the final position
//! 4. **Backpropagation**: add the score to every node on the path to the root
//!
//! After the budget is spent, the visited root child with the best mean value
//! is returned.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{DecisionEngine, HeuristicEvaluator, MctsConfig, RolloutPolicy};
//!
//! let config = MctsConfig::default()
//!     .with_iterations(200)
//!     .with_rollout_policy(RolloutPolicy::Greedy);
//! let mut engine = DecisionEngine::new(config, Box::new(HeuristicEvaluator::new()));
//!
//! let action = engine.choose_action(&state)?;
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `num_iterations`: iterations per decision (default: 100)
//! - `rollout_policy`: `Random`, `Greedy` or `EpsilonGreedy { epsilon }`
//!
//! The exploration constant is derived from the budget as
//! `1 / sqrt(ln(num_iterations))`.
//!
//! # Evaluators
//!
//! - [`HeuristicEvaluator`]: weighted board/health/hand difference, in-process
//! - [`RemoteEvaluator`]: 676-byte feature payload over TCP, `f32` reply
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------+
//! |                     DecisionEngine                     |
//! +--------------------------------------------------------+
//! |  +-----------+     +-----------+     +--------------+  |
//! |  | MctsTree  |     |  Rollout  |     |  Evaluator   |  |
//! |  |  (arena)  |     | (policy)  |     | (heuristic / |  |
//! |  |           |     |           |     |   remote)    |  |
//! |  +-----+-----+     +-----+-----+     +------+-------+  |
//! |        |                 |                  |          |
//! |        v                 v                  v          |
//! |   select -> expand -> rollout -> evaluate -> backprop  |
//! +--------------------------------------------------------+
//! ```

pub mod config;
pub mod evaluator;
pub mod features;
pub mod node;
pub mod remote;
pub mod rollout;
pub mod search;
pub mod tree;

#[cfg(test)]
mod testing;

// Re-export main types
pub use config::{MctsConfig, RolloutPolicy};
pub use evaluator::{
    Evaluator, EvaluatorBackend, EvaluatorError, EvaluatorSettings, HeuristicEvaluator,
    HeuristicWeights,
};
pub use features::{FeatureVector, FEATURE_COUNT, PAYLOAD_BYTES};
pub use node::{Children, MctsNode, NodeId};
pub use remote::{RemoteEvaluator, RemoteStats};
pub use rollout::Rollout;
pub use search::{
    run_mcts, ChildStats, DecisionEngine, MctsSearch, SearchError, SearchResult, SearchStats,
};
pub use tree::{MctsTree, TreeStats};
