//! MCTS search implementation.
//!
//! Each iteration runs:
//! 1. Selection: descend from the root by UCT to a node without children
//! 2. Expansion: materialize the node's non-pass successors, pick a seed child
//! 3. Rollout: play the seed forward with the configured policy, evaluate
//! 4. Backpropagation: add the reward along the path back to the root
//!
//! The tree only models the controller's own decisions within one turn, so
//! rewards are never negated on the way up.

use std::ops::AddAssign;
use std::time::Instant;

use engine_core::{GameAction, GameState, PlayerId};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::MctsConfig;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::rollout::Rollout;
use crate::tree::{MctsTree, TreeStats};

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("No legal actions available")]
    NoLegalActions,

    #[error("Node {0} is already expanded")]
    AlreadyExpanded(NodeId),

    #[error("Inconsistent tree: {0}")]
    InconsistentTree(String),

    #[error("Actor changed mid-rollout: expected {expected}, got {actual}")]
    ActorChanged { expected: PlayerId, actual: PlayerId },

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Search produced no decision")]
    NoDecision,

    #[error("Invalid search config: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    /// Whether the evaluator can no longer serve requests.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::Evaluator(EvaluatorError::Unavailable(_)))
    }
}

/// Per-phase timings (microseconds) and work counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub selection_us: u64,
    pub expansion_us: u64,
    pub rollout_us: u64,
    pub backprop_us: u64,
    /// Evaluator calls
    pub evaluations: u64,
    /// Batched `apply` calls (expansion and rollouts)
    pub apply_calls: u64,
}

impl SearchStats {
    pub fn total_us(&self) -> u64 {
        self.selection_us + self.expansion_us + self.rollout_us + self.backprop_us
    }
}

impl AddAssign<&SearchStats> for SearchStats {
    fn add_assign(&mut self, other: &SearchStats) {
        self.selection_us += other.selection_us;
        self.expansion_us += other.expansion_us;
        self.rollout_us += other.rollout_us;
        self.backprop_us += other.backprop_us;
        self.evaluations += other.evaluations;
        self.apply_calls += other.apply_calls;
    }
}

/// Statistics of one root child.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStats<A> {
    pub action: A,
    pub visits: u32,
    /// `None` if the child was never visited
    pub mean_value: Option<f64>,
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<A> {
    /// Action to take
    pub action: A,

    /// Mean value of the chosen child, `None` when no search ran
    pub value: Option<f64>,

    /// Number of iterations performed
    pub iterations: u32,

    /// Root children in insertion order
    pub children: Vec<ChildStats<A>>,

    pub stats: SearchStats,

    pub tree: TreeStats,
}

/// MCTS search state for one decision.
pub struct MctsSearch<'a, S: GameState> {
    tree: MctsTree<S>,
    evaluator: &'a dyn Evaluator,
    config: &'a MctsConfig,
    controller: PlayerId,
    stats: SearchStats,
}

impl<'a, S: GameState> MctsSearch<'a, S> {
    /// Create a new search rooted at `state`; its current actor is the
    /// controller.
    pub fn new(state: S, evaluator: &'a dyn Evaluator, config: &'a MctsConfig) -> Self {
        let controller = state.current_actor();
        Self {
            tree: MctsTree::new(state),
            evaluator,
            config,
            controller,
            stats: SearchStats::default(),
        }
    }

    /// Run the configured number of iterations and pick the root child with
    /// the best mean value.
    pub fn run(&mut self, rng: &mut ChaCha20Rng) -> Result<SearchResult<S::Action>, SearchError> {
        self.config.validate().map_err(SearchError::InvalidConfig)?;

        let start = Instant::now();
        let root = self.tree.root();
        let root_state = &self
            .tree
            .get(root)
            .ok_or(SearchError::UnknownNode(root))?
            .state;

        if root_state.is_terminal() {
            return Err(SearchError::NoLegalActions);
        }
        let legal = root_state.legal_actions();
        match legal.as_slice() {
            [] => return Err(SearchError::NoLegalActions),
            [only] => {
                debug!(action = ?only, "Single legal action, skipping search");
                return Ok(SearchResult {
                    action: only.clone(),
                    value: None,
                    iterations: 0,
                    children: Vec::new(),
                    stats: SearchStats::default(),
                    tree: self.tree.stats(),
                });
            }
            _ => {}
        }

        let c = self.config.exploration_constant();
        for iteration in 0..self.config.num_iterations {
            self.iterate(iteration, c, rng)?;
        }
        self.stats.apply_calls += self.tree.apply_calls();

        let (action, value) = self.decide(&legal)?;
        let result = SearchResult {
            action,
            value,
            iterations: self.config.num_iterations,
            children: self.root_children()?,
            stats: self.stats.clone(),
            tree: self.tree.stats(),
        };

        debug!(
            action = ?result.action,
            value = ?result.value,
            iterations = result.iterations,
            nodes = result.tree.total_nodes,
            evaluations = result.stats.evaluations,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "MCTS decision"
        );

        Ok(result)
    }

    /// Run a single iteration (select -> expand -> rollout -> backpropagate).
    fn iterate(&mut self, iteration: u32, c: f64, rng: &mut ChaCha20Rng) -> Result<(), SearchError> {
        let t = Instant::now();
        let leaf = self.tree.select(c)?;
        self.stats.selection_us += t.elapsed().as_micros() as u64;

        let t = Instant::now();
        let seed = self.tree.expand(leaf, rng)?;
        self.stats.expansion_us += t.elapsed().as_micros() as u64;

        let t = Instant::now();
        let rollout = Rollout::new(self.config.rollout_policy, self.evaluator, self.controller);
        let seed_state = &self
            .tree
            .get(seed)
            .ok_or(SearchError::UnknownNode(seed))?
            .state;
        let reward = rollout.run(seed_state, rng, &mut self.stats)?;
        self.stats.rollout_us += t.elapsed().as_micros() as u64;

        let t = Instant::now();
        let updated = self.tree.backpropagate(seed, reward)?;
        self.stats.backprop_us += t.elapsed().as_micros() as u64;

        trace!(
            iteration,
            leaf = leaf.0,
            seed = seed.0,
            reward,
            path_len = updated,
            "MCTS iteration complete"
        );

        Ok(())
    }

    /// Best visited root child by mean value (last maximum wins ties). If no
    /// child was visited every child is a candidate; with no children at all
    /// the pass action is returned when legal.
    fn decide(&self, legal: &[S::Action]) -> Result<(S::Action, Option<f64>), SearchError> {
        let children = self.root_children()?;

        let visited: Vec<&ChildStats<S::Action>> =
            children.iter().filter(|c| c.visits > 0).collect();
        let candidates: Vec<&ChildStats<S::Action>> = if visited.is_empty() {
            children.iter().collect()
        } else {
            visited
        };

        let mut best: Option<(&ChildStats<S::Action>, f64)> = None;
        for child in candidates {
            let mean = child.mean_value.unwrap_or(crate::node::UNEXPLORED_VALUE);
            match best {
                Some((_, best_mean)) if mean < best_mean => {}
                _ => best = Some((child, mean)),
            }
        }

        match best {
            Some((child, _)) => Ok((child.action.clone(), child.mean_value)),
            None => legal
                .iter()
                .find(|a| a.is_pass())
                .map(|pass| {
                    debug!("No root child could be expanded, passing");
                    (pass.clone(), None)
                })
                .ok_or(SearchError::NoDecision),
        }
    }

    fn root_children(&self) -> Result<Vec<ChildStats<S::Action>>, SearchError> {
        let root = self.tree.root();
        let ids = self
            .tree
            .get(root)
            .ok_or(SearchError::UnknownNode(root))?
            .child_ids();

        ids.iter()
            .map(|&id| {
                let node = self.tree.get(id).ok_or(SearchError::UnknownNode(id))?;
                let action = node.action.clone().ok_or_else(|| {
                    SearchError::InconsistentTree(format!("child {} has no action", id))
                })?;
                Ok(ChildStats {
                    action,
                    visits: node.visit_count,
                    mean_value: node.visited_mean(),
                })
            })
            .collect()
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<S> {
        &self.tree
    }
}

/// Convenience function to run a single MCTS search.
pub fn run_mcts<S: GameState>(
    state: S,
    evaluator: &dyn Evaluator,
    config: &MctsConfig,
    rng: &mut ChaCha20Rng,
) -> Result<SearchResult<S::Action>, SearchError> {
    MctsSearch::new(state, evaluator, config).run(rng)
}

/// Decision API: a fixed configuration and evaluator, a fresh tree per call.
pub struct DecisionEngine {
    config: MctsConfig,
    evaluator: Box<dyn Evaluator>,
    rng: ChaCha20Rng,
}

impl DecisionEngine {
    /// Create an engine with an entropy-seeded RNG.
    pub fn new(config: MctsConfig, evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            config,
            evaluator,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Create an engine whose decisions are reproducible.
    pub fn with_seed(config: MctsConfig, evaluator: Box<dyn Evaluator>, seed: u64) -> Self {
        Self {
            config,
            evaluator,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    /// Choose an action for the current actor of `state`.
    pub fn choose_action<S: GameState>(&mut self, state: &S) -> Result<S::Action, SearchError> {
        self.search(state).map(|result| result.action)
    }

    /// Like [`choose_action`](Self::choose_action), with full statistics.
    pub fn search<S: GameState>(
        &mut self,
        state: &S,
    ) -> Result<SearchResult<S::Action>, SearchError> {
        run_mcts(
            state.clone(),
            self.evaluator.as_ref(),
            &self.config,
            &mut self.rng,
        )
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
