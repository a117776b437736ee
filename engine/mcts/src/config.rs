//! MCTS configuration parameters.

use std::fmt;
use std::str::FromStr;

/// Default epsilon when `epsilon-greedy` is requested without one.
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Strategy used to play out a freshly expanded node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RolloutPolicy {
    /// Uniformly random legal actions until the turn is passed.
    #[default]
    Random,
    /// Take the best-evaluated successor while it beats passing.
    Greedy,
    /// Random step with probability `epsilon`, greedy step otherwise.
    EpsilonGreedy { epsilon: f64 },
}

impl RolloutPolicy {
    /// Build a policy from its config name. `epsilon` is only used by
    /// `epsilon-greedy` and must lie in [0, 1].
    pub fn from_name(name: &str, epsilon: f64) -> Result<Self, String> {
        match name.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "greedy" => Ok(Self::Greedy),
            "epsilon-greedy" | "epsilon_greedy" => Self::epsilon_greedy(epsilon),
            other => Err(format!(
                "unknown rollout policy '{}' (expected random, greedy or epsilon-greedy)",
                other
            )),
        }
    }

    /// `EpsilonGreedy`, rejecting an epsilon outside [0, 1] (or NaN).
    pub fn epsilon_greedy(epsilon: f64) -> Result<Self, String> {
        let policy = Self::EpsilonGreedy { epsilon };
        policy.validate()?;
        Ok(policy)
    }

    /// Check the policy parameters.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            RolloutPolicy::EpsilonGreedy { epsilon } if !(0.0..=1.0).contains(&epsilon) => {
                Err(format!("epsilon must be within [0, 1], got {}", epsilon))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for RolloutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s, DEFAULT_EPSILON)
    }
}

impl fmt::Display for RolloutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloutPolicy::Random => write!(f, "random"),
            RolloutPolicy::Greedy => write!(f, "greedy"),
            RolloutPolicy::EpsilonGreedy { epsilon } => write!(f, "epsilon-greedy({})", epsilon),
        }
    }
}

/// Immutable configuration for one decision engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Select/expand/rollout/backpropagate iterations per decision.
    pub num_iterations: u32,

    /// How leaves are played out.
    pub rollout_policy: RolloutPolicy,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_iterations: 100,
            rollout_policy: RolloutPolicy::Random,
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            num_iterations: 50,
            rollout_policy: RolloutPolicy::Random,
        }
    }

    /// Exploration constant `C = 1 / sqrt(ln(budget))`.
    ///
    /// Budgets below 2 use `ln(2)` so the constant stays finite.
    pub fn exploration_constant(&self) -> f64 {
        let budget = self.num_iterations.max(2) as f64;
        1.0 / budget.ln().sqrt()
    }

    /// Check that the configuration can drive a search. Every search calls
    /// this first.
    pub fn validate(&self) -> Result<(), String> {
        self.rollout_policy.validate()
    }

    /// Builder pattern: set the iteration budget.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.num_iterations = n;
        self
    }

    /// Builder pattern: set the rollout policy.
    pub fn with_rollout_policy(mut self, policy: RolloutPolicy) -> Self {
        self.rollout_policy = policy;
        self
    }
}
