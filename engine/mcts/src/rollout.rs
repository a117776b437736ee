//! Rollout policies.
//!
//! A rollout plays the controller's current turn forward from a working copy
//! of a state until only the pass action remains (or a policy decides to
//! pass), then scores the final state with the evaluator.

use engine_core::{GameAction, GameState, PlayerId};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::config::RolloutPolicy;
use crate::evaluator::Evaluator;
use crate::search::{SearchError, SearchStats};

enum Step<S> {
    /// Stop and report this value.
    Stop(f64),
    /// Continue from this state.
    Advance(S),
}

/// Runs rollouts for one controller with a fixed policy and evaluator.
pub struct Rollout<'a> {
    policy: RolloutPolicy,
    evaluator: &'a dyn Evaluator,
    controller: PlayerId,
}

impl<'a> Rollout<'a> {
    pub fn new(policy: RolloutPolicy, evaluator: &'a dyn Evaluator, controller: PlayerId) -> Self {
        Self {
            policy,
            evaluator,
            controller,
        }
    }

    /// Play out `state` and return the leaf value from the controller's
    /// perspective.
    pub fn run<S: GameState>(
        &self,
        state: &S,
        rng: &mut ChaCha20Rng,
        stats: &mut SearchStats,
    ) -> Result<f64, SearchError> {
        let mut current = state.clone();
        let mut steps = 0u32;

        loop {
            if current.is_terminal() {
                break;
            }
            let actions = current.legal_actions();
            if actions.len() <= 1 {
                break;
            }

            let step = match self.policy {
                RolloutPolicy::Random => self.random_step(&current, actions, rng, stats)?,
                RolloutPolicy::Greedy => self.greedy_step(&current, &actions, stats)?,
                RolloutPolicy::EpsilonGreedy { epsilon } => {
                    if rng.gen_bool(epsilon) {
                        self.random_step(&current, actions, rng, stats)?
                    } else {
                        self.greedy_step(&current, &actions, stats)?
                    }
                }
            };

            match step {
                Step::Stop(value) => {
                    trace!(steps, value, "Rollout passed");
                    return Ok(value);
                }
                Step::Advance(next) => {
                    if !next.is_terminal() && next.current_actor() != self.controller {
                        return Err(SearchError::ActorChanged {
                            expected: self.controller,
                            actual: next.current_actor(),
                        });
                    }
                    current = next;
                    steps += 1;
                }
            }
        }

        let value = self.evaluate(&current, stats)?;
        trace!(steps, value, "Rollout reached pass-only state");
        Ok(value)
    }

    fn evaluate<S: GameState>(&self, state: &S, stats: &mut SearchStats) -> Result<f64, SearchError> {
        stats.evaluations += 1;
        Ok(self.evaluator.evaluate(&state.observe(self.controller))?)
    }

    /// Sample legal actions until one applies; a sampled pass stops here.
    fn random_step<S: GameState>(
        &self,
        state: &S,
        mut candidates: Vec<S::Action>,
        rng: &mut ChaCha20Rng,
        stats: &mut SearchStats,
    ) -> Result<Step<S>, SearchError> {
        while !candidates.is_empty() {
            let idx = rng.gen_range(0..candidates.len());
            if candidates[idx].is_pass() {
                return Ok(Step::Stop(self.evaluate(state, stats)?));
            }
            stats.apply_calls += 1;
            match state.apply_one(&candidates[idx]) {
                Some(next) => return Ok(Step::Advance(next)),
                None => {
                    candidates.swap_remove(idx);
                }
            }
        }
        Ok(Step::Stop(self.evaluate(state, stats)?))
    }

    /// Advance to the best-evaluated successor unless passing is at least as
    /// good.
    fn greedy_step<S: GameState>(
        &self,
        state: &S,
        actions: &[S::Action],
        stats: &mut SearchStats,
    ) -> Result<Step<S>, SearchError> {
        let candidates: Vec<S::Action> = actions.iter().filter(|a| !a.is_pass()).cloned().collect();

        let mut best: Option<(f64, S)> = None;
        if !candidates.is_empty() {
            stats.apply_calls += 1;
            for (_, next) in state.apply(&candidates) {
                let Some(next) = next else {
                    continue;
                };
                let value = self.evaluate(&next, stats)?;
                if best.as_ref().map_or(true, |(best_value, _)| value > *best_value) {
                    best = Some((value, next));
                }
            }
        }

        let pass_value = self.evaluate(state, stats)?;
        match best {
            Some((value, next)) if value > pass_value => Ok(Step::Advance(next)),
            _ => Ok(Step::Stop(pass_value)),
        }
    }
}
