//! Agents that pick actions for one seat.

use anyhow::{anyhow, Result};
use engine_core::GameState;
use games_skirmish::{Action, SkirmishState};
use mcts::{
    DecisionEngine, EvaluatorBackend, EvaluatorSettings, MctsConfig, SearchError, SearchStats,
};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Agent selectable per seat from the CLI/config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Mcts,
    Random,
}

impl FromStr for AgentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcts" => Ok(AgentKind::Mcts),
            "random" => Ok(AgentKind::Random),
            other => Err(anyhow!(
                "unknown agent '{}' (expected mcts or random)",
                other
            )),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Mcts => write!(f, "mcts"),
            AgentKind::Random => write!(f, "random"),
        }
    }
}

/// Action selection for one seat.
pub trait Agent {
    fn kind(&self) -> AgentKind;

    /// Choose an action for the current actor of `state`.
    fn choose_action(&mut self, state: &SkirmishState) -> Result<Action, SearchError>;

    /// Accumulated search statistics, for agents that search.
    fn search_stats(&self) -> Option<&SearchStats> {
        None
    }
}

/// Evaluator handle shared by every MCTS seat of the process.
pub type SharedEvaluator = Arc<EvaluatorBackend>;

/// Connect the configured evaluator once if any seat searches. A remote
/// backend that cannot be reached fails the run up front.
pub fn connect_evaluator(
    kinds: &[AgentKind; 2],
    settings: &EvaluatorSettings,
) -> Result<Option<SharedEvaluator>> {
    if !kinds.contains(&AgentKind::Mcts) {
        return Ok(None);
    }
    let backend = EvaluatorBackend::connect(settings)?;
    info!(evaluator = backend.name(), "Evaluator connected");
    Ok(Some(Arc::new(backend)))
}

/// Build an agent. MCTS agents need the shared evaluator.
pub fn build_agent(
    kind: AgentKind,
    mcts_config: &MctsConfig,
    evaluator: Option<&SharedEvaluator>,
    seed: Option<u64>,
) -> Result<Box<dyn Agent>> {
    match kind {
        AgentKind::Mcts => {
            let evaluator =
                evaluator.ok_or_else(|| anyhow!("mcts agent built without an evaluator"))?;
            info!(
                evaluator = evaluator.name(),
                iterations = mcts_config.num_iterations,
                rollout = %mcts_config.rollout_policy,
                "MCTS agent ready"
            );
            Ok(Box::new(MctsAgent::new(
                mcts_config.clone(),
                Arc::clone(evaluator),
                seed,
            )))
        }
        AgentKind::Random => Ok(Box::new(RandomAgent::new(seed))),
    }
}

/// Agent backed by the MCTS decision engine.
pub struct MctsAgent {
    engine: DecisionEngine,
    stats: SearchStats,
}

impl MctsAgent {
    pub fn new(config: MctsConfig, evaluator: SharedEvaluator, seed: Option<u64>) -> Self {
        let engine = match seed {
            Some(seed) => DecisionEngine::with_seed(config, Box::new(evaluator), seed),
            None => DecisionEngine::new(config, Box::new(evaluator)),
        };
        Self {
            engine,
            stats: SearchStats::default(),
        }
    }
}

impl Agent for MctsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Mcts
    }

    fn choose_action(&mut self, state: &SkirmishState) -> Result<Action, SearchError> {
        let result = self.engine.search(state)?;
        self.stats += &result.stats;
        Ok(result.action)
    }

    fn search_stats(&self) -> Option<&SearchStats> {
        Some(&self.stats)
    }
}

/// Uniformly random legal actions.
#[derive(Debug)]
pub struct RandomAgent {
    rng: ChaCha20Rng,
}

impl RandomAgent {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Self { rng }
    }
}

impl Agent for RandomAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Random
    }

    fn choose_action(&mut self, state: &SkirmishState) -> Result<Action, SearchError> {
        state
            .legal_actions()
            .choose(&mut self.rng)
            .copied()
            .ok_or(SearchError::NoLegalActions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Outcome, PlayerId};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn opening(seed: u64) -> SkirmishState {
        SkirmishState::new_game(&mut ChaCha20Rng::seed_from_u64(seed))
    }

    /// Random play until the actor has more than one option.
    fn with_choice(seed: u64) -> SkirmishState {
        let mut state = opening(seed);
        let mut agent = RandomAgent::new(Some(seed));
        while state.legal_actions().len() < 2 {
            let action = agent.choose_action(&state).unwrap();
            state = state.step(action).unwrap();
        }
        state
    }

    #[test]
    fn parses_agent_names() {
        assert_eq!("mcts".parse::<AgentKind>().unwrap(), AgentKind::Mcts);
        assert_eq!(" Random ".parse::<AgentKind>().unwrap(), AgentKind::Random);
        assert!("human".parse::<AgentKind>().is_err());
        assert_eq!(AgentKind::Mcts.to_string(), "mcts");
    }

    #[test]
    fn random_agent_picks_legal_actions() {
        let mut agent = RandomAgent::new(Some(3));
        let state = opening(1);
        let legal = state.legal_actions();
        for _ in 0..20 {
            let action = agent.choose_action(&state).unwrap();
            assert!(legal.contains(&action));
        }
        assert!(agent.search_stats().is_none());
    }

    #[test]
    fn random_agent_on_finished_game_errors() {
        let mut state = opening(2);
        state.outcome = Some(Outcome::Won(PlayerId::One));
        assert!(state.is_terminal());

        let mut agent = RandomAgent::new(Some(3));
        assert!(matches!(
            agent.choose_action(&state),
            Err(SearchError::NoLegalActions)
        ));
    }

    fn heuristic() -> Option<SharedEvaluator> {
        connect_evaluator(&[AgentKind::Mcts, AgentKind::Random], &EvaluatorSettings::default())
            .unwrap()
    }

    #[test]
    fn mcts_agent_accumulates_search_stats() {
        let evaluator = heuristic();
        let mut agent = build_agent(
            AgentKind::Mcts,
            &MctsConfig::for_testing(),
            evaluator.as_ref(),
            Some(5),
        )
        .unwrap();
        assert_eq!(agent.kind(), AgentKind::Mcts);

        let state = with_choice(4);
        let action = agent.choose_action(&state).unwrap();
        assert!(state.legal_actions().contains(&action));
        assert!(agent.search_stats().unwrap().evaluations > 0);
    }

    #[test]
    fn unreachable_remote_fails_to_connect() {
        let settings = EvaluatorSettings::Remote {
            addr: "127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(200),
        };
        let kinds = [AgentKind::Mcts, AgentKind::Random];
        assert!(connect_evaluator(&kinds, &settings).is_err());
    }

    #[test]
    fn random_seats_need_no_evaluator() {
        let settings = EvaluatorSettings::Remote {
            addr: "127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(200),
        };
        let kinds = [AgentKind::Random, AgentKind::Random];
        assert!(connect_evaluator(&kinds, &settings).unwrap().is_none());
        assert!(build_agent(AgentKind::Mcts, &MctsConfig::default(), None, None).is_err());
    }

    #[test]
    fn both_mcts_seats_share_one_remote_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let settings = EvaluatorSettings::Remote {
            addr: listener.local_addr().unwrap().to_string(),
            connect_timeout: Duration::from_secs(2),
        };
        let kinds = [AgentKind::Mcts, AgentKind::Mcts];

        let evaluator = connect_evaluator(&kinds, &settings).unwrap();
        let agents: Vec<Box<dyn Agent>> = kinds
            .iter()
            .map(|&kind| {
                build_agent(kind, &MctsConfig::default(), evaluator.as_ref(), None).unwrap()
            })
            .collect();
        assert_eq!(agents.len(), 2);

        let mut accepted = vec![listener.accept().unwrap().0];
        // Drain anything else that connected
        thread::sleep(Duration::from_millis(50));
        listener.set_nonblocking(true).unwrap();
        while let Ok((conn, _)) = listener.accept() {
            accepted.push(conn);
        }
        assert_eq!(accepted.len(), 1);
        assert_eq!(evaluator.map(|e| Arc::strong_count(&e)), Some(3));
    }
}
