//! Evaluator trait for position evaluation.
//!
//! An evaluator maps a [`Position`] (observed from the controller's seat) to a
//! score in [-1, 1]. Two backends exist: a local weighted heuristic and a
//! remote scorer reached over TCP (see [`crate::remote`]). The backend is
//! picked once per process through [`EvaluatorBackend::connect`].

use std::sync::Arc;
use std::time::Duration;

use engine_core::Position;
use thiserror::Error;
use tracing::info;

use crate::remote::RemoteEvaluator;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The backend cannot serve requests anymore. Fatal for the process.
    #[error("Evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("Evaluator I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed evaluator response: {0}")]
    MalformedResponse(String),

    #[error("Feature layout mismatch: expected {expected} fields, got {actual}")]
    FeatureLayout { expected: usize, actual: usize },

    #[error("Invalid evaluator config: {0}")]
    InvalidConfig(String),
}

/// Trait for position evaluators.
///
/// Implementations:
/// - [`HeuristicEvaluator`]: weighted board features (default)
/// - [`RemoteEvaluator`]: blocking round trip to an external scorer
pub trait Evaluator: Send + Sync {
    /// Score `position` from its controller's perspective, in [-1, 1].
    fn evaluate(&self, position: &Position) -> Result<f64, EvaluatorError>;
}

/// A backend shared between several engines. Every holder talks to the same
/// underlying connection.
impl<T: Evaluator + ?Sized> Evaluator for Arc<T> {
    fn evaluate(&self, position: &Position) -> Result<f64, EvaluatorError> {
        (**self).evaluate(position)
    }
}

/// Per-feature weights of the heuristic. Each term is the controller's value
/// minus the opponent's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicWeights {
    pub hero_health: f64,
    pub board_count: f64,
    pub attack: f64,
    pub minion_health: f64,
    pub taunt_health: f64,
    pub hand_count: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            hero_health: 0.02,
            board_count: 0.05,
            attack: 0.02,
            minion_health: 0.015,
            taunt_health: 0.01,
            hand_count: 0.01,
        }
    }
}

/// Deterministic board-feature heuristic.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEvaluator {
    weights: HeuristicWeights,
}

impl HeuristicEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: HeuristicWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &HeuristicWeights {
        &self.weights
    }
}

impl Evaluator for HeuristicEvaluator {
    fn evaluate(&self, position: &Position) -> Result<f64, EvaluatorError> {
        let me = &position.controller;
        let them = &position.opponent;

        if them.health <= 0 {
            return Ok(1.0);
        }
        if me.health <= 0 {
            return Ok(-1.0);
        }

        let w = &self.weights;
        let diff = |a: i32, b: i32| (a - b) as f64;
        let score = w.hero_health * diff(me.health, them.health)
            + w.board_count * diff(me.board.len() as i32, them.board.len() as i32)
            + w.attack * diff(me.total_attack(), them.total_attack())
            + w.minion_health * diff(me.total_health(), them.total_health())
            + w.taunt_health * diff(me.taunt_health(), them.taunt_health())
            + w.hand_count * diff(me.hand.len() as i32, them.hand.len() as i32);

        Ok(score.clamp(-1.0, 1.0))
    }
}

/// Which backend to build, decided once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatorSettings {
    Heuristic(HeuristicWeights),
    Remote {
        addr: String,
        connect_timeout: Duration,
    },
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        EvaluatorSettings::Heuristic(HeuristicWeights::default())
    }
}

impl EvaluatorSettings {
    /// Build settings from the `[evaluator]` config values.
    pub fn from_config(
        backend: &str,
        host: &str,
        port: u16,
        connect_timeout_secs: u64,
    ) -> Result<Self, EvaluatorError> {
        match backend.trim().to_ascii_lowercase().as_str() {
            "heuristic" => Ok(Self::default()),
            "remote" => {
                if host.is_empty() {
                    return Err(EvaluatorError::InvalidConfig(
                        "remote backend requires a host".into(),
                    ));
                }
                Ok(Self::Remote {
                    addr: format!("{}:{}", host, port),
                    connect_timeout: Duration::from_secs(connect_timeout_secs.max(1)),
                })
            }
            other => Err(EvaluatorError::InvalidConfig(format!(
                "unknown evaluator backend '{}' (expected heuristic or remote)",
                other
            ))),
        }
    }
}

/// The active evaluator backend.
#[derive(Debug)]
pub enum EvaluatorBackend {
    Heuristic(HeuristicEvaluator),
    Remote(RemoteEvaluator),
}

impl EvaluatorBackend {
    /// Build the configured backend. A remote connection failure is returned
    /// as [`EvaluatorError::Unavailable`].
    pub fn connect(settings: &EvaluatorSettings) -> Result<Self, EvaluatorError> {
        match settings {
            EvaluatorSettings::Heuristic(weights) => {
                info!("Using heuristic evaluator");
                Ok(Self::Heuristic(HeuristicEvaluator::with_weights(*weights)))
            }
            EvaluatorSettings::Remote {
                addr,
                connect_timeout,
            } => Ok(Self::Remote(RemoteEvaluator::connect(
                addr,
                *connect_timeout,
            )?)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvaluatorBackend::Heuristic(_) => "heuristic",
            EvaluatorBackend::Remote(_) => "remote",
        }
    }
}

impl Evaluator for EvaluatorBackend {
    fn evaluate(&self, position: &Position) -> Result<f64, EvaluatorError> {
        match self {
            EvaluatorBackend::Heuristic(eval) => eval.evaluate(position),
            EvaluatorBackend::Remote(eval) => eval.evaluate(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{MinionView, SideView};

    fn side(health: i32, board: Vec<MinionView>, hand: usize) -> SideView {
        SideView {
            health,
            board,
            hand: vec![0; hand],
            ..Default::default()
        }
    }

    fn minion(attack: i32, health: i32, taunt: bool) -> MinionView {
        MinionView {
            asset_id: 1,
            attack,
            health,
            taunt,
            ..Default::default()
        }
    }

    fn position(controller: SideView, opponent: SideView) -> Position {
        Position {
            turn: 3,
            controller,
            opponent,
        }
    }

    #[test]
    fn test_even_position_scores_zero() {
        let eval = HeuristicEvaluator::new();
        let p = position(side(30, vec![], 4), side(30, vec![], 4));
        assert_eq!(eval.evaluate(&p).unwrap(), 0.0);
    }

    #[test]
    fn test_win_and_loss_short_circuit() {
        let eval = HeuristicEvaluator::new();

        let win = position(side(1, vec![], 0), side(0, vec![minion(9, 9, true)], 10));
        assert_eq!(eval.evaluate(&win).unwrap(), 1.0);

        let loss = position(side(-3, vec![minion(9, 9, true)], 10), side(30, vec![], 0));
        assert_eq!(eval.evaluate(&loss).unwrap(), -1.0);

        // Opponent death is checked first
        let both = position(side(0, vec![], 0), side(0, vec![], 0));
        assert_eq!(eval.evaluate(&both).unwrap(), 1.0);
    }

    #[test]
    fn test_weighted_terms() {
        let eval = HeuristicEvaluator::new();
        let p = position(
            side(25, vec![minion(3, 4, true)], 2),
            side(20, vec![], 3),
        );
        // 0.02*5 + 0.05*1 + 0.02*3 + 0.015*4 + 0.01*4 + 0.01*(-1)
        let expected = 0.10 + 0.05 + 0.06 + 0.06 + 0.04 - 0.01;
        assert!((eval.evaluate(&p).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped() {
        let eval = HeuristicEvaluator::new();
        let board: Vec<MinionView> = (0..7).map(|_| minion(12, 12, true)).collect();
        let p = position(side(30, board, 10), side(1, vec![], 0));
        assert_eq!(eval.evaluate(&p).unwrap(), 1.0);
    }

    #[test]
    fn test_perspective_is_antisymmetric() {
        let eval = HeuristicEvaluator::new();
        let a = side(18, vec![minion(2, 3, false)], 3);
        let b = side(24, vec![minion(5, 1, true), minion(1, 1, false)], 1);

        let forward = eval.evaluate(&position(a.clone(), b.clone())).unwrap();
        let backward = eval.evaluate(&position(b, a)).unwrap();
        assert!((forward + backward).abs() < 1e-12);
    }

    #[test]
    fn test_custom_weights() {
        let weights = HeuristicWeights {
            hero_health: 0.1,
            ..HeuristicWeights::default()
        };
        let eval = HeuristicEvaluator::with_weights(weights);
        let p = position(side(30, vec![], 0), side(28, vec![], 0));
        assert!((eval.evaluate(&p).unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(eval.weights().hero_health, 0.1);
    }

    #[test]
    fn test_settings_from_config() {
        assert_eq!(
            EvaluatorSettings::from_config("heuristic", "", 0, 0).unwrap(),
            EvaluatorSettings::default()
        );
        assert_eq!(
            EvaluatorSettings::from_config("remote", "10.0.0.2", 5050, 3).unwrap(),
            EvaluatorSettings::Remote {
                addr: "10.0.0.2:5050".into(),
                connect_timeout: Duration::from_secs(3),
            }
        );
        assert!(matches!(
            EvaluatorSettings::from_config("oracle", "", 0, 0),
            Err(EvaluatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_backend_heuristic() {
        let backend = EvaluatorBackend::connect(&EvaluatorSettings::default()).unwrap();
        assert_eq!(backend.name(), "heuristic");
        let p = position(side(30, vec![], 0), side(0, vec![], 0));
        assert_eq!(backend.evaluate(&p).unwrap(), 1.0);
    }

    #[test]
    fn test_shared_backend_scores_like_the_original() {
        let backend = Arc::new(EvaluatorBackend::connect(&EvaluatorSettings::default()).unwrap());
        let other = Arc::clone(&backend);
        let p = position(side(25, vec![minion(3, 4, true)], 2), side(20, vec![], 3));

        assert_eq!(
            backend.evaluate(&p).unwrap(),
            other.evaluate(&p).unwrap()
        );
        let boxed: Box<dyn Evaluator> = Box::new(other);
        assert_eq!(boxed.evaluate(&p).unwrap(), backend.evaluate(&p).unwrap());
    }

    #[test]
    fn test_backend_remote_unreachable() {
        // Bind then drop to get a port with nothing listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let settings = EvaluatorSettings::Remote {
            addr: format!("127.0.0.1:{}", port),
            connect_timeout: Duration::from_millis(200),
        };
        assert!(matches!(
            EvaluatorBackend::connect(&settings),
            Err(EvaluatorError::Unavailable(_))
        ));
    }
}
