//! State/action contract consumed by the search engine.
//!
//! Game implementations own their rules entirely. The engine only ever reads a
//! state through this trait and never mutates one in place: every transition
//! produces a fresh value.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::observation::Position;

/// Seat identifier for the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    /// The other seat.
    #[inline]
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    /// Zero-based seat index, usable for `[T; 2]` lookups.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerId::One => write!(f, "player1"),
            PlayerId::Two => write!(f, "player2"),
        }
    }
}

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won(PlayerId),
    Draw,
}

impl Outcome {
    /// Reward of this outcome seen from `perspective`.
    ///
    /// * `1.0` if `perspective` won
    /// * `-1.0` if `perspective` lost
    /// * `0.0` for draws
    ///
    /// ```
    /// use engine_core::{Outcome, PlayerId};
    ///
    /// assert_eq!(Outcome::Won(PlayerId::One).reward(PlayerId::One), 1.0);
    /// assert_eq!(Outcome::Won(PlayerId::One).reward(PlayerId::Two), -1.0);
    /// assert_eq!(Outcome::Draw.reward(PlayerId::Two), 0.0);
    /// ```
    #[inline]
    pub fn reward(self, perspective: PlayerId) -> f64 {
        match self {
            Outcome::Won(winner) if winner == perspective => 1.0,
            Outcome::Won(_) => -1.0,
            Outcome::Draw => 0.0,
        }
    }
}

/// An opaque, equality-comparable move identifier.
///
/// Exactly one kind of action ends the mover's decision sequence for the
/// current turn. The engine never expands it and recognizes it via
/// [`GameAction::is_pass`].
pub trait GameAction: Clone + Eq + Hash + Debug {
    /// Whether this is the pass / end-turn action.
    fn is_pass(&self) -> bool;
}

/// A snapshot of the full game after zero or more actions.
///
/// # Contract
///
/// * `legal_actions` is only meaningful for non-terminal states and is empty
///   exactly when the state is terminal.
/// * A state whose only legal action is the pass action has finished the
///   current actor's decisions for this turn.
/// * `apply` applies every action independently to `self` and returns one entry
///   per input action, in input order. An entry is `None` when that branch could
///   not be resolved; callers skip such entries.
/// * No method may have observable side effects on `self`.
pub trait GameState: Clone + Debug {
    type Action: GameAction;

    /// Seat whose decision it is.
    fn current_actor(&self) -> PlayerId;

    /// Legal actions for the current actor.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Apply each action to this state, one successor per action.
    fn apply(&self, actions: &[Self::Action]) -> Vec<(Self::Action, Option<Self>)>;

    /// Whether the game is over.
    fn is_terminal(&self) -> bool;

    /// Outcome of a terminal state, `None` while the game is ongoing.
    fn outcome(&self) -> Option<Outcome>;

    /// Turn counter, incremented every time a player ends their turn.
    fn turn(&self) -> u32;

    /// Board features as seen by `perspective`.
    fn observe(&self, perspective: PlayerId) -> Position;

    /// Apply a single action.
    fn apply_one(&self, action: &Self::Action) -> Option<Self> {
        self.apply(std::slice::from_ref(action))
            .into_iter()
            .next()
            .and_then(|(_, next)| next)
    }

    /// The pass action, if it is currently legal.
    fn pass_action(&self) -> Option<Self::Action> {
        self.legal_actions().into_iter().find(GameAction::is_pass)
    }
}

/// Errors a game implementation may report when asked to do something
/// outside its rules.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Game is already over")]
    GameOver,
    #[error("Illegal action: {0}")]
    IllegalAction(String),
    #[error("Invalid setup: {0}")]
    InvalidSetup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involution() {
        assert_eq!(PlayerId::One.opponent(), PlayerId::Two);
        assert_eq!(PlayerId::Two.opponent().opponent(), PlayerId::Two);
    }

    #[test]
    fn test_index() {
        assert_eq!(PlayerId::One.index(), 0);
        assert_eq!(PlayerId::Two.index(), 1);
    }

    #[test]
    fn test_outcome_reward() {
        let won = Outcome::Won(PlayerId::Two);
        assert_eq!(won.reward(PlayerId::Two), 1.0);
        assert_eq!(won.reward(PlayerId::One), -1.0);
        assert_eq!(Outcome::Draw.reward(PlayerId::One), 0.0);
    }

    #[test]
    fn test_player_display() {
        assert_eq!(PlayerId::One.to_string(), "player1");
        assert_eq!(PlayerId::Two.to_string(), "player2");
    }

    #[test]
    fn test_outcome_serde() {
        let json = serde_json::to_string(&Outcome::Won(PlayerId::One)).unwrap();
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Outcome::Won(PlayerId::One));
    }
}
