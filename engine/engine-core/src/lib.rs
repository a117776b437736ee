//! Core traits and types for the Tavern search engine
//!
//! This crate provides the boundary between a game simulation and the search:
//! - `GameState` / `GameAction`: the state/action contract a game implements
//! - `PlayerId`, `Outcome`: seats and game results
//! - `Position`: board features from one seat's perspective, consumed by
//!   evaluators and training export

pub mod game;
pub mod observation;

// Re-export main types for convenience
pub use game::{GameAction, GameError, GameState, Outcome, PlayerId};
pub use observation::{MinionView, Position, SideView, Weapon, MAX_BOARD, MAX_HAND};
