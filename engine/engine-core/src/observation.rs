//! Observation types shared by evaluators and training export.
//!
//! A [`Position`] is always built from one seat's perspective: `controller` is
//! the side the search is deciding for, `opponent` the other one. Hidden
//! information (the opponent's hand contents) may be reported as zero ids.

use serde::{Deserialize, Serialize};

/// Maximum number of hand cards carried in an observation.
pub const MAX_HAND: usize = 10;

/// Maximum number of minions a side can have on board.
pub const MAX_BOARD: usize = 7;

/// An equipped weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Weapon {
    pub asset_id: i32,
    pub attack: i32,
    pub durability: i32,
}

/// A minion on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinionView {
    pub asset_id: i32,
    pub attack: i32,
    /// Maximum health.
    pub health: i32,
    /// Damage taken so far; remaining health is `health - damage`.
    pub damage: i32,
    pub stealth: bool,
    pub immune: bool,
    pub taunt: bool,
    pub cant_be_targeted: bool,
    pub attacks_this_turn: i32,
}

impl MinionView {
    /// Health left after damage.
    #[inline]
    pub fn remaining_health(&self) -> i32 {
        self.health - self.damage
    }
}

/// Everything visible about one side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideView {
    pub hero_class: i32,
    pub weapon: Option<Weapon>,
    pub health: i32,
    pub mana: i32,
    /// Hand card asset ids in hand order; zeros for hidden cards.
    pub hand: Vec<i32>,
    pub deck_count: i32,
    pub board: Vec<MinionView>,
}

impl SideView {
    pub fn total_attack(&self) -> i32 {
        self.board.iter().map(|m| m.attack).sum()
    }

    pub fn total_health(&self) -> i32 {
        self.board.iter().map(MinionView::remaining_health).sum()
    }

    pub fn taunt_health(&self) -> i32 {
        self.board
            .iter()
            .filter(|m| m.taunt)
            .map(MinionView::remaining_health)
            .sum()
    }
}

/// Board snapshot from one seat's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub turn: u32,
    pub controller: SideView,
    pub opponent: SideView,
}
