//! Skirmish: a compact two-player minion card game for the Tavern engine
//!
//! Each player has a hero with 30 health, a 30-card deck drawn from the
//! [`CARD_POOL`](cards::CARD_POOL), and up to 10 mana crystals. On their turn a
//! player may play cards, attack with ready minions or an equipped weapon, and
//! finally end the turn. Taunt minions must be attacked first; stealthed
//! minions cannot be attacked. A hero at zero health loses.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{GameAction, GameState};
//! use games_skirmish::SkirmishState;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let state = SkirmishState::new_game(&mut rng);
//! let actions = state.legal_actions();
//! assert!(actions.iter().any(|a| a.is_pass()));
//! ```

pub mod cards;

use engine_core::{
    GameAction, GameError, GameState, MinionView, Outcome, PlayerId, Position, SideView, Weapon,
    MAX_BOARD, MAX_HAND,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cards::{card, CardKind, CARD_POOL};

pub const STARTING_HEALTH: i32 = 30;
pub const DECK_SIZE: usize = 30;
pub const MAX_MANA: i32 = 10;
pub const HERO_CLASSES: i32 = 9;

/// Who attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attacker {
    Hero,
    Minion(u8),
}

/// What gets attacked on the opposing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Hero,
    Minion(u8),
}

/// A Skirmish move. Indices refer to the state the action was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    PlayCard { hand_index: u8 },
    Attack { attacker: Attacker, target: Target },
    EndTurn,
}

impl GameAction for Action {
    fn is_pass(&self) -> bool {
        matches!(self, Action::EndTurn)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::PlayCard { hand_index } => write!(f, "play#{}", hand_index),
            Action::Attack { attacker, target } => {
                let from = match attacker {
                    Attacker::Hero => "hero".to_string(),
                    Attacker::Minion(i) => format!("m{}", i),
                };
                let to = match target {
                    Target::Hero => "hero".to_string(),
                    Target::Minion(i) => format!("m{}", i),
                };
                write!(f, "{}->{}", from, to)
            }
            Action::EndTurn => write!(f, "end-turn"),
        }
    }
}

/// A minion in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minion {
    pub asset_id: i32,
    pub attack: i32,
    pub health: i32,
    pub damage: i32,
    pub taunt: bool,
    pub stealth: bool,
    pub cant_be_targeted: bool,
    pub attacks_this_turn: i32,
    /// Summoning sickness: cannot attack on the turn it was played.
    pub summoned_this_turn: bool,
}

impl Minion {
    fn from_card(asset_id: i32, kind: CardKind) -> Option<Self> {
        match kind {
            CardKind::Minion {
                attack,
                health,
                taunt,
                stealth,
                cant_be_targeted,
            } => Some(Self {
                asset_id,
                attack,
                health,
                damage: 0,
                taunt,
                stealth,
                cant_be_targeted,
                attacks_this_turn: 0,
                summoned_this_turn: true,
            }),
            CardKind::Weapon { .. } => None,
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.damage >= self.health
    }

    fn can_attack(&self) -> bool {
        self.attack > 0 && !self.summoned_this_turn && self.attacks_this_turn == 0
    }
}

/// A hero and its equipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hero {
    pub class: i32,
    pub health: i32,
    pub weapon: Option<Weapon>,
    pub attacks_this_turn: i32,
}

impl Hero {
    fn can_attack(&self) -> bool {
        self.attacks_this_turn == 0 && self.weapon.map(|w| w.attack > 0).unwrap_or(false)
    }
}

/// One side of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub hero: Hero,
    pub mana: i32,
    pub max_mana: i32,
    pub hand: Vec<i32>,
    pub deck: Vec<i32>,
    pub board: Vec<Minion>,
    pub fatigue: i32,
}

impl PlayerState {
    fn new(class: i32, deck: Vec<i32>) -> Self {
        Self {
            hero: Hero {
                class,
                health: STARTING_HEALTH,
                weapon: None,
                attacks_this_turn: 0,
            },
            mana: 0,
            max_mana: 0,
            hand: Vec::new(),
            deck,
            board: Vec::new(),
            fatigue: 0,
        }
    }

    /// Draw the top card; overdraw burns it, an empty deck deals fatigue.
    fn draw(&mut self) {
        match self.deck.pop() {
            Some(asset_id) if self.hand.len() < MAX_HAND => self.hand.push(asset_id),
            Some(asset_id) => trace!(asset_id, "hand full, card burned"),
            None => {
                self.fatigue += 1;
                self.hero.health -= self.fatigue;
            }
        }
    }

    fn start_turn(&mut self) {
        self.max_mana = (self.max_mana + 1).min(MAX_MANA);
        self.mana = self.max_mana;
        self.hero.attacks_this_turn = 0;
        for minion in &mut self.board {
            minion.attacks_this_turn = 0;
            minion.summoned_this_turn = false;
        }
        self.draw();
    }

    /// Minions an attacker on the other side may currently hit.
    fn attackable_minions(&self) -> Vec<usize> {
        let visible: Vec<usize> = (0..self.board.len())
            .filter(|&i| !self.board[i].stealth)
            .collect();
        let taunts: Vec<usize> = visible
            .iter()
            .copied()
            .filter(|&i| self.board[i].taunt)
            .collect();
        if taunts.is_empty() {
            visible
        } else {
            taunts
        }
    }

    fn has_visible_taunt(&self) -> bool {
        self.board.iter().any(|m| m.taunt && !m.stealth)
    }

    fn view(&self, reveal_hand: bool) -> SideView {
        SideView {
            hero_class: self.hero.class,
            weapon: self.hero.weapon,
            health: self.hero.health,
            mana: self.max_mana,
            hand: if reveal_hand {
                self.hand.clone()
            } else {
                vec![0; self.hand.len()]
            },
            deck_count: self.deck.len() as i32,
            board: self
                .board
                .iter()
                .map(|m| MinionView {
                    asset_id: m.asset_id,
                    attack: m.attack,
                    health: m.health,
                    damage: m.damage,
                    stealth: m.stealth,
                    immune: false,
                    taunt: m.taunt,
                    cant_be_targeted: m.cant_be_targeted,
                    attacks_this_turn: m.attacks_this_turn,
                })
                .collect(),
        }
    }
}

/// Complete Skirmish game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkirmishState {
    pub turn: u32,
    pub current: PlayerId,
    pub players: [PlayerState; 2],
    pub outcome: Option<Outcome>,
}

impl SkirmishState {
    /// Deal a fresh game: random classes and decks, opening hands of 3 and 4
    /// cards, and player one's first turn already started.
    pub fn new_game(rng: &mut ChaCha20Rng) -> Self {
        let deal = |rng: &mut ChaCha20Rng| -> PlayerState {
            let class = rng.gen_range(1..=HERO_CLASSES);
            let mut deck: Vec<i32> = (0..DECK_SIZE)
                .map(|i| CARD_POOL[i % CARD_POOL.len()].asset_id)
                .collect();
            deck.shuffle(rng);
            PlayerState::new(class, deck)
        };
        let players = [deal(rng), deal(rng)];

        Self::from_players(players)
    }

    /// Start a game from prepared decks (top of deck is the end of the vec).
    pub fn from_players(mut players: [PlayerState; 2]) -> Self {
        for _ in 0..3 {
            players[0].draw();
        }
        for _ in 0..4 {
            players[1].draw();
        }
        players[0].start_turn();

        Self {
            turn: 1,
            current: PlayerId::One,
            players,
            outcome: None,
        }
    }

    /// Build a deck-only player, handy for scripted positions.
    pub fn player(class: i32, deck: Vec<i32>) -> PlayerState {
        PlayerState::new(class, deck)
    }

    pub fn side(&self, player: PlayerId) -> &PlayerState {
        &self.players[player.index()]
    }

    pub fn side_mut(&mut self, player: PlayerId) -> &mut PlayerState {
        &mut self.players[player.index()]
    }

    /// Apply one action to a copy of this state.
    pub fn step(&self, action: Action) -> Result<SkirmishState, GameError> {
        if self.outcome.is_some() {
            return Err(GameError::GameOver);
        }
        if !self.legal_actions().contains(&action) {
            return Err(GameError::IllegalAction(action.to_string()));
        }

        let mut next = self.clone();
        match action {
            Action::PlayCard { hand_index } => next.play_card(hand_index as usize)?,
            Action::Attack { attacker, target } => next.attack(attacker, target),
            Action::EndTurn => next.end_turn(),
        }
        next.update_outcome();
        Ok(next)
    }

    fn play_card(&mut self, hand_index: usize) -> Result<(), GameError> {
        let me = self.side_mut(self.current);
        let asset_id = me.hand.remove(hand_index);
        let card = card(asset_id)
            .ok_or_else(|| GameError::InvalidSetup(format!("unknown card {}", asset_id)))?;
        me.mana -= card.cost;

        match card.kind {
            CardKind::Weapon { attack, durability } => {
                me.hero.weapon = Some(Weapon {
                    asset_id,
                    attack,
                    durability,
                });
            }
            kind => {
                if let Some(minion) = Minion::from_card(asset_id, kind) {
                    me.board.push(minion);
                }
            }
        }
        Ok(())
    }

    fn attack(&mut self, attacker: Attacker, target: Target) {
        let me = self.current.index();
        let them = self.current.opponent().index();

        let attack_value = match attacker {
            Attacker::Hero => self.players[me].hero.weapon.map(|w| w.attack).unwrap_or(0),
            Attacker::Minion(i) => self.players[me].board[i as usize].attack,
        };

        let retaliation = match target {
            Target::Hero => {
                self.players[them].hero.health -= attack_value;
                0
            }
            Target::Minion(j) => {
                let defender = &mut self.players[them].board[j as usize];
                defender.damage += attack_value;
                defender.attack
            }
        };

        let side = &mut self.players[me];
        match attacker {
            Attacker::Hero => {
                side.hero.health -= retaliation;
                side.hero.attacks_this_turn += 1;
                if let Some(weapon) = side.hero.weapon.as_mut() {
                    weapon.durability -= 1;
                    if weapon.durability <= 0 {
                        side.hero.weapon = None;
                    }
                }
            }
            Attacker::Minion(i) => {
                let minion = &mut side.board[i as usize];
                minion.damage += retaliation;
                minion.attacks_this_turn += 1;
                minion.stealth = false;
            }
        }

        for player in &mut self.players {
            player.board.retain(|m| !m.is_dead());
        }
    }

    fn end_turn(&mut self) {
        self.turn += 1;
        self.current = self.current.opponent();
        let current = self.current;
        self.side_mut(current).start_turn();
    }

    fn update_outcome(&mut self) {
        let one_dead = self.players[0].hero.health <= 0;
        let two_dead = self.players[1].hero.health <= 0;
        self.outcome = match (one_dead, two_dead) {
            (true, true) => Some(Outcome::Draw),
            (true, false) => Some(Outcome::Won(PlayerId::Two)),
            (false, true) => Some(Outcome::Won(PlayerId::One)),
            (false, false) => None,
        };
    }
}

impl GameState for SkirmishState {
    type Action = Action;

    fn current_actor(&self) -> PlayerId {
        self.current
    }

    fn legal_actions(&self) -> Vec<Action> {
        if self.outcome.is_some() {
            return Vec::new();
        }

        let me = self.side(self.current);
        let them = self.side(self.current.opponent());
        let mut actions = Vec::new();

        for (i, &asset_id) in me.hand.iter().enumerate() {
            let Some(card) = card(asset_id) else {
                continue;
            };
            let fits = match card.kind {
                CardKind::Minion { .. } => me.board.len() < MAX_BOARD,
                CardKind::Weapon { .. } => true,
            };
            if card.cost <= me.mana && fits {
                actions.push(Action::PlayCard {
                    hand_index: i as u8,
                });
            }
        }

        let mut targets: Vec<Target> = them
            .attackable_minions()
            .into_iter()
            .map(|j| Target::Minion(j as u8))
            .collect();
        if !them.has_visible_taunt() {
            targets.push(Target::Hero);
        }

        let mut attackers: Vec<Attacker> = (0..me.board.len())
            .filter(|&i| me.board[i].can_attack())
            .map(|i| Attacker::Minion(i as u8))
            .collect();
        if me.hero.can_attack() {
            attackers.push(Attacker::Hero);
        }

        for &attacker in &attackers {
            for &target in &targets {
                actions.push(Action::Attack { attacker, target });
            }
        }

        actions.push(Action::EndTurn);
        actions
    }

    fn apply(&self, actions: &[Action]) -> Vec<(Action, Option<Self>)> {
        actions
            .iter()
            .map(|&action| (action, self.step(action).ok()))
            .collect()
    }

    fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    fn turn(&self) -> u32 {
        self.turn
    }

    fn observe(&self, perspective: PlayerId) -> Position {
        Position {
            turn: self.turn,
            controller: self.side(perspective).view(true),
            opponent: self.side(perspective.opponent()).view(false),
        }
    }
}
