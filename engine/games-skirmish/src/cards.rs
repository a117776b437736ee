//! Card pool for Skirmish.

/// What a card does when played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Minion {
        attack: i32,
        health: i32,
        taunt: bool,
        stealth: bool,
        cant_be_targeted: bool,
    },
    Weapon {
        attack: i32,
        durability: i32,
    },
}

/// A card definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub asset_id: i32,
    pub name: &'static str,
    pub cost: i32,
    pub kind: CardKind,
}

const fn minion(asset_id: i32, name: &'static str, cost: i32, attack: i32, health: i32) -> Card {
    Card {
        asset_id,
        name,
        cost,
        kind: CardKind::Minion {
            attack,
            health,
            taunt: false,
            stealth: false,
            cant_be_targeted: false,
        },
    }
}

const fn taunt(asset_id: i32, name: &'static str, cost: i32, attack: i32, health: i32) -> Card {
    Card {
        asset_id,
        name,
        cost,
        kind: CardKind::Minion {
            attack,
            health,
            taunt: true,
            stealth: false,
            cant_be_targeted: false,
        },
    }
}

/// Every card that can appear in a Skirmish deck.
pub const CARD_POOL: &[Card] = &[
    minion(101, "Ember Sprite", 1, 1, 1),
    minion(102, "River Stalker", 1, 1, 2),
    taunt(103, "Shield Bearer", 1, 0, 4),
    minion(104, "Bog Lurker", 2, 3, 2),
    taunt(105, "Hill Guard", 2, 2, 3),
    Card {
        asset_id: 106,
        name: "Shade Prowler",
        cost: 2,
        kind: CardKind::Minion {
            attack: 2,
            health: 2,
            taunt: false,
            stealth: true,
            cant_be_targeted: false,
        },
    },
    Card {
        asset_id: 107,
        name: "Iron Axe",
        cost: 2,
        kind: CardKind::Weapon {
            attack: 3,
            durability: 2,
        },
    },
    minion(108, "Tusk Rider", 3, 3, 3),
    taunt(109, "Warden Ox", 4, 3, 5),
    Card {
        asset_id: 110,
        name: "Spellward Golem",
        cost: 4,
        kind: CardKind::Minion {
            attack: 4,
            health: 4,
            taunt: false,
            stealth: false,
            cant_be_targeted: true,
        },
    },
    minion(111, "Ravine Ogre", 5, 6, 6),
    taunt(112, "Stone Colossus", 7, 7, 8),
];

/// Look up a card by asset id.
pub fn card(asset_id: i32) -> Option<&'static Card> {
    CARD_POOL.iter().find(|c| c.asset_id == asset_id)
}
