//! Fixed-length feature payload shared by the remote evaluator and training
//! export.
//!
//! # Layout
//!
//! 169 signed 32-bit fields, serialized little-endian (676 bytes):
//!
//! | Offset | Count | Content |
//! |-------:|------:|---------|
//! | 0      | 10    | turn, hero class, weapon id, weapon attack, weapon durability, health, mana, hand count, deck count, board count |
//! | 10     | 10    | controller hand asset ids, zero-padded |
//! | 20     | 70    | controller minion rows (7 x 10), zero-padded |
//! | 90     | 9     | opponent hero class, weapon id, weapon attack, weapon durability, health, mana, hand count, deck count, board count |
//! | 99     | 70    | opponent minion rows (7 x 10), zero-padded |
//!
//! A minion row is: asset id, attack, health, damage, stealth, immune, taunt,
//! cannot-be-targeted, attacks this turn, asset id.

use engine_core::{MinionView, Position, SideView, MAX_BOARD, MAX_HAND};

use crate::evaluator::EvaluatorError;

/// Fields per minion row.
pub const MINION_FIELDS: usize = 10;

const CONTROLLER_HEADER: usize = 10;
const OPPONENT_HEADER: usize = 9;
const BOARD_FIELDS: usize = MAX_BOARD * MINION_FIELDS;

const HAND_OFFSET: usize = CONTROLLER_HEADER;
const CONTROLLER_BOARD_OFFSET: usize = HAND_OFFSET + MAX_HAND;
const OPPONENT_OFFSET: usize = CONTROLLER_BOARD_OFFSET + BOARD_FIELDS;
const OPPONENT_BOARD_OFFSET: usize = OPPONENT_OFFSET + OPPONENT_HEADER;

/// Total number of fields in a payload.
pub const FEATURE_COUNT: usize = OPPONENT_BOARD_OFFSET + BOARD_FIELDS;

/// Serialized payload size in bytes.
pub const PAYLOAD_BYTES: usize = FEATURE_COUNT * 4;

const _: () = assert!(FEATURE_COUNT == 169);

/// An encoded position, always exactly [`FEATURE_COUNT`] fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    fields: [i32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Encode a position from its controller's perspective.
    pub fn encode(position: &Position) -> Self {
        let mut fields = [0i32; FEATURE_COUNT];
        let me = &position.controller;
        let them = &position.opponent;

        fields[0] = position.turn as i32;
        write_side_header(&mut fields[1..CONTROLLER_HEADER], me);

        for (slot, &asset_id) in fields[HAND_OFFSET..CONTROLLER_BOARD_OFFSET]
            .iter_mut()
            .zip(me.hand.iter())
        {
            *slot = asset_id;
        }

        write_board(&mut fields[CONTROLLER_BOARD_OFFSET..OPPONENT_OFFSET], &me.board);
        write_side_header(&mut fields[OPPONENT_OFFSET..OPPONENT_BOARD_OFFSET], them);
        write_board(&mut fields[OPPONENT_BOARD_OFFSET..], &them.board);

        Self { fields }
    }

    /// Wrap raw fields, checking the length.
    pub fn from_fields(fields: &[i32]) -> Result<Self, EvaluatorError> {
        let fields: [i32; FEATURE_COUNT] =
            fields
                .try_into()
                .map_err(|_| EvaluatorError::FeatureLayout {
                    expected: FEATURE_COUNT,
                    actual: fields.len(),
                })?;
        Ok(Self { fields })
    }

    /// Decode a little-endian payload.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, EvaluatorError> {
        if bytes.len() != PAYLOAD_BYTES {
            return Err(EvaluatorError::FeatureLayout {
                expected: FEATURE_COUNT,
                actual: bytes.len() / 4,
            });
        }
        let mut fields = [0i32; FEATURE_COUNT];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            *field = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self { fields })
    }

    /// Serialize as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PAYLOAD_BYTES);
        for field in &self.fields {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.fields
    }

    pub fn turn(&self) -> i32 {
        self.fields[0]
    }

    pub fn controller_health(&self) -> i32 {
        self.fields[5]
    }

    pub fn controller_hand_count(&self) -> i32 {
        self.fields[7]
    }

    pub fn controller_deck_count(&self) -> i32 {
        self.fields[8]
    }

    pub fn controller_board_count(&self) -> i32 {
        self.fields[9]
    }

    /// The ten controller hand slots.
    pub fn controller_hand(&self) -> &[i32] {
        &self.fields[HAND_OFFSET..CONTROLLER_BOARD_OFFSET]
    }

    /// Controller minion row `slot` (0..7).
    pub fn controller_minion(&self, slot: usize) -> Option<&[i32]> {
        minion_row(&self.fields[CONTROLLER_BOARD_OFFSET..OPPONENT_OFFSET], slot)
    }

    pub fn opponent_health(&self) -> i32 {
        self.fields[OPPONENT_OFFSET + 4]
    }

    pub fn opponent_hand_count(&self) -> i32 {
        self.fields[OPPONENT_OFFSET + 6]
    }

    pub fn opponent_board_count(&self) -> i32 {
        self.fields[OPPONENT_OFFSET + 8]
    }

    /// Opponent minion row `slot` (0..7).
    pub fn opponent_minion(&self, slot: usize) -> Option<&[i32]> {
        minion_row(&self.fields[OPPONENT_BOARD_OFFSET..], slot)
    }
}

/// Hero class, weapon (3), health, mana, hand/deck/board counts.
fn write_side_header(out: &mut [i32], side: &SideView) {
    let weapon = side.weapon.unwrap_or_default();
    let header = [
        side.hero_class,
        weapon.asset_id,
        weapon.attack,
        weapon.durability,
        side.health,
        side.mana,
        side.hand.len() as i32,
        side.deck_count,
        side.board.len() as i32,
    ];
    out.copy_from_slice(&header);
}

fn write_board(out: &mut [i32], board: &[MinionView]) {
    for (row, minion) in out.chunks_exact_mut(MINION_FIELDS).zip(board.iter()) {
        row.copy_from_slice(&[
            minion.asset_id,
            minion.attack,
            minion.health,
            minion.damage,
            minion.stealth as i32,
            minion.immune as i32,
            minion.taunt as i32,
            minion.cant_be_targeted as i32,
            minion.attacks_this_turn,
            minion.asset_id,
        ]);
    }
}

fn minion_row(board: &[i32], slot: usize) -> Option<&[i32]> {
    board.chunks_exact(MINION_FIELDS).nth(slot)
}
