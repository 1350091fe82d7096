//! Move legality for Trouble.
//!
//! Bring out on a six, exact count into and along the finish lane, never
//! stack two of your own pieces. Everything here is a pure function of the
//! state and the roll.

use super::board::{finish_space_id, start_space_id, track_space_id};
use super::config::RulesConfig;
use super::types::{Move, Piece, PieceState, TroubleState};

pub const BRING_OUT_ROLL: u8 = 6;

/// Own pieces always block a track space; opponents only block when
/// capturing is switched off.
fn track_space_blocked(
    config: &RulesConfig,
    state: &TroubleState,
    player_index: usize,
    space_id: &str,
) -> bool {
    if config.allow_capture {
        state.is_space_blocked_by_own(player_index, space_id)
    } else {
        state.find_piece_on_space(space_id, None).is_some()
    }
}

/// Target in the finish lane for `finish_index`, or None on overshoot.
fn finish_move(
    config: &RulesConfig,
    state: &TroubleState,
    piece: &Piece,
    player_index: usize,
    finish_index: u32,
) -> Option<Move> {
    if finish_index >= config.finish_length {
        return None;
    }
    let target_space_id = finish_space_id(player_index, finish_index);
    if state.is_space_blocked_by_own(player_index, &target_space_id) {
        return None;
    }
    let target_state = if finish_index == config.finish_length - 1 {
        PieceState::Done
    } else {
        PieceState::Finish
    };
    Some(Move {
        piece_id: piece.id.clone(),
        target_space_id,
        target_state,
        progress: config.track_length + finish_index,
        finish_index: Some(finish_index),
    })
}

/// The single move `piece` can make with `roll`, if any.
pub fn calculate_move_for_piece(
    config: &RulesConfig,
    state: &TroubleState,
    piece: &Piece,
    player_index: usize,
    roll: u8,
) -> Option<Move> {
    let roll = u32::from(roll);
    match piece.state {
        PieceState::Done => None,
        PieceState::Home => {
            if roll != u32::from(BRING_OUT_ROLL) {
                return None;
            }
            let target_space_id = start_space_id(config, player_index);
            if track_space_blocked(config, state, player_index, &target_space_id) {
                return None;
            }
            Some(Move {
                piece_id: piece.id.clone(),
                target_space_id,
                target_state: PieceState::Track,
                progress: 0,
                finish_index: None,
            })
        }
        PieceState::Track => {
            let next = piece.steps_from_start.unwrap_or(0).checked_add(roll)?;
            if next < config.track_length {
                let index = config.start_index_for_player(player_index) + next;
                let target_space_id = track_space_id(config, i64::from(index));
                if track_space_blocked(config, state, player_index, &target_space_id) {
                    return None;
                }
                return Some(Move {
                    piece_id: piece.id.clone(),
                    target_space_id,
                    target_state: PieceState::Track,
                    progress: next,
                    finish_index: None,
                });
            }
            finish_move(config, state, piece, player_index, next - config.track_length)
        }
        PieceState::Finish => {
            let current = piece.finish_index.unwrap_or_else(|| {
                piece
                    .steps_from_start
                    .unwrap_or(config.track_length)
                    .saturating_sub(config.track_length)
            });
            finish_move(config, state, piece, player_index, current.checked_add(roll)?)
        }
    }
}

/// Every legal move of the player at `player_index`. Winners get none.
pub fn valid_moves_for_player(
    config: &RulesConfig,
    state: &TroubleState,
    player_index: usize,
    roll: u8,
) -> Vec<Move> {
    let Some(player) = state.players.get(player_index) else {
        return vec![];
    };
    if roll == 0 || state.is_winner(&player.player_id) {
        return vec![];
    }
    player
        .pieces
        .iter()
        .filter_map(|piece| calculate_move_for_piece(config, state, piece, player_index, roll))
        .collect()
}
