//! Board geometry for Trouble.
//!
//! Space ids are derived, never stored independently: track space `i` is
//! `t{i mod track_length}`, finish slot `f` of player `p` is `p{p}-f{f}`,
//! home slot `h` of player `p` is `p{p}-home-{h}`.

use crate::engine::models::Player;

use super::config::RulesConfig;
use super::types::{Piece, PieceState, TroublePlayer};

pub fn track_space_id(config: &RulesConfig, index: i64) -> String {
    let len = i64::from(config.track_length.max(1));
    format!("t{}", index.rem_euclid(len))
}

pub fn finish_space_id(player_index: usize, finish_index: u32) -> String {
    format!("p{player_index}-f{finish_index}")
}

pub fn home_space_id(player_index: usize, home_index: usize) -> String {
    format!("p{player_index}-home-{home_index}")
}

pub fn piece_id(player_id: &str, home_index: usize) -> String {
    format!("{player_id}-piece-{}", home_index + 1)
}

/// Entry space of the player seated at `player_index`.
pub fn start_space_id(config: &RulesConfig, player_index: usize) -> String {
    track_space_id(config, i64::from(config.start_index_for_player(player_index)))
}

fn new_piece(config: &RulesConfig, player_id: &str, player_index: usize, home_index: usize) -> Piece {
    Piece {
        id: piece_id(player_id, home_index),
        player_id: player_id.to_string(),
        state: PieceState::Home,
        start_index: config.start_index_for_player(player_index),
        start_space_id: start_space_id(config, player_index),
        current_space_id: home_space_id(player_index, home_index),
        home_index: Some(home_index),
        steps_from_start: None,
        finish_index: None,
        is_selectable: false,
    }
}

/// Seat a host player with a full set of pieces at home.
pub fn new_player(config: &RulesConfig, player: &Player, player_index: usize) -> TroublePlayer {
    TroublePlayer {
        player_id: player.player_id.clone(),
        nickname: player.display_name.clone(),
        start_index: config.start_index_for_player(player_index),
        pieces: (0..config.pieces_per_player as usize)
            .map(|h| new_piece(config, &player.player_id, player_index, h))
            .collect(),
    }
}

/// Bring a (possibly restored) player up to date: create pieces if none
/// exist, otherwise back-fill seat-derived fields the snapshot lacked.
pub fn setup_player_pieces(config: &RulesConfig, player: &mut TroublePlayer, player_index: usize) {
    player.start_index = config.start_index_for_player(player_index);

    if player.pieces.is_empty() {
        player.pieces = (0..config.pieces_per_player as usize)
            .map(|h| new_piece(config, &player.player_id, player_index, h))
            .collect();
        return;
    }

    for (i, piece) in player.pieces.iter_mut().enumerate() {
        if piece.start_space_id.is_empty() {
            piece.start_index = player.start_index;
            piece.start_space_id = start_space_id(config, player_index);
        }
        if piece.home_index.is_none() {
            piece.home_index = Some(i);
        }
        if piece.player_id.is_empty() {
            piece.player_id = player.player_id.clone();
        }
        if piece.current_space_id.is_empty() {
            piece.current_space_id = if piece.state == PieceState::Home {
                home_space_id(player_index, piece.home_slot())
            } else {
                piece.start_space_id.clone()
            };
        }
    }
}
