//! Trouble rules behind the `RulesPlugin` seam.

use crate::engine::events::EventSink;
use crate::engine::models::*;
use crate::engine::plugin::{PluginError, RulesPlugin};

use super::board::{home_space_id, new_player, setup_player_pieces};
use super::config::{ConfigError, RulesConfig};
use super::moves::valid_moves_for_player;
use super::types::*;

#[derive(Debug, Clone, Default)]
pub struct TroublePlugin {
    config: RulesConfig,
}

impl TroublePlugin {
    /// Plugin over `config` as given. Callers building a `RulesConfig` by
    /// hand must run `RulesConfig::validate` first, or use `try_new`.
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    pub fn try_new(config: RulesConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Back-fill a restored snapshot so every player has a complete,
    /// seat-consistent set of pieces.
    pub fn restore_state(&self, state: &mut TroubleState) {
        for (i, player) in state.players.iter_mut().enumerate() {
            setup_player_pieces(&self.config, player, i);
        }
    }

    /// Flag the current player's movable pieces; everything else is cleared.
    pub fn mark_selectable(&self, state: &mut TroubleState, player_index: usize, moves: &[Move]) {
        for (pi, player) in state.players.iter_mut().enumerate() {
            for piece in &mut player.pieces {
                piece.is_selectable =
                    pi == player_index && moves.iter().any(|m| m.piece_id == piece.id);
            }
        }
    }

    pub fn clear_selectable(&self, state: &mut TroubleState) {
        for piece in state.players.iter_mut().flat_map(|p| p.pieces.iter_mut()) {
            piece.is_selectable = false;
        }
    }

    fn send_piece_home(
        &self,
        state: &mut TroubleState,
        player_index: usize,
        piece_index: usize,
        events: &mut dyn EventSink<TroubleEvent>,
    ) {
        let piece = &mut state.players[player_index].pieces[piece_index];
        piece.state = PieceState::Home;
        piece.steps_from_start = None;
        piece.finish_index = None;
        piece.current_space_id = home_space_id(player_index, piece.home_slot());
        piece.is_selectable = false;

        tracing::info!(piece = %piece.id, player_index, "piece captured");
        events.emit(TroubleEvent::PieceCaptured {
            captured_piece_id: piece.id.clone(),
            player_index,
        });
    }
}

impl RulesPlugin for TroublePlugin {
    type State = TroubleState;
    type Move = Move;
    type Event = TroubleEvent;

    fn game_id(&self) -> &str {
        "trouble"
    }
    fn display_name(&self) -> &str {
        "Trouble"
    }
    fn min_players(&self) -> u32 {
        self.config.min_players
    }
    fn max_players(&self) -> u32 {
        self.config.max_players
    }
    fn description(&self) -> &str {
        "Four-player Pop-O-Matic race around the track to your finish lane. \
         Bring pieces out on a six and send opponents home by landing on them."
    }

    fn create_initial_state(
        &self,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<TroubleState, PluginError> {
        if !(config.options.is_object() || config.options.is_null()) {
            return Err(PluginError::Options(format!(
                "expected a JSON object, got {}",
                config.options
            )));
        }
        let n = players.len();
        if n < self.min_players() as usize || n > self.max_players() as usize {
            return Err(PluginError::PlayerCount {
                game: self.game_id().to_string(),
                min: self.min_players(),
                max: self.max_players(),
                got: n,
            });
        }
        Ok(TroubleState {
            players: players
                .iter()
                .enumerate()
                .map(|(i, p)| new_player(&self.config, p, i))
                .collect(),
            current_player_index: 0,
            winners: Vec::new(),
        })
    }

    fn compute_legal_moves(&self, state: &TroubleState, player_index: usize, roll: u8) -> Vec<Move> {
        valid_moves_for_player(&self.config, state, player_index, roll)
    }

    fn apply_move(
        &self,
        state: &mut TroubleState,
        player_index: usize,
        mv: &Move,
        events: &mut dyn EventSink<TroubleEvent>,
    ) -> bool {
        let Some(piece_index) = state
            .players
            .get(player_index)
            .and_then(|p| p.pieces.iter().position(|pc| pc.id == mv.piece_id))
        else {
            return false;
        };

        if mv.target_state == PieceState::Track {
            match state.find_piece_on_space(&mv.target_space_id, Some(&mv.piece_id)) {
                Some((owner, _)) if owner == player_index => return false,
                Some(_) if !self.config.allow_capture => return false,
                Some((owner, captured)) => self.send_piece_home(state, owner, captured, events),
                None => {}
            }
        }

        let player_id = state.players[player_index].player_id.clone();
        let piece = &mut state.players[player_index].pieces[piece_index];
        piece.state = mv.target_state;
        piece.steps_from_start = Some(mv.progress);
        piece.finish_index = match mv.target_state {
            PieceState::Finish | PieceState::Done => Some(
                mv.finish_index
                    .unwrap_or_else(|| mv.progress.saturating_sub(self.config.track_length)),
            ),
            _ => None,
        };
        piece.current_space_id = mv.target_space_id.clone();
        piece.is_selectable = false;

        tracing::debug!(
            player = %player_id,
            piece = %piece.id,
            to = %mv.target_space_id,
            state = ?piece.state,
            "piece moved"
        );
        events.emit(TroubleEvent::PieceMoved {
            player_id,
            piece_id: piece.id.clone(),
            to_space_id: mv.target_space_id.clone(),
            state: piece.state,
        });
        true
    }

    fn on_turn_start(&self, state: &mut TroubleState, player_index: usize) {
        state.current_player_index = player_index;
        self.clear_selectable(state);
    }

    fn on_turn_end(&self, state: &mut TroubleState, player_index: usize) {
        self.clear_selectable(state);
        if !state.players.is_empty() {
            state.current_player_index = (player_index + 1) % state.players.len();
        }
    }

    fn check_winner(&self, state: &TroubleState, player_index: usize) -> bool {
        state
            .players
            .get(player_index)
            .map(TroublePlayer::all_done)
            .unwrap_or(false)
    }

    fn on_win(
        &self,
        state: &mut TroubleState,
        player_index: usize,
        events: &mut dyn EventSink<TroubleEvent>,
    ) {
        let Some(player_id) = state.players.get(player_index).map(|p| p.player_id.clone()) else {
            return;
        };
        if state.is_winner(&player_id) {
            return;
        }
        state.winners.push(player_id.clone());
        tracing::info!(
            player = %player_id,
            place = state.winners.len(),
            "player finished all pieces"
        );
        events.emit(TroubleEvent::PlayerWon {
            player_id: player_id.clone(),
        });
        events.emit(TroubleEvent::GameWon { winner: player_id });
    }
}
