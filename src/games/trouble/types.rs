//! Domain types for Trouble. Field names serialize in camelCase so snapshots
//! interoperate with existing board front-ends.

use serde::{Deserialize, Serialize};

use crate::engine::bus::Topic;
use crate::engine::models::{Event, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceState {
    Home,
    Track,
    Finish,
    Done, // terminal
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub id: String,
    pub player_id: PlayerId,
    pub state: PieceState,
    #[serde(default)]
    pub start_index: u32,
    #[serde(default)]
    pub start_space_id: String,
    #[serde(default)]
    pub current_space_id: String,
    #[serde(default)]
    pub home_index: Option<usize>,
    /// Spaces advanced since leaving home. None while at home.
    #[serde(default)]
    pub steps_from_start: Option<u32>,
    /// Slot in the finish lane. None unless finish/done.
    #[serde(default)]
    pub finish_index: Option<u32>,
    #[serde(default)]
    pub is_selectable: bool,
}

impl Piece {
    pub fn home_slot(&self) -> usize {
        self.home_index.unwrap_or(0)
    }

    pub fn is_home(&self) -> bool {
        self.state == PieceState::Home
    }

    pub fn is_done(&self) -> bool {
        self.state == PieceState::Done
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroublePlayer {
    pub player_id: PlayerId,
    pub nickname: String,
    /// Track-entry index on the shared circular track.
    #[serde(default)]
    pub start_index: u32,
    #[serde(default)]
    pub pieces: Vec<Piece>,
}

impl TroublePlayer {
    pub fn piece(&self, piece_id: &str) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == piece_id)
    }

    pub fn all_home(&self) -> bool {
        self.pieces.iter().all(Piece::is_home)
    }

    pub fn all_done(&self) -> bool {
        !self.pieces.is_empty() && self.pieces.iter().all(Piece::is_done)
    }
}

/// Full Trouble game state. The turn machine is its only writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroubleState {
    pub players: Vec<TroublePlayer>,
    #[serde(default)]
    pub current_player_index: usize,
    /// Players who completed all pieces, in finishing order. Never shrinks.
    #[serde(default)]
    pub winners: Vec<PlayerId>,
}

impl TroubleState {
    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.player_id == player_id)
    }

    pub fn current_player(&self) -> Option<&TroublePlayer> {
        self.players.get(self.current_player_index)
    }

    pub fn is_winner(&self, player_id: &str) -> bool {
        self.winners.iter().any(|w| w == player_id)
    }

    /// Players still racing.
    pub fn remaining_players(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !self.is_winner(&p.player_id))
            .count()
    }

    /// Locate a piece sitting on `space_id` as (player index, piece index).
    /// Pieces at home or done never occupy board spaces.
    pub fn find_piece_on_space(
        &self,
        space_id: &str,
        ignore_piece_id: Option<&str>,
    ) -> Option<(usize, usize)> {
        for (pi, player) in self.players.iter().enumerate() {
            for (ki, piece) in player.pieces.iter().enumerate() {
                if Some(piece.id.as_str()) != ignore_piece_id
                    && !matches!(piece.state, PieceState::Home | PieceState::Done)
                    && piece.current_space_id == space_id
                {
                    return Some((pi, ki));
                }
            }
        }
        None
    }

    pub fn is_space_blocked_by_own(&self, player_index: usize, space_id: &str) -> bool {
        matches!(self.find_piece_on_space(space_id, None), Some((pi, _)) if pi == player_index)
    }
}

/// A legal move for one piece under the current roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub piece_id: String,
    pub target_space_id: String,
    pub target_state: PieceState,
    /// New `steps_from_start` after the move.
    pub progress: u32,
    pub finish_index: Option<u32>,
}

impl Move {
    /// Bringing a piece out of home onto its entry space.
    pub fn is_entry(&self) -> bool {
        self.target_state == PieceState::Track && self.progress == 0
    }
}

/// Answer to the "bring a piece out or move on the board" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryChoice {
    BringOut,
    MoveOnBoard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload", rename_all = "camelCase")]
pub enum TroubleEvent {
    #[serde(rename_all = "camelCase")]
    PlayerRoll { game_state: TroubleState, result: u8 },
    #[serde(rename_all = "camelCase")]
    ExtraRollGranted { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    PieceMoved {
        player_id: PlayerId,
        piece_id: String,
        to_space_id: String,
        state: PieceState,
    },
    #[serde(rename_all = "camelCase")]
    PieceCaptured {
        captured_piece_id: String,
        player_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    TurnEnded { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    GameWon { winner: PlayerId },
    #[serde(rename_all = "camelCase")]
    PlayerWon { player_id: PlayerId },
}

impl TroubleEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TroubleEvent::PlayerRoll { .. } => "playerRoll",
            TroubleEvent::ExtraRollGranted { .. } => "extraRollGranted",
            TroubleEvent::PieceMoved { .. } => "pieceMoved",
            TroubleEvent::PieceCaptured { .. } => "pieceCaptured",
            TroubleEvent::TurnEnded { .. } => "turnEnded",
            TroubleEvent::GameWon { .. } => "gameWon",
            TroubleEvent::PlayerWon { .. } => "playerWon",
        }
    }

    pub fn player_id(&self) -> Option<&str> {
        match self {
            TroubleEvent::ExtraRollGranted { player_id }
            | TroubleEvent::PieceMoved { player_id, .. }
            | TroubleEvent::TurnEnded { player_id }
            | TroubleEvent::PlayerWon { player_id } => Some(player_id.as_str()),
            TroubleEvent::GameWon { winner } => Some(winner.as_str()),
            TroubleEvent::PlayerRoll { .. } | TroubleEvent::PieceCaptured { .. } => None,
        }
    }
}

impl From<TroubleEvent> for Event {
    fn from(event: TroubleEvent) -> Self {
        let event_type = event.event_type().to_string();
        let player_id = event.player_id().map(str::to_string);
        let payload = serde_json::to_value(&event)
            .ok()
            .and_then(|mut v| v.get_mut("payload").map(serde_json::Value::take))
            .unwrap_or_default();
        Event {
            event_type,
            player_id,
            payload,
        }
    }
}

/// Host input delivered on the inbound bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload", rename_all = "camelCase")]
pub enum InboundEvent {
    RollComplete { value: u8 },
    #[serde(rename_all = "camelCase")]
    PieceClicked { piece_id: String, player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    SpaceClicked { space_id: String },
}

impl InboundEvent {
    pub const TOPICS: [&'static str; 3] = ["rollComplete", "pieceClicked", "spaceClicked"];
}

impl Topic for InboundEvent {
    fn topic(&self) -> &'static str {
        match self {
            InboundEvent::RollComplete { .. } => "rollComplete",
            InboundEvent::PieceClicked { .. } => "pieceClicked",
            InboundEvent::SpaceClicked { .. } => "spaceClicked",
        }
    }
}

/// Successful move request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveApplied {
    pub piece_id: String,
    pub to_space_id: String,
    pub state: PieceState,
}

/// Wire shape of a move request result: `{success, data}` or `{success, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<MoveApplied>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<MoveApplied, E>> for MoveResponse {
    fn from(result: Result<MoveApplied, E>) -> Self {
        match result {
            Ok(data) => MoveResponse {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => MoveResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}
