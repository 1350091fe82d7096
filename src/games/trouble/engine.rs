//! Turn state machine for Trouble.
//!
//! The engine consumes one die value at a time, computes the roller's legal
//! moves and either resolves the turn on its own or parks in a [`Decision`]
//! that waits for the player: the bring-out prompt, or a pick among several
//! highlighted targets. The decision is replaced wholesale at every
//! transition and is the only place a roll or a move list is cached.

use std::collections::BTreeMap;

use crate::engine::bus::{EventBus, Subscription};
use crate::engine::events::{EventSink, NullSink};
use crate::engine::models::{GameConfig, Player, PlayerId};
use crate::engine::plugin::{PluginError, RulesPlugin};

use super::error::{MoveError, TurnError};
use super::moves::{calculate_move_for_piece, BRING_OUT_ROLL};
use super::plugin::TroublePlugin;
use super::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingRoll,
    ChoicePending,
    AwaitingMoveChoice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Decision {
    #[default]
    AwaitingRoll,
    /// A six offering both a bring-out and board moves.
    ChoicePending { roll: u8, moves: Vec<Move> },
    /// Several moves; waiting for a piece or highlighted-space click.
    AwaitingMoveChoice {
        roll: u8,
        moves: Vec<Move>,
        targets: BTreeMap<String, Move>,
    },
}

impl Decision {
    pub fn phase(&self) -> TurnPhase {
        match self {
            Decision::AwaitingRoll => TurnPhase::AwaitingRoll,
            Decision::ChoicePending { .. } => TurnPhase::ChoicePending,
            Decision::AwaitingMoveChoice { .. } => TurnPhase::AwaitingMoveChoice,
        }
    }

    pub fn roll(&self) -> Option<u8> {
        match self {
            Decision::AwaitingRoll => None,
            Decision::ChoicePending { roll, .. } | Decision::AwaitingMoveChoice { roll, .. } => {
                Some(*roll)
            }
        }
    }

    pub fn moves(&self) -> &[Move] {
        match self {
            Decision::AwaitingRoll => &[],
            Decision::ChoicePending { moves, .. } | Decision::AwaitingMoveChoice { moves, .. } => {
                moves
            }
        }
    }
}

/// What happened to the turn after a move landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnResolution {
    ExtraRoll,
    TurnEnded,
    /// The move completed the mover's last piece; the turn passed on.
    Won,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollOutcome {
    /// The roller already finished; the turn passed straight on.
    Skipped,
    NoMoves { extra_roll: bool },
    Moved {
        applied: MoveApplied,
        resolution: TurnResolution,
    },
    ChoicePending {
        start_moves: Vec<Move>,
        board_moves: Vec<Move>,
    },
    AwaitingMoveChoice { targets: Vec<String> },
}

type StateListener = Box<dyn FnMut(&TroubleState) + Send>;

pub struct TroubleEngine {
    plugin: TroublePlugin,
    state: TroubleState,
    decision: Decision,
    sink: Box<dyn EventSink<TroubleEvent> + Send>,
    listener: Option<StateListener>,
    subscription: Option<Subscription<InboundEvent>>,
}

impl TroubleEngine {
    pub fn new(
        plugin: TroublePlugin,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<Self, PluginError> {
        let state = plugin.create_initial_state(players, config)?;
        Ok(Self::from_state(plugin, state))
    }

    /// Resume from a snapshot. Pieces are back-filled and the saved current
    /// player keeps the turn.
    pub fn from_state(plugin: TroublePlugin, mut state: TroubleState) -> Self {
        plugin.restore_state(&mut state);
        let current = match state.players.len() {
            0 => 0,
            n => state.current_player_index % n,
        };
        plugin.on_turn_start(&mut state, current);
        Self {
            plugin,
            state,
            decision: Decision::default(),
            sink: Box::new(NullSink),
            listener: None,
            subscription: None,
        }
    }

    pub fn with_sink(mut self, sink: impl EventSink<TroubleEvent> + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Called with the new state after every transition.
    pub fn with_state_listener(
        mut self,
        listener: impl FnMut(&TroubleState) + Send + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn state(&self) -> &TroubleState {
        &self.state
    }

    pub fn into_state(self) -> TroubleState {
        self.state
    }

    pub fn plugin(&self) -> &TroublePlugin {
        &self.plugin
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    pub fn phase(&self) -> TurnPhase {
        self.decision.phase()
    }

    pub fn current_roll(&self) -> Option<u8> {
        self.decision.roll()
    }

    pub fn available_moves(&self) -> &[Move] {
        self.decision.moves()
    }

    pub fn available_move(&self, piece_id: &str) -> Option<&Move> {
        self.decision.moves().iter().find(|m| m.piece_id == piece_id)
    }

    /// Highlighted move for `space_id` while a target pick is pending.
    pub fn target_move(&self, space_id: &str) -> Option<&Move> {
        match &self.decision {
            Decision::AwaitingMoveChoice { targets, .. } => targets.get(space_id),
            _ => None,
        }
    }

    pub fn awaiting_move_choice(&self) -> bool {
        self.phase() != TurnPhase::AwaitingRoll
    }

    pub fn roll_enabled(&self) -> bool {
        self.phase() == TurnPhase::AwaitingRoll
    }

    pub fn current_player_id(&self) -> Option<&str> {
        self.state.current_player().map(|p| p.player_id.as_str())
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.state.winners
    }

    /// At most one player is still racing.
    pub fn is_finished(&self) -> bool {
        self.state.players.len() > 1 && self.state.remaining_players() <= 1
    }

    /// Feed a die value for the current player.
    pub fn handle_roll(&mut self, roll: u8) -> Result<RollOutcome, TurnError> {
        if !(1..=6).contains(&roll) {
            return Err(TurnError::RollOutOfRange(roll));
        }
        if self.decision != Decision::AwaitingRoll {
            return Err(TurnError::ChoicePending);
        }
        let player_index = self.state.current_player_index;
        let Some(player) = self.state.players.get(player_index) else {
            return Err(TurnError::NoPlayers);
        };
        let player_id = player.player_id.clone();

        tracing::info!(player = %player_id, roll, "roll received");
        self.sink.emit(TroubleEvent::PlayerRoll {
            game_state: self.state.clone(),
            result: roll,
        });

        if self.state.is_winner(&player_id) {
            tracing::debug!(player = %player_id, "player already finished, passing turn");
            self.end_turn(player_index);
            return Ok(RollOutcome::Skipped);
        }

        let moves = self
            .plugin
            .compute_legal_moves(&self.state, player_index, roll);
        tracing::debug!(player = %player_id, roll, count = moves.len(), "legal moves");

        if moves.is_empty() {
            let extra_roll = roll == BRING_OUT_ROLL;
            if extra_roll {
                self.grant_extra_roll(player_index);
            } else {
                self.end_turn(player_index);
            }
            return Ok(RollOutcome::NoMoves { extra_roll });
        }

        if roll == BRING_OUT_ROLL {
            let (start_moves, board_moves): (Vec<Move>, Vec<Move>) =
                moves.iter().cloned().partition(Move::is_entry);

            if self.state.players[player_index].all_home() {
                if let Some(mv) = start_moves.first() {
                    let (applied, resolution) = self.commit_move(player_index, roll, mv)?;
                    return Ok(RollOutcome::Moved {
                        applied,
                        resolution,
                    });
                }
            } else if !start_moves.is_empty() && !board_moves.is_empty() {
                self.plugin
                    .mark_selectable(&mut self.state, player_index, &moves);
                self.decision = Decision::ChoicePending { roll, moves };
                tracing::info!(player = %player_id, "waiting for bring-out choice");
                self.propose_state_change();
                return Ok(RollOutcome::ChoicePending {
                    start_moves,
                    board_moves,
                });
            }
        }

        self.offer_moves(player_index, roll, moves)
    }

    /// Answer the bring-out prompt.
    pub fn resolve_choice(&mut self, choice: EntryChoice) -> Result<RollOutcome, TurnError> {
        let (roll, moves) = match &self.decision {
            Decision::ChoicePending { roll, moves } => (*roll, moves.clone()),
            _ => return Err(TurnError::NoChoicePending),
        };
        let player_index = self.state.current_player_index;
        let (start_moves, board_moves): (Vec<Move>, Vec<Move>) =
            moves.into_iter().partition(Move::is_entry);
        tracing::info!(?choice, "entry choice resolved");

        match choice {
            EntryChoice::BringOut => {
                let Some(mv) = start_moves.first() else {
                    return Err(TurnError::NoChoicePending);
                };
                let (applied, resolution) = self.commit_move(player_index, roll, mv)?;
                Ok(RollOutcome::Moved {
                    applied,
                    resolution,
                })
            }
            EntryChoice::MoveOnBoard => self.offer_moves(player_index, roll, board_moves),
        }
    }

    /// Apply the move of `piece_id` to `target_space_id` for `player_id`.
    /// Nothing changes when the request is rejected.
    pub fn request_move(
        &mut self,
        player_id: &str,
        piece_id: &str,
        target_space_id: &str,
    ) -> Result<MoveApplied, MoveError> {
        let (player_index, mv, roll) =
            self.validate_request(player_id, piece_id, target_space_id)?;
        let (applied, resolution) = self.commit_move(player_index, roll, &mv)?;
        tracing::debug!(player = player_id, ?resolution, "move request resolved");
        Ok(applied)
    }

    /// Clicking one of your own movable pieces moves it. Clicks from anyone
    /// but the current player are ignored.
    pub fn handle_piece_click(
        &mut self,
        player_id: &str,
        piece_id: &str,
    ) -> Option<Result<MoveApplied, MoveError>> {
        if self.current_player_id() != Some(player_id) {
            tracing::trace!(player = player_id, "ignoring click from inactive player");
            return None;
        }
        let target = self.available_move(piece_id)?.target_space_id.clone();
        Some(self.request_move(player_id, piece_id, &target))
    }

    /// Clicking a highlighted space applies the move that lands there.
    pub fn handle_space_click(&mut self, space_id: &str) -> Option<Result<MoveApplied, MoveError>> {
        let mv = self.target_move(space_id)?.clone();
        let player_id = self.current_player_id()?.to_string();
        Some(self.request_move(&player_id, &mv.piece_id, &mv.target_space_id))
    }

    /// Dispatch one inbound event. Returns true if it changed the game.
    pub fn handle_event(&mut self, event: InboundEvent) -> bool {
        match event {
            InboundEvent::RollComplete { value } => match self.handle_roll(value) {
                Ok(outcome) => {
                    tracing::debug!(?outcome, "roll handled");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "roll rejected");
                    false
                }
            },
            InboundEvent::PieceClicked {
                piece_id,
                player_id,
            } => log_request(self.handle_piece_click(&player_id, &piece_id)),
            InboundEvent::SpaceClicked { space_id } => {
                log_request(self.handle_space_click(&space_id))
            }
        }
    }

    /// Register for every inbound event kind. Replaces any earlier
    /// subscription.
    pub fn subscribe_to(&mut self, bus: &EventBus<InboundEvent>) {
        self.subscription = Some(bus.subscribe(&InboundEvent::TOPICS));
    }

    /// Handle every event queued on the subscription. Returns how many were
    /// consumed.
    pub fn pump(&mut self) -> usize {
        let mut consumed = 0;
        while let Some(event) = self.subscription.as_mut().and_then(Subscription::try_next) {
            self.handle_event(event);
            consumed += 1;
        }
        consumed
    }

    /// Drop the bus subscription and any pending decision.
    pub fn cleanup(&mut self) {
        self.subscription = None;
        self.decision = Decision::AwaitingRoll;
        self.plugin.clear_selectable(&mut self.state);
        tracing::debug!("trouble engine cleaned up");
    }

    fn validate_request(
        &self,
        player_id: &str,
        piece_id: &str,
        target_space_id: &str,
    ) -> Result<(usize, Move, u8), MoveError> {
        let roll = self.decision.roll().ok_or(MoveError::NoActiveRoll)?;
        let player_index = self
            .state
            .player_index(player_id)
            .ok_or(MoveError::InvalidPlayer)?;
        if piece_id.is_empty() {
            return Err(MoveError::NoPieceSelected);
        }
        let piece = self.state.players[player_index]
            .piece(piece_id)
            .ok_or(MoveError::NoPieceSelected)?;
        if target_space_id.is_empty() {
            return Err(MoveError::TargetRequired);
        }
        if player_index != self.state.current_player_index {
            return Err(MoveError::InvalidMove);
        }
        let mv = self
            .decision
            .moves()
            .iter()
            .find(|m| m.piece_id == piece_id && m.target_space_id == target_space_id)
            .ok_or(MoveError::InvalidMove)?;

        let fresh =
            calculate_move_for_piece(self.plugin.config(), &self.state, piece, player_index, roll);
        if fresh.as_ref() != Some(mv) {
            tracing::warn!(piece = piece_id, target = target_space_id, "stale move rejected");
            return Err(MoveError::InvalidMove);
        }
        Ok((player_index, mv.clone(), roll))
    }

    fn offer_moves(
        &mut self,
        player_index: usize,
        roll: u8,
        moves: Vec<Move>,
    ) -> Result<RollOutcome, TurnError> {
        match moves.as_slice() {
            [] => {
                self.end_turn(player_index);
                Ok(RollOutcome::NoMoves { extra_roll: false })
            }
            [only] => {
                let (applied, resolution) = self.commit_move(player_index, roll, only)?;
                Ok(RollOutcome::Moved {
                    applied,
                    resolution,
                })
            }
            _ => {
                let targets: BTreeMap<String, Move> = moves
                    .iter()
                    .map(|m| (m.target_space_id.clone(), m.clone()))
                    .collect();
                let target_ids: Vec<String> = targets.keys().cloned().collect();
                self.plugin
                    .mark_selectable(&mut self.state, player_index, &moves);
                tracing::info!(targets = ?target_ids, "waiting for move choice");
                self.decision = Decision::AwaitingMoveChoice {
                    roll,
                    moves,
                    targets,
                };
                self.propose_state_change();
                Ok(RollOutcome::AwaitingMoveChoice {
                    targets: target_ids,
                })
            }
        }
    }

    fn commit_move(
        &mut self,
        player_index: usize,
        roll: u8,
        mv: &Move,
    ) -> Result<(MoveApplied, TurnResolution), MoveError> {
        if !self
            .plugin
            .apply_move(&mut self.state, player_index, mv, &mut *self.sink)
        {
            return Err(MoveError::InvalidMove);
        }
        self.decision = Decision::AwaitingRoll;

        let player_id = self.state.players[player_index].player_id.clone();
        let applied = MoveApplied {
            piece_id: mv.piece_id.clone(),
            to_space_id: mv.target_space_id.clone(),
            state: mv.target_state,
        };

        let resolution = if self.plugin.check_winner(&self.state, player_index)
            && !self.state.is_winner(&player_id)
        {
            self.plugin
                .on_win(&mut self.state, player_index, &mut *self.sink);
            self.end_turn(player_index);
            TurnResolution::Won
        } else if roll == BRING_OUT_ROLL {
            self.grant_extra_roll(player_index);
            TurnResolution::ExtraRoll
        } else {
            self.end_turn(player_index);
            TurnResolution::TurnEnded
        };
        Ok((applied, resolution))
    }

    fn grant_extra_roll(&mut self, player_index: usize) {
        let player_id = self.state.players[player_index].player_id.clone();
        self.decision = Decision::AwaitingRoll;
        self.plugin.clear_selectable(&mut self.state);
        tracing::info!(player = %player_id, "extra roll granted");
        self.sink.emit(TroubleEvent::ExtraRollGranted { player_id });
        self.propose_state_change();
    }

    fn end_turn(&mut self, player_index: usize) {
        let player_id = self.state.players[player_index].player_id.clone();
        self.decision = Decision::AwaitingRoll;
        self.plugin.on_turn_end(&mut self.state, player_index);
        self.sink.emit(TroubleEvent::TurnEnded {
            player_id: player_id.clone(),
        });
        let next = self.state.current_player_index;
        self.plugin.on_turn_start(&mut self.state, next);
        tracing::debug!(from = %player_id, next, "turn ended");
        self.propose_state_change();
    }

    fn propose_state_change(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&self.state);
        }
    }
}

fn log_request(result: Option<Result<MoveApplied, MoveError>>) -> bool {
    match result {
        None => false,
        Some(Ok(applied)) => {
            tracing::debug!(piece = %applied.piece_id, to = %applied.to_space_id, "move applied");
            true
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "move request rejected");
            false
        }
    }
}
