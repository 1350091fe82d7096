//! Plugin traits: the interfaces every rules variant implements.
//!
//! `RulesPlugin` is the typed capability set the turn machine drives.
//! `GamePlugin` is the object-safe JSON boundary the host registry holds;
//! `JsonAdapter` turns the former into the latter.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::events::EventSink;
use crate::engine::models::*;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("invalid game data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{game} needs {min}..={max} players, got {got}")]
    PlayerCount {
        game: String,
        min: u32,
        max: u32,
        got: usize,
    },

    #[error("invalid options: {0}")]
    Options(String),
}

/// Typed rules plugin. The host holds a reference to this trait; concrete
/// variants supply the rules.
pub trait RulesPlugin: Send + Sync {
    type State: Clone + Serialize + DeserializeOwned + Send + Sync;
    type Move: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync;
    type Event: Into<Event>;

    fn game_id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn min_players(&self) -> u32;
    fn max_players(&self) -> u32;
    fn description(&self) -> &str;

    /// Build the initial state for the seated players.
    fn create_initial_state(
        &self,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<Self::State, PluginError>;

    /// Every legal move of the player at `player_index` for `roll`.
    fn compute_legal_moves(
        &self,
        state: &Self::State,
        player_index: usize,
        roll: u8,
    ) -> Vec<Self::Move>;

    /// Apply a move already known to be legal. Returns false if the move was
    /// refused and nothing changed.
    fn apply_move(
        &self,
        state: &mut Self::State,
        player_index: usize,
        mv: &Self::Move,
        events: &mut dyn EventSink<Self::Event>,
    ) -> bool;

    /// Called when `player_index` becomes the active player.
    fn on_turn_start(&self, _state: &mut Self::State, _player_index: usize) {}

    /// Called when `player_index` hands the turn over.
    fn on_turn_end(&self, _state: &mut Self::State, _player_index: usize) {}

    /// True once the player at `player_index` has completed the game.
    fn check_winner(&self, state: &Self::State, player_index: usize) -> bool;

    /// Record `player_index` as having completed the game. Called once, right
    /// after the move for which `check_winner` first turned true.
    fn on_win(
        &self,
        _state: &mut Self::State,
        _player_index: usize,
        _events: &mut dyn EventSink<Self::Event>,
    ) {
    }
}

/// Object-safe JSON boundary used by the host registry.
pub trait GamePlugin: Send + Sync {
    fn game_id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn min_players(&self) -> u32;
    fn max_players(&self) -> u32;
    fn description(&self) -> &str;

    fn create_initial_state(
        &self,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<serde_json::Value, PluginError>;

    fn get_valid_moves(
        &self,
        game_data: &serde_json::Value,
        player_index: usize,
        roll: u8,
    ) -> Result<Vec<serde_json::Value>, PluginError>;

    fn apply_move(
        &self,
        game_data: &serde_json::Value,
        player_index: usize,
        roll: u8,
        mv: &serde_json::Value,
    ) -> Result<TransitionResult, PluginError>;
}

/// Exposes a typed `RulesPlugin` through the JSON `GamePlugin` trait.
pub struct JsonAdapter<P>(pub P);

impl<P: RulesPlugin> GamePlugin for JsonAdapter<P> {
    fn game_id(&self) -> &str {
        self.0.game_id()
    }
    fn display_name(&self) -> &str {
        self.0.display_name()
    }
    fn min_players(&self) -> u32 {
        self.0.min_players()
    }
    fn max_players(&self) -> u32 {
        self.0.max_players()
    }
    fn description(&self) -> &str {
        self.0.description()
    }

    fn create_initial_state(
        &self,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<serde_json::Value, PluginError> {
        let state = self.0.create_initial_state(players, config)?;
        Ok(serde_json::to_value(state)?)
    }

    fn get_valid_moves(
        &self,
        game_data: &serde_json::Value,
        player_index: usize,
        roll: u8,
    ) -> Result<Vec<serde_json::Value>, PluginError> {
        let state: P::State = serde_json::from_value(game_data.clone())?;
        self.0
            .compute_legal_moves(&state, player_index, roll)
            .into_iter()
            .map(|m| serde_json::to_value(m).map_err(PluginError::from))
            .collect()
    }

    fn apply_move(
        &self,
        game_data: &serde_json::Value,
        player_index: usize,
        roll: u8,
        mv: &serde_json::Value,
    ) -> Result<TransitionResult, PluginError> {
        let mut state: P::State = serde_json::from_value(game_data.clone())?;
        let mv: P::Move = serde_json::from_value(mv.clone())?;
        let mut events: Vec<P::Event> = Vec::new();
        // Moves arriving over the boundary are re-checked against the roll.
        let legal = self
            .0
            .compute_legal_moves(&state, player_index, roll)
            .contains(&mv);
        let applied = legal && self.0.apply_move(&mut state, player_index, &mv, &mut events);
        let player_won = applied && self.0.check_winner(&state, player_index);
        if player_won {
            self.0.on_win(&mut state, player_index, &mut events);
        }
        Ok(TransitionResult {
            game_data: serde_json::to_value(&state)?,
            events: events.into_iter().map(Into::into).collect(),
            applied,
            player_won,
        })
    }
}
