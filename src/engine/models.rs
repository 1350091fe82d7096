//! Core engine data types shared between the host and every rules plugin.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type PlayerId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub display_name: String,
    #[serde(default)]
    pub seat_index: i32,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl Player {
    pub fn new(player_id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            display_name: display_name.into(),
            seat_index: 0,
            is_bot: false,
            bot_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_options")]
    pub options: serde_json::Value,
    pub random_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            options: default_options(),
            random_seed: None,
        }
    }
}

fn default_options() -> serde_json::Value {
    serde_json::json!({})
}

/// Untyped event as seen by the host's event dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    /// Player ids in the order they completed all of their pieces.
    pub winners: Vec<PlayerId>,
    pub final_scores: HashMap<String, f64>,
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    "normal".to_string()
}

/// Outcome of a move applied through the JSON boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResult {
    pub game_data: serde_json::Value,
    pub events: Vec<Event>,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub player_won: bool,
}
