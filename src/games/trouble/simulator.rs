//! Synchronous game simulator: drives a `TroubleEngine` with seeded dice and
//! bot strategies until the race is decided. Used by the arena and the
//! `trouble-engine` binary.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use crate::engine::bot_strategy::BotStrategy;
use crate::engine::models::{GameConfig, GameResult, Player, PlayerId};
use crate::engine::plugin::PluginError;

use super::engine::{RollOutcome, TroubleEngine};
use super::error::{MoveError, TurnError};
use super::plugin::TroublePlugin;
use super::types::{EntryChoice, TroubleEvent};

pub type Seat<'a> = &'a dyn BotStrategy<TroublePlugin>;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("{players} players but {seats} bot seats")]
    Seats { players: usize, seats: usize },
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Hard stop for games that never resolve.
    pub max_rolls: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_rolls: 20_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStats {
    pub rolls: usize,
    pub moves: usize,
    pub captures: usize,
    pub extra_rolls: usize,
}

impl GameStats {
    fn record(&mut self, event: &TroubleEvent) {
        match event {
            TroubleEvent::PlayerRoll { .. } => self.rolls += 1,
            TroubleEvent::PieceMoved { .. } => self.moves += 1,
            TroubleEvent::PieceCaptured { .. } => self.captures += 1,
            TroubleEvent::ExtraRollGranted { .. } => self.extra_rolls += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Every player in finishing order. Unranked players (roll cap hit)
    /// trail in seat order.
    pub finishing_order: Vec<PlayerId>,
    pub result: GameResult,
    pub stats: GameStats,
    pub completed: bool,
}

/// Play one full game. `seats[i]` moves for `players[i]`.
pub fn simulate_game(
    plugin: TroublePlugin,
    players: &[Player],
    seats: &[Seat<'_>],
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    if seats.len() != players.len() {
        return Err(SimulationError::Seats {
            players: players.len(),
            seats: seats.len(),
        });
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let game_config = GameConfig {
        random_seed: Some(config.seed),
        ..Default::default()
    };
    let mut engine = TroubleEngine::new(plugin, players, &game_config)?.with_sink(tx);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = GameStats::default();

    let mut rolls = 0;
    while !engine.is_finished() && rolls < config.max_rolls {
        let roll = rng.gen_range(1..=6u8);
        rolls += 1;
        let outcome = engine.handle_roll(roll)?;
        resolve_pending(&mut engine, outcome, seats, &mut rng)?;
        while let Ok(event) = rx.try_recv() {
            stats.record(&event);
        }
    }

    let completed = engine.is_finished();
    if !completed {
        tracing::warn!(rolls, seed = config.seed, "roll cap reached before the game resolved");
    }

    let state = engine.into_state();
    let mut finishing_order = state.winners.clone();
    finishing_order.extend(
        state
            .players
            .iter()
            .filter(|p| !state.is_winner(&p.player_id))
            .map(|p| p.player_id.clone()),
    );

    let final_scores: HashMap<String, f64> = state
        .players
        .iter()
        .map(|p| {
            let done = p.pieces.iter().filter(|pc| pc.is_done()).count();
            (p.player_id.clone(), done as f64)
        })
        .collect();

    tracing::info!(
        order = ?finishing_order,
        rolls = stats.rolls,
        captures = stats.captures,
        "game simulated"
    );

    Ok(SimulationResult {
        finishing_order,
        result: GameResult {
            winners: state.winners,
            final_scores,
            reason: if completed { "normal" } else { "roll_limit" }.to_string(),
        },
        stats,
        completed,
    })
}

/// Answer prompts until the roll is fully resolved.
fn resolve_pending(
    engine: &mut TroubleEngine,
    mut outcome: RollOutcome,
    seats: &[Seat<'_>],
    rng: &mut StdRng,
) -> Result<(), SimulationError> {
    while matches!(
        outcome,
        RollOutcome::ChoicePending { .. } | RollOutcome::AwaitingMoveChoice { .. }
    ) {
        let player_index = engine.state().current_player_index;
        let seat = seats[player_index];
        let moves = engine.available_moves().to_vec();
        let Some(pick) = seat
            .choose_move(engine.plugin(), engine.state(), player_index, &moves, rng)
            .or_else(|| moves.first())
            .cloned()
        else {
            break;
        };

        if let RollOutcome::ChoicePending { .. } = outcome {
            let choice = if pick.is_entry() {
                EntryChoice::BringOut
            } else {
                EntryChoice::MoveOnBoard
            };
            tracing::trace!(bot = seat.name(), ?choice, "bot answered prompt");
            outcome = engine.resolve_choice(choice)?;
        } else {
            let player_id = engine
                .current_player_id()
                .map(str::to_string)
                .unwrap_or_default();
            engine.request_move(&player_id, &pick.piece_id, &pick.target_space_id)?;
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bot_strategy::RandomStrategy;
    use crate::games::trouble::bots::GreedyStrategy;

    fn players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player::new(format!("p{i}"), format!("Bot {i}")))
            .collect()
    }

    #[test]
    fn test_simulated_game_completes() {
        let seats: [Seat; 2] = [&GreedyStrategy, &RandomStrategy];
        let result = simulate_game(
            TroublePlugin::default(),
            &players(2),
            &seats,
            &SimulationConfig {
                seed: 11,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(result.completed);
        assert_eq!(result.result.winners.len(), 1);
        assert_eq!(result.finishing_order.len(), 2);
        assert_eq!(result.result.final_scores[&result.result.winners[0]], 4.0);
        assert!(result.stats.moves >= 16);
        assert!(result.stats.rolls >= result.stats.moves);
    }

    #[test]
    fn test_same_seed_same_game() {
        let seats: [Seat; 3] = [&RandomStrategy, &RandomStrategy, &RandomStrategy];
        let config = SimulationConfig {
            seed: 3,
            ..Default::default()
        };
        let a = simulate_game(TroublePlugin::default(), &players(3), &seats, &config).unwrap();
        let b = simulate_game(TroublePlugin::default(), &players(3), &seats, &config).unwrap();
        assert_eq!(a.finishing_order, b.finishing_order);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.result.winners.len(), 2);
    }

    #[test]
    fn test_roll_cap_stops_early() {
        let seats: [Seat; 2] = [&RandomStrategy, &RandomStrategy];
        let result = simulate_game(
            TroublePlugin::default(),
            &players(2),
            &seats,
            &SimulationConfig {
                seed: 5,
                max_rolls: 10,
            },
        )
        .unwrap();
        assert!(!result.completed);
        assert_eq!(result.stats.rolls, 10);
        assert_eq!(result.result.reason, "roll_limit");
        assert!(result.result.winners.is_empty());
    }

    #[test]
    fn test_seat_count_must_match() {
        let seats: [Seat; 1] = [&RandomStrategy];
        let err = simulate_game(
            TroublePlugin::default(),
            &players(2),
            &seats,
            &SimulationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Seats { players: 2, seats: 1 }));
    }
}
