//! Heuristic Trouble bot.

use rand::rngs::StdRng;

use crate::engine::bot_strategy::{BotStrategy, RandomStrategy};

use super::plugin::TroublePlugin;
use super::types::{Move, PieceState, TroubleState};

const FINISH_BONUS: u32 = 1_000;
const CAPTURE_BONUS: u32 = 500;
const BRING_OUT_BONUS: u32 = 300;

/// Finish a piece if possible, else capture, else bring a piece out, else
/// advance the piece furthest along.
pub struct GreedyStrategy;

impl GreedyStrategy {
    fn score(state: &TroubleState, player_index: usize, mv: &Move) -> u32 {
        if mv.target_state == PieceState::Done {
            return FINISH_BONUS;
        }
        let captures = mv.target_state == PieceState::Track
            && matches!(
                state.find_piece_on_space(&mv.target_space_id, Some(&mv.piece_id)),
                Some((owner, _)) if owner != player_index
            );
        if captures {
            return CAPTURE_BONUS + mv.progress;
        }
        if mv.is_entry() {
            return BRING_OUT_BONUS;
        }
        mv.progress
    }
}

impl BotStrategy<TroublePlugin> for GreedyStrategy {
    fn name(&self) -> &str {
        "greedy"
    }

    fn choose_move<'a>(
        &self,
        _plugin: &TroublePlugin,
        state: &TroubleState,
        player_index: usize,
        moves: &'a [Move],
        _rng: &mut StdRng,
    ) -> Option<&'a Move> {
        // First of equally scored moves wins.
        moves
            .iter()
            .rev()
            .max_by_key(|mv| Self::score(state, player_index, mv))
    }
}

/// Strategy names accepted on the command line.
pub const STRATEGY_NAMES: [&str; 2] = ["greedy", "random"];

pub fn strategy_by_name(name: &str) -> Option<Box<dyn BotStrategy<TroublePlugin>>> {
    match name {
        "greedy" => Some(Box::new(GreedyStrategy)),
        "random" => Some(Box::new(RandomStrategy)),
        _ => None,
    }
}
