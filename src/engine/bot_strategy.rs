//! Bot strategy trait and the rules-agnostic random bot.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::engine::plugin::RulesPlugin;

/// A bot strategy picks one of the legal moves it is offered.
///
/// The same call answers the bring-out prompt: the driver turns a picked
/// entry move into "bring out" and anything else into "move on board".
pub trait BotStrategy<P: RulesPlugin>: Send + Sync {
    fn name(&self) -> &str;

    fn choose_move<'a>(
        &self,
        plugin: &P,
        state: &P::State,
        player_index: usize,
        moves: &'a [P::Move],
        rng: &mut StdRng,
    ) -> Option<&'a P::Move>;
}

/// Picks a uniformly random legal move.
pub struct RandomStrategy;

impl<P: RulesPlugin> BotStrategy<P> for RandomStrategy {
    fn name(&self) -> &str {
        "random"
    }

    fn choose_move<'a>(
        &self,
        _plugin: &P,
        _state: &P::State,
        _player_index: usize,
        moves: &'a [P::Move],
        rng: &mut StdRng,
    ) -> Option<&'a P::Move> {
        moves.choose(rng)
    }
}
