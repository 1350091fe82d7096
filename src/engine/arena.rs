//! Bot-vs-bot arena runner.
//!
//! Games run in parallel via rayon; results are aggregated in game order so
//! a run is reproducible from its base seed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::engine::models::*;

/// Aggregated results from an arena run.
pub struct ArenaResult {
    pub num_games: usize,
    pub wins: HashMap<String, usize>,
    /// Games that ended without anyone finishing.
    pub unresolved: usize,
    /// 1-based finishing positions per strategy, one entry per seat played.
    pub ranks: HashMap<String, Vec<usize>>,
    pub game_durations_ms: Vec<f64>,
}

impl ArenaResult {
    pub fn win_rate(&self, name: &str) -> f64 {
        *self.wins.get(name).unwrap_or(&0) as f64 / self.num_games.max(1) as f64
    }

    pub fn avg_rank(&self, name: &str) -> f64 {
        match self.ranks.get(name) {
            Some(r) if !r.is_empty() => r.iter().sum::<usize>() as f64 / r.len() as f64,
            _ => 0.0,
        }
    }

    /// Wilson score interval for the win rate.
    pub fn confidence_interval_95(&self, name: &str) -> (f64, f64) {
        let n = self.num_games;
        if n == 0 {
            return (0.0, 0.0);
        }
        let p = self.win_rate(name);
        let z = 1.96_f64;
        let denom = 1.0 + z * z / n as f64;
        let center = (p + z * z / (2.0 * n as f64)) / denom;
        let margin = z * ((p * (1.0 - p) + z * z / (4.0 * n as f64)) / n as f64).sqrt() / denom;
        ((center - margin).max(0.0), (center + margin).min(1.0))
    }

    pub fn summary(&self) -> String {
        let mut names: Vec<&String> = self.wins.keys().collect();
        names.sort();

        let mut lines = vec![format!("Arena Results ({} games)", self.num_games)];
        lines.push("=".repeat(60));
        for name in names {
            let (ci_lo, ci_hi) = self.confidence_interval_95(name);
            lines.push(format!(
                "  {:>12}: {:3} wins ({:5.1}%)  [95% CI: {:.1}%-{:.1}%]  avg rank={:.2}",
                name,
                self.wins[name],
                self.win_rate(name) * 100.0,
                ci_lo * 100.0,
                ci_hi * 100.0,
                self.avg_rank(name),
            ));
        }
        lines.push(format!("  {:>12}: {}", "Unresolved", self.unresolved));
        if !self.game_durations_ms.is_empty() {
            let total_ms = self.game_durations_ms.iter().sum::<f64>();
            let avg_ms = total_ms / self.game_durations_ms.len() as f64;
            lines.push(format!(
                "  Avg game: {:.1}ms  |  Total: {:.1}s",
                avg_ms,
                total_ms / 1000.0
            ));
        }
        lines.join("\n")
    }
}

/// Seat the strategies for game `game_idx`: rotated one seat per game when
/// `alternate_seats` is set.
pub fn seat_players(strategy_names: &[String], game_idx: usize, alternate_seats: bool) -> Vec<Player> {
    let n = strategy_names.len();
    (0..n)
        .map(|i| {
            let name = if alternate_seats {
                &strategy_names[(i + game_idx) % n]
            } else {
                &strategy_names[i]
            };
            Player {
                player_id: format!("p{i}"),
                display_name: name.clone(),
                seat_index: i as i32,
                is_bot: true,
                bot_id: Some(name.clone()),
            }
        })
        .collect()
}

/// Play `num_games` between the named strategies, one seat each.
///
/// `play` runs a single game for the seated players and seed and returns
/// its result, or None if the game could not be played. Each player's
/// `bot_id` names the strategy in that seat.
pub fn run_arena<F>(
    strategy_names: &[String],
    num_games: usize,
    base_seed: u64,
    alternate_seats: bool,
    play: F,
    progress_callback: Option<&(dyn Fn(usize, usize) + Sync)>,
) -> ArenaResult
where
    F: Fn(&[Player], u64) -> Option<GameResult> + Sync,
{
    let done = AtomicUsize::new(0);

    let games: Vec<(Vec<Player>, Option<GameResult>, f64)> = (0..num_games)
        .into_par_iter()
        .map(|game_idx| {
            let players = seat_players(strategy_names, game_idx, alternate_seats);
            let seed = base_seed.wrapping_add(game_idx as u64);

            let t0 = Instant::now();
            let result = play(&players, seed);
            let elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0;

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(cb) = progress_callback {
                cb(finished, num_games);
            }
            (players, result, elapsed_ms)
        })
        .collect();

    let mut result = ArenaResult {
        num_games,
        wins: strategy_names.iter().map(|n| (n.clone(), 0)).collect(),
        unresolved: 0,
        ranks: strategy_names.iter().map(|n| (n.clone(), Vec::new())).collect(),
        game_durations_ms: Vec::with_capacity(num_games),
    };

    for (players, game_result, elapsed_ms) in games {
        result.game_durations_ms.push(elapsed_ms);

        let winners = match game_result {
            Some(gr) if !gr.winners.is_empty() => gr.winners,
            _ => {
                result.unresolved += 1;
                continue;
            }
        };

        for player in &players {
            let Some(name) = player.bot_id.as_ref() else {
                continue;
            };
            // Players who never finished share the position after the last finisher.
            let rank = winners
                .iter()
                .position(|w| *w == player.player_id)
                .map_or(winners.len() + 1, |pos| pos + 1);
            if let Some(ranks) = result.ranks.get_mut(name) {
                ranks.push(rank);
            }
            if rank == 1 {
                if let Some(wins) = result.wins.get_mut(name) {
                    *wins += 1;
                }
            }
        }
    }

    result
}
