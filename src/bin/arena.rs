//! Arena CLI: run bot-vs-bot Trouble experiments from the command line.
//!
//! Usage:
//!   cargo run --release --bin arena -- --games 500 --bots greedy,random
//!   cargo run --release --bin arena -- --games 200 --bots greedy,random,random,random --seed 9

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trouble_game_engine::engine::arena::run_arena;
use trouble_game_engine::engine::bot_strategy::BotStrategy;
use trouble_game_engine::engine::models::Player;
use trouble_game_engine::games::trouble::bots::{strategy_by_name, STRATEGY_NAMES};
use trouble_game_engine::games::trouble::config::{load_default_rules, load_rules};
use trouble_game_engine::games::trouble::simulator::{simulate_game, Seat, SimulationConfig};
use trouble_game_engine::games::trouble::TroublePlugin;

#[derive(Parser)]
#[command(name = "arena", about = "Run bot-vs-bot arena experiments for Trouble")]
struct Cli {
    /// Number of games to play
    #[arg(long, default_value = "100")]
    games: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Rotate seat positions between games
    #[arg(long, default_value = "true")]
    alternate_seats: bool,

    /// Path to trouble_rules.toml
    #[arg(long, env = "TROUBLE_RULES")]
    rules: Option<PathBuf>,

    /// Bot per seat, comma separated: "greedy" or "random"
    #[arg(long, value_delimiter = ',', default_value = "greedy,random")]
    bots: Vec<String>,

    /// Roll cap per game
    #[arg(long, default_value = "20000")]
    max_rolls: usize,
}

/// Unique label per seat so two copies of one bot are tallied apart.
fn seat_labels(bots: &[String]) -> Vec<String> {
    bots.iter()
        .enumerate()
        .map(|(i, b)| {
            if bots.iter().filter(|o| *o == b).count() > 1 {
                format!("{b}#{}", i + 1)
            } else {
                b.clone()
            }
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rules = match &cli.rules {
        Some(path) => load_rules(path).unwrap_or_else(|e| {
            eprintln!("Error loading rules: {}", e);
            std::process::exit(1);
        }),
        None => load_default_rules(),
    };

    let labels = seat_labels(&cli.bots);
    let strategies: Vec<(String, Box<dyn BotStrategy<TroublePlugin>>)> = cli
        .bots
        .iter()
        .zip(&labels)
        .map(|(bot, label)| {
            let strategy = strategy_by_name(bot).unwrap_or_else(|| {
                eprintln!("Error: unknown bot '{}'", bot);
                eprintln!("Available bots: {:?}", STRATEGY_NAMES);
                std::process::exit(1);
            });
            (label.clone(), strategy)
        })
        .collect();

    let n = strategies.len();
    if (n as u32) < rules.min_players || (n as u32) > rules.max_players {
        eprintln!(
            "Error: {} bots but the rules seat {}..={} players",
            n, rules.min_players, rules.max_players
        );
        std::process::exit(1);
    }

    eprintln!(
        "Arena: {} games, seed={}, alternate_seats={}, bots={:?}",
        cli.games, cli.seed, cli.alternate_seats, labels
    );
    eprintln!(
        "  rules: track={}, finish={}, pieces={}, capture={}",
        rules.track_length, rules.finish_length, rules.pieces_per_player, rules.allow_capture
    );
    eprintln!();

    let plugin = TroublePlugin::new(rules);
    let play = |players: &[Player], seed: u64| {
        let seats: Vec<Seat> = players
            .iter()
            .map(|p| {
                let label = p.bot_id.as_deref().unwrap_or_default();
                strategies
                    .iter()
                    .find(|(l, _)| l == label)
                    .map(|(_, s)| &**s as Seat)
            })
            .collect::<Option<_>>()?;
        let config = SimulationConfig {
            seed,
            max_rolls: cli.max_rolls,
        };
        match simulate_game(plugin.clone(), players, &seats, &config) {
            Ok(outcome) => Some(outcome.result),
            Err(e) => {
                tracing::error!(seed, error = %e, "game aborted");
                None
            }
        }
    };

    let total = cli.games;
    let progress_cb = move |done: usize, _total: usize| {
        eprint!("\r  [{}/{}] games completed", done, total);
    };

    let result = run_arena(
        &labels,
        cli.games,
        cli.seed,
        cli.alternate_seats,
        play,
        Some(&progress_cb),
    );

    eprintln!("\r                                    "); // clear progress line
    println!("{}", result.summary());
}
