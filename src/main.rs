//! trouble-engine: play one fully logged Trouble game between bots.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --release -- --bots greedy,random --seed 7

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trouble_game_engine::engine::bot_strategy::BotStrategy;
use trouble_game_engine::engine::models::Player;
use trouble_game_engine::games::trouble::bots::{strategy_by_name, STRATEGY_NAMES};
use trouble_game_engine::games::trouble::config::{load_default_rules, load_rules};
use trouble_game_engine::games::trouble::simulator::{simulate_game, Seat, SimulationConfig};
use trouble_game_engine::games::trouble::TroublePlugin;
use trouble_game_engine::games::GameRegistry;

#[derive(Parser)]
#[command(name = "trouble-engine", about = "Play a logged Trouble game between bots")]
struct Cli {
    /// Path to trouble_rules.toml (default: auto-discover)
    #[arg(long, env = "TROUBLE_RULES")]
    rules: Option<PathBuf>,

    /// Bot per seat, comma separated: "greedy" or "random"
    #[arg(long, value_delimiter = ',', default_value = "greedy,random")]
    bots: Vec<String>,

    /// Random seed for dice and bots
    #[arg(long, default_value = "42", env = "TROUBLE_SEED")]
    seed: u64,

    /// Give up after this many rolls
    #[arg(long, default_value = "20000")]
    max_rolls: usize,

    /// Print the game result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let rules = match cli.rules {
        Some(ref path) => load_rules(path).map_err(|e| format!("Failed to load rules: {e}"))?,
        None => load_default_rules(),
    };

    let registry = GameRegistry::with_builtin(rules.clone());
    tracing::info!(games = ?registry.list_game_ids(), "registered game plugins");

    let strategies = cli
        .bots
        .iter()
        .map(|name| {
            strategy_by_name(name).ok_or_else(|| {
                format!("unknown bot '{name}', expected one of {STRATEGY_NAMES:?}")
            })
        })
        .collect::<Result<Vec<Box<dyn BotStrategy<TroublePlugin>>>, _>>()?;

    let players: Vec<Player> = strategies
        .iter()
        .enumerate()
        .map(|(i, s)| Player {
            player_id: format!("p{}", i + 1),
            display_name: format!("{} #{}", s.name(), i + 1),
            seat_index: i as i32,
            is_bot: true,
            bot_id: Some(s.name().to_string()),
        })
        .collect();
    let seats: Vec<Seat> = strategies.iter().map(|s| &**s as Seat).collect();

    let outcome = simulate_game(
        TroublePlugin::new(rules),
        &players,
        &seats,
        &SimulationConfig {
            seed: cli.seed,
            max_rolls: cli.max_rolls,
        },
    )?;

    for (place, pid) in outcome.finishing_order.iter().enumerate() {
        let name = players
            .iter()
            .find(|p| &p.player_id == pid)
            .map_or(pid.as_str(), |p| p.display_name.as_str());
        println!("{:>2}. {}", place + 1, name);
    }
    println!(
        "rolls={} moves={} captures={} extra_rolls={} completed={}",
        outcome.stats.rolls,
        outcome.stats.moves,
        outcome.stats.captures,
        outcome.stats.extra_rolls,
        outcome.completed,
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.result)?);
    }

    Ok(())
}
