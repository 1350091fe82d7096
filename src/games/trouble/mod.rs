//! Trouble (Pop-O-Matic) move resolution and turn sequencing.

pub mod board;
pub mod bots;
pub mod config;
pub mod engine;
pub mod error;
pub mod moves;
pub mod plugin;
pub mod simulator;
pub mod types;

pub use config::RulesConfig;
pub use engine::TroubleEngine;
pub use plugin::TroublePlugin;
