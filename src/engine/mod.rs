pub mod models;
pub mod plugin;
pub mod events;
pub mod bus;
pub mod bot_strategy;
pub mod arena;
