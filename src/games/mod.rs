pub mod trouble;

use std::collections::HashMap;

use crate::engine::plugin::{GamePlugin, JsonAdapter};

use self::trouble::{RulesConfig, TroublePlugin};

/// Registry of available game plugins.
#[derive(Default)]
pub struct GameRegistry {
    plugins: HashMap<String, Box<dyn GamePlugin>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registry with every built-in rules variant.
    pub fn with_builtin(rules: RulesConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JsonAdapter(TroublePlugin::new(rules))));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn GamePlugin>) {
        let id = plugin.game_id().to_string();
        self.plugins.insert(id, plugin);
    }

    pub fn get(&self, game_id: &str) -> Option<&dyn GamePlugin> {
        self.plugins.get(game_id).map(|p| p.as_ref())
    }

    pub fn list_game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.keys().cloned().collect();
        ids.sort();
        ids
    }
}
