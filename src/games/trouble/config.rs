//! Board and rules configuration for Trouble.
//! Loaded from TOML at runtime, or parsed straight from a map file's
//! `engine.config` object (camelCase keys).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PIECES_PER_PLAYER: u32 = 4;
pub const DEFAULT_TRACK_LENGTH: u32 = 28;
pub const DEFAULT_FINISH_LENGTH: u32 = 4;
pub const DEFAULT_START_OFFSETS: [u32; 4] = [0, 7, 14, 21];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read rules file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to parse map config: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("rules validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    #[serde(alias = "piecesPerPlayer")]
    pub pieces_per_player: u32,
    #[serde(alias = "trackLength")]
    pub track_length: u32,
    #[serde(alias = "finishLength")]
    pub finish_length: u32,
    #[serde(alias = "startOffsets")]
    pub start_offsets: Vec<u32>,
    #[serde(alias = "allowCapture")]
    pub allow_capture: bool,
    #[serde(alias = "minPlayers")]
    pub min_players: u32,
    #[serde(alias = "maxPlayers")]
    pub max_players: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            pieces_per_player: DEFAULT_PIECES_PER_PLAYER,
            track_length: DEFAULT_TRACK_LENGTH,
            finish_length: DEFAULT_FINISH_LENGTH,
            start_offsets: DEFAULT_START_OFFSETS.to_vec(),
            allow_capture: true,
            min_players: 2,
            max_players: 4,
        }
    }
}

impl RulesConfig {
    /// Parse a map file's `engine.config` object.
    pub fn from_map_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let config: RulesConfig = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pieces_per_player == 0 {
            return Err(ConfigError::Validation("pieces_per_player must be > 0".into()));
        }
        if self.track_length == 0 {
            return Err(ConfigError::Validation("track_length must be > 0".into()));
        }
        if self.finish_length == 0 {
            return Err(ConfigError::Validation("finish_length must be > 0".into()));
        }
        if let Some(bad) = self.start_offsets.iter().find(|&&o| o >= self.track_length) {
            return Err(ConfigError::Validation(format!(
                "start offset {bad} lies outside a track of {} spaces",
                self.track_length
            )));
        }
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(ConfigError::Validation(format!(
                "invalid player range {}..={}",
                self.min_players, self.max_players
            )));
        }
        Ok(())
    }

    /// Track offsets in effect. An empty list falls back to the defaults.
    pub fn effective_offsets(&self) -> &[u32] {
        if self.start_offsets.is_empty() {
            &DEFAULT_START_OFFSETS[..]
        } else {
            self.start_offsets.as_slice()
        }
    }

    /// Track-entry index for the player seated at `player_index`.
    pub fn start_index_for_player(&self, player_index: usize) -> u32 {
        let offsets = self.effective_offsets();
        offsets[player_index % offsets.len()]
    }
}

/// Load rules from a TOML file at the given path.
pub fn load_rules(path: &Path) -> Result<RulesConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: RulesConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Try to load rules from well-known paths, returning defaults if none found.
pub fn load_default_rules() -> RulesConfig {
    let candidates = [
        "trouble_rules.toml",
        "../trouble_rules.toml",
        "/etc/trouble/rules.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_rules(p) {
                Ok(rules) => {
                    tracing::info!(path = %p.display(), track_length = rules.track_length, "loaded rules");
                    return rules;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load rules");
                }
            }
        }
    }
    tracing::info!("no trouble_rules.toml found, using classic rules");
    RulesConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_classic_board() {
        let c = RulesConfig::default();
        assert_eq!(c.pieces_per_player, 4);
        assert_eq!(c.track_length, 28);
        assert_eq!(c.finish_length, 4);
        assert_eq!(c.start_offsets, vec![0, 7, 14, 21]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c: RulesConfig = toml::from_str("track_length = 40\nstart_offsets = [0, 10, 20, 30]").unwrap();
        assert_eq!(c.track_length, 40);
        assert_eq!(c.finish_length, 4);
        assert_eq!(c.start_index_for_player(2), 20);
    }

    #[test]
    fn test_map_engine_config_parses() {
        let map_config = serde_json::json!({
            "piecesPerPlayer": 4,
            "allowCapture": true,
            "trackLength": 28,
            "startOffsets": [0, 7, 14, 21],
            "finishLength": 4
        });
        let c = RulesConfig::from_map_json(&map_config).unwrap();
        assert_eq!(c, RulesConfig::default());
    }

    #[test]
    fn test_empty_offsets_fall_back() {
        let c = RulesConfig {
            start_offsets: vec![],
            ..Default::default()
        };
        assert_eq!(c.start_index_for_player(1), 7);
        assert_eq!(c.start_index_for_player(5), 7);
    }

    #[test]
    fn test_validation_rejects_offset_outside_track() {
        let c = RulesConfig {
            start_offsets: vec![0, 28],
            ..Default::default()
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_validation_rejects_zero_finish_lane() {
        let c = RulesConfig {
            finish_length: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_rules_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pieces_per_player = 2\nfinish_length = 3").unwrap();
        let c = load_rules(file.path()).unwrap();
        assert_eq!(c.pieces_per_player, 2);
        assert_eq!(c.finish_length, 3);
        assert_eq!(c.track_length, 28);
    }

    #[test]
    fn test_load_rules_missing_file() {
        let err = load_rules(Path::new("/nonexistent/trouble_rules.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_load_rules_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "track_length = \"long\"").unwrap();
        assert!(matches!(load_rules(file.path()), Err(ConfigError::TomlParse(_))));
    }
}
