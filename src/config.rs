use crate::errors::ConfigError;
use crate::player::MAX_HP;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// How hard the reference opponent plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Which kind of match is being played. Only reported back in the game report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattleMode {
    #[default]
    QuickBattle,
    Campaign,
    Versus,
}

impl fmt::Display for BattleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleMode::QuickBattle => write!(f, "quick_battle"),
            BattleMode::Campaign => write!(f, "campaign"),
            BattleMode::Versus => write!(f, "versus"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub deck_out_enabled: bool, // Drawing from an empty deck loses the game
    pub starting_hp: u32,
    pub starting_hand_size: usize,
    pub difficulty: Difficulty,
    pub mode: BattleMode,
    pub rng_seed: Option<u64>, // None seeds from the OS
}

impl Default for BattleConfig {
    fn default() -> Self {
        BattleConfig {
            deck_out_enabled: true,
            starting_hp: MAX_HP,
            starting_hand_size: 5,
            difficulty: Difficulty::Normal,
            mode: BattleMode::QuickBattle,
            rng_seed: None,
        }
    }
}

impl BattleConfig {
    /// Parse a config from RON. Omitted fields take their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig =
            ron::from_str(source).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_hp == 0 || self.starting_hp > MAX_HP {
            return Err(ConfigError::InvalidValue(format!(
                "starting_hp must be between 1 and {}, got {}",
                MAX_HP, self.starting_hp
            )));
        }
        if self.starting_hand_size > 10 {
            return Err(ConfigError::InvalidValue(format!(
                "starting_hand_size must be at most 10, got {}",
                self.starting_hand_size
            )));
        }
        Ok(())
    }
}
