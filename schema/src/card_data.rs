use crate::card_types::{CardKind, Element};
use crate::effect_data::{AbilityData, SpellEffect, TrapData};
use serde::{Deserialize, Serialize};

/// Identifier of a card template in the library.
pub type CardId = u32;

fn default_level() -> u8 {
    1
}

/// Static definition of a card as it appears in the library data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub id: CardId,
    pub name: String,
    pub kind: CardKind,
    #[serde(default)]
    pub element: Element,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub ability: Option<AbilityData>,
    #[serde(default)]
    pub spell: Option<SpellEffect>,
    #[serde(default)]
    pub trap: Option<TrapData>,
    #[serde(default)]
    pub description: String,
}

impl CardTemplate {
    /// Number of tributes a creature of this level demands.
    pub fn sacrifice_required(&self) -> usize {
        match self.level {
            0 | 1 => 0,
            2 => 1,
            _ => 2,
        }
    }
}
