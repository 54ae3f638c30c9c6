use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Elemental affinity of a card. Drives the type chart during combat.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Element {
    Fire,
    Water,
    Earth,
    Air,
    Light,
    Dark,
    #[default]
    Neutral,
}

impl Element {
    /// Raw chart lookup for `attacking` striking `defending`.
    /// Returns `None` when the pairing has no entry; callers treat that as neutral.
    pub fn chart_entry(attacking: Element, defending: Element) -> Option<f64> {
        use Element::*;

        match (attacking, defending) {
            // The elemental wheel: Water > Fire > Earth > Air > Water
            (Water, Fire) | (Fire, Earth) | (Earth, Air) | (Air, Water) => Some(1.5),
            (Fire, Water) | (Earth, Fire) | (Air, Earth) | (Water, Air) => Some(0.5),

            // Light and Dark overwhelm each other
            (Light, Dark) | (Dark, Light) => Some(1.5),

            _ => None,
        }
    }

    /// Multiplier applied to the attacker's attack stat. 1.0 when absent from the chart.
    pub fn type_effectiveness(attacking: Element, defending: Element) -> f64 {
        Self::chart_entry(attacking, defending).unwrap_or(1.0)
    }
}

/// The three card families a deck can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum CardKind {
    Creature,
    Spell,
    Trap,
}
