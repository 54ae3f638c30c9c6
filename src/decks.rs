use crate::card_data::get_card_data;
use crate::errors::{CardDataError, CardDataResult};
use crate::player::PlayerType;
use schema::{CardId, CardTemplate};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::error;

const BUILTIN_DECKS: &str = include_str!("../data/decks.ron");

/// A predefined deck for quick battles and NPC opponents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckTemplate {
    pub name: String,
    pub description: String,
    pub cards: Vec<CardId>,
}

// Lazy-loaded deck data
static DECK_DATA: LazyLock<Vec<DeckTemplate>> = LazyLock::new(|| {
    ron::from_str(BUILTIN_DECKS).unwrap_or_else(|e| {
        error!("Built-in decks failed to parse: {}", e);
        Vec::new()
    })
});

/// Everything the engine needs to seat one player at battle start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub player_id: String,
    pub player_name: String,
    pub player_type: PlayerType,
    pub deck: Vec<CardTemplate>,
}

impl PlayerSetup {
    pub fn new(
        player_id: impl Into<String>,
        player_name: impl Into<String>,
        player_type: PlayerType,
        deck: Vec<CardTemplate>,
    ) -> Self {
        PlayerSetup {
            player_id: player_id.into(),
            player_name: player_name.into(),
            player_type,
            deck,
        }
    }

    /// Seat a player with one of the prebuilt decks.
    pub fn from_deck(
        deck_name: &str,
        player_id: impl Into<String>,
        player_name: impl Into<String>,
        player_type: PlayerType,
    ) -> CardDataResult<Self> {
        let deck = build_deck(deck_name)?;
        Ok(Self::new(player_id, player_name, player_type, deck))
    }
}

/// All prebuilt decks
pub fn get_available_decks() -> &'static [DeckTemplate] {
    &DECK_DATA
}

/// Case-insensitive deck lookup by name.
pub fn get_deck(name: &str) -> CardDataResult<&'static DeckTemplate> {
    DECK_DATA
        .iter()
        .find(|deck| deck.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| CardDataError::DeckNotFound(name.to_string()))
}

/// Resolve a prebuilt deck's card ids against the card library.
pub fn build_deck(name: &str) -> CardDataResult<Vec<CardTemplate>> {
    let deck = get_deck(name)?;
    deck.cards.iter().map(|&id| get_card_data(id)).collect()
}
