use crate::card::{CardInst, Uid};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const MAX_HP: u32 = 8000;
pub const MAX_FIELD_SIZE: usize = 3;
pub const MAX_TRAP_ZONE_SIZE: usize = 2;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    // Sacrifices may come from the hand or the field, never the summoned card itself.
    Summon { card_id: Uid, sacrifices: Vec<Uid> },

    // Target is required for single-creature spells and ignored otherwise.
    UseSpell { card_id: Uid, target_id: Option<Uid> },

    SetTrap { card_id: Uid },

    // No target means a direct attack on the opposing player.
    Attack { card_id: Uid, target_id: Option<Uid> },

    GoToBattle,
    EndTurn,

    // Pass: MAIN advances to BATTLE, BATTLE ends the turn.
    Wait,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerAction::Summon { card_id, sacrifices } if sacrifices.is_empty() => {
                write!(f, "Summon #{}", card_id)
            }
            PlayerAction::Summon { card_id, sacrifices } => {
                let ids: Vec<String> = sacrifices.iter().map(|uid| format!("#{}", uid)).collect();
                write!(f, "Summon #{} sacrificing {}", card_id, ids.join(", "))
            }
            PlayerAction::UseSpell { card_id, target_id: Some(target) } => {
                write!(f, "Cast #{} on #{}", card_id, target)
            }
            PlayerAction::UseSpell { card_id, target_id: None } => write!(f, "Cast #{}", card_id),
            PlayerAction::SetTrap { card_id } => write!(f, "Set trap #{}", card_id),
            PlayerAction::Attack { card_id, target_id: Some(target) } => {
                write!(f, "Attack #{} with #{}", target, card_id)
            }
            PlayerAction::Attack { card_id, target_id: None } => {
                write!(f, "Attack directly with #{}", card_id)
            }
            PlayerAction::GoToBattle => write!(f, "Go to battle"),
            PlayerAction::EndTurn => write!(f, "End turn"),
            PlayerAction::Wait => write!(f, "Wait"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerType {
    Human,
    Npc,
}

/// The zone a card currently occupies.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Deck,
    Hand,
    Field,
    TrapZone,
    Graveyard,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattlePlayer {
    // A unique identifier. For a human, this could be their UserID.
    pub player_id: String,
    pub player_name: String,
    pub player_type: PlayerType,

    pub hp: u32,

    pub deck: VecDeque<CardInst>, // Front is the next draw
    pub hand: Vec<CardInst>,
    pub field: Vec<CardInst>,      // At most MAX_FIELD_SIZE creatures, in summon order
    pub trap_zone: Vec<CardInst>,  // At most MAX_TRAP_ZONE_SIZE face-down traps
    pub graveyard: Vec<CardInst>,  // Append-only, in destruction order
}

impl BattlePlayer {
    /// Create a new BattlePlayer with a prepared deck and empty zones
    pub fn new(
        player_id: String,
        player_name: String,
        player_type: PlayerType,
        deck: Vec<CardInst>,
        hp: u32,
    ) -> Self {
        BattlePlayer {
            player_id,
            player_name,
            player_type,
            hp: hp.min(MAX_HP),
            deck: deck.into(),
            hand: Vec::new(),
            field: Vec::new(),
            trap_zone: Vec::new(),
            graveyard: Vec::new(),
        }
    }

    pub fn hand_card(&self, uid: Uid) -> Option<&CardInst> {
        self.hand.iter().find(|c| c.uid == uid)
    }

    pub fn field_card(&self, uid: Uid) -> Option<&CardInst> {
        self.field.iter().find(|c| c.uid == uid)
    }

    pub fn field_card_mut(&mut self, uid: Uid) -> Option<&mut CardInst> {
        self.field.iter_mut().find(|c| c.uid == uid)
    }

    pub fn graveyard_card(&self, uid: Uid) -> Option<&CardInst> {
        self.graveyard.iter().find(|c| c.uid == uid)
    }

    /// Remove a card from hand, preserving the order of the rest.
    pub fn take_from_hand(&mut self, uid: Uid) -> Option<CardInst> {
        let index = self.hand.iter().position(|c| c.uid == uid)?;
        Some(self.hand.remove(index))
    }

    pub fn take_from_field(&mut self, uid: Uid) -> Option<CardInst> {
        let index = self.field.iter().position(|c| c.uid == uid)?;
        Some(self.field.remove(index))
    }

    pub fn take_from_trap_zone(&mut self, uid: Uid) -> Option<CardInst> {
        let index = self.trap_zone.iter().position(|c| c.uid == uid)?;
        Some(self.trap_zone.remove(index))
    }

    pub fn take_from_graveyard(&mut self, uid: Uid) -> Option<CardInst> {
        let index = self.graveyard.iter().position(|c| c.uid == uid)?;
        Some(self.graveyard.remove(index))
    }

    /// Take a card out of whichever of hand, field or trap zone holds it.
    pub fn take_from_play(&mut self, uid: Uid) -> Option<CardInst> {
        self.take_from_hand(uid)
            .or_else(|| self.take_from_field(uid))
            .or_else(|| self.take_from_trap_zone(uid))
    }

    /// Move the top card of the deck into the hand.
    pub fn draw(&mut self) -> Option<Uid> {
        let card = self.deck.pop_front()?;
        let uid = card.uid;
        self.hand.push(card);
        Some(uid)
    }

    /// Append a card to the graveyard with its destruction timestamp.
    pub fn send_to_graveyard(&mut self, mut card: CardInst, timestamp: u64) {
        card.is_set = false;
        card.has_attacked = false;
        card.statuses.clear();
        card.destroyed_at = Some(timestamp);
        self.graveyard.push(card);
    }

    /// The creature with the latest destruction timestamp, if any.
    pub fn last_destroyed_creature(&self) -> Option<&CardInst> {
        self.graveyard
            .iter()
            .filter(|c| c.is_creature())
            .max_by_key(|c| c.destroyed_at.unwrap_or(0))
    }

    /// Reduce HP, flooring at 0. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.hp);
        self.hp -= taken;
        taken
    }

    /// Restore HP up to MAX_HP. Returns the amount actually healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let healed = amount.min(MAX_HP - self.hp.min(MAX_HP));
        self.hp += healed;
        healed
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }

    pub fn has_field_space(&self) -> bool {
        self.field.len() < MAX_FIELD_SIZE
    }

    pub fn has_trap_space(&self) -> bool {
        self.trap_zone.len() < MAX_TRAP_ZONE_SIZE
    }

    /// Find which zone holds a card.
    pub fn locate(&self, uid: Uid) -> Option<Zone> {
        if self.hand.iter().any(|c| c.uid == uid) {
            Some(Zone::Hand)
        } else if self.field.iter().any(|c| c.uid == uid) {
            Some(Zone::Field)
        } else if self.trap_zone.iter().any(|c| c.uid == uid) {
            Some(Zone::TrapZone)
        } else if self.graveyard.iter().any(|c| c.uid == uid) {
            Some(Zone::Graveyard)
        } else if self.deck.iter().any(|c| c.uid == uid) {
            Some(Zone::Deck)
        } else {
            None
        }
    }

    /// Every card this player owns, across all zones.
    pub fn all_cards(&self) -> impl Iterator<Item = &CardInst> {
        self.deck
            .iter()
            .chain(self.hand.iter())
            .chain(self.field.iter())
            .chain(self.trap_zone.iter())
            .chain(self.graveyard.iter())
    }
}
