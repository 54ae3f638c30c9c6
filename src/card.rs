use schema::{AbilityData, CardId, CardKind, CardTemplate, Element, SpellEffect, StatusKind, TrapData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Battle-unique identifier of one physical card instance.
pub type Uid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStatus {
    pub kind: StatusKind,
    pub turns_remaining: u8,
    pub ticks: u8, // Number of turn-start ticks already processed (drives poison escalation)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInst {
    pub uid: Uid,
    pub template: CardTemplate,      // Immutable identity, never mutated during a battle
    pub attack: u32,                 // Current attack, may differ from the template after buffs
    pub defense: u32,                // Current defense
    pub has_attacked: bool,          // Cleared once per turn hand-over
    pub statuses: Vec<ActiveStatus>, // At most one entry per StatusKind
    pub is_set: bool,                // Face-down in the trap zone
    pub destroyed_at: Option<u64>,   // Logical timestamp once in the graveyard
}

impl CardInst {
    /// Create a fresh battle instance of a card template.
    pub fn new(uid: Uid, template: CardTemplate) -> Self {
        CardInst {
            uid,
            attack: template.attack,
            defense: template.defense,
            template,
            has_attacked: false,
            statuses: Vec::new(),
            is_set: false,
            destroyed_at: None,
        }
    }

    pub fn id(&self) -> CardId {
        self.template.id
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn kind(&self) -> CardKind {
        self.template.kind
    }

    pub fn element(&self) -> Element {
        self.template.element
    }

    pub fn level(&self) -> u8 {
        self.template.level
    }

    pub fn is_creature(&self) -> bool {
        self.template.kind == CardKind::Creature
    }

    pub fn ability(&self) -> Option<&AbilityData> {
        self.template.ability.as_ref()
    }

    pub fn spell_effect(&self) -> Option<&SpellEffect> {
        self.template.spell.as_ref()
    }

    pub fn trap_data(&self) -> Option<&TrapData> {
        self.template.trap.as_ref()
    }

    /// Number of sacrifices needed to summon this card.
    pub fn sacrifice_required(&self) -> usize {
        self.template.sacrifice_required()
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind)
    }

    pub fn status(&self, kind: StatusKind) -> Option<&ActiveStatus> {
        self.statuses.iter().find(|s| s.kind == kind)
    }

    /// Apply a status. Re-applying an active status refreshes it to the longer duration.
    pub fn apply_status(&mut self, kind: StatusKind, duration: u8) {
        if duration == 0 {
            return;
        }
        match self.statuses.iter_mut().find(|s| s.kind == kind) {
            Some(existing) => {
                existing.turns_remaining = existing.turns_remaining.max(duration);
            }
            None => self.statuses.push(ActiveStatus {
                kind,
                turns_remaining: duration,
                ticks: 0,
            }),
        }
    }

    /// Add signed deltas to current attack and defense, flooring at 0.
    pub fn modify_stats(&mut self, attack_delta: i32, defense_delta: i32) {
        self.attack = apply_delta(self.attack, attack_delta);
        self.defense = apply_delta(self.defense, defense_delta);
    }

    /// Return the card to its printed state, as when it is revived.
    pub fn reset_to_template(&mut self) {
        self.attack = self.template.attack;
        self.defense = self.template.defense;
        self.has_attacked = false;
        self.statuses.clear();
        self.is_set = false;
        self.destroyed_at = None;
    }
}

fn apply_delta(value: u32, delta: i32) -> u32 {
    if delta >= 0 {
        value.saturating_add(delta as u32)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

impl fmt::Display for CardInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.template.kind {
            CardKind::Creature => {
                write!(
                    f,
                    "#{} {} [{} Lv{}] ATK {} / DEF {}",
                    self.uid,
                    self.name(),
                    self.element(),
                    self.level(),
                    self.attack,
                    self.defense
                )?;
                if !self.statuses.is_empty() {
                    let statuses: Vec<String> = self
                        .statuses
                        .iter()
                        .map(|s| format!("{} {}", s.kind, s.turns_remaining))
                        .collect();
                    write!(f, " ({})", statuses.join(", "))?;
                }
                if self.has_attacked {
                    write!(f, " [spent]")?;
                }
                Ok(())
            }
            CardKind::Spell => match self.spell_effect() {
                Some(effect) => write!(f, "#{} {} [Spell: {}]", self.uid, self.name(), effect),
                None => write!(f, "#{} {} [Spell]", self.uid, self.name()),
            },
            CardKind::Trap => write!(f, "#{} {} [Trap]", self.uid, self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn creature(attack: u32, defense: u32) -> CardInst {
        CardInst::new(
            1,
            CardTemplate {
                id: 1,
                name: "Test Beast".to_string(),
                kind: CardKind::Creature,
                element: Element::Earth,
                level: 1,
                attack,
                defense,
                ability: None,
                spell: None,
                trap: None,
                description: String::new(),
            },
        )
    }

    #[test]
    fn test_modify_stats_floors_at_zero() {
        let mut card = creature(500, 300);
        card.modify_stats(-800, 200);
        assert_eq!(card.attack, 0);
        assert_eq!(card.defense, 500);
    }

    #[test]
    fn test_reapplying_status_keeps_longer_duration() {
        let mut card = creature(500, 300);
        card.apply_status(StatusKind::Burn, 3);
        card.apply_status(StatusKind::Burn, 1);
        assert_eq!(card.statuses.len(), 1);
        assert_eq!(card.status(StatusKind::Burn).map(|s| s.turns_remaining), Some(3));
    }

    #[test]
    fn test_reset_restores_template_stats() {
        let mut card = creature(1200, 800);
        card.modify_stats(300, -400);
        card.apply_status(StatusKind::Poison, 3);
        card.has_attacked = true;
        card.destroyed_at = Some(7);

        card.reset_to_template();

        assert_eq!(card.attack, 1200);
        assert_eq!(card.defense, 800);
        assert!(card.statuses.is_empty());
        assert!(!card.has_attacked);
        assert_eq!(card.destroyed_at, None);
    }
}
