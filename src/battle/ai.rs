//! A module for defining AI behaviors for battle opponents.

use crate::battle::calculators::{resolve_combat, Combatant};
use crate::battle::conditions::attack_factor;
use crate::battle::state::{Phase, TurnRng};
use crate::battle::view::BattleView;
use crate::card::{CardInst, Uid};
use crate::config::Difficulty;
use crate::player::{PlayerAction, MAX_HP};
use ordered_float::OrderedFloat;
use schema::{BuffTarget, DamageTarget, SpellEffect};

/// A trait for any system that can decide on a battle action.
/// The decision is validated by the engine exactly like human input.
pub trait Behavior {
    /// Pick one of `legal` given what the player can see.
    fn decide_action(&self, view: &BattleView, legal: &[PlayerAction], rng: &mut TurnRng) -> PlayerAction;
}

/// Reference opponent. Easy picks any legal action; Normal and Hard score them.
pub struct ScoringAI {
    difficulty: Difficulty,
}

impl ScoringAI {
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    fn value(card: &CardInst) -> f64 {
        (card.attack + card.defense) as f64 / 100.0
    }

    fn strike(card: &CardInst) -> Combatant {
        Combatant {
            element: card.element(),
            attack: card.attack as f64 * attack_factor(card),
            defense: card.defense as f64,
        }
    }

    /// The core scoring logic. Assigns a floating-point value to a given action.
    fn score_action(&self, action: &PlayerAction, view: &BattleView) -> f64 {
        let hard = self.difficulty == Difficulty::Hard;

        match action {
            PlayerAction::Summon {
                card_id,
                sacrifices,
            } => {
                let Some(card) = view.visible_card(*card_id) else {
                    return 0.0;
                };
                let cost: f64 = sacrifices
                    .iter()
                    .map(|uid| match view.me.field.iter().find(|c| c.uid == *uid) {
                        Some(on_field) => Self::value(on_field),
                        None => 10.0,
                    })
                    .sum();
                20.0 + Self::value(card) - cost
            }
            PlayerAction::UseSpell { card_id, target_id } => view
                .visible_card(*card_id)
                .map(|card| self.score_spell(card.spell_effect(), *target_id, view))
                .unwrap_or(0.0),
            PlayerAction::SetTrap { .. } => {
                if hard {
                    14.0
                } else {
                    10.0
                }
            }
            PlayerAction::GoToBattle => 1.0,
            PlayerAction::EndTurn => {
                if view.phase == Phase::Main {
                    -100.0
                } else {
                    0.0
                }
            }
            PlayerAction::Wait => -1.0,
            PlayerAction::Attack { card_id, target_id } => {
                let Some(attacker) = view.visible_card(*card_id) else {
                    return 0.0;
                };
                let mut score = self.score_attack(attacker, *target_id, view);
                // Face-down cards might be waiting for exactly this
                if hard && view.opponent.trap_count > 0 && score < 1000.0 {
                    score *= 0.8;
                }
                score
            }
        }
    }

    fn score_attack(&self, attacker: &CardInst, target_id: Option<Uid>, view: &BattleView) -> f64 {
        let hard = self.difficulty == Difficulty::Hard;
        let strike = Self::strike(attacker);

        let Some(defender) = target_id.and_then(|uid| view.visible_card(uid)) else {
            let damage = strike.attack.round();
            if hard && damage >= view.opponent.hp as f64 {
                return 1000.0;
            }
            return 5.0 + damage / 50.0;
        };

        let outcome = resolve_combat(&strike, &Self::strike(defender));
        if hard && outcome.damage_to_defender_owner >= view.opponent.hp {
            return 1000.0;
        }
        match (outcome.attacker_destroyed, outcome.defender_destroyed) {
            (false, true) => 30.0 + Self::value(defender) + outcome.damage_to_defender_owner as f64 / 50.0,
            (true, true) => 10.0 + Self::value(defender) - Self::value(attacker),
            _ => -20.0 - Self::value(attacker),
        }
    }

    fn score_spell(&self, effect: Option<&SpellEffect>, target_id: Option<Uid>, view: &BattleView) -> f64 {
        let enemy = |uid: Option<Uid>| uid.and_then(|uid| view.opponent.field.iter().find(|c| c.uid == uid));

        match effect {
            None => -10.0,
            Some(SpellEffect::Heal { amount, .. }) => {
                let missing = MAX_HP.saturating_sub(view.me.hp);
                if missing == 0 {
                    -5.0
                } else {
                    (*amount).min(missing) as f64 / 50.0
                }
            }
            Some(SpellEffect::Damage {
                amount,
                target: DamageTarget::EnemyPlayer,
            }) => {
                if self.difficulty == Difficulty::Hard && *amount >= view.opponent.hp {
                    1000.0
                } else {
                    *amount as f64 / 40.0
                }
            }
            Some(SpellEffect::Damage {
                amount,
                target: DamageTarget::SingleEnemy,
            }) => enemy(target_id).map_or(0.0, |target| Self::spell_hit(target, *amount)),
            Some(SpellEffect::Damage {
                amount,
                target: DamageTarget::AllEnemies,
            }) => view
                .opponent
                .field
                .iter()
                .map(|target| Self::spell_hit(target, *amount))
                .sum(),
            Some(SpellEffect::Buff {
                attack,
                defense,
                target,
            }) => {
                let allies = match target {
                    BuffTarget::SingleAlly => 1,
                    BuffTarget::AllAllies => view.me.field.len(),
                };
                (attack + defense) as f64 * allies as f64 / 100.0
            }
            Some(SpellEffect::Draw { count }) => {
                if view.me.deck_size > *count as usize {
                    *count as f64 * 8.0
                } else {
                    -5.0
                }
            }
            Some(SpellEffect::Destroy) => enemy(target_id).map_or(0.0, |target| 10.0 + Self::value(target)),
            Some(SpellEffect::Status { status, .. }) => match enemy(target_id) {
                Some(target) if !target.has_status(*status) => 15.0,
                Some(_) => 1.0,
                None => -50.0,
            },
            Some(SpellEffect::Revive { .. }) => {
                if view.me.graveyard.iter().any(|c| c.is_creature()) {
                    12.0
                } else {
                    -5.0
                }
            }
        }
    }

    fn spell_hit(target: &CardInst, amount: u32) -> f64 {
        if amount >= target.defense {
            10.0 + Self::value(target)
        } else {
            amount as f64 / 100.0
        }
    }
}

impl Behavior for ScoringAI {
    fn decide_action(&self, view: &BattleView, legal: &[PlayerAction], rng: &mut TurnRng) -> PlayerAction {
        if legal.is_empty() {
            return PlayerAction::Wait;
        }

        if self.difficulty == Difficulty::Easy {
            let index = rng.pick_index(legal.len(), "easy opponent choice");
            return legal[index].clone();
        }

        legal
            .iter()
            .max_by_key(|action| OrderedFloat(self.score_action(action, view)))
            .cloned()
            .unwrap_or(PlayerAction::Wait)
    }
}
