use crate::battle::calculators::Combatant;
use crate::battle::conditions::attack_factor;
use crate::battle::effects::{EffectDelta, StatChange, StatusApplication, TriggerEvent};
use crate::battle::state::BattleState;
use crate::card::{CardInst, Uid};
use schema::{AbilityEffect, AbilityTrigger, EffectTarget};

/// One ability that fired for a trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityActivation {
    pub owner: usize,
    pub source_uid: Uid,
    pub card_name: String,
    pub ability_name: String,
    pub delta: EffectDelta,
}

/// Continuous modifiers from PASSIVE abilities. Recomputed whenever needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassiveModifiers {
    pub attack: i32,
    pub defense: i32,
    pub evasion: u8,
}

/// Evaluate every ability that reacts to `event`, in field order.
pub fn evaluate(state: &BattleState, event: &TriggerEvent) -> Vec<AbilityActivation> {
    let (owner, trigger, sources, counterpart): (usize, AbilityTrigger, Vec<&CardInst>, Option<Uid>) =
        match *event {
            TriggerEvent::Summoned { player_index, uid } => (
                player_index,
                AbilityTrigger::OnSummon,
                state.players[player_index].field_card(uid).into_iter().collect(),
                None,
            ),
            TriggerEvent::Attacked {
                player_index,
                attacker,
                defender,
            } => (
                player_index,
                AbilityTrigger::OnAttack,
                state.players[player_index].field_card(attacker).into_iter().collect(),
                defender,
            ),
            TriggerEvent::Destroyed {
                player_index,
                uid,
                by,
            } => (
                player_index,
                AbilityTrigger::OnDestroy,
                state.players[player_index]
                    .graveyard_card(uid)
                    .into_iter()
                    .collect(),
                by,
            ),
            TriggerEvent::TurnStarted { player_index } => (
                player_index,
                AbilityTrigger::OnTurnStart,
                state.players[player_index].field.iter().collect(),
                None,
            ),
            TriggerEvent::TurnEnded { player_index } => (
                player_index,
                AbilityTrigger::OnTurnEnd,
                state.players[player_index].field.iter().collect(),
                None,
            ),
            TriggerEvent::Damaged { player_index, .. } => (
                player_index,
                AbilityTrigger::OnDamage,
                state.players[player_index].field.iter().collect(),
                None,
            ),
        };

    sources
        .into_iter()
        .filter_map(|card| {
            let ability = card.ability().filter(|a| a.trigger == trigger)?;
            Some(AbilityActivation {
                owner,
                source_uid: card.uid,
                card_name: card.name().to_string(),
                ability_name: ability.name.clone(),
                delta: build_delta(state, owner, card.uid, &ability.effect, counterpart),
            })
        })
        .collect()
}

fn build_delta(
    state: &BattleState,
    owner: usize,
    source_uid: Uid,
    effect: &AbilityEffect,
    counterpart: Option<Uid>,
) -> EffectDelta {
    let mut delta = EffectDelta::default();

    match effect {
        AbilityEffect::HealOwner { amount } => delta.heal_owner = *amount,
        AbilityEffect::DamageOpponent { amount } => delta.damage_opponent = *amount,
        AbilityEffect::DrawCards { count } => delta.draw = *count,
        AbilityEffect::InflictStatus {
            status,
            duration,
            target,
        } => {
            let duration = if *duration == 0 {
                status.default_duration()
            } else {
                *duration
            };
            let targets = resolve_targets(state, owner, source_uid, *target, counterpart);
            if targets.is_empty() {
                delta.notes.push(format!("no target for {}", status));
            }
            delta.statuses = targets
                .into_iter()
                .map(|(player_index, uid)| StatusApplication {
                    player_index,
                    uid,
                    status: *status,
                    duration,
                })
                .collect();
        }
        AbilityEffect::ModifyStats {
            attack,
            defense,
            target,
        } => {
            let targets = resolve_targets(state, owner, source_uid, *target, counterpart);
            if targets.is_empty() {
                delta.notes.push("no target for the stat change".to_string());
            }
            delta.stat_changes = targets
                .into_iter()
                .map(|(player_index, uid)| StatChange {
                    player_index,
                    uid,
                    attack: *attack,
                    defense: *defense,
                })
                .collect();
        }
        AbilityEffect::ReviveLast => delta.revive = Some(false),
        // Continuous effects have nothing to do on a trigger
        AbilityEffect::StatBoost { .. }
        | AbilityEffect::AllyAura { .. }
        | AbilityEffect::Evasion { .. }
        | AbilityEffect::ElementBoost { .. } => {}
    }

    delta
}

fn resolve_targets(
    state: &BattleState,
    owner: usize,
    source_uid: Uid,
    target: EffectTarget,
    counterpart: Option<Uid>,
) -> Vec<(usize, Uid)> {
    let opponent = 1 - owner;
    match target {
        EffectTarget::This => state.players[owner]
            .field_card(source_uid)
            .map(|card| vec![(owner, card.uid)])
            .unwrap_or_default(),
        EffectTarget::Counterpart => counterpart
            .and_then(|uid| state.players[opponent].field_card(uid))
            .map(|card| vec![(opponent, card.uid)])
            .unwrap_or_default(),
        EffectTarget::AllEnemies => state.players[opponent]
            .field
            .iter()
            .map(|card| (opponent, card.uid))
            .collect(),
        EffectTarget::AllAllies => state.players[owner]
            .field
            .iter()
            .map(|card| (owner, card.uid))
            .collect(),
    }
}

/// Sum the PASSIVE modifiers that apply to `card` when it faces `opponent`.
pub fn passive_modifiers(
    state: &BattleState,
    owner: usize,
    card: &CardInst,
    opponent: Option<&CardInst>,
) -> PassiveModifiers {
    let mut modifiers = PassiveModifiers::default();

    if let Some(ability) = card.ability().filter(|a| a.trigger == AbilityTrigger::Passive) {
        match &ability.effect {
            AbilityEffect::StatBoost { attack, defense } => {
                modifiers.attack += attack;
                modifiers.defense += defense;
            }
            AbilityEffect::Evasion { chance } => {
                modifiers.evasion = modifiers.evasion.max(*chance);
            }
            AbilityEffect::ElementBoost { against, attack } => {
                if opponent.is_some_and(|o| o.element() == *against) {
                    modifiers.attack += attack;
                }
            }
            _ => {}
        }
    }

    // Auras reach every creature on the owner's field, their source included
    for ally in &state.players[owner].field {
        if let Some(ability) = ally.ability().filter(|a| a.trigger == AbilityTrigger::Passive) {
            if let AbilityEffect::AllyAura { attack, defense } = ability.effect {
                modifiers.attack += attack;
                modifiers.defense += defense;
            }
        }
    }

    modifiers
}

/// Combat numbers for `card` against `opponent`: passives folded in, then burn.
pub fn combatant(
    state: &BattleState,
    owner: usize,
    card: &CardInst,
    opponent: Option<&CardInst>,
) -> Combatant {
    let modifiers = passive_modifiers(state, owner, card, opponent);
    let attack = (card.attack as i64 + modifiers.attack as i64).max(0) as f64;
    let defense = (card.defense as i64 + modifiers.defense as i64).max(0) as f64;

    Combatant {
        element: card.element(),
        attack: attack * attack_factor(card),
        defense,
    }
}
