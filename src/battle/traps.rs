use crate::battle::effects::{EffectDelta, StatChange, StatusApplication, TriggerEvent};
use crate::battle::state::BattleState;
use crate::card::Uid;
use schema::{TrapCondition, TrapEffect};

/// A face-down trap that matched an event and is about to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapActivation {
    pub owner: usize,
    pub trap_uid: Uid,
    pub trap_name: String,
    pub delta: EffectDelta,
}

/// Which trap condition an event satisfies, whose traps are scanned, and the
/// opposing creature that set it off.
fn match_event(state: &BattleState, event: &TriggerEvent) -> Option<(usize, TrapCondition, Option<Uid>)> {
    match *event {
        TriggerEvent::Summoned { player_index, uid } => {
            Some((1 - player_index, TrapCondition::OnSummon, Some(uid)))
        }
        TriggerEvent::Attacked {
            player_index,
            attacker,
            defender,
        } => {
            let condition = match defender {
                Some(_) => TrapCondition::OnAttack,
                None => TrapCondition::OnDirectAttack,
            };
            Some((1 - player_index, condition, Some(attacker)))
        }
        // Only destruction the opponent brings about during their own turn
        TriggerEvent::Destroyed {
            player_index, by, ..
        } if state.turn_owner != player_index => {
            Some((player_index, TrapCondition::OnDestroy, by))
        }
        _ => None,
    }
}

/// Find the first trap in the zone of the player opposing the event's producer that
/// matches. At most one trap activates per event.
pub fn scan(state: &BattleState, event: &TriggerEvent) -> Option<TrapActivation> {
    let (owner, condition, trigger_creature) = match_event(state, event)?;
    let opponent = 1 - owner;
    let creature = trigger_creature.filter(|uid| state.players[opponent].field_card(*uid).is_some());
    let is_attack = matches!(
        condition,
        TrapCondition::OnAttack | TrapCondition::OnDirectAttack
    );

    state.players[owner].trap_zone.iter().find_map(|trap| {
        let data = trap.trap_data()?;
        if data.condition != condition {
            return None;
        }

        let mut delta = EffectDelta::default();
        match &data.effect {
            TrapEffect::NegateAttack if is_attack => delta.negate_attack = true,
            TrapEffect::NegateAttack => return None,
            TrapEffect::DamagePlayer { amount } => delta.damage_opponent = *amount,
            TrapEffect::Debuff { attack, defense } => {
                delta.stat_changes.push(StatChange {
                    player_index: opponent,
                    uid: creature?,
                    attack: *attack,
                    defense: *defense,
                });
            }
            TrapEffect::InflictStatus { status, duration } => {
                let duration = if *duration == 0 {
                    status.default_duration()
                } else {
                    *duration
                };
                delta.statuses.push(StatusApplication {
                    player_index: opponent,
                    uid: creature?,
                    status: *status,
                    duration,
                });
            }
            TrapEffect::DestroyTrigger => delta.destroy.push((opponent, creature?)),
            // Waits for lethal damage instead of the event itself
            TrapEffect::SurviveAtOne => return None,
        }

        Some(TrapActivation {
            owner,
            trap_uid: trap.uid,
            trap_name: trap.name().to_string(),
            delta,
        })
    })
}

/// A set survive-at-1 trap that covers lethal damage from a creature or direct attack.
pub fn find_survive_trap(state: &BattleState, owner: usize, direct: bool) -> Option<(Uid, String)> {
    let condition = if direct {
        TrapCondition::OnDirectAttack
    } else {
        TrapCondition::OnAttack
    };

    state.players[owner]
        .trap_zone
        .iter()
        .find(|trap| {
            trap.trap_data()
                .is_some_and(|d| d.condition == condition && d.effect == TrapEffect::SurviveAtOne)
        })
        .map(|trap| (trap.uid, trap.name().to_string()))
}
