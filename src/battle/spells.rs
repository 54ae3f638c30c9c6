use crate::battle::commands::{BattleCommand, PlayerTarget};
use crate::battle::state::{BattleEvent, BattleState};
use crate::card::Uid;
use crate::errors::ActionError;
use schema::{BuffTarget, DamageTarget, HealTarget, SpellEffect};

/// What a spell needs chosen before it can be cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRequirement {
    None,
    EnemyCreature,
    AllyCreature,
    AnyCreature,
}

pub fn target_requirement(effect: Option<&SpellEffect>) -> TargetRequirement {
    match effect {
        Some(SpellEffect::Damage {
            target: DamageTarget::SingleEnemy,
            ..
        })
        | Some(SpellEffect::Destroy) => TargetRequirement::EnemyCreature,
        Some(SpellEffect::Buff {
            target: BuffTarget::SingleAlly,
            ..
        }) => TargetRequirement::AllyCreature,
        Some(SpellEffect::Status { .. }) => TargetRequirement::AnyCreature,
        _ => TargetRequirement::None,
    }
}

/// Check the chosen target at cast time. Targets for spells that take none are ignored.
pub fn validate_target(
    state: &BattleState,
    caster: usize,
    effect: Option<&SpellEffect>,
    target: Option<Uid>,
) -> Result<(), ActionError> {
    let opponent = 1 - caster;
    let on_field = |player: usize, uid: Uid| state.players[player].field_card(uid).is_some();

    match target_requirement(effect) {
        TargetRequirement::None => Ok(()),
        requirement => {
            let uid = target.ok_or(ActionError::TargetRequired)?;
            let valid = match requirement {
                TargetRequirement::EnemyCreature => on_field(opponent, uid),
                TargetRequirement::AllyCreature => on_field(caster, uid),
                _ => on_field(caster, uid) || on_field(opponent, uid),
            };
            if valid {
                Ok(())
            } else {
                Err(ActionError::InvalidTarget(uid))
            }
        }
    }
}

fn fizzle(reason: impl Into<String>) -> BattleCommand {
    BattleCommand::EmitEvent(BattleEvent::EffectFizzled {
        reason: reason.into(),
    })
}

/// Resolve a spell's payload into commands. The spell card itself has already left the hand.
/// Targets that vanished since the cast become no-ops with a log line.
pub fn resolve_spell(
    state: &BattleState,
    caster: usize,
    spell_name: &str,
    effect: Option<&SpellEffect>,
    target: Option<Uid>,
) -> Vec<BattleCommand> {
    let caster_target = PlayerTarget::from_index(caster);
    let opponent = 1 - caster;
    let enemy_target = caster_target.opponent();

    let Some(effect) = effect else {
        return vec![fizzle(format!("{} has no effect", spell_name))];
    };

    match effect {
        SpellEffect::Heal { amount, target: heal_target } => {
            let mut commands = Vec::new();
            if *heal_target == HealTarget::Ally {
                commands.push(fizzle(format!(
                    "{} cannot heal a creature, so it heals its caster instead",
                    spell_name
                )));
            }
            commands.push(BattleCommand::HealPlayer {
                target: caster_target,
                amount: *amount,
            });
            commands
        }
        SpellEffect::Damage {
            amount,
            target: DamageTarget::EnemyPlayer,
        } => vec![BattleCommand::DealDamage {
            target: enemy_target,
            amount: *amount,
        }],
        SpellEffect::Damage {
            amount,
            target: DamageTarget::SingleEnemy,
        } => match target.and_then(|uid| state.players[opponent].field_card(uid)) {
            Some(card) => vec![defense_damage(enemy_target, card.uid, card.defense, *amount)],
            None => vec![fizzle(format!("{} lost its target", spell_name))],
        },
        SpellEffect::Damage {
            amount,
            target: DamageTarget::AllEnemies,
        } => {
            let enemies = &state.players[opponent].field;
            if enemies.is_empty() {
                return vec![fizzle(format!("{} found no enemy creatures", spell_name))];
            }
            enemies
                .iter()
                .map(|card| defense_damage(enemy_target, card.uid, card.defense, *amount))
                .collect()
        }
        SpellEffect::Buff {
            attack,
            defense,
            target: buff_target,
        } => {
            let allies: Vec<Uid> = match buff_target {
                BuffTarget::SingleAlly => target
                    .filter(|uid| state.players[caster].field_card(*uid).is_some())
                    .into_iter()
                    .collect(),
                BuffTarget::AllAllies => state.players[caster].field.iter().map(|c| c.uid).collect(),
            };
            if allies.is_empty() {
                return vec![fizzle(format!("{} has no ally to empower", spell_name))];
            }
            allies
                .into_iter()
                .map(|uid| BattleCommand::ModifyStats {
                    target: caster_target,
                    uid,
                    attack: *attack,
                    defense: *defense,
                })
                .collect()
        }
        SpellEffect::Draw { count } => vec![BattleCommand::DrawCards {
            target: caster_target,
            count: *count,
        }],
        SpellEffect::Destroy => match target.filter(|uid| state.players[opponent].field_card(*uid).is_some()) {
            Some(uid) => vec![BattleCommand::DestroyCard {
                target: enemy_target,
                uid,
                by: None,
            }],
            None => vec![fizzle(format!("{} lost its target", spell_name))],
        },
        SpellEffect::Status { status, duration } => {
            let duration = if *duration == 0 {
                status.default_duration()
            } else {
                *duration
            };
            match target.and_then(|uid| state.field_card(uid)) {
                Some((owner, card)) => vec![BattleCommand::ApplyStatus {
                    target: PlayerTarget::from_index(owner),
                    uid: card.uid,
                    status: *status,
                    duration,
                }],
                None => vec![fizzle(format!("{} lost its target", spell_name))],
            }
        }
        SpellEffect::Revive { half_attack } => match state.players[caster].last_destroyed_creature() {
            Some(card) => vec![BattleCommand::ReviveCard {
                target: caster_target,
                uid: card.uid,
                half_attack: *half_attack,
            }],
            None => vec![fizzle(format!("{} found nothing to revive", spell_name))],
        },
    }
}

// Defense soaks spell damage; a creature whose defense is worn to zero is destroyed.
fn defense_damage(target: PlayerTarget, uid: Uid, defense: u32, amount: u32) -> BattleCommand {
    if amount >= defense {
        BattleCommand::DestroyCard {
            target,
            uid,
            by: None,
        }
    } else {
        BattleCommand::ModifyStats {
            target,
            uid,
            attack: 0,
            defense: -(amount.min(i32::MAX as u32) as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{creature, TestBattleBuilder};
    use pretty_assertions::assert_eq;
    use schema::{Element, StatusKind};

    fn two_enemies() -> BattleState {
        TestBattleBuilder::new()
            .p1_field(vec![creature(1, "Ally", Element::Fire, 1000, 1000)])
            .p2_field(vec![
                creature(10, "Frail", Element::Air, 1300, 400),
                creature(11, "Sturdy", Element::Earth, 800, 1500),
            ])
            .build()
    }

    #[test]
    fn test_single_target_spells_need_targets() {
        let state = two_enemies();
        let fireball = SpellEffect::Damage {
            amount: 800,
            target: DamageTarget::SingleEnemy,
        };

        assert_eq!(
            validate_target(&state, 0, Some(&fireball), None),
            Err(ActionError::TargetRequired)
        );
        assert_eq!(
            validate_target(&state, 0, Some(&fireball), Some(1)),
            Err(ActionError::InvalidTarget(1))
        );
        assert_eq!(validate_target(&state, 0, Some(&fireball), Some(10)), Ok(()));
        assert_eq!(
            validate_target(&state, 0, Some(&SpellEffect::Draw { count: 2 }), None),
            Ok(())
        );
    }

    #[test]
    fn test_area_damage_destroys_or_weakens() {
        let state = two_enemies();
        let wave = SpellEffect::Damage {
            amount: 500,
            target: DamageTarget::AllEnemies,
        };

        let commands = resolve_spell(&state, 0, "Tidal Wave", Some(&wave), None);

        assert_eq!(
            commands,
            vec![
                BattleCommand::DestroyCard {
                    target: PlayerTarget::Player2,
                    uid: 10,
                    by: None
                },
                BattleCommand::ModifyStats {
                    target: PlayerTarget::Player2,
                    uid: 11,
                    attack: 0,
                    defense: -500
                },
            ]
        );
    }

    #[test]
    fn test_heal_ally_is_redirected_to_owner() {
        let state = two_enemies();
        let salve = SpellEffect::Heal {
            amount: 500,
            target: HealTarget::Ally,
        };

        let commands = resolve_spell(&state, 0, "Spirit Salve", Some(&salve), Some(1));

        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[1],
            BattleCommand::HealPlayer {
                target: PlayerTarget::Player1,
                amount: 500
            }
        );
    }

    #[test]
    fn test_vanished_target_fizzles() {
        let state = two_enemies();
        let commands = resolve_spell(&state, 0, "Obliterate", Some(&SpellEffect::Destroy), Some(99));
        assert!(matches!(
            commands.as_slice(),
            [BattleCommand::EmitEvent(BattleEvent::EffectFizzled { .. })]
        ));
    }

    #[test]
    fn test_status_can_hit_either_side() {
        let state = two_enemies();
        let hex = SpellEffect::Status {
            status: StatusKind::Burn,
            duration: 3,
        };

        assert_eq!(validate_target(&state, 0, Some(&hex), Some(1)), Ok(()));
        assert_eq!(
            resolve_spell(&state, 0, "Searing Hex", Some(&hex), Some(11)),
            vec![BattleCommand::ApplyStatus {
                target: PlayerTarget::Player2,
                uid: 11,
                status: StatusKind::Burn,
                duration: 3
            }]
        );
    }

    #[test]
    fn test_missing_payload_is_ignored() {
        let state = two_enemies();
        let commands = resolve_spell(&state, 0, "Blank Scroll", None, None);
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            &commands[0],
            BattleCommand::EmitEvent(BattleEvent::EffectFizzled { reason }) if reason.contains("no effect")
        ));
    }
}
