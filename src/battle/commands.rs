use crate::battle::action_stack::BattleAction;
use crate::battle::state::{BattleEvent, BattleState, EventBus, Phase};
use crate::card::{ActiveStatus, Uid};
use schema::StatusKind;
use tracing::debug;

/// Player target for commands - provides type safety over raw indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerTarget {
    Player1,
    Player2,
}

impl PlayerTarget {
    pub fn to_index(self) -> usize {
        match self {
            PlayerTarget::Player1 => 0,
            PlayerTarget::Player2 => 1,
        }
    }

    pub fn opponent(self) -> PlayerTarget {
        match self {
            PlayerTarget::Player1 => PlayerTarget::Player2,
            PlayerTarget::Player2 => PlayerTarget::Player1,
        }
    }

    /// Any index other than 0 maps to Player2.
    pub fn from_index(index: usize) -> PlayerTarget {
        match index {
            0 => PlayerTarget::Player1,
            _ => PlayerTarget::Player2,
        }
    }
}

/// Atomic commands representing final state changes
#[derive(Debug, Clone, PartialEq)]
pub enum BattleCommand {
    // Direct state changes
    SetPhase(Phase),
    SetTurnOwner(PlayerTarget),
    IncrementTurnNumber,
    ClearAttackFlags,

    // Player HP
    DealDamage {
        target: PlayerTarget,
        amount: u32,
    },
    HealPlayer {
        target: PlayerTarget,
        amount: u32,
    },
    SetHp {
        target: PlayerTarget,
        hp: u32,
    },

    // Card movement
    DrawCards {
        target: PlayerTarget,
        count: u8,
    },
    SummonToField {
        target: PlayerTarget,
        uid: Uid,
    },
    SetTrap {
        target: PlayerTarget,
        uid: Uid,
    },
    /// Hand, field or trap zone to graveyard, without counting as a destruction
    SendToGraveyard {
        target: PlayerTarget,
        uid: Uid,
    },
    /// Field to graveyard as a destruction. `by` is the opposing creature responsible, if any.
    DestroyCard {
        target: PlayerTarget,
        uid: Uid,
        by: Option<Uid>,
    },
    ReviveCard {
        target: PlayerTarget,
        uid: Uid,
        half_attack: bool,
    },

    // Field creature modifications
    ApplyStatus {
        target: PlayerTarget,
        uid: Uid,
        status: StatusKind,
        duration: u8,
    },
    ReplaceStatuses {
        target: PlayerTarget,
        uid: Uid,
        statuses: Vec<ActiveStatus>,
    },
    ModifyStats {
        target: PlayerTarget,
        uid: Uid,
        attack: i32,
        defense: i32,
    },
    SetHasAttacked {
        target: PlayerTarget,
        uid: Uid,
        value: bool,
    },

    // Battle flow
    EmitEvent(BattleEvent),
    PushAction(BattleAction),
}

/// Error types for command execution
#[derive(Debug, PartialEq, Eq)]
pub enum ExecutionError {
    /// The referenced card is no longer where the command expects it
    MissingCard(Uid),
    FieldFull,
    TrapZoneFull,
}

/// A creature that left the field through destruction during a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destruction {
    pub owner: usize,
    pub uid: Uid,
    pub by: Option<Uid>,
}

/// What a batch did that other processors react to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReport {
    pub destroyed: Vec<Destruction>,
    pub damaged: Vec<(usize, u32)>,
}

/// Push an event onto the bus and into the state's log.
pub fn emit(state: &mut BattleState, bus: &mut EventBus, event: BattleEvent) {
    state.record_event(&event);
    bus.push(event);
}

/// Execute a batch of commands in order.
/// A command whose card has gone missing is skipped with a log line; the rest still run.
pub fn execute_command_batch(
    commands: Vec<BattleCommand>,
    state: &mut BattleState,
    bus: &mut EventBus,
) -> Result<CommandReport, ExecutionError> {
    let mut report = CommandReport::default();
    for command in commands {
        match execute_command(command, state, bus, &mut report) {
            Ok(()) => {}
            Err(ExecutionError::MissingCard(uid)) => {
                debug!(uid, "command target missing, skipped");
                emit(
                    state,
                    bus,
                    BattleEvent::EffectFizzled {
                        reason: format!("card #{} is no longer in play", uid),
                    },
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Helper function to execute commands that operate on one field creature
fn execute_field_command<F>(
    target: PlayerTarget,
    uid: Uid,
    state: &mut BattleState,
    bus: &mut EventBus,
    operation: F,
) -> Result<(), ExecutionError>
where
    F: FnOnce(&mut crate::card::CardInst, usize) -> Option<BattleEvent>,
{
    let player_index = target.to_index();
    let card = state.players[player_index]
        .field_card_mut(uid)
        .ok_or(ExecutionError::MissingCard(uid))?;
    if let Some(event) = operation(card, player_index) {
        emit(state, bus, event);
    }
    Ok(())
}

/// Helper function specifically for DealDamage with stats and event emission
fn execute_deal_damage_command(
    target: PlayerTarget,
    amount: u32,
    state: &mut BattleState,
    bus: &mut EventBus,
    report: &mut CommandReport,
) {
    let player_index = target.to_index();
    let taken = state.players[player_index].take_damage(amount);
    if taken == 0 {
        return;
    }
    state.stats.record_damage(player_index, taken);
    report.damaged.push((player_index, taken));

    let remaining_hp = state.players[player_index].hp;
    emit(
        state,
        bus,
        BattleEvent::PlayerDamaged {
            player_index,
            amount: taken,
            remaining_hp,
        },
    );
}

fn execute_command(
    command: BattleCommand,
    state: &mut BattleState,
    bus: &mut EventBus,
    report: &mut CommandReport,
) -> Result<(), ExecutionError> {
    match command {
        BattleCommand::EmitEvent(event) => {
            emit(state, bus, event);
            Ok(())
        }
        BattleCommand::SetPhase(phase) => {
            state.phase = phase;
            let player_index = state.turn_owner;
            emit(state, bus, BattleEvent::PhaseChanged { player_index, phase });
            Ok(())
        }
        BattleCommand::SetTurnOwner(target) => {
            state.turn_owner = target.to_index();
            Ok(())
        }
        BattleCommand::IncrementTurnNumber => {
            state.turn_number += 1;
            Ok(())
        }
        BattleCommand::ClearAttackFlags => {
            for player in state.players.iter_mut() {
                for card in player.field.iter_mut() {
                    card.has_attacked = false;
                }
            }
            Ok(())
        }
        BattleCommand::DealDamage { target, amount } => {
            execute_deal_damage_command(target, amount, state, bus, report);
            Ok(())
        }
        BattleCommand::HealPlayer { target, amount } => {
            let player_index = target.to_index();
            let healed = state.players[player_index].heal(amount);
            let new_hp = state.players[player_index].hp;
            emit(
                state,
                bus,
                BattleEvent::PlayerHealed {
                    player_index,
                    amount: healed,
                    new_hp,
                },
            );
            Ok(())
        }
        BattleCommand::SetHp { target, hp } => {
            let player = &mut state.players[target.to_index()];
            player.hp = hp.min(crate::player::MAX_HP);
            Ok(())
        }
        BattleCommand::DrawCards { target, count } => {
            let player_index = target.to_index();
            for _ in 0..count {
                match state.players[player_index].draw() {
                    Some(uid) => emit(state, bus, BattleEvent::CardDrawn { player_index, uid }),
                    None => {
                        emit(state, bus, BattleEvent::DeckEmpty { player_index });
                        break;
                    }
                }
            }
            Ok(())
        }
        BattleCommand::SummonToField { target, uid } => {
            let player_index = target.to_index();
            let player = &mut state.players[player_index];
            if !player.has_field_space() {
                return Err(ExecutionError::FieldFull);
            }
            let mut card = player
                .take_from_hand(uid)
                .ok_or(ExecutionError::MissingCard(uid))?;
            card.has_attacked = false;
            let name = card.name().to_string();
            player.field.push(card);
            state.stats.record_summon(player_index);
            emit(
                state,
                bus,
                BattleEvent::CreatureSummoned {
                    player_index,
                    uid,
                    name,
                },
            );
            Ok(())
        }
        BattleCommand::SetTrap { target, uid } => {
            let player_index = target.to_index();
            let player = &mut state.players[player_index];
            if !player.has_trap_space() {
                return Err(ExecutionError::TrapZoneFull);
            }
            let mut card = player
                .take_from_hand(uid)
                .ok_or(ExecutionError::MissingCard(uid))?;
            card.is_set = true;
            player.trap_zone.push(card);
            emit(state, bus, BattleEvent::TrapSet { player_index, uid });
            Ok(())
        }
        BattleCommand::SendToGraveyard { target, uid } => {
            let player_index = target.to_index();
            let card = state.players[player_index]
                .take_from_play(uid)
                .ok_or(ExecutionError::MissingCard(uid))?;
            let timestamp = state.tick_clock();
            state.players[player_index].send_to_graveyard(card, timestamp);
            emit(state, bus, BattleEvent::CardDiscarded { player_index, uid });
            Ok(())
        }
        BattleCommand::DestroyCard { target, uid, by } => {
            let player_index = target.to_index();
            let card = state.players[player_index]
                .take_from_field(uid)
                .ok_or(ExecutionError::MissingCard(uid))?;
            let name = card.name().to_string();
            let timestamp = state.tick_clock();
            state.players[player_index].send_to_graveyard(card, timestamp);
            state.stats.record_destroyed(player_index);
            report.destroyed.push(Destruction {
                owner: player_index,
                uid,
                by,
            });
            emit(
                state,
                bus,
                BattleEvent::CreatureDestroyed {
                    player_index,
                    uid,
                    name,
                },
            );
            Ok(())
        }
        BattleCommand::ReviveCard {
            target,
            uid,
            half_attack,
        } => {
            let player_index = target.to_index();
            let player = &mut state.players[player_index];
            let mut card = player
                .take_from_graveyard(uid)
                .ok_or(ExecutionError::MissingCard(uid))?;
            card.reset_to_template();
            if half_attack {
                card.attack /= 2;
            }
            let name = card.name().to_string();
            player.hand.push(card);
            emit(
                state,
                bus,
                BattleEvent::CardRevived {
                    player_index,
                    uid,
                    name,
                },
            );
            Ok(())
        }
        BattleCommand::ApplyStatus {
            target,
            uid,
            status,
            duration,
        } => execute_field_command(target, uid, state, bus, |card, player_index| {
            card.apply_status(status, duration);
            Some(BattleEvent::StatusApplied {
                player_index,
                uid,
                name: card.name().to_string(),
                status,
                duration,
            })
        }),
        BattleCommand::ReplaceStatuses {
            target,
            uid,
            statuses,
        } => execute_field_command(target, uid, state, bus, |card, _| {
            card.statuses = statuses;
            None
        }),
        BattleCommand::ModifyStats {
            target,
            uid,
            attack,
            defense,
        } => execute_field_command(target, uid, state, bus, |card, player_index| {
            card.modify_stats(attack, defense);
            Some(BattleEvent::StatsModified {
                player_index,
                uid,
                name: card.name().to_string(),
                attack_delta: attack,
                defense_delta: defense,
            })
        }),
        BattleCommand::SetHasAttacked { target, uid, value } => {
            execute_field_command(target, uid, state, bus, |card, _| {
                card.has_attacked = value;
                None
            })
        }
        BattleCommand::PushAction(action) => {
            state.pending.push_front(action);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{creature, TestBattleBuilder};
    use pretty_assertions::assert_eq;
    use schema::Element;

    #[test]
    fn test_player_target_conversion() {
        assert_eq!(PlayerTarget::Player1.to_index(), 0);
        assert_eq!(PlayerTarget::Player2.to_index(), 1);
        assert_eq!(PlayerTarget::from_index(0), PlayerTarget::Player1);
        assert_eq!(PlayerTarget::from_index(1), PlayerTarget::Player2);
        assert_eq!(PlayerTarget::Player1.opponent(), PlayerTarget::Player2);
        assert_eq!(PlayerTarget::Player2.opponent(), PlayerTarget::Player1);
    }

    #[test]
    fn test_deal_damage_records_stats_and_floors_hp() {
        let mut state = TestBattleBuilder::new().p2_hp(500).build();
        let mut bus = EventBus::new();

        let report = execute_command_batch(
            vec![BattleCommand::DealDamage {
                target: PlayerTarget::Player2,
                amount: 800,
            }],
            &mut state,
            &mut bus,
        )
        .expect("batch runs");

        assert_eq!(state.players[1].hp, 0);
        assert_eq!(report.damaged, vec![(1, 500)]);
        assert_eq!(state.stats.damage_dealt, [500, 0]);
        assert_eq!(
            bus.events(),
            &[BattleEvent::PlayerDamaged {
                player_index: 1,
                amount: 500,
                remaining_hp: 0
            }]
        );
    }

    #[test]
    fn test_missing_card_fizzles_and_batch_continues() {
        let mut state = TestBattleBuilder::new()
            .p2_field(vec![creature(20, "Golem", Element::Earth, 1000, 1000)])
            .build();
        let mut bus = EventBus::new();

        let report = execute_command_batch(
            vec![
                BattleCommand::ModifyStats {
                    target: PlayerTarget::Player2,
                    uid: 999,
                    attack: -100,
                    defense: 0,
                },
                BattleCommand::DestroyCard {
                    target: PlayerTarget::Player2,
                    uid: 20,
                    by: None,
                },
            ],
            &mut state,
            &mut bus,
        )
        .expect("missing cards are not fatal");

        assert!(matches!(bus.events()[0], BattleEvent::EffectFizzled { .. }));
        assert_eq!(report.destroyed.len(), 1);
        assert!(state.players[1].field.is_empty());
        assert_eq!(state.players[1].graveyard[0].destroyed_at, Some(state.clock - 1));
    }

    #[test]
    fn test_summon_into_full_field_is_an_error() {
        let mut state = TestBattleBuilder::new()
            .p1_field(vec![
                creature(1, "A", Element::Fire, 100, 100),
                creature(2, "B", Element::Fire, 100, 100),
                creature(3, "C", Element::Fire, 100, 100),
            ])
            .p1_hand(vec![creature(4, "D", Element::Fire, 100, 100)])
            .build();
        let mut bus = EventBus::new();

        let result = execute_command_batch(
            vec![BattleCommand::SummonToField {
                target: PlayerTarget::Player1,
                uid: 4,
            }],
            &mut state,
            &mut bus,
        );

        assert_eq!(result, Err(ExecutionError::FieldFull));
        assert_eq!(state.players[0].hand.len(), 1);
    }

    #[test]
    fn test_revive_resets_and_halves_attack() {
        let mut state = TestBattleBuilder::new().build();
        let mut card = creature(7, "Phoenix", Element::Fire, 2300, 1800);
        card.modify_stats(-1000, -1000);
        state.players[0].send_to_graveyard(card, 3);
        let mut bus = EventBus::new();

        execute_command_batch(
            vec![BattleCommand::ReviveCard {
                target: PlayerTarget::Player1,
                uid: 7,
                half_attack: true,
            }],
            &mut state,
            &mut bus,
        )
        .expect("batch runs");

        let revived = state.players[0].hand_card(7).expect("back in hand");
        assert_eq!(revived.attack, 1150);
        assert_eq!(revived.defense, 1800);
        assert_eq!(revived.destroyed_at, None);
    }
}
