use crate::battle::abilities;
use crate::battle::action_stack::{ActionStack, BattleAction};
use crate::battle::calculators::{direct_attack_damage, resolve_combat};
use crate::battle::commands::{emit, execute_command_batch, BattleCommand, PlayerTarget};
use crate::battle::conditions::{self, CONFUSE_SELF_HIT_CHANCE};
use crate::battle::effects::TriggerEvent;
use crate::battle::spells::{self, TargetRequirement};
use crate::battle::state::{BattleEvent, BattleState, DefeatReason, EventBus, GameOutcome, Phase, TurnRng};
use crate::battle::summon;
use crate::battle::traps::{self, TrapActivation};
use crate::card::Uid;
use crate::errors::ActionError;
use crate::player::PlayerAction;
use schema::{CardKind, StatusKind};
use tracing::{debug, info, warn};

/// Nesting limit for effects that trigger further effects.
pub const MAX_TRIGGER_DEPTH: u8 = 4;

/// One input to the battle reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineInput {
    /// A human action or an opponent decision
    Action {
        player_index: usize,
        action: PlayerAction,
    },
    /// Run the next pending resolution step
    Advance,
}

/// Reducer entry point: apply one input and return the events it produced.
/// Rejected actions leave the state untouched apart from a log line.
pub fn apply(state: &mut BattleState, input: EngineInput, rng: &mut TurnRng) -> EventBus {
    match input {
        EngineInput::Action {
            player_index,
            action,
        } => {
            let mut bus = EventBus::new();
            // The rejection is already on the bus
            let _ = queue_action(state, player_index, action, &mut bus);
            bus
        }
        EngineInput::Advance => advance(state, rng),
    }
}

/// Validate an action and queue its first resolution step.
pub fn submit_action(
    state: &mut BattleState,
    player_index: usize,
    action: PlayerAction,
) -> Result<EventBus, ActionError> {
    let mut bus = EventBus::new();
    queue_action(state, player_index, action, &mut bus)?;
    Ok(bus)
}

fn queue_action(
    state: &mut BattleState,
    player_index: usize,
    action: PlayerAction,
    bus: &mut EventBus,
) -> Result<(), ActionError> {
    if let Err(error) = validate_action(state, player_index, &action) {
        reject(state, bus, player_index, &error);
        return Err(error);
    }

    let step = match action {
        PlayerAction::Wait if state.phase == Phase::Main => BattleAction::EnterBattle { player_index },
        PlayerAction::Wait => BattleAction::EndTurn { player_index },
        ref other => match ActionStack::from_player_action(player_index, other) {
            Some(step) => step,
            None => return Ok(()),
        },
    };
    debug!(player_index, %action, "action queued");
    state.pending.push_back(step);
    Ok(())
}

fn reject(state: &mut BattleState, bus: &mut EventBus, player_index: usize, error: &ActionError) {
    warn!(player_index, %error, "action rejected");
    emit(
        state,
        bus,
        BattleEvent::ActionRejected {
            player_index,
            reason: error.to_string(),
        },
    );
}

/// Check an action against the current state without changing anything.
pub fn validate_action(
    state: &BattleState,
    player_index: usize,
    action: &PlayerAction,
) -> Result<(), ActionError> {
    if state.is_finished() {
        return Err(ActionError::GameFinished);
    }
    if state.is_busy() {
        return Err(ActionError::Busy);
    }
    if player_index >= state.players.len() {
        return Err(ActionError::InvalidPlayerIndex(player_index));
    }
    if player_index != state.turn_owner {
        return Err(ActionError::NotYourTurn(player_index));
    }

    let player = &state.players[player_index];
    let require_phase = |phase: Phase| {
        if state.phase == phase {
            Ok(())
        } else {
            Err(ActionError::WrongPhase { actual: state.phase })
        }
    };

    match action {
        PlayerAction::Summon {
            card_id,
            sacrifices,
        } => {
            require_phase(Phase::Main)?;
            summon::validate_summon(player, *card_id, sacrifices)
        }
        PlayerAction::UseSpell { card_id, target_id } => {
            require_phase(Phase::Main)?;
            let card = player
                .hand_card(*card_id)
                .ok_or(ActionError::CardNotInHand(*card_id))?;
            if card.kind() != CardKind::Spell {
                return Err(ActionError::WrongCardKind {
                    uid: *card_id,
                    expected: CardKind::Spell,
                });
            }
            spells::validate_target(state, player_index, card.spell_effect(), *target_id)
        }
        PlayerAction::SetTrap { card_id } => {
            require_phase(Phase::Main)?;
            let card = player
                .hand_card(*card_id)
                .ok_or(ActionError::CardNotInHand(*card_id))?;
            if card.kind() != CardKind::Trap {
                return Err(ActionError::WrongCardKind {
                    uid: *card_id,
                    expected: CardKind::Trap,
                });
            }
            if !player.has_trap_space() {
                return Err(ActionError::TrapZoneFull);
            }
            Ok(())
        }
        PlayerAction::Attack { card_id, target_id } => {
            if state.turn_number == 1 && player_index == state.first_player {
                return Err(ActionError::FirstTurnNoAttack);
            }
            require_phase(Phase::Battle)?;
            let card = player
                .field_card(*card_id)
                .ok_or(ActionError::CardNotOnField(*card_id))?;
            if card.has_attacked {
                return Err(ActionError::AlreadyAttacked(*card_id));
            }

            let enemy = &state.players[1 - player_index];
            match target_id {
                None if enemy.field.is_empty() => Ok(()),
                None => Err(ActionError::DirectAttackBlocked),
                Some(target) if enemy.field_card(*target).is_some() => Ok(()),
                Some(target) => Err(ActionError::InvalidTarget(*target)),
            }
        }
        PlayerAction::GoToBattle => require_phase(Phase::Main),
        PlayerAction::EndTurn | PlayerAction::Wait => match state.phase {
            Phase::Main | Phase::Battle => Ok(()),
            actual => Err(ActionError::WrongPhase { actual }),
        },
    }
}

/// Every action `player_index` could legally submit right now.
pub fn get_valid_actions(state: &BattleState, player_index: usize) -> Vec<PlayerAction> {
    if player_index >= state.players.len()
        || state.is_finished()
        || state.is_busy()
        || player_index != state.turn_owner
    {
        return Vec::new();
    }

    let player = &state.players[player_index];
    let enemy = &state.players[1 - player_index];
    let mut candidates = Vec::new();

    match state.phase {
        Phase::Main => {
            for card in &player.hand {
                match card.kind() {
                    CardKind::Creature => {
                        let pool: Vec<Uid> = player
                            .hand
                            .iter()
                            .chain(player.field.iter())
                            .map(|c| c.uid)
                            .filter(|&uid| uid != card.uid)
                            .collect();
                        for sacrifices in sacrifice_sets(&pool, card.sacrifice_required()) {
                            candidates.push(PlayerAction::Summon {
                                card_id: card.uid,
                                sacrifices,
                            });
                        }
                    }
                    CardKind::Spell => {
                        let targets: Vec<Option<Uid>> =
                            match spells::target_requirement(card.spell_effect()) {
                                TargetRequirement::None => vec![None],
                                TargetRequirement::EnemyCreature => {
                                    enemy.field.iter().map(|c| Some(c.uid)).collect()
                                }
                                TargetRequirement::AllyCreature => {
                                    player.field.iter().map(|c| Some(c.uid)).collect()
                                }
                                TargetRequirement::AnyCreature => enemy
                                    .field
                                    .iter()
                                    .chain(player.field.iter())
                                    .map(|c| Some(c.uid))
                                    .collect(),
                            };
                        for target_id in targets {
                            candidates.push(PlayerAction::UseSpell {
                                card_id: card.uid,
                                target_id,
                            });
                        }
                    }
                    CardKind::Trap => candidates.push(PlayerAction::SetTrap { card_id: card.uid }),
                }
            }
            candidates.push(PlayerAction::GoToBattle);
            candidates.push(PlayerAction::EndTurn);
        }
        Phase::Battle => {
            for card in &player.field {
                if enemy.field.is_empty() {
                    candidates.push(PlayerAction::Attack {
                        card_id: card.uid,
                        target_id: None,
                    });
                }
                for target in &enemy.field {
                    candidates.push(PlayerAction::Attack {
                        card_id: card.uid,
                        target_id: Some(target.uid),
                    });
                }
            }
            candidates.push(PlayerAction::EndTurn);
        }
        Phase::Draw | Phase::End => {}
    }

    candidates
        .into_iter()
        .filter(|action| validate_action(state, player_index, action).is_ok())
        .collect()
}

fn sacrifice_sets(pool: &[Uid], required: usize) -> Vec<Vec<Uid>> {
    match required {
        0 => vec![Vec::new()],
        1 => pool.iter().map(|&uid| vec![uid]).collect(),
        _ => {
            let mut sets = Vec::new();
            for (i, &first) in pool.iter().enumerate() {
                for rest in sacrifice_sets(&pool[i + 1..], required - 1) {
                    let mut set = vec![first];
                    set.extend(rest);
                    sets.push(set);
                }
            }
            sets
        }
    }
}

/// Execute exactly one pending resolution step.
pub fn advance(state: &mut BattleState, rng: &mut TurnRng) -> EventBus {
    let mut bus = EventBus::new();
    if state.is_finished() {
        state.pending.clear();
        return bus;
    }
    let Some(action) = state.pending.pop_front() else {
        return bus;
    };

    debug!(?action, turn = state.turn_number, phase = %state.phase, "resolving step");
    execute_battle_action(action, state, &mut bus, rng);

    let violations = state.check_invariants();
    if !violations.is_empty() {
        warn!(?violations, "battle state invariants violated");
    }
    bus
}

/// Drain the pending queue synchronously.
pub fn resolve_pending(state: &mut BattleState, rng: &mut TurnRng) -> EventBus {
    let mut bus = EventBus::new();
    while state.is_busy() && !state.is_finished() {
        bus.extend(advance(state, rng));
    }
    bus
}

fn execute_battle_action(action: BattleAction, state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) {
    match action {
        BattleAction::StartTurn { player_index } => execute_start_turn(player_index, state, bus, rng),
        BattleAction::Summon {
            player_index,
            card_id,
            sacrifices,
        } => {
            if let Err(error) = summon::validate_summon(&state.players[player_index], card_id, &sacrifices) {
                reject(state, bus, player_index, &error);
                return;
            }
            let commands = summon::summon_commands(&state.players[player_index], player_index, card_id, &sacrifices);
            apply_commands(state, bus, rng, commands, 0);
            state.pending.push_front(BattleAction::SummonTriggers {
                player_index,
                card_id,
            });
        }
        BattleAction::SummonTriggers {
            player_index,
            card_id,
        } => {
            let event = TriggerEvent::Summoned {
                player_index,
                uid: card_id,
            };
            dispatch_trigger(state, bus, rng, event, 0);
            check_defeat(state, bus, DefeatReason::HpDepleted);
        }
        BattleAction::CastSpell {
            player_index,
            card_id,
            target_id,
        } => execute_cast_spell(player_index, card_id, target_id, state, bus, rng),
        BattleAction::SetTrap {
            player_index,
            card_id,
        } => {
            let commands = vec![BattleCommand::SetTrap {
                target: PlayerTarget::from_index(player_index),
                uid: card_id,
            }];
            apply_commands(state, bus, rng, commands, 0);
        }
        BattleAction::EnterBattle { player_index } => {
            apply_commands(state, bus, rng, vec![BattleCommand::SetPhase(Phase::Battle)], 0);
            if state.turn_number == 1 && player_index == state.first_player {
                emit(state, bus, BattleEvent::FirstTurnNoAttack { player_index });
                state.pending.push_front(BattleAction::EndTurn { player_index });
            }
        }
        BattleAction::EndTurn { player_index } => execute_end_turn(player_index, state, bus, rng),
        BattleAction::DeclareAttack {
            player_index,
            attacker_id,
            target_id,
        } => execute_declare_attack(player_index, attacker_id, target_id, state, bus, rng),
        BattleAction::ResolveAttack {
            player_index,
            attacker_id,
            target_id,
        } => execute_resolve_attack(player_index, attacker_id, target_id, state, bus, rng),
    }
}

/// DRAW phase: status ticks, turn-start abilities, then the draw.
fn execute_start_turn(player_index: usize, state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) {
    let turn_number = state.turn_number;
    apply_commands(state, bus, rng, vec![BattleCommand::SetPhase(Phase::Draw)], 0);
    emit(
        state,
        bus,
        BattleEvent::TurnStarted {
            player_index,
            turn_number,
        },
    );

    let report = conditions::process_turn_start(&state.players[player_index], player_index, rng);
    apply_commands(state, bus, rng, conditions::tick_commands(report), 0);
    if check_defeat(state, bus, DefeatReason::StatusDamage) {
        return;
    }

    dispatch_trigger(state, bus, rng, TriggerEvent::TurnStarted { player_index }, 0);
    if check_defeat(state, bus, DefeatReason::HpDepleted) {
        return;
    }

    if state.players[player_index].deck.is_empty() {
        emit(state, bus, BattleEvent::DeckEmpty { player_index });
        if state.config.deck_out_enabled {
            finish_game(state, bus, 1 - player_index, DefeatReason::DeckOut);
            return;
        }
    } else {
        let draw = BattleCommand::DrawCards {
            target: PlayerTarget::from_index(player_index),
            count: 1,
        };
        apply_commands(state, bus, rng, vec![draw], 0);
    }

    apply_commands(state, bus, rng, vec![BattleCommand::SetPhase(Phase::Main)], 0);
}

fn execute_end_turn(player_index: usize, state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng) {
    apply_commands(state, bus, rng, vec![BattleCommand::SetPhase(Phase::End)], 0);
    dispatch_trigger(state, bus, rng, TriggerEvent::TurnEnded { player_index }, 0);
    if check_defeat(state, bus, DefeatReason::HpDepleted) {
        return;
    }

    let next = 1 - player_index;
    let commands = vec![
        BattleCommand::ClearAttackFlags,
        BattleCommand::EmitEvent(BattleEvent::TurnEnded { player_index }),
        BattleCommand::SetTurnOwner(PlayerTarget::from_index(next)),
        BattleCommand::IncrementTurnNumber,
        BattleCommand::PushAction(BattleAction::StartTurn { player_index: next }),
    ];
    apply_commands(state, bus, rng, commands, 0);
}

fn execute_cast_spell(
    player_index: usize,
    card_id: Uid,
    target_id: Option<Uid>,
    state: &mut BattleState,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    let Some(card) = state.players[player_index].hand_card(card_id).cloned() else {
        reject(state, bus, player_index, &ActionError::CardNotInHand(card_id));
        return;
    };

    let cast = vec![
        BattleCommand::SendToGraveyard {
            target: PlayerTarget::from_index(player_index),
            uid: card_id,
        },
        BattleCommand::EmitEvent(BattleEvent::SpellCast {
            player_index,
            uid: card_id,
            name: card.name().to_string(),
        }),
    ];
    apply_commands(state, bus, rng, cast, 0);
    state.stats.record_spell(player_index);

    let commands = spells::resolve_spell(state, player_index, card.name(), card.spell_effect(), target_id);
    apply_commands(state, bus, rng, commands, 0);
    check_defeat(state, bus, DefeatReason::HpDepleted);
}

/// Confusion, the defender's traps and ON_ATTACK abilities. Queues the strike itself.
fn execute_declare_attack(
    player_index: usize,
    attacker_id: Uid,
    target_id: Option<Uid>,
    state: &mut BattleState,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    let opponent = 1 - player_index;
    let Some(attacker) = state.players[player_index].field_card(attacker_id).cloned() else {
        fizzle(state, bus, "the attacker is no longer on the field");
        return;
    };
    let attacker_name = attacker.name().to_string();
    let target_name = target_id
        .and_then(|uid| state.players[opponent].field_card(uid))
        .map(|card| card.name().to_string());

    let declare = vec![
        BattleCommand::EmitEvent(BattleEvent::AttackDeclared {
            player_index,
            attacker: attacker_name.clone(),
            target: target_name,
        }),
        BattleCommand::SetHasAttacked {
            target: PlayerTarget::from_index(player_index),
            uid: attacker_id,
            value: true,
        },
    ];
    apply_commands(state, bus, rng, declare, 0);

    if attacker.has_status(StatusKind::Confuse) && rng.roll(CONFUSE_SELF_HIT_CHANCE, "confusion self-hit") {
        let own = abilities::combatant(state, player_index, &attacker, None);
        let damage = direct_attack_damage(&own) / 2;
        emit(
            state,
            bus,
            BattleEvent::AttackConfused {
                player_index,
                attacker: attacker_name,
                damage,
            },
        );
        let hit = BattleCommand::DealDamage {
            target: PlayerTarget::from_index(player_index),
            amount: damage,
        };
        apply_commands(state, bus, rng, vec![hit], 0);
        check_defeat(state, bus, DefeatReason::HpDepleted);
        return;
    }

    let event = TriggerEvent::Attacked {
        player_index,
        attacker: attacker_id,
        defender: target_id,
    };

    if let Some(activation) = traps::scan(state, &event) {
        let negated = spring_trap(state, bus, rng, activation, 0);
        if check_defeat(state, bus, DefeatReason::HpDepleted) {
            return;
        }
        if negated {
            emit(
                state,
                bus,
                BattleEvent::AttackNegated {
                    player_index,
                    attacker: attacker_name,
                },
            );
            return;
        }
        if state.players[player_index].field_card(attacker_id).is_none() {
            return;
        }
    }

    fire_abilities(state, bus, rng, &event, 0);
    if check_defeat(state, bus, DefeatReason::HpDepleted) {
        return;
    }

    state.pending.push_front(BattleAction::ResolveAttack {
        player_index,
        attacker_id,
        target_id,
    });
}

/// Evasion, then the strike itself and its HP damage.
fn execute_resolve_attack(
    player_index: usize,
    attacker_id: Uid,
    target_id: Option<Uid>,
    state: &mut BattleState,
    bus: &mut EventBus,
    rng: &mut TurnRng,
) {
    let opponent = 1 - player_index;
    let Some(attacker) = state.players[player_index].field_card(attacker_id).cloned() else {
        fizzle(state, bus, "the attacker is no longer on the field");
        return;
    };

    let Some(defender_id) = target_id else {
        let strike = abilities::combatant(state, player_index, &attacker, None);
        damage_player(state, bus, rng, opponent, direct_attack_damage(&strike), Some(true));
        check_defeat(state, bus, DefeatReason::HpDepleted);
        return;
    };

    let Some(defender) = state.players[opponent].field_card(defender_id).cloned() else {
        fizzle(state, bus, "the target is no longer on the field");
        return;
    };

    let evasion = abilities::passive_modifiers(state, opponent, &defender, Some(&attacker)).evasion;
    if rng.roll(evasion, "evasion") {
        emit(
            state,
            bus,
            BattleEvent::AttackEvaded {
                player_index: opponent,
                defender: defender.name().to_string(),
            },
        );
        return;
    }

    let strike = abilities::combatant(state, player_index, &attacker, Some(&defender));
    let guard = abilities::combatant(state, opponent, &defender, Some(&attacker));
    let outcome = resolve_combat(&strike, &guard);

    let mut commands = vec![
        BattleCommand::EmitEvent(BattleEvent::AttackTypeEffectiveness {
            multiplier: outcome.multiplier,
        }),
        BattleCommand::EmitEvent(BattleEvent::CombatResolved {
            attacker: attacker.name().to_string(),
            defender: defender.name().to_string(),
            effective_attack: outcome.effective_attack,
            effective_defense: outcome.effective_defense,
        }),
    ];
    if outcome.defender_destroyed {
        commands.push(BattleCommand::DestroyCard {
            target: PlayerTarget::from_index(opponent),
            uid: defender_id,
            by: Some(attacker_id),
        });
    }
    if outcome.attacker_destroyed {
        commands.push(BattleCommand::DestroyCard {
            target: PlayerTarget::from_index(player_index),
            uid: attacker_id,
            by: Some(defender_id),
        });
    }
    apply_commands(state, bus, rng, commands, 0);

    if outcome.damage_to_defender_owner > 0 {
        damage_player(state, bus, rng, opponent, outcome.damage_to_defender_owner, Some(false));
    }
    if outcome.damage_to_attacker_owner > 0 {
        damage_player(state, bus, rng, player_index, outcome.damage_to_attacker_owner, None);
    }
    check_defeat(state, bus, DefeatReason::HpDepleted);
}

/// Apply attack damage to a player. `survive` names the kind of attack (`Some(true)` for
/// direct) when a survive-at-1 trap of the victim may intercept lethal damage.
fn damage_player(
    state: &mut BattleState,
    bus: &mut EventBus,
    rng: &mut TurnRng,
    victim: usize,
    amount: u32,
    survive: Option<bool>,
) {
    let hp = state.players[victim].hp;
    let survive_trap = survive
        .filter(|_| amount >= hp)
        .and_then(|direct| traps::find_survive_trap(state, victim, direct));

    let Some((trap_uid, trap_name)) = survive_trap else {
        let hit = BattleCommand::DealDamage {
            target: PlayerTarget::from_index(victim),
            amount,
        };
        apply_commands(state, bus, rng, vec![hit], 0);
        return;
    };

    let target = PlayerTarget::from_index(victim);
    let commands = vec![
        BattleCommand::SendToGraveyard { target, uid: trap_uid },
        BattleCommand::EmitEvent(BattleEvent::TrapActivated {
            player_index: victim,
            trap: trap_name,
        }),
        BattleCommand::SetHp { target, hp: 1 },
    ];
    apply_commands(state, bus, rng, commands, 0);
    state.stats.record_trap(victim);

    let taken = hp.saturating_sub(1);
    if taken > 0 {
        state.stats.record_damage(victim, taken);
        emit(
            state,
            bus,
            BattleEvent::PlayerDamaged {
                player_index: victim,
                amount: taken,
                remaining_hp: 1,
            },
        );
    }
    emit(state, bus, BattleEvent::SurvivedAtOne { player_index: victim });
    if taken > 0 {
        let event = TriggerEvent::Damaged {
            player_index: victim,
            amount: taken,
        };
        dispatch_trigger(state, bus, rng, event, 1);
    }
}

fn fizzle(state: &mut BattleState, bus: &mut EventBus, reason: &str) {
    emit(
        state,
        bus,
        BattleEvent::EffectFizzled {
            reason: reason.to_string(),
        },
    );
}

/// Execute a batch, then let abilities and traps react to what it destroyed and damaged.
fn apply_commands(
    state: &mut BattleState,
    bus: &mut EventBus,
    rng: &mut TurnRng,
    commands: Vec<BattleCommand>,
    depth: u8,
) {
    if commands.is_empty() {
        return;
    }
    let report = match execute_command_batch(commands, state, bus) {
        Ok(report) => report,
        Err(error) => {
            warn!(?error, "command batch aborted");
            return;
        }
    };

    // A defeated player ends the game before anything else reacts
    if state.is_finished() || state.players.iter().any(|p| p.is_defeated()) {
        return;
    }

    for destruction in report.destroyed {
        let event = TriggerEvent::Destroyed {
            player_index: destruction.owner,
            uid: destruction.uid,
            by: destruction.by,
        };
        dispatch_trigger(state, bus, rng, event, depth + 1);
    }
    for (player_index, amount) in report.damaged {
        dispatch_trigger(state, bus, rng, TriggerEvent::Damaged { player_index, amount }, depth + 1);
    }
}

/// Abilities first, then at most one trap of the opposing player.
fn dispatch_trigger(state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng, event: TriggerEvent, depth: u8) {
    if depth > MAX_TRIGGER_DEPTH {
        debug!(?event, "trigger depth exceeded, ignored");
        return;
    }
    fire_abilities(state, bus, rng, &event, depth);
    if state.is_finished() || state.players.iter().any(|p| p.is_defeated()) {
        return;
    }
    if let Some(activation) = traps::scan(state, &event) {
        spring_trap(state, bus, rng, activation, depth);
    }
}

fn fire_abilities(state: &mut BattleState, bus: &mut EventBus, rng: &mut TurnRng, event: &TriggerEvent, depth: u8) {
    for activation in abilities::evaluate(state, event) {
        if state.is_finished() || state.players.iter().any(|p| p.is_defeated()) {
            return;
        }
        debug!(card = %activation.card_name, ability = %activation.ability_name, "ability triggered");
        emit(
            state,
            bus,
            BattleEvent::AbilityTriggered {
                player_index: activation.owner,
                card: activation.card_name,
                ability: activation.ability_name,
            },
        );
        let commands = activation
            .delta
            .into_commands(activation.owner, Some(activation.source_uid), state);
        apply_commands(state, bus, rng, commands, depth);
    }
}

/// Move the trap to the graveyard and apply its effect. Returns whether it negates an attack.
fn spring_trap(
    state: &mut BattleState,
    bus: &mut EventBus,
    rng: &mut TurnRng,
    activation: TrapActivation,
    depth: u8,
) -> bool {
    let TrapActivation {
        owner,
        trap_uid,
        trap_name,
        delta,
    } = activation;
    debug!(owner, trap = %trap_name, "trap activated");

    let reveal = vec![
        BattleCommand::SendToGraveyard {
            target: PlayerTarget::from_index(owner),
            uid: trap_uid,
        },
        BattleCommand::EmitEvent(BattleEvent::TrapActivated {
            player_index: owner,
            trap: trap_name,
        }),
    ];
    apply_commands(state, bus, rng, reveal, depth);
    state.stats.record_trap(owner);

    let negate = delta.negate_attack;
    let commands = delta.into_commands(owner, None, state);
    apply_commands(state, bus, rng, commands, depth);
    negate
}

/// Latch the game over if a player is out of HP. The player not acting is checked
/// first, so a simultaneous knock-out goes to the player whose turn it is.
pub fn check_defeat(state: &mut BattleState, bus: &mut EventBus, reason: DefeatReason) -> bool {
    if state.is_finished() {
        return true;
    }
    let acting = state.turn_owner;
    for loser in [1 - acting, acting] {
        if state.players[loser].is_defeated() {
            finish_game(state, bus, 1 - loser, reason);
            return true;
        }
    }
    false
}

/// End the battle. Only the first call has any effect.
pub fn finish_game(state: &mut BattleState, bus: &mut EventBus, winner: usize, reason: DefeatReason) {
    if state.is_finished() {
        debug!(winner, %reason, "battle already finished, ignored");
        return;
    }

    let outcome = GameOutcome { winner, reason };
    state.outcome = Some(outcome);
    state.pending.clear();
    emit(state, bus, BattleEvent::GameOver { winner, reason });
    state.report = Some(state.stats.report(0, &outcome, state.turn_number, state.config.mode));

    info!(
        battle_id = %state.battle_id,
        winner = state.player_name(winner),
        %reason,
        turns = state.turn_number,
        "battle finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{creature, TestBattleBuilder};
    use pretty_assertions::assert_eq;
    use schema::Element;

    #[test]
    fn test_sacrifice_sets_are_combinations() {
        assert_eq!(sacrifice_sets(&[1, 2, 3], 0), vec![Vec::<Uid>::new()]);
        assert_eq!(sacrifice_sets(&[1, 2, 3], 2), vec![vec![1, 2], vec![1, 3], vec![2, 3]]);
        assert!(sacrifice_sets(&[1], 2).is_empty());
    }

    #[test]
    fn test_wait_advances_main_then_ends_battle() {
        let mut state = TestBattleBuilder::new().p2_deck(vec![creature(50, "Spare", Element::Air, 100, 100)]).build();
        let mut rng = TurnRng::new_for_test(vec![]);

        apply(
            &mut state,
            EngineInput::Action {
                player_index: 0,
                action: PlayerAction::Wait,
            },
            &mut rng,
        );
        assert_eq!(state.pending.peek(), Some(&BattleAction::EnterBattle { player_index: 0 }));
        apply(&mut state, EngineInput::Advance, &mut rng);
        assert_eq!(state.phase, Phase::Battle);

        apply(
            &mut state,
            EngineInput::Action {
                player_index: 0,
                action: PlayerAction::Wait,
            },
            &mut rng,
        );
        resolve_pending(&mut state, &mut rng);

        assert_eq!(state.turn_owner, 1);
        assert_eq!(state.phase, Phase::Main);
        assert_eq!(state.players[1].hand.len(), 1);
    }

    #[test]
    fn test_input_is_rejected_while_busy() {
        let mut state = TestBattleBuilder::new().build();
        let mut rng = TurnRng::new_for_test(vec![]);
        submit_action(&mut state, 0, PlayerAction::GoToBattle).expect("legal");

        let bus = apply(
            &mut state,
            EngineInput::Action {
                player_index: 0,
                action: PlayerAction::EndTurn,
            },
            &mut rng,
        );

        assert!(matches!(bus.events(), [BattleEvent::ActionRejected { .. }]));
        assert_eq!(state.pending.len(), 1);
        assert_eq!(
            validate_action(&state, 0, &PlayerAction::EndTurn),
            Err(ActionError::Busy)
        );
    }

    #[test]
    fn test_finish_game_is_idempotent() {
        let mut state = TestBattleBuilder::new().build();
        let mut bus = EventBus::new();

        finish_game(&mut state, &mut bus, 0, DefeatReason::HpDepleted);
        finish_game(&mut state, &mut bus, 1, DefeatReason::DeckOut);

        assert_eq!(
            state.outcome,
            Some(GameOutcome {
                winner: 0,
                reason: DefeatReason::HpDepleted
            })
        );
        assert_eq!(bus.len(), 1);
        assert!(state.report.is_some());
    }
}
