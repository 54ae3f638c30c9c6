use crate::battle::commands::{BattleCommand, PlayerTarget};
use crate::battle::state::{BattleEvent, TurnRng};
use crate::card::{ActiveStatus, CardInst, Uid};
use crate::player::BattlePlayer;
use schema::StatusKind;

pub const BURN_DAMAGE: u32 = 100;
pub const BURN_ATTACK_FACTOR: f64 = 0.75;
pub const POISON_BASE_DAMAGE: u32 = 50; // Grows by this much with every tick
pub const FREEZE_SKIP_CHANCE: u8 = 50;
pub const CONFUSE_SELF_HIT_CHANCE: u8 = 50;

/// Result of ticking one creature's statuses at its owner's turn start.
#[derive(Debug, Clone, PartialEq)]
pub struct CardStatusTick {
    pub uid: Uid,
    pub name: String,
    pub statuses_after: Vec<ActiveStatus>,
    pub damage: Vec<(StatusKind, u32)>,
    pub prevented_by: Option<StatusKind>,
    pub expired: Vec<StatusKind>,
}

/// Every field creature's tick plus the aggregate HP loss for the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTickReport {
    pub player_index: usize,
    pub cards: Vec<CardStatusTick>,
    pub total_damage: u32,
}

/// Whether an attacking creature's attack is reduced by burn.
pub fn attack_factor(card: &CardInst) -> f64 {
    if card.has_status(StatusKind::Burn) {
        BURN_ATTACK_FACTOR
    } else {
        1.0
    }
}

fn tick_card(card: &CardInst, rng: &mut TurnRng) -> CardStatusTick {
    let mut tick = CardStatusTick {
        uid: card.uid,
        name: card.name().to_string(),
        statuses_after: Vec::new(),
        damage: Vec::new(),
        prevented_by: None,
        expired: Vec::new(),
    };

    for status in &card.statuses {
        let mut status = *status;

        match status.kind {
            StatusKind::Burn => tick.damage.push((StatusKind::Burn, BURN_DAMAGE)),
            StatusKind::Poison => {
                let damage = POISON_BASE_DAMAGE * (status.ticks as u32 + 1);
                tick.damage.push((StatusKind::Poison, damage));
            }
            StatusKind::Freeze => {
                if tick.prevented_by.is_none() && rng.roll(FREEZE_SKIP_CHANCE, "freeze skip") {
                    tick.prevented_by = Some(StatusKind::Freeze);
                }
            }
            StatusKind::Paralyze | StatusKind::Sleep => {
                if tick.prevented_by.is_none() {
                    tick.prevented_by = Some(status.kind);
                }
            }
            StatusKind::Confuse => {}
        }

        status.ticks = status.ticks.saturating_add(1);
        status.turns_remaining = status.turns_remaining.saturating_sub(1);
        if status.turns_remaining == 0 {
            tick.expired.push(status.kind);
        } else {
            tick.statuses_after.push(status);
        }
    }

    tick
}

/// Tick every status on a player's field. Reads the player, never mutates it.
pub fn process_turn_start(
    player: &BattlePlayer,
    player_index: usize,
    rng: &mut TurnRng,
) -> StatusTickReport {
    let cards: Vec<CardStatusTick> = player
        .field
        .iter()
        .filter(|card| !card.statuses.is_empty())
        .map(|card| tick_card(card, rng))
        .collect();

    let total_damage = cards
        .iter()
        .flat_map(|tick| tick.damage.iter().map(|(_, amount)| *amount))
        .sum();

    StatusTickReport {
        player_index,
        cards,
        total_damage,
    }
}

/// Turn a tick report into commands. The HP loss lands as one aggregate hit at the end.
pub fn tick_commands(report: StatusTickReport) -> Vec<BattleCommand> {
    let target = PlayerTarget::from_index(report.player_index);
    let player_index = report.player_index;
    let mut commands = Vec::new();

    for tick in report.cards {
        for (status, damage) in &tick.damage {
            commands.push(BattleCommand::EmitEvent(BattleEvent::StatusDamage {
                player_index,
                name: tick.name.clone(),
                status: *status,
                damage: *damage,
            }));
        }
        if let Some(status) = tick.prevented_by {
            commands.push(BattleCommand::SetHasAttacked {
                target,
                uid: tick.uid,
                value: true,
            });
            commands.push(BattleCommand::EmitEvent(BattleEvent::ActionPrevented {
                player_index,
                name: tick.name.clone(),
                status,
            }));
        }
        for status in &tick.expired {
            commands.push(BattleCommand::EmitEvent(BattleEvent::StatusExpired {
                player_index,
                uid: tick.uid,
                name: tick.name.clone(),
                status: *status,
            }));
        }
        commands.push(BattleCommand::ReplaceStatuses {
            target,
            uid: tick.uid,
            statuses: tick.statuses_after,
        });
    }

    if report.total_damage > 0 {
        commands.push(BattleCommand::DealDamage {
            target,
            amount: report.total_damage,
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{creature, TestBattleBuilder};
    use pretty_assertions::assert_eq;
    use schema::Element;

    fn statused(uid: Uid, kind: StatusKind, duration: u8) -> CardInst {
        let mut card = creature(uid, "Target", Element::Neutral, 1000, 1000);
        card.apply_status(kind, duration);
        card
    }

    #[test]
    fn test_poison_escalates_each_tick() {
        let state = TestBattleBuilder::new()
            .p1_field(vec![statused(1, StatusKind::Poison, 3)])
            .build();
        let mut rng = TurnRng::new_for_test(vec![]);

        let first = process_turn_start(&state.players[0], 0, &mut rng);
        assert_eq!(first.total_damage, 50);

        let mut card = state.players[0].field[0].clone();
        card.statuses = first.cards[0].statuses_after.clone();
        let mut player = state.players[0].clone();
        player.field = vec![card];

        let second = process_turn_start(&player, 0, &mut rng);
        assert_eq!(second.total_damage, 100);
    }

    #[test]
    fn test_aggregate_damage_across_field() {
        let state = TestBattleBuilder::new()
            .p1_field(vec![
                statused(1, StatusKind::Burn, 3),
                statused(2, StatusKind::Poison, 3),
                creature(3, "Healthy", Element::Neutral, 100, 100),
            ])
            .build();
        let mut rng = TurnRng::new_for_test(vec![]);

        let report = process_turn_start(&state.players[0], 0, &mut rng);

        assert_eq!(report.cards.len(), 2);
        assert_eq!(report.total_damage, BURN_DAMAGE + POISON_BASE_DAMAGE);
        let damage_commands = tick_commands(report)
            .into_iter()
            .filter(|c| matches!(c, BattleCommand::DealDamage { .. }))
            .count();
        assert_eq!(damage_commands, 1);
    }

    #[test]
    fn test_freeze_skip_depends_on_roll() {
        let state = TestBattleBuilder::new()
            .p1_field(vec![statused(1, StatusKind::Freeze, 2)])
            .build();

        let mut thawed_rng = TurnRng::new_for_test(vec![51]);
        let report = process_turn_start(&state.players[0], 0, &mut thawed_rng);
        assert_eq!(report.cards[0].prevented_by, None);

        let mut frozen_rng = TurnRng::new_for_test(vec![50]);
        let report = process_turn_start(&state.players[0], 0, &mut frozen_rng);
        assert_eq!(report.cards[0].prevented_by, Some(StatusKind::Freeze));
    }

    #[test]
    fn test_paralyze_prevents_then_expires() {
        let state = TestBattleBuilder::new()
            .p1_field(vec![statused(1, StatusKind::Paralyze, 1)])
            .build();
        let mut rng = TurnRng::new_for_test(vec![]);

        let report = process_turn_start(&state.players[0], 0, &mut rng);

        assert_eq!(report.cards[0].prevented_by, Some(StatusKind::Paralyze));
        assert_eq!(report.cards[0].expired, vec![StatusKind::Paralyze]);
        assert!(report.cards[0].statuses_after.is_empty());
    }

    #[test]
    fn test_burn_reduces_attack_factor() {
        let card = statused(1, StatusKind::Burn, 3);
        assert_eq!(attack_factor(&card), BURN_ATTACK_FACTOR);
    }
}
