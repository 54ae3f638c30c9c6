use crate::battle::commands::{BattleCommand, PlayerTarget};
use crate::battle::state::BattleEvent;
use crate::card::Uid;
use crate::errors::ActionError;
use crate::player::{BattlePlayer, Zone, MAX_FIELD_SIZE};
use schema::CardKind;
use std::collections::HashSet;

/// Check that `uid` can be summoned from the hand paying exactly `sacrifices`.
///
/// Sacrifices come from the summoner's own hand or field and can never include the
/// summoned card. The field limit is checked after field sacrifices leave.
pub fn validate_summon(player: &BattlePlayer, uid: Uid, sacrifices: &[Uid]) -> Result<(), ActionError> {
    let card = player.hand_card(uid).ok_or(ActionError::CardNotInHand(uid))?;
    if !card.is_creature() {
        return Err(ActionError::WrongCardKind {
            uid,
            expected: CardKind::Creature,
        });
    }

    let required = card.sacrifice_required();
    if sacrifices.len() != required {
        return Err(ActionError::SacrificeCountMismatch {
            required,
            offered: sacrifices.len(),
        });
    }

    let mut seen = HashSet::new();
    let mut from_field = 0;
    for &sacrifice in sacrifices {
        if sacrifice == uid || !seen.insert(sacrifice) {
            return Err(ActionError::InvalidSacrifice(sacrifice));
        }
        match player.locate(sacrifice) {
            Some(Zone::Field) => from_field += 1,
            Some(Zone::Hand) => {}
            _ => return Err(ActionError::InvalidSacrifice(sacrifice)),
        }
    }

    if player.field.len() - from_field + 1 > MAX_FIELD_SIZE {
        return Err(ActionError::FieldFull);
    }

    Ok(())
}

/// Sacrifices to the graveyard, then the creature onto the field.
pub fn summon_commands(player: &BattlePlayer, player_index: usize, uid: Uid, sacrifices: &[Uid]) -> Vec<BattleCommand> {
    let target = PlayerTarget::from_index(player_index);
    let mut commands = Vec::with_capacity(sacrifices.len() * 2 + 1);

    for &sacrifice in sacrifices {
        let name = player
            .hand_card(sacrifice)
            .or_else(|| player.field_card(sacrifice))
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        commands.push(BattleCommand::SendToGraveyard {
            target,
            uid: sacrifice,
        });
        commands.push(BattleCommand::EmitEvent(BattleEvent::CardSacrificed {
            player_index,
            uid: sacrifice,
            name,
        }));
    }
    commands.push(BattleCommand::SummonToField { target, uid });
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{creature, creature_lv, spell, TestBattleBuilder};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::Element;

    fn full_field_player() -> BattlePlayer {
        let state = TestBattleBuilder::new()
            .p1_field(vec![
                creature(1, "A", Element::Fire, 1000, 1000),
                creature(2, "B", Element::Water, 1000, 1000),
                creature(3, "C", Element::Earth, 1000, 1000),
            ])
            .p1_hand(vec![
                creature_lv(10, "Titan", Element::Earth, 3, 2800, 2500),
                creature(11, "Imp", Element::Fire, 1200, 800),
                creature_lv(12, "Knight", Element::Light, 2, 1900, 1600),
                spell(13, "Fireball", None),
            ])
            .build();
        state.players[0].clone()
    }

    #[test]
    fn test_level_three_on_full_field_with_two_field_sacrifices() {
        let player = full_field_player();
        assert_eq!(validate_summon(&player, 10, &[1, 2]), Ok(()));
    }

    #[rstest]
    #[case::hand_sacrifices_leave_field_full(10, vec![11, 12], ActionError::FieldFull)]
    #[case::one_short(10, vec![1], ActionError::SacrificeCountMismatch { required: 2, offered: 1 })]
    #[case::duplicate(10, vec![1, 1], ActionError::InvalidSacrifice(1))]
    #[case::self_sacrifice(10, vec![10, 1], ActionError::InvalidSacrifice(10))]
    #[case::unknown(10, vec![1, 99], ActionError::InvalidSacrifice(99))]
    #[case::level_one_full_field(11, vec![], ActionError::FieldFull)]
    #[case::not_in_hand(1, vec![], ActionError::CardNotInHand(1))]
    #[case::spell(13, vec![], ActionError::WrongCardKind { uid: 13, expected: CardKind::Creature })]
    fn test_illegal_summons(#[case] uid: Uid, #[case] sacrifices: Vec<Uid>, #[case] expected: ActionError) {
        let player = full_field_player();
        assert_eq!(validate_summon(&player, uid, &sacrifices), Err(expected));
    }

    #[test]
    fn test_summon_commands_pay_sacrifices_first() {
        let player = full_field_player();

        let commands = summon_commands(&player, 0, 12, &[3]);

        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[0],
            BattleCommand::SendToGraveyard {
                target: PlayerTarget::Player1,
                uid: 3
            }
        );
        assert_eq!(
            commands[2],
            BattleCommand::SummonToField {
                target: PlayerTarget::Player1,
                uid: 12
            }
        );
    }
}
