#[cfg(test)]
mod tests {
    use crate::battle::state::{BattleEvent, DefeatReason, GameOutcome, Phase, TurnRng};
    use crate::battle::tests::common::{
        act, assert_invariants, creature, predictable_rng, trap, with_ability, TestBattleBuilder,
    };
    use crate::errors::ActionError;
    use crate::player::PlayerAction;
    use rstest::rstest;
    use schema::{AbilityEffect, AbilityTrigger, Element, StatusKind, TrapCondition, TrapEffect};
    use pretty_assertions::assert_eq;

    fn attack(card_id: u32, target_id: Option<u32>) -> PlayerAction {
        PlayerAction::Attack { card_id, target_id }
    }

    #[test]
    fn test_water_overwhelms_fire() {
        // Arrange
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Naga", Element::Water, 1500, 1200)])
            .p2_field(vec![creature(10, "Imp", Element::Fire, 1200, 1000)])
            .build();
        let mut rng = predictable_rng();

        // Act
        let bus = act(&mut state, &mut rng, 0, attack(1, Some(10))).expect("legal attack");

        // Assert
        assert!(bus.events().contains(&BattleEvent::CombatResolved {
            attacker: "Naga".to_string(),
            defender: "Imp".to_string(),
            effective_attack: 2250,
            effective_defense: 1000,
        }));
        assert_eq!(state.players[1].hp, 6750);
        assert!(state.players[1].field.is_empty());
        assert_eq!(state.players[1].graveyard[0].uid, 10);
        assert!(state.players[0].field[0].has_attacked);
        assert_eq!(state.stats.cards_destroyed, [1, 0]);
        assert_invariants(&state);
    }

    #[test]
    fn test_direct_attack_ignores_the_chart() {
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Zephyr", Element::Air, 800, 600)])
            .build();
        let mut rng = predictable_rng();

        act(&mut state, &mut rng, 0, attack(1, None)).expect("legal attack");

        assert_eq!(state.players[1].hp, 7200);
    }

    #[rstest]
    #[case::tie(1000, 1000, 8000, 8000, true, true)]
    #[case::attacker_loses(900, 1200, 7700, 8000, true, false)]
    #[case::defender_loses(1300, 1200, 8000, 7900, false, true)]
    fn test_outcomes_of_neutral_combat(
        #[case] attack_value: u32,
        #[case] defense_value: u32,
        #[case] p1_hp: u32,
        #[case] p2_hp: u32,
        #[case] attacker_destroyed: bool,
        #[case] defender_destroyed: bool,
    ) {
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Golem", Element::Neutral, attack_value, 500)])
            .p2_field(vec![creature(10, "Wall", Element::Neutral, 500, defense_value)])
            .build();
        let mut rng = predictable_rng();

        act(&mut state, &mut rng, 0, attack(1, Some(10))).expect("legal attack");

        assert_eq!(state.players[0].hp, p1_hp);
        assert_eq!(state.players[1].hp, p2_hp);
        assert_eq!(state.players[0].field.is_empty(), attacker_destroyed);
        assert_eq!(state.players[1].field.is_empty(), defender_destroyed);
    }

    #[test]
    fn test_each_creature_attacks_once_per_turn() {
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Zephyr", Element::Air, 800, 600)])
            .build();
        let mut rng = predictable_rng();

        act(&mut state, &mut rng, 0, attack(1, None)).expect("first attack");
        let second = act(&mut state, &mut rng, 0, attack(1, None));

        assert_eq!(second.err(), Some(ActionError::AlreadyAttacked(1)));
        assert_eq!(state.players[1].hp, 7200);
    }

    #[test]
    fn test_direct_attack_needs_an_empty_field() {
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Zephyr", Element::Air, 800, 600)])
            .p2_field(vec![creature(10, "Wall", Element::Earth, 100, 2000)])
            .build();
        let mut rng = predictable_rng();

        let result = act(&mut state, &mut rng, 0, attack(1, None));

        assert_eq!(result.err(), Some(ActionError::DirectAttackBlocked));
    }

    #[test]
    fn test_negate_trap_cancels_the_attack() {
        // Arrange
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Naga", Element::Water, 1500, 1200)])
            .p2_field(vec![creature(10, "Imp", Element::Fire, 1200, 1000)])
            .p2_traps(vec![trap(20, "Mirror Ward", TrapCondition::OnAttack, TrapEffect::NegateAttack)])
            .build();
        let mut rng = predictable_rng();

        // Act
        let bus = act(&mut state, &mut rng, 0, attack(1, Some(10))).expect("legal attack");

        // Assert
        assert!(bus.events().contains(&BattleEvent::AttackNegated {
            player_index: 0,
            attacker: "Naga".to_string(),
        }));
        assert_eq!(state.players[1].hp, 8000);
        assert_eq!(state.players[1].field.len(), 1);
        assert!(state.players[1].trap_zone.is_empty());
        assert_eq!(state.players[1].graveyard[0].uid, 20);
        assert!(state.players[0].field[0].has_attacked);
        assert_eq!(state.stats.traps_triggered, [0, 1]);
        assert_invariants(&state);
    }

    #[test]
    fn test_survive_trap_holds_at_one_hp() {
        // Arrange
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p2_hp(500)
            .p1_field(vec![creature(1, "Zephyr", Element::Air, 800, 600)])
            .p2_traps(vec![trap(
                20,
                "Last Stand",
                TrapCondition::OnDirectAttack,
                TrapEffect::SurviveAtOne,
            )])
            .build();
        let mut rng = predictable_rng();

        // Act
        let bus = act(&mut state, &mut rng, 0, attack(1, None)).expect("legal attack");

        // Assert
        assert_eq!(state.players[1].hp, 1);
        assert!(!state.is_finished());
        assert!(bus.events().contains(&BattleEvent::SurvivedAtOne { player_index: 1 }));
        assert!(state.players[1].trap_zone.is_empty());
    }

    #[test]
    fn test_survive_trap_stays_set_for_non_lethal_damage() {
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Zephyr", Element::Air, 800, 600)])
            .p2_traps(vec![trap(
                20,
                "Last Stand",
                TrapCondition::OnDirectAttack,
                TrapEffect::SurviveAtOne,
            )])
            .build();
        let mut rng = predictable_rng();

        act(&mut state, &mut rng, 0, attack(1, None)).expect("legal attack");

        assert_eq!(state.players[1].hp, 7200);
        assert_eq!(state.players[1].trap_zone.len(), 1);
    }

    #[test]
    fn test_two_lethal_hits_record_one_winner() {
        // Arrange: the destroy trap kills the attacker's owner, combat kills the defender's
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_hp(300)
            .p2_hp(500)
            .p1_field(vec![creature(1, "Naga", Element::Water, 1500, 1200)])
            .p2_field(vec![creature(10, "Imp", Element::Fire, 1200, 1000)])
            .p2_traps(vec![trap(
                20,
                "Vengeful Flame",
                TrapCondition::OnDestroy,
                TrapEffect::DamagePlayer { amount: 400 },
            )])
            .build();
        let mut rng = predictable_rng();

        // Act
        let bus = act(&mut state, &mut rng, 0, attack(1, Some(10))).expect("legal attack");

        // Assert: both players hit 0, the turn owner takes it
        assert_eq!(state.players[0].hp, 0);
        assert_eq!(state.players[1].hp, 0);
        assert_eq!(
            state.outcome,
            Some(GameOutcome {
                winner: 0,
                reason: DefeatReason::HpDepleted
            })
        );
        let game_overs = bus
            .events()
            .iter()
            .filter(|e| matches!(e, BattleEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_evasion_avoids_the_strike() {
        // Arrange: a roll of 10 is inside a 25% evasion chance
        let dodger = with_ability(
            creature(10, "Wisp", Element::Light, 300, 300),
            "Flicker",
            AbilityTrigger::Passive,
            AbilityEffect::Evasion { chance: 25 },
        );
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![creature(1, "Naga", Element::Water, 1500, 1200)])
            .p2_field(vec![dodger])
            .build();
        let mut rng = TurnRng::new_for_test(vec![10]);

        // Act
        act(&mut state, &mut rng, 0, attack(1, Some(10))).expect("legal attack");

        // Assert
        assert_eq!(state.players[1].field.len(), 1);
        assert_eq!(state.players[1].hp, 8000);
        assert!(state.players[0].field[0].has_attacked);
    }

    #[test]
    fn test_confused_attacker_hits_its_own_side() {
        // Arrange
        let mut confused = creature(1, "Naga", Element::Water, 1500, 1200);
        confused.apply_status(StatusKind::Confuse, 2);
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![confused])
            .p2_field(vec![creature(10, "Imp", Element::Fire, 1200, 1000)])
            .build();
        let mut rng = TurnRng::new_for_test(vec![1]);

        // Act
        act(&mut state, &mut rng, 0, attack(1, Some(10))).expect("legal attack");

        // Assert
        assert_eq!(state.players[0].hp, 7250);
        assert_eq!(state.players[1].hp, 8000);
        assert_eq!(state.players[1].field.len(), 1);
    }

    #[test]
    fn test_burned_attacker_strikes_weaker() {
        let mut burned = creature(1, "Golem", Element::Neutral, 1200, 500);
        burned.apply_status(StatusKind::Burn, 2);
        let mut state = TestBattleBuilder::new()
            .phase(Phase::Battle)
            .p1_field(vec![burned])
            .build();
        let mut rng = predictable_rng();

        act(&mut state, &mut rng, 0, attack(1, None)).expect("legal attack");

        assert_eq!(state.players[1].hp, 8000 - 900);
    }
}
