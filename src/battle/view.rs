use crate::battle::state::{BattleState, Phase};
use crate::card::{CardInst, Uid};
use crate::config::Difficulty;
use serde::{Deserialize, Serialize};

/// What one player is allowed to know about the battle.
/// The opponent's hand, deck order and face-down traps stay hidden.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleView {
    pub player_index: usize,
    pub phase: Phase,
    pub turn_number: u32,
    pub is_first_turn: bool, // Attacks are barred for this player this turn
    pub difficulty: Difficulty,
    pub me: OwnSide,
    pub opponent: OpponentSide,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OwnSide {
    pub hp: u32,
    pub hand: Vec<CardInst>,
    pub field: Vec<CardInst>,
    pub trap_zone: Vec<CardInst>,
    pub deck_size: usize,
    pub graveyard: Vec<CardInst>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpponentSide {
    pub hp: u32,
    pub hand_size: usize,
    pub deck_size: usize,
    pub field: Vec<CardInst>,
    pub trap_count: usize,
    pub graveyard: Vec<CardInst>,
}

impl BattleView {
    pub fn for_player(state: &BattleState, player_index: usize) -> Self {
        let me = &state.players[player_index];
        let them = &state.players[1 - player_index];

        BattleView {
            player_index,
            phase: state.phase,
            turn_number: state.turn_number,
            is_first_turn: state.turn_number == 1 && state.first_player == player_index,
            difficulty: state.config.difficulty,
            me: OwnSide {
                hp: me.hp,
                hand: me.hand.clone(),
                field: me.field.clone(),
                trap_zone: me.trap_zone.clone(),
                deck_size: me.deck.len(),
                graveyard: me.graveyard.clone(),
            },
            opponent: OpponentSide {
                hp: them.hp,
                hand_size: them.hand.len(),
                deck_size: them.deck.len(),
                field: them.field.clone(),
                trap_count: them.trap_zone.len(),
                graveyard: them.graveyard.clone(),
            },
        }
    }

    /// Any card this player can see, own or opposing.
    pub fn visible_card(&self, uid: Uid) -> Option<&CardInst> {
        self.me
            .hand
            .iter()
            .chain(self.me.field.iter())
            .chain(self.me.trap_zone.iter())
            .chain(self.opponent.field.iter())
            .find(|c| c.uid == uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{creature, trap, TestBattleBuilder};
    use pretty_assertions::assert_eq;
    use schema::{Element, TrapCondition, TrapEffect};

    #[test]
    fn test_view_hides_opponent_secrets() {
        let state = TestBattleBuilder::new()
            .p1_hand(vec![creature(1, "Imp", Element::Fire, 1200, 800)])
            .p2_hand(vec![creature(2, "Naga", Element::Water, 1600, 1400)])
            .p2_field(vec![creature(3, "Golem", Element::Earth, 1400, 2000)])
            .p2_traps(vec![trap(4, "Mirror Ward", TrapCondition::OnAttack, TrapEffect::NegateAttack)])
            .build();

        let view = BattleView::for_player(&state, 0);

        assert_eq!(view.opponent.hand_size, 1);
        assert_eq!(view.opponent.trap_count, 1);
        assert_eq!(view.opponent.field.len(), 1);
        assert!(view.visible_card(1).is_some());
        assert!(view.visible_card(3).is_some());
        assert!(view.visible_card(2).is_none());
        assert!(view.visible_card(4).is_none());
    }
}
