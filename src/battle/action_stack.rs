use std::collections::VecDeque;

use crate::card::Uid;
use crate::player::PlayerAction;
use serde::{Deserialize, Serialize};

/// Internal action types for the pending-resolution queue.
/// Each one is a single resolution step executed by one call to `advance`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleAction {
    /// DRAW phase: status ticks, turn-start abilities, then the draw
    StartTurn { player_index: usize },

    /// Move the creature to the field, paying its sacrifices
    Summon {
        player_index: usize,
        card_id: Uid,
        sacrifices: Vec<Uid>,
    },

    /// ON_SUMMON ability, then the opponent's summon traps
    SummonTriggers { player_index: usize, card_id: Uid },

    CastSpell {
        player_index: usize,
        card_id: Uid,
        target_id: Option<Uid>,
    },

    SetTrap { player_index: usize, card_id: Uid },

    /// Confusion, defender traps and ON_ATTACK ability
    DeclareAttack {
        player_index: usize,
        attacker_id: Uid,
        target_id: Option<Uid>,
    },

    /// Evasion, combat resolution and damage
    ResolveAttack {
        player_index: usize,
        attacker_id: Uid,
        target_id: Option<Uid>,
    },

    EnterBattle { player_index: usize },

    EndTurn { player_index: usize },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ActionStack {
    actions: VecDeque<BattleAction>,
}

impl ActionStack {
    /// Creates a new, empty ActionStack.
    pub fn new() -> Self {
        Self {
            actions: VecDeque::new(),
        }
    }

    /// Converts a validated player action into its first resolution step.
    /// `Wait` is resolved against the current phase by the caller before it gets here.
    pub fn from_player_action(player_index: usize, action: &PlayerAction) -> Option<BattleAction> {
        match action {
            PlayerAction::Summon { card_id, sacrifices } => Some(BattleAction::Summon {
                player_index,
                card_id: *card_id,
                sacrifices: sacrifices.clone(),
            }),
            PlayerAction::UseSpell { card_id, target_id } => Some(BattleAction::CastSpell {
                player_index,
                card_id: *card_id,
                target_id: *target_id,
            }),
            PlayerAction::SetTrap { card_id } => Some(BattleAction::SetTrap {
                player_index,
                card_id: *card_id,
            }),
            PlayerAction::Attack { card_id, target_id } => Some(BattleAction::DeclareAttack {
                player_index,
                attacker_id: *card_id,
                target_id: *target_id,
            }),
            PlayerAction::GoToBattle => Some(BattleAction::EnterBattle { player_index }),
            PlayerAction::EndTurn => Some(BattleAction::EndTurn { player_index }),
            PlayerAction::Wait => None,
        }
    }

    /// Adds an action to the end of the execution queue.
    pub fn push_back(&mut self, action: BattleAction) {
        self.actions.push_back(action);
    }

    /// Adds an action to the front of the execution queue, to be executed next.
    /// Used for follow-up steps such as attack resolution after a declaration.
    pub fn push_front(&mut self, action: BattleAction) {
        self.actions.push_front(action);
    }

    /// Removes and returns the next action to be executed from the front of the queue.
    pub fn pop_front(&mut self) -> Option<BattleAction> {
        self.actions.pop_front()
    }

    pub fn peek(&self) -> Option<&BattleAction> {
        self.actions.front()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_front_runs_next() {
        let mut stack = ActionStack::new();
        stack.push_back(BattleAction::EndTurn { player_index: 0 });
        stack.push_front(BattleAction::EnterBattle { player_index: 0 });

        assert_eq!(stack.len(), 2);
        assert_eq!(
            stack.pop_front(),
            Some(BattleAction::EnterBattle { player_index: 0 })
        );
        assert_eq!(
            stack.pop_front(),
            Some(BattleAction::EndTurn { player_index: 0 })
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn test_attack_becomes_declaration() {
        let action = PlayerAction::Attack {
            card_id: 4,
            target_id: None,
        };
        assert_eq!(
            ActionStack::from_player_action(1, &action),
            Some(BattleAction::DeclareAttack {
                player_index: 1,
                attacker_id: 4,
                target_id: None
            })
        );
        assert_eq!(ActionStack::from_player_action(1, &PlayerAction::Wait), None);
    }
}
