use crate::battle::commands::{BattleCommand, PlayerTarget};
use crate::battle::state::{BattleEvent, BattleState};
use crate::card::Uid;
use schema::StatusKind;

/// Something that happened on the board which abilities and traps may react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Summoned {
        player_index: usize,
        uid: Uid,
    },
    /// `defender` is None for a direct attack.
    Attacked {
        player_index: usize,
        attacker: Uid,
        defender: Option<Uid>,
    },
    /// `player_index` owns the destroyed card; `by` is the opposing creature responsible.
    Destroyed {
        player_index: usize,
        uid: Uid,
        by: Option<Uid>,
    },
    TurnStarted {
        player_index: usize,
    },
    TurnEnded {
        player_index: usize,
    },
    Damaged {
        player_index: usize,
        amount: u32,
    },
}

impl TriggerEvent {
    /// The player whose action produced the event.
    pub fn producer(&self, turn_owner: usize) -> usize {
        match *self {
            TriggerEvent::Summoned { player_index, .. }
            | TriggerEvent::Attacked { player_index, .. }
            | TriggerEvent::TurnStarted { player_index }
            | TriggerEvent::TurnEnded { player_index } => player_index,
            TriggerEvent::Destroyed { .. } | TriggerEvent::Damaged { .. } => turn_owner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusApplication {
    pub player_index: usize,
    pub uid: Uid,
    pub status: StatusKind,
    pub duration: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatChange {
    pub player_index: usize,
    pub uid: Uid,
    pub attack: i32,
    pub defense: i32,
}

/// Uniform description of what an ability or trap does, relative to its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectDelta {
    pub notes: Vec<String>,
    pub heal_owner: u32,
    pub damage_opponent: u32,
    pub draw: u8,
    pub statuses: Vec<StatusApplication>,
    pub stat_changes: Vec<StatChange>,
    pub destroy: Vec<(usize, Uid)>,
    pub revive: Option<bool>, // Some(half_attack)
    pub negate_attack: bool,
}

impl EffectDelta {
    pub fn is_empty(&self) -> bool {
        *self == EffectDelta::default()
    }

    /// Expand into commands for the given owner. `by` names the creature credited with
    /// any destruction this delta causes.
    pub fn into_commands(
        self,
        owner: usize,
        by: Option<Uid>,
        state: &BattleState,
    ) -> Vec<BattleCommand> {
        let owner_target = PlayerTarget::from_index(owner);
        let mut commands: Vec<BattleCommand> = self
            .notes
            .into_iter()
            .map(|reason| BattleCommand::EmitEvent(BattleEvent::EffectFizzled { reason }))
            .collect();

        if self.heal_owner > 0 {
            commands.push(BattleCommand::HealPlayer {
                target: owner_target,
                amount: self.heal_owner,
            });
        }
        if self.damage_opponent > 0 {
            commands.push(BattleCommand::DealDamage {
                target: owner_target.opponent(),
                amount: self.damage_opponent,
            });
        }
        if self.draw > 0 {
            commands.push(BattleCommand::DrawCards {
                target: owner_target,
                count: self.draw,
            });
        }
        for application in self.statuses {
            commands.push(BattleCommand::ApplyStatus {
                target: PlayerTarget::from_index(application.player_index),
                uid: application.uid,
                status: application.status,
                duration: application.duration,
            });
        }
        for change in self.stat_changes {
            commands.push(BattleCommand::ModifyStats {
                target: PlayerTarget::from_index(change.player_index),
                uid: change.uid,
                attack: change.attack,
                defense: change.defense,
            });
        }
        for (player_index, uid) in self.destroy {
            commands.push(BattleCommand::DestroyCard {
                target: PlayerTarget::from_index(player_index),
                uid,
                by,
            });
        }
        if let Some(half_attack) = self.revive {
            match state.players[owner].last_destroyed_creature() {
                Some(card) => commands.push(BattleCommand::ReviveCard {
                    target: owner_target,
                    uid: card.uid,
                    half_attack,
                }),
                None => commands.push(BattleCommand::EmitEvent(BattleEvent::EffectFizzled {
                    reason: "there is no creature to revive".to_string(),
                })),
            }
        }

        commands
    }
}
