use crate::battle::state::{DefeatReason, GameOutcome};
use crate::config::BattleMode;
use serde::{Deserialize, Serialize};

/// Running per-player totals for one battle. Indexed by player index.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub damage_dealt: [u32; 2], // HP damage each player inflicted on the other
    pub damage_taken: [u32; 2],
    pub cards_destroyed: [u32; 2], // Enemy creatures each player destroyed
    pub creatures_summoned: [u32; 2],
    pub spells_cast: [u32; 2],
    pub traps_triggered: [u32; 2],
}

impl MatchStats {
    /// Record HP damage taken by `victim`, credited to the other player.
    pub fn record_damage(&mut self, victim: usize, amount: u32) {
        self.damage_taken[victim] += amount;
        self.damage_dealt[1 - victim] += amount;
    }

    /// Record a creature owned by `owner` being destroyed.
    pub fn record_destroyed(&mut self, owner: usize) {
        self.cards_destroyed[1 - owner] += 1;
    }

    pub fn record_summon(&mut self, player_index: usize) {
        self.creatures_summoned[player_index] += 1;
    }

    pub fn record_spell(&mut self, player_index: usize) {
        self.spells_cast[player_index] += 1;
    }

    pub fn record_trap(&mut self, player_index: usize) {
        self.traps_triggered[player_index] += 1;
    }

    /// Summarise the match from one player's point of view.
    pub fn report(
        &self,
        perspective: usize,
        outcome: &GameOutcome,
        turns: u32,
        mode: BattleMode,
    ) -> GameReport {
        GameReport {
            winner: outcome.winner,
            reason: outcome.reason,
            perspective,
            damage_dealt: self.damage_dealt[perspective],
            cards_destroyed: self.cards_destroyed[perspective],
            turns,
            mode,
            perfect: outcome.winner == perspective && self.damage_taken[perspective] == 0,
        }
    }
}

/// Reported once when a battle ends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameReport {
    pub winner: usize,
    pub reason: DefeatReason,
    pub perspective: usize, // Player the totals below belong to
    pub damage_dealt: u32,
    pub cards_destroyed: u32,
    pub turns: u32,
    pub mode: BattleMode,
    pub perfect: bool, // Won without taking any HP damage
}

/// Receives the game report. Notified exactly once per battle.
pub trait MatchObserver: Send {
    fn on_game_end(&mut self, report: &GameReport);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_damage_is_credited_to_opponent() {
        let mut stats = MatchStats::default();
        stats.record_damage(1, 1200);
        stats.record_damage(0, 300);
        stats.record_destroyed(1);

        assert_eq!(stats.damage_dealt, [1200, 300]);
        assert_eq!(stats.damage_taken, [300, 1200]);
        assert_eq!(stats.cards_destroyed, [1, 0]);
    }

    #[test]
    fn test_perfect_requires_no_damage_taken() {
        let mut stats = MatchStats::default();
        stats.record_damage(1, 8000);
        let outcome = GameOutcome {
            winner: 0,
            reason: DefeatReason::HpDepleted,
        };

        let report = stats.report(0, &outcome, 7, BattleMode::QuickBattle);
        assert!(report.perfect);
        assert_eq!(report.damage_dealt, 8000);

        stats.record_damage(0, 100);
        assert!(!stats.report(0, &outcome, 7, BattleMode::QuickBattle).perfect);
        assert!(!stats.report(1, &outcome, 7, BattleMode::QuickBattle).perfect);
    }
}
