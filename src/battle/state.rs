use crate::battle::action_stack::{ActionStack, BattleAction};
use crate::battle::stats::{GameReport, MatchStats};
use crate::card::{CardInst, Uid};
use crate::config::BattleConfig;
use crate::decks::PlayerSetup;
use crate::errors::{BattleStateError, SnapshotError};
use crate::player::{BattlePlayer, Zone, MAX_FIELD_SIZE, MAX_HP, MAX_TRAP_ZONE_SIZE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use schema::{CardKind, StatusKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{trace, warn};

/// Number of log lines kept on the state.
pub const LOG_CAPACITY: usize = 50;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Draw,
    Main,
    Battle,
    End,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Draw => write!(f, "DRAW"),
            Phase::Main => write!(f, "MAIN"),
            Phase::Battle => write!(f, "BATTLE"),
            Phase::End => write!(f, "END"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefeatReason {
    HpDepleted,
    StatusDamage,
    DeckOut,
}

impl fmt::Display for DefeatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefeatReason::HpDepleted => write!(f, "hp_depleted"),
            DefeatReason::StatusDamage => write!(f, "status_damage"),
            DefeatReason::DeckOut => write!(f, "deck_out"),
        }
    }
}

/// Written exactly once, by the game-over latch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub winner: usize,
    pub reason: DefeatReason,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Info,
    Combat,
    Effect,
    Status,
    Spell,
    Trap,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogCategory::Info => "info",
            LogCategory::Combat => "combat",
            LogCategory::Effect => "effect",
            LogCategory::Status => "status",
            LogCategory::Spell => "spell",
            LogCategory::Trap => "trap",
        };
        write!(f, "{}", label)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub category: LogCategory,
    pub timestamp: u64,
}

/// Ordered log that keeps only the most recent entries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BattleLog {
    entries: VecDeque<LogEntry>,
}

impl Default for BattleLog {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }
}

impl BattleLog {
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entries written after the given timestamp.
    pub fn since(&self, timestamp: u64) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.timestamp > timestamp)
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    // Turn Management
    BattleStarted {
        starter: usize,
    },
    TurnStarted {
        player_index: usize,
        turn_number: u32,
    },
    PhaseChanged {
        player_index: usize,
        phase: Phase,
    },
    TurnEnded {
        player_index: usize,
    },

    // Card Movement
    CardDrawn {
        player_index: usize,
        uid: Uid,
    },
    DeckEmpty {
        player_index: usize,
    },
    CreatureSummoned {
        player_index: usize,
        uid: Uid,
        name: String,
    },
    CardSacrificed {
        player_index: usize,
        uid: Uid,
        name: String,
    },
    CardDiscarded {
        player_index: usize,
        uid: Uid,
    },
    TrapSet {
        player_index: usize,
        uid: Uid,
    },
    SpellCast {
        player_index: usize,
        uid: Uid,
        name: String,
    },
    CardRevived {
        player_index: usize,
        uid: Uid,
        name: String,
    },

    // Combat
    AttackDeclared {
        player_index: usize,
        attacker: String,
        target: Option<String>,
    },
    AttackNegated {
        player_index: usize,
        attacker: String,
    },
    AttackEvaded {
        player_index: usize,
        defender: String,
    },
    AttackConfused {
        player_index: usize,
        attacker: String,
        damage: u32,
    },
    FirstTurnNoAttack {
        player_index: usize,
    },
    AttackTypeEffectiveness {
        multiplier: f64,
    },
    CombatResolved {
        attacker: String,
        defender: String,
        effective_attack: u32,
        effective_defense: u32,
    },
    CreatureDestroyed {
        player_index: usize,
        uid: Uid,
        name: String,
    },
    PlayerDamaged {
        player_index: usize,
        amount: u32,
        remaining_hp: u32,
    },
    PlayerHealed {
        player_index: usize,
        amount: u32,
        new_hp: u32,
    },

    // Effects
    StatsModified {
        player_index: usize,
        uid: Uid,
        name: String,
        attack_delta: i32,
        defense_delta: i32,
    },
    AbilityTriggered {
        player_index: usize,
        card: String,
        ability: String,
    },
    TrapActivated {
        player_index: usize,
        trap: String,
    },
    SurvivedAtOne {
        player_index: usize,
    },
    EffectFizzled {
        reason: String,
    },

    // Status Conditions
    StatusApplied {
        player_index: usize,
        uid: Uid,
        name: String,
        status: StatusKind,
        duration: u8,
    },
    StatusExpired {
        player_index: usize,
        uid: Uid,
        name: String,
        status: StatusKind,
    },
    StatusDamage {
        player_index: usize,
        name: String,
        status: StatusKind,
        damage: u32,
    },
    ActionPrevented {
        player_index: usize,
        name: String,
        status: StatusKind,
    },

    // Rejected Input
    ActionRejected {
        player_index: usize,
        reason: String,
    },

    // Battle End
    GameOver {
        winner: usize,
        reason: DefeatReason,
    },
}

impl BattleEvent {
    /// Formats the event into a human-readable string using battle context.
    /// Returns None for silent events that should not produce user-visible text.
    pub fn format(&self, battle_state: &BattleState) -> Option<String> {
        let name = move |index: &usize| battle_state.player_name(*index);

        match self {
            // === Turn Management Events ===
            BattleEvent::BattleStarted { starter } => {
                Some(format!("The battle begins! {} goes first.", name(starter)))
            }
            BattleEvent::TurnStarted {
                player_index,
                turn_number,
            } => Some(format!(
                "=== Turn {}: {} ===",
                turn_number,
                name(player_index)
            )),
            BattleEvent::PhaseChanged {
                player_index,
                phase,
            } => Some(format!("{} enters the {} phase.", name(player_index), phase)),
            BattleEvent::TurnEnded { player_index } => {
                Some(format!("{} ends their turn.", name(player_index)))
            }

            // === Card Movement Events ===
            BattleEvent::CardDrawn { player_index, .. } => {
                Some(format!("{} draws a card.", name(player_index)))
            }
            BattleEvent::DeckEmpty { player_index } => Some(format!(
                "{} has no cards left to draw.",
                name(player_index)
            )),
            BattleEvent::CreatureSummoned {
                player_index,
                name: card,
                ..
            } => Some(format!("{} summons {}!", name(player_index), card)),
            BattleEvent::CardSacrificed {
                player_index,
                name: card,
                ..
            } => Some(format!("{} sacrifices {}.", name(player_index), card)),
            BattleEvent::CardDiscarded { .. } => None,
            BattleEvent::TrapSet { player_index, .. } => {
                Some(format!("{} sets a card face-down.", name(player_index)))
            }
            BattleEvent::SpellCast {
                player_index,
                name: card,
                ..
            } => Some(format!("{} casts {}!", name(player_index), card)),
            BattleEvent::CardRevived {
                player_index,
                name: card,
                ..
            } => Some(format!(
                "{} returns to {}'s hand!",
                card,
                name(player_index)
            )),

            // === Combat Events ===
            BattleEvent::AttackDeclared {
                attacker, target, ..
            } => match target {
                Some(target) => Some(format!("{} attacks {}!", attacker, target)),
                None => Some(format!("{} attacks directly!", attacker)),
            },
            BattleEvent::AttackNegated { attacker, .. } => {
                Some(format!("{}'s attack was negated!", attacker))
            }
            BattleEvent::AttackEvaded { defender, .. } => {
                Some(format!("{} evaded the attack!", defender))
            }
            BattleEvent::AttackConfused {
                player_index,
                attacker,
                damage,
            } => Some(format!(
                "{} is confused and strikes its own side! {} takes {} damage.",
                attacker,
                name(player_index),
                damage
            )),
            BattleEvent::FirstTurnNoAttack { player_index } => Some(format!(
                "{} cannot attack on the first turn.",
                name(player_index)
            )),
            BattleEvent::AttackTypeEffectiveness { multiplier } => match multiplier {
                m if *m > 1.0 => Some("It's super effective!".to_string()),
                m if *m < 1.0 => Some("It's not very effective...".to_string()),
                _ => None,
            },
            BattleEvent::CombatResolved {
                attacker,
                defender,
                effective_attack,
                effective_defense,
            } => Some(format!(
                "{} ({}) clashes with {} ({}).",
                attacker, effective_attack, defender, effective_defense
            )),
            BattleEvent::CreatureDestroyed {
                player_index,
                name: card,
                ..
            } => Some(format!("{}'s {} was destroyed!", name(player_index), card)),
            BattleEvent::PlayerDamaged {
                player_index,
                amount,
                remaining_hp,
            } => Some(format!(
                "{} takes {} damage! ({} HP left)",
                name(player_index),
                amount,
                remaining_hp
            )),
            BattleEvent::PlayerHealed {
                player_index,
                amount,
                new_hp,
            } => Some(format!(
                "{} recovers {} HP! ({} HP)",
                name(player_index),
                amount,
                new_hp
            )),

            // === Effect Events ===
            BattleEvent::StatsModified {
                name: card,
                attack_delta,
                defense_delta,
                ..
            } => Some(Self::format_stat_change(card, *attack_delta, *defense_delta)),
            BattleEvent::AbilityTriggered { card, ability, .. } => {
                Some(format!("{}'s {} activates!", card, ability))
            }
            BattleEvent::TrapActivated {
                player_index, trap, ..
            } => Some(format!("{} activates the trap {}!", name(player_index), trap)),
            BattleEvent::SurvivedAtOne { player_index } => Some(format!(
                "{} holds on with 1 HP!",
                name(player_index)
            )),
            BattleEvent::EffectFizzled { reason } => Some(format!("The effect fizzles: {}.", reason)),

            // === Status Events ===
            BattleEvent::StatusApplied {
                name: card,
                status,
                duration,
                ..
            } => Some(format!(
                "{} {} ({} turns).",
                card,
                Self::format_status_applied(*status),
                duration
            )),
            BattleEvent::StatusExpired {
                name: card, status, ..
            } => Some(format!("{} {}", card, Self::format_status_removed(*status))),
            BattleEvent::StatusDamage {
                player_index,
                name: card,
                status,
                damage,
            } => Some(format!(
                "{} takes {} damage from {}'s {}.",
                name(player_index),
                damage,
                card,
                status.to_string().to_lowercase()
            )),
            BattleEvent::ActionPrevented {
                name: card, status, ..
            } => Some(format!(
                "{} {}",
                card,
                Self::format_status_prevented(*status)
            )),

            BattleEvent::ActionRejected {
                player_index,
                reason,
            } => Some(format!("{} cannot do that: {}.", name(player_index), reason)),

            BattleEvent::GameOver { winner, reason } => Some(format!(
                "{} wins the battle! ({})",
                name(winner),
                reason
            )),
        }
    }

    /// Log category the event is filed under.
    pub fn category(&self) -> LogCategory {
        match self {
            BattleEvent::BattleStarted { .. }
            | BattleEvent::TurnStarted { .. }
            | BattleEvent::PhaseChanged { .. }
            | BattleEvent::TurnEnded { .. }
            | BattleEvent::CardDrawn { .. }
            | BattleEvent::DeckEmpty { .. }
            | BattleEvent::CreatureSummoned { .. }
            | BattleEvent::CardSacrificed { .. }
            | BattleEvent::CardDiscarded { .. }
            | BattleEvent::ActionRejected { .. }
            | BattleEvent::GameOver { .. } => LogCategory::Info,

            BattleEvent::AttackDeclared { .. }
            | BattleEvent::AttackEvaded { .. }
            | BattleEvent::AttackConfused { .. }
            | BattleEvent::FirstTurnNoAttack { .. }
            | BattleEvent::AttackTypeEffectiveness { .. }
            | BattleEvent::CombatResolved { .. }
            | BattleEvent::CreatureDestroyed { .. }
            | BattleEvent::PlayerDamaged { .. } => LogCategory::Combat,

            BattleEvent::PlayerHealed { .. }
            | BattleEvent::StatsModified { .. }
            | BattleEvent::AbilityTriggered { .. }
            | BattleEvent::CardRevived { .. }
            | BattleEvent::EffectFizzled { .. } => LogCategory::Effect,

            BattleEvent::StatusApplied { .. }
            | BattleEvent::StatusExpired { .. }
            | BattleEvent::StatusDamage { .. }
            | BattleEvent::ActionPrevented { .. } => LogCategory::Status,

            BattleEvent::SpellCast { .. } => LogCategory::Spell,

            BattleEvent::TrapSet { .. }
            | BattleEvent::TrapActivated { .. }
            | BattleEvent::AttackNegated { .. }
            | BattleEvent::SurvivedAtOne { .. } => LogCategory::Trap,
        }
    }

    fn format_stat_change(card: &str, attack_delta: i32, defense_delta: i32) -> String {
        match (attack_delta, defense_delta) {
            (0, d) => format!("{}'s defense changes by {:+}.", card, d),
            (a, 0) => format!("{}'s attack changes by {:+}.", card, a),
            (a, d) => format!("{}'s attack changes by {:+} and defense by {:+}.", card, a, d),
        }
    }

    fn format_status_applied(status: StatusKind) -> &'static str {
        match status {
            StatusKind::Burn => "was set ablaze",
            StatusKind::Freeze => "was frozen solid",
            StatusKind::Paralyze => "is paralyzed",
            StatusKind::Poison => "was poisoned",
            StatusKind::Sleep => "fell asleep",
            StatusKind::Confuse => "became confused",
        }
    }

    fn format_status_removed(status: StatusKind) -> &'static str {
        match status {
            StatusKind::Burn => "is no longer burning.",
            StatusKind::Freeze => "thawed out.",
            StatusKind::Paralyze => "can move again.",
            StatusKind::Poison => "is no longer poisoned.",
            StatusKind::Sleep => "woke up.",
            StatusKind::Confuse => "snapped out of its confusion.",
        }
    }

    fn format_status_prevented(status: StatusKind) -> &'static str {
        match status {
            StatusKind::Freeze => "is frozen and cannot act this turn.",
            StatusKind::Paralyze => "is paralyzed and cannot attack this turn.",
            StatusKind::Sleep => "is fast asleep.",
            _ => "cannot act this turn.",
        }
    }
}

/// Event bus for collecting the events produced by one engine call.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Move every event of another bus onto the end of this one.
    pub fn extend(&mut self, other: EventBus) {
        self.events.extend(other.events);
    }

    /// Print all events in debug format with indentation.
    pub fn print_debug(&self) {
        for event in &self.events {
            println!("  {:?}", event);
        }
    }

    /// Print all events using their formatted text (when available) along with battle context.
    pub fn print_formatted(&self, battle_state: &BattleState) {
        for event in &self.events {
            if let Some(formatted) = event.format(battle_state) {
                println!("  {}", formatted);
            }
        }
    }

    /// Return true if the event bus contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Return the number of events in the bus.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

/// Source of every random decision in a battle: d100 rolls, shuffles and the coin flip.
/// Scripted outcomes are consumed first; after that a seeded generator takes over if present.
#[derive(Debug, Clone)]
pub struct TurnRng {
    outcomes: Vec<u8>,
    index: usize,
    source: Option<StdRng>,
}

impl TurnRng {
    /// Fully scripted outcomes (1..=100). Shuffles are no-ops.
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            outcomes,
            index: 0,
            source: None,
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            outcomes: Vec::new(),
            index: 0,
            source: Some(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn new_random() -> Self {
        Self {
            outcomes: Vec::new(),
            index: 0,
            source: Some(StdRng::from_rng(&mut rand::rng())),
        }
    }

    pub fn from_config(config: &BattleConfig) -> Self {
        match config.rng_seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::new_random(),
        }
    }

    /// Next d100 outcome in 1..=100.
    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        let outcome = if let Some(&scripted) = self.outcomes.get(self.index) {
            self.index += 1;
            scripted
        } else if let Some(source) = self.source.as_mut() {
            source.random_range(1..=100)
        } else {
            warn!("TurnRng exhausted while rolling for '{}', using 100", reason);
            100
        };

        trace!(outcome, reason, "rng consumed");
        outcome
    }

    /// True with `chance` percent probability. Certain outcomes consume no roll.
    pub fn roll(&mut self, chance: u8, reason: &str) -> bool {
        match chance {
            0 => false,
            c if c >= 100 => true,
            c => self.next_outcome(reason) <= c,
        }
    }

    /// Uniform index in `0..len` derived from one d100 outcome.
    pub fn pick_index(&mut self, len: usize, reason: &str) -> usize {
        if len <= 1 {
            return 0;
        }
        let outcome = self.next_outcome(reason).clamp(1, 100) as usize;
        ((outcome - 1) * len / 100).min(len - 1)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if let Some(source) = self.source.as_mut() {
            items.shuffle(source);
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleState {
    pub battle_id: String,
    pub players: [BattlePlayer; 2],
    pub turn_owner: usize,
    pub first_player: usize, // Barred from attacking on turn 1
    pub turn_number: u32,
    pub phase: Phase,
    pub config: BattleConfig,
    pub log: BattleLog,
    pub outcome: Option<GameOutcome>,
    pub report: Option<GameReport>,
    pub stats: MatchStats,
    pub pending: ActionStack,
    pub clock: u64, // Logical clock for log entries and graveyard timestamps
    next_uid: Uid,
}

impl BattleState {
    /// Assemble a battle from prepared players, already in player 1's MAIN phase of turn 1.
    /// Opening hands are whatever the players were built with.
    pub fn new(id: String, player1: BattlePlayer, player2: BattlePlayer, config: BattleConfig) -> Self {
        let next_uid = player1
            .all_cards()
            .chain(player2.all_cards())
            .map(|c| c.uid)
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            battle_id: id,
            players: [player1, player2],
            turn_owner: 0,
            first_player: 0,
            turn_number: 1,
            phase: Phase::Main,
            config,
            log: BattleLog::default(),
            outcome: None,
            report: None,
            stats: MatchStats::default(),
            pending: ActionStack::new(),
            clock: 0,
            next_uid,
        }
    }

    /// Start a fresh battle: number every card, shuffle both decks, deal opening hands
    /// and flip for the starter. The starter's first DRAW step is queued, not yet run.
    pub fn start_battle(
        id: impl Into<String>,
        config: BattleConfig,
        setups: [PlayerSetup; 2],
        rng: &mut TurnRng,
    ) -> Self {
        let mut next_uid: Uid = 1;
        let starting_hp = config.starting_hp;

        let players = setups.map(|setup| {
            let mut deck: Vec<CardInst> = setup
                .deck
                .into_iter()
                .map(|template| {
                    let card = CardInst::new(next_uid, template);
                    next_uid += 1;
                    card
                })
                .collect();
            rng.shuffle(&mut deck);
            BattlePlayer::new(
                setup.player_id,
                setup.player_name,
                setup.player_type,
                deck,
                starting_hp,
            )
        });

        let [player1, player2] = players;
        let mut state = Self::new(id.into(), player1, player2, config);

        for player in state.players.iter_mut() {
            for _ in 0..state.config.starting_hand_size {
                player.draw();
            }
        }

        let starter = rng.pick_index(2, "starting player");
        state.turn_owner = starter;
        state.first_player = starter;
        state.phase = Phase::Draw;
        state.record_event(&BattleEvent::BattleStarted { starter });
        state.pending.push_back(BattleAction::StartTurn {
            player_index: starter,
        });
        state
    }

    pub fn player_name(&self, index: usize) -> &str {
        self.players
            .get(index)
            .map(|p| p.player_name.as_str())
            .unwrap_or("Unknown")
    }

    /// Advance the logical clock and return the new time.
    pub fn tick_clock(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn allocate_uid(&mut self) -> Uid {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Append the event's text, if it has any, to the capped log.
    pub fn record_event(&mut self, event: &BattleEvent) {
        if let Some(message) = event.format(self) {
            let timestamp = self.tick_clock();
            self.log.push(LogEntry {
                message,
                category: event.category(),
                timestamp,
            });
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// True while a multi-step resolution is still queued.
    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn winner(&self) -> Option<usize> {
        self.outcome.map(|o| o.winner)
    }

    /// Locate a card anywhere in the battle.
    pub fn find_card(&self, uid: Uid) -> Option<(usize, Zone)> {
        self.players
            .iter()
            .enumerate()
            .find_map(|(index, player)| player.locate(uid).map(|zone| (index, zone)))
    }

    /// Owner index and card for a creature currently on either field.
    pub fn field_card(&self, uid: Uid) -> Option<(usize, &CardInst)> {
        self.players
            .iter()
            .enumerate()
            .find_map(|(index, player)| player.field_card(uid).map(|card| (index, card)))
    }

    /// Every invariant violation in the current state. Empty when the state is sound.
    pub fn check_invariants(&self) -> Vec<BattleStateError> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (index, player) in self.players.iter().enumerate() {
            if player.hp > MAX_HP {
                violations.push(BattleStateError::HpOutOfRange {
                    player: index,
                    hp: player.hp,
                });
            }
            if player.field.len() > MAX_FIELD_SIZE {
                violations.push(BattleStateError::FieldOverCapacity {
                    player: index,
                    len: player.field.len(),
                });
            }
            if player.trap_zone.len() > MAX_TRAP_ZONE_SIZE {
                violations.push(BattleStateError::TrapZoneOverCapacity {
                    player: index,
                    len: player.trap_zone.len(),
                });
            }
            for card in player.field.iter() {
                if card.kind() != CardKind::Creature {
                    violations.push(BattleStateError::NonCreatureOnField(card.uid));
                }
            }
            for card in player.trap_zone.iter() {
                if card.kind() != CardKind::Trap || !card.is_set {
                    violations.push(BattleStateError::InvalidTrapZoneCard(card.uid));
                }
            }
            let outside_trap_zone = player
                .deck
                .iter()
                .chain(player.hand.iter())
                .chain(player.field.iter())
                .chain(player.graveyard.iter());
            for card in outside_trap_zone {
                if card.is_set {
                    violations.push(BattleStateError::FaceDownOutsideTrapZone(card.uid));
                }
            }
            for card in player.all_cards() {
                if !seen.insert(card.uid) {
                    violations.push(BattleStateError::DuplicateUid(card.uid));
                }
            }
        }

        violations
    }

    /// First invariant violation, if any.
    pub fn validate(&self) -> Result<(), BattleStateError> {
        match self.check_invariants().into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    /// Compact binary snapshot for clients that render pushed state.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        postcard::to_allocvec(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        postcard::from_bytes(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

impl fmt::Display for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Battle {} | Turn {} | {}'s {} phase",
            self.battle_id,
            self.turn_number,
            self.player_name(self.turn_owner),
            self.phase
        )?;
        for (index, player) in self.players.iter().enumerate() {
            writeln!(
                f,
                "{} [{}] HP {}/{} | hand {} | deck {} | traps set {} | graveyard {}",
                player.player_name,
                index + 1,
                player.hp,
                MAX_HP,
                player.hand.len(),
                player.deck.len(),
                player.trap_zone.len(),
                player.graveyard.len()
            )?;
            if player.field.is_empty() {
                writeln!(f, "  (empty field)")?;
            }
            for card in &player.field {
                writeln!(f, "  {}", card)?;
            }
        }
        if let Some(outcome) = &self.outcome {
            writeln!(
                f,
                "Winner: {} ({})",
                self.player_name(outcome.winner),
                outcome.reason
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerType;
    use pretty_assertions::assert_eq;

    fn empty_state() -> BattleState {
        let p1 = BattlePlayer::new(
            "p1".to_string(),
            "Alice".to_string(),
            PlayerType::Human,
            vec![],
            MAX_HP,
        );
        let p2 = BattlePlayer::new(
            "p2".to_string(),
            "Bob".to_string(),
            PlayerType::Npc,
            vec![],
            MAX_HP,
        );
        BattleState::new("test".to_string(), p1, p2, BattleConfig::default())
    }

    #[test]
    fn test_log_keeps_most_recent_entries() {
        let mut state = empty_state();
        for turn in 0..60 {
            state.record_event(&BattleEvent::TurnStarted {
                player_index: 0,
                turn_number: turn,
            });
        }
        assert_eq!(state.log.len(), LOG_CAPACITY);
        let first = state.log.entries().next().map(|e| e.message.clone());
        assert_eq!(first, Some("=== Turn 10: Alice ===".to_string()));
        assert_eq!(state.log.last().map(|e| e.timestamp), Some(60));
    }

    #[test]
    fn test_silent_events_are_not_logged() {
        let mut state = empty_state();
        state.record_event(&BattleEvent::AttackTypeEffectiveness { multiplier: 1.0 });
        state.record_event(&BattleEvent::CardDiscarded {
            player_index: 0,
            uid: 1,
        });
        assert!(state.log.is_empty());
    }

    #[test]
    fn test_event_text_samples() {
        let state = empty_state();

        let damage = BattleEvent::PlayerDamaged {
            player_index: 1,
            amount: 800,
            remaining_hp: 7200,
        };
        assert_eq!(
            damage.format(&state),
            Some("Bob takes 800 damage! (7200 HP left)".to_string())
        );
        assert_eq!(damage.category(), LogCategory::Combat);

        let effective = BattleEvent::AttackTypeEffectiveness { multiplier: 1.5 };
        assert_eq!(effective.format(&state), Some("It's super effective!".to_string()));

        let over = BattleEvent::GameOver {
            winner: 0,
            reason: DefeatReason::DeckOut,
        };
        assert_eq!(
            over.format(&state),
            Some("Alice wins the battle! (deck_out)".to_string())
        );
    }

    #[test]
    fn test_scripted_rng_then_exhaustion() {
        let mut rng = TurnRng::new_for_test(vec![30, 70]);
        assert!(rng.roll(50, "first"));
        assert!(!rng.roll(50, "second"));
        assert!(!rng.roll(0, "never consumes"));
        assert_eq!(rng.next_outcome("exhausted"), 100);
    }

    #[test]
    fn test_pick_index_splits_range() {
        let mut rng = TurnRng::new_for_test(vec![1, 50, 51, 100]);
        assert_eq!(rng.pick_index(2, "a"), 0);
        assert_eq!(rng.pick_index(2, "b"), 0);
        assert_eq!(rng.pick_index(2, "c"), 1);
        assert_eq!(rng.pick_index(2, "d"), 1);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = TurnRng::from_seed(42);
        let mut b = TurnRng::from_seed(42);
        let rolls_a: Vec<u8> = (0..10).map(|_| a.next_outcome("x")).collect();
        let rolls_b: Vec<u8> = (0..10).map(|_| b.next_outcome("x")).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|r| (1..=100).contains(r)));
    }

    #[test]
    fn test_empty_state_has_no_violations() {
        let state = empty_state();
        assert_eq!(state.check_invariants(), vec![]);
        assert_eq!(state.validate(), Ok(()));
    }
}
