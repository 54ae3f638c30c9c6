use crate::battle::engine;
use crate::battle::state::{BattleState, EventBus, Phase, TurnRng};
use crate::card::{CardInst, Uid};
use crate::config::BattleConfig;
use crate::errors::ActionError;
use crate::player::{BattlePlayer, PlayerAction, PlayerType, MAX_HP};
use schema::{
    AbilityData, AbilityEffect, AbilityTrigger, CardKind, CardTemplate, Element, SpellEffect, TrapCondition,
    TrapData, TrapEffect,
};

fn template(uid: Uid, name: &str, kind: CardKind) -> CardTemplate {
    CardTemplate {
        id: uid,
        name: name.to_string(),
        kind,
        element: Element::Neutral,
        level: 1,
        attack: 0,
        defense: 0,
        ability: None,
        spell: None,
        trap: None,
        description: String::new(),
    }
}

/// A level 1 creature with no ability. The uid doubles as its template id.
pub fn creature(uid: Uid, name: &str, element: Element, attack: u32, defense: u32) -> CardInst {
    creature_lv(uid, name, element, 1, attack, defense)
}

pub fn creature_lv(uid: Uid, name: &str, element: Element, level: u8, attack: u32, defense: u32) -> CardInst {
    let mut card = template(uid, name, CardKind::Creature);
    card.element = element;
    card.level = level;
    card.attack = attack;
    card.defense = defense;
    CardInst::new(uid, card)
}

/// Give a creature an ability.
pub fn with_ability(mut card: CardInst, name: &str, trigger: AbilityTrigger, effect: AbilityEffect) -> CardInst {
    card.template.ability = Some(AbilityData {
        name: name.to_string(),
        trigger,
        effect,
    });
    card
}

pub fn spell(uid: Uid, name: &str, effect: Option<SpellEffect>) -> CardInst {
    let mut card = template(uid, name, CardKind::Spell);
    card.spell = effect;
    CardInst::new(uid, card)
}

/// A trap card as it sits in the hand. `p1_traps`/`p2_traps` set it face-down.
pub fn trap(uid: Uid, name: &str, condition: TrapCondition, effect: TrapEffect) -> CardInst {
    let mut card = template(uid, name, CardKind::Trap);
    card.trap = Some(TrapData { condition, effect });
    CardInst::new(uid, card)
}

#[derive(Default)]
struct SideSetup {
    hand: Vec<CardInst>,
    field: Vec<CardInst>,
    traps: Vec<CardInst>,
    deck: Vec<CardInst>,
    graveyard: Vec<CardInst>,
    hp: Option<u32>,
}

impl SideSetup {
    fn build(self, id: &str, name: &str, player_type: PlayerType) -> BattlePlayer {
        let mut player = BattlePlayer::new(id.to_string(), name.to_string(), player_type, self.deck, self.hp.unwrap_or(MAX_HP));
        player.hand = self.hand;
        player.field = self.field;
        player.trap_zone = self
            .traps
            .into_iter()
            .map(|mut card| {
                card.is_set = true;
                card
            })
            .collect();
        for (index, card) in self.graveyard.into_iter().enumerate() {
            player.send_to_graveyard(card, index as u64 + 1);
        }
        player
    }
}

/// A builder for mid-battle test states.
///
/// Defaults to player 1's MAIN phase on turn 2, with player 2 as the player who went
/// first, so attacks are allowed. Both players start at full HP with empty zones.
pub struct TestBattleBuilder {
    p1: SideSetup,
    p2: SideSetup,
    phase: Phase,
    turn_owner: usize,
    first_player: usize,
    turn_number: u32,
    config: BattleConfig,
}

impl TestBattleBuilder {
    pub fn new() -> Self {
        Self {
            p1: SideSetup::default(),
            p2: SideSetup::default(),
            phase: Phase::Main,
            turn_owner: 0,
            first_player: 1,
            turn_number: 2,
            config: BattleConfig::default(),
        }
    }

    pub fn p1_hand(mut self, cards: Vec<CardInst>) -> Self {
        self.p1.hand = cards;
        self
    }

    pub fn p1_field(mut self, cards: Vec<CardInst>) -> Self {
        self.p1.field = cards;
        self
    }

    pub fn p1_traps(mut self, cards: Vec<CardInst>) -> Self {
        self.p1.traps = cards;
        self
    }

    pub fn p1_deck(mut self, cards: Vec<CardInst>) -> Self {
        self.p1.deck = cards;
        self
    }

    pub fn p1_graveyard(mut self, cards: Vec<CardInst>) -> Self {
        self.p1.graveyard = cards;
        self
    }

    pub fn p1_hp(mut self, hp: u32) -> Self {
        self.p1.hp = Some(hp);
        self
    }

    pub fn p2_hand(mut self, cards: Vec<CardInst>) -> Self {
        self.p2.hand = cards;
        self
    }

    pub fn p2_field(mut self, cards: Vec<CardInst>) -> Self {
        self.p2.field = cards;
        self
    }

    pub fn p2_traps(mut self, cards: Vec<CardInst>) -> Self {
        self.p2.traps = cards;
        self
    }

    pub fn p2_deck(mut self, cards: Vec<CardInst>) -> Self {
        self.p2.deck = cards;
        self
    }

    pub fn p2_graveyard(mut self, cards: Vec<CardInst>) -> Self {
        self.p2.graveyard = cards;
        self
    }

    pub fn p2_hp(mut self, hp: u32) -> Self {
        self.p2.hp = Some(hp);
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Hand the turn to `owner`. The other player is recorded as having gone first.
    pub fn turn(mut self, owner: usize) -> Self {
        self.turn_owner = owner;
        self.first_player = 1 - owner;
        self
    }

    /// Turn 1 with the current owner as the starting player.
    pub fn first_turn(mut self) -> Self {
        self.turn_number = 1;
        self.first_player = self.turn_owner;
        self
    }

    pub fn config(mut self, config: BattleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> BattleState {
        let player1 = self.p1.build("p1", "Player 1", PlayerType::Human);
        let player2 = self.p2.build("p2", "Player 2", PlayerType::Npc);
        let mut state = BattleState::new("test_battle".to_string(), player1, player2, self.config);
        state.phase = self.phase;
        state.turn_owner = self.turn_owner;
        state.first_player = self.first_player;
        state.turn_number = self.turn_number;
        state.clock = 100;
        state
    }
}

/// A `TurnRng` that never triggers chance effects (every roll is 100).
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![100; 100])
}

/// Submit an action and drain the queue, the way a headless caller would.
pub fn act(state: &mut BattleState, rng: &mut TurnRng, player_index: usize, action: PlayerAction) -> Result<EventBus, ActionError> {
    let mut bus = engine::submit_action(state, player_index, action)?;
    bus.extend(engine::resolve_pending(state, rng));
    Ok(bus)
}

/// Fails the test with every violation listed.
pub fn assert_invariants(state: &BattleState) {
    let violations = state.check_invariants();
    assert!(violations.is_empty(), "invariant violations: {:?}", violations);
}
