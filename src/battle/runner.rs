use crate::battle::ai::Behavior;
use crate::battle::engine::{self, get_valid_actions};
use crate::battle::state::{BattleEvent, BattleState, EventBus, Phase, TurnRng};
use crate::battle::stats::{GameReport, MatchObserver};
use crate::battle::view::BattleView;
use crate::config::BattleConfig;
use crate::decks::PlayerSetup;
use crate::errors::ActionError;
use crate::player::PlayerAction;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on decisions a strategy may take in one turn before the runner ends it.
pub const MAX_NPC_ACTIONS_PER_TURN: usize = 32;

/// Result of executing one input or a stretch of resolution steps
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub events: Vec<BattleEvent>,
    pub phase: Phase,
    pub turn_owner: usize,
    pub battle_ended: bool,
    pub winner: Option<usize>,
}

/// High-level battle management: owns the state, the RNG and any opponent strategies.
/// Human input and strategy decisions go through the same validation.
pub struct BattleRunner {
    battle_state: BattleState,
    rng: TurnRng,
    strategies: [Option<Box<dyn Behavior + Send>>; 2],
    observers: Vec<Box<dyn MatchObserver>>,
    reported: bool,
    origin: Option<(String, BattleConfig, [PlayerSetup; 2])>, // Kept for restarts
}

impl BattleRunner {
    /// Start a fresh battle and resolve the starter's DRAW phase.
    pub fn new(battle_id: impl Into<String>, config: BattleConfig, setups: [PlayerSetup; 2]) -> Self {
        let battle_id = battle_id.into();
        let mut rng = TurnRng::from_config(&config);
        let battle_state = BattleState::start_battle(battle_id.clone(), config.clone(), setups.clone(), &mut rng);

        let mut runner = Self {
            battle_state,
            rng,
            strategies: [None, None],
            observers: Vec::new(),
            reported: false,
            origin: Some((battle_id, config, setups)),
        };
        runner.run_until_idle();
        runner
    }

    /// Wrap an already prepared state. Such a runner cannot restart.
    pub fn from_state(battle_state: BattleState, rng: TurnRng) -> Self {
        Self {
            battle_state,
            rng,
            strategies: [None, None],
            observers: Vec::new(),
            reported: false,
            origin: None,
        }
    }

    /// Let a strategy play for `player_index`.
    pub fn with_strategy(mut self, player_index: usize, strategy: Box<dyn Behavior + Send>) -> Self {
        if let Some(slot) = self.strategies.get_mut(player_index) {
            *slot = Some(strategy);
        }
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn MatchObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &BattleState {
        &self.battle_state
    }

    pub fn view(&self, player_index: usize) -> BattleView {
        BattleView::for_player(&self.battle_state, player_index)
    }

    pub fn valid_actions(&self, player_index: usize) -> Vec<PlayerAction> {
        get_valid_actions(&self.battle_state, player_index)
    }

    pub fn is_battle_ended(&self) -> bool {
        self.battle_state.is_finished()
    }

    pub fn get_winner(&self) -> Option<usize> {
        self.battle_state.winner()
    }

    pub fn report(&self) -> Option<&GameReport> {
        self.battle_state.report.as_ref()
    }

    /// Validate and fully resolve one action.
    pub fn submit_action(&mut self, player_index: usize, action: PlayerAction) -> Result<ExecutionResult, ActionError> {
        let mut bus = engine::submit_action(&mut self.battle_state, player_index, action)?;
        bus.extend(engine::resolve_pending(&mut self.battle_state, &mut self.rng));
        Ok(self.finish_step(bus))
    }

    /// Execute a single pending step.
    pub fn tick(&mut self) -> ExecutionResult {
        let bus = engine::advance(&mut self.battle_state, &mut self.rng);
        self.finish_step(bus)
    }

    pub fn run_until_idle(&mut self) -> ExecutionResult {
        let bus = engine::resolve_pending(&mut self.battle_state, &mut self.rng);
        self.finish_step(bus)
    }

    /// Paced driver for presentation: one step per `delay`.
    pub async fn advance_paced(&mut self, delay: Duration) -> ExecutionResult {
        let mut bus = EventBus::new();
        while self.battle_state.is_busy() && !self.battle_state.is_finished() {
            tokio::time::sleep(delay).await;
            bus.extend(engine::advance(&mut self.battle_state, &mut self.rng));
        }
        self.finish_step(bus)
    }

    /// The player a strategy should move for right now, if any.
    pub fn npc_to_move(&self) -> Option<usize> {
        let state = &self.battle_state;
        let owner = state.turn_owner;
        if state.is_finished() || state.is_busy() || self.strategies[owner].is_none() {
            return None;
        }
        Some(owner)
    }

    /// Ask the turn owner's strategy for one decision and resolve it.
    pub fn step_npc(&mut self) -> Option<Result<ExecutionResult, ActionError>> {
        let player_index = self.npc_to_move()?;
        let view = self.view(player_index);
        let legal = self.valid_actions(player_index);
        let strategy = self.strategies[player_index].as_ref()?;
        let decision = strategy.decide_action(&view, &legal, &mut self.rng);
        debug!(player_index, %decision, "strategy decided");
        Some(self.submit_action(player_index, decision))
    }

    /// Let the strategy play until its turn is over.
    pub fn play_npc_turn(&mut self) -> ExecutionResult {
        let mut events = Vec::new();
        let Some(player_index) = self.npc_to_move() else {
            return self.finish_step(EventBus::new());
        };

        for _ in 0..MAX_NPC_ACTIONS_PER_TURN {
            if self.npc_to_move() != Some(player_index) {
                break;
            }
            match self.step_npc() {
                Some(Ok(result)) => events.extend(result.events),
                Some(Err(error)) => {
                    warn!(player_index, %error, "strategy chose an illegal action, passing");
                    match self.submit_action(player_index, PlayerAction::Wait) {
                        Ok(result) => events.extend(result.events),
                        Err(_) => break,
                    }
                }
                None => break,
            }
        }

        if self.npc_to_move() == Some(player_index) {
            warn!(player_index, "strategy did not finish its turn, ending it");
            if let Ok(result) = self.submit_action(player_index, PlayerAction::EndTurn) {
                events.extend(result.events);
            }
        }

        let mut result = self.finish_step(EventBus::new());
        result.events = events;
        result
    }

    /// Play strategy turns until the battle ends, a human must act or `max_turns` pass.
    pub fn run_to_completion(&mut self, max_turns: u32) -> ExecutionResult {
        let mut events = self.run_until_idle().events;
        while !self.battle_state.is_finished() && self.battle_state.turn_number <= max_turns {
            if self.npc_to_move().is_none() {
                break;
            }
            events.extend(self.play_npc_turn().events);
        }
        let mut result = self.finish_step(EventBus::new());
        result.events = events;
        result
    }

    /// Discard the battle and start over with the same decks and configuration.
    pub fn restart(&mut self) -> bool {
        let Some((battle_id, config, setups)) = self.origin.clone() else {
            return false;
        };
        self.rng = TurnRng::from_config(&config);
        self.battle_state = BattleState::start_battle(battle_id, config, setups, &mut self.rng);
        self.reported = false;
        self.run_until_idle();
        true
    }

    fn finish_step(&mut self, bus: EventBus) -> ExecutionResult {
        if let (false, Some(report)) = (self.reported, self.battle_state.report.as_ref()) {
            for observer in self.observers.iter_mut() {
                observer.on_game_end(report);
            }
            self.reported = true;
        }

        ExecutionResult {
            events: bus.events().to_vec(),
            phase: self.battle_state.phase,
            turn_owner: self.battle_state.turn_owner,
            battle_ended: self.battle_state.is_finished(),
            winner: self.battle_state.winner(),
        }
    }
}
