// In: src/lib.rs

//! Card Battle Engine
//!
//! A deterministic two-player collectible card battle system: elemental combat,
//! status conditions, creature abilities, face-down traps and spells, driven through
//! a DRAW, MAIN, BATTLE, END turn cycle with an idempotent game-over latch.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod card;
pub mod card_data;
pub mod config;
pub mod decks;
pub mod errors;
pub mod mcp_interface;
pub mod player;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{
    AbilityData, AbilityEffect, AbilityTrigger, BuffTarget, CardId, CardKind, CardTemplate, DamageTarget,
    EffectTarget, Element, HealTarget, SpellEffect, StatusKind, TrapCondition, TrapData, TrapEffect,
};

// --- From this crate's modules (`src/`) ---

// Core battle engine functions and state.
pub use battle::engine::{
    advance, apply, get_valid_actions, resolve_pending, submit_action, validate_action, EngineInput,
};
pub use battle::state::{BattleEvent, BattleState, DefeatReason, GameOutcome, Phase, TurnRng};

// Drivers, opponents and observers.
pub use battle::ai::{Behavior, ScoringAI};
pub use battle::runner::{BattleRunner, ExecutionResult};
pub use battle::stats::{GameReport, MatchObserver};
pub use battle::view::BattleView;

// Core runtime types for a battle.
pub use card::{CardInst, Uid};
pub use config::{BattleConfig, BattleMode, Difficulty};
pub use player::{BattlePlayer, PlayerAction, PlayerType};

// Primary data access functions.
pub use card_data::{find_card_by_name, get_card_data};
pub use decks::{build_deck, get_available_decks, PlayerSetup};

// Crate-specific error and result types.
pub use errors::{
    ActionError, BattleEngineError, BattleResult, BattleStateError, CardDataError, CardDataResult, ConfigError,
    SnapshotError,
};
