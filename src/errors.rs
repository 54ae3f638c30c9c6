use crate::battle::state::Phase;
use crate::card::Uid;
use schema::{CardId, CardKind};
use thiserror::Error;

/// Main error type for the card battle engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleEngineError {
    /// Error related to card library lookup or parsing
    #[error("Card data error: {0}")]
    CardData(#[from] CardDataError),
    /// Error related to battle configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Error related to invalid player actions
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
    /// Error related to state snapshots
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    /// Error related to invalid battle state
    #[error("Battle state error: {0}")]
    BattleState(#[from] BattleStateError),
}

/// Errors related to card library operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardDataError {
    #[error("Card not found: {0}")]
    CardNotFound(CardId),
    #[error("No card named '{0}'")]
    CardNameNotFound(String),
    #[error("Deck not found: {0}")]
    DeckNotFound(String),
    #[error("Duplicate card id {0} in library")]
    DuplicateCardId(CardId),
    #[error("Malformed card data: {0}")]
    MalformedData(String),
    #[error("Could not read card data: {0}")]
    Io(String),
}

/// Errors related to loading a battle configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Malformed config: {0}")]
    Malformed(String),
    #[error("Could not read config: {0}")]
    Io(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Reasons a player action is refused. Rejections never change the battle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("the battle is already over")]
    GameFinished,
    #[error("an action is still resolving")]
    Busy,
    #[error("invalid player index {0}")]
    InvalidPlayerIndex(usize),
    #[error("it is not player {0}'s turn")]
    NotYourTurn(usize),
    #[error("not allowed during the {actual} phase")]
    WrongPhase { actual: Phase },
    #[error("card #{0} is not in hand")]
    CardNotInHand(Uid),
    #[error("card #{0} is not on the field")]
    CardNotOnField(Uid),
    #[error("card #{uid} is not a {expected}")]
    WrongCardKind { uid: Uid, expected: CardKind },
    #[error("{required} sacrifice(s) required but {offered} offered")]
    SacrificeCountMismatch { required: usize, offered: usize },
    #[error("card #{0} cannot be sacrificed")]
    InvalidSacrifice(Uid),
    #[error("the field is full")]
    FieldFull,
    #[error("the trap zone is full")]
    TrapZoneFull,
    #[error("card #{0} has already attacked this turn")]
    AlreadyAttacked(Uid),
    #[error("the first player cannot attack on the first turn")]
    FirstTurnNoAttack,
    #[error("this action needs a target")]
    TargetRequired,
    #[error("card #{0} is not a valid target")]
    InvalidTarget(Uid),
    #[error("a direct attack needs an empty opposing field")]
    DirectAttackBlocked,
}

/// Errors related to snapshot encoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("could not encode snapshot: {0}")]
    Encode(String),
    #[error("could not decode snapshot: {0}")]
    Decode(String),
}

/// Invariant violations detected in a battle state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleStateError {
    #[error("player {player} has out-of-range HP {hp}")]
    HpOutOfRange { player: usize, hp: u32 },
    #[error("player {player} has {len} cards on the field")]
    FieldOverCapacity { player: usize, len: usize },
    #[error("player {player} has {len} cards in the trap zone")]
    TrapZoneOverCapacity { player: usize, len: usize },
    #[error("card #{0} appears in more than one zone")]
    DuplicateUid(Uid),
    #[error("card #{0} is on the field but is not a creature")]
    NonCreatureOnField(Uid),
    #[error("card #{0} is in the trap zone but is not a set trap")]
    InvalidTrapZoneCard(Uid),
    #[error("card #{0} is face-down outside the trap zone")]
    FaceDownOutsideTrapZone(Uid),
}

/// Type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Type alias for Results using CardDataError
pub type CardDataResult<T> = Result<T, CardDataError>;
