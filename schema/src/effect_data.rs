use crate::card_types::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// Status conditions that can sit on a field creature.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum StatusKind {
    Burn,
    Freeze,
    Paralyze,
    Poison,
    Sleep,
    Confuse,
}

impl StatusKind {
    /// Duration used when a card or effect does not specify one.
    pub fn default_duration(self) -> u8 {
        match self {
            StatusKind::Burn => 3,
            StatusKind::Freeze => 2,
            StatusKind::Paralyze => 1,
            StatusKind::Poison => 3,
            StatusKind::Sleep => 2,
            StatusKind::Confuse => 2,
        }
    }
}

/// When an ability fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityTrigger {
    OnSummon,
    OnAttack,
    OnDestroy,
    OnTurnStart,
    OnTurnEnd,
    OnDamage,
    Passive,
}

/// Who a triggered ability effect lands on, relative to the ability's card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    /// The card carrying the ability.
    This,
    /// The opposing creature named by the trigger event (defender, attacker, destroyer).
    Counterpart,
    AllEnemies,
    AllAllies,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityEffect {
    HealOwner {
        amount: u32,
    },
    DamageOpponent {
        amount: u32,
    },
    DrawCards {
        count: u8,
    },
    InflictStatus {
        status: StatusKind,
        duration: u8,
        target: EffectTarget,
    },
    ModifyStats {
        attack: i32,
        defense: i32,
        target: EffectTarget,
    },
    /// Return the most recently destroyed creature in the owner's graveyard to hand.
    ReviveLast,

    // Continuous effects, only meaningful with `AbilityTrigger::Passive`.
    StatBoost {
        attack: i32,
        defense: i32,
    },
    AllyAura {
        attack: i32,
        defense: i32,
    },
    Evasion {
        chance: u8,
    },
    ElementBoost {
        against: Element,
        attack: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityData {
    pub name: String,
    pub trigger: AbilityTrigger,
    pub effect: AbilityEffect,
}

/// The opponent action a face-down trap waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapCondition {
    OnAttack,
    OnDirectAttack,
    OnSummon,
    OnDestroy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrapEffect {
    NegateAttack,
    DamagePlayer { amount: u32 },
    Debuff { attack: i32, defense: i32 },
    InflictStatus { status: StatusKind, duration: u8 },
    DestroyTrigger,
    /// Leaves the owner at exactly 1 HP when the matching attack would be lethal.
    SurviveAtOne,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapData {
    pub condition: TrapCondition,
    pub effect: TrapEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealTarget {
    Owner,
    /// Creatures have no HP; resolved against the owner's HP pool.
    Ally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageTarget {
    SingleEnemy,
    AllEnemies,
    EnemyPlayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffTarget {
    SingleAlly,
    AllAllies,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpellEffect {
    Heal { amount: u32, target: HealTarget },
    Damage { amount: u32, target: DamageTarget },
    Buff { attack: i32, defense: i32, target: BuffTarget },
    Draw { count: u8 },
    Destroy,
    Status { status: StatusKind, duration: u8 },
    Revive { half_attack: bool },
}

impl fmt::Display for SpellEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpellEffect::Heal { amount, .. } => write!(f, "Restore {} HP", amount),
            SpellEffect::Damage { amount, target } => match target {
                DamageTarget::SingleEnemy => write!(f, "Deal {} damage to an enemy creature", amount),
                DamageTarget::AllEnemies => write!(f, "Deal {} damage to every enemy creature", amount),
                DamageTarget::EnemyPlayer => write!(f, "Deal {} damage to the opponent", amount),
            },
            SpellEffect::Buff { attack, defense, target } => {
                let who = match target {
                    BuffTarget::SingleAlly => "an ally",
                    BuffTarget::AllAllies => "all allies",
                };
                write!(f, "Give {} {:+} ATK / {:+} DEF", who, attack, defense)
            }
            SpellEffect::Draw { count } => write!(f, "Draw {} card(s)", count),
            SpellEffect::Destroy => write!(f, "Destroy an enemy creature"),
            SpellEffect::Status { status, duration } => {
                write!(f, "Inflict {} for {} turn(s)", status, duration)
            }
            SpellEffect::Revive { half_attack } => {
                if *half_attack {
                    write!(f, "Return your last destroyed creature to hand at half attack")
                } else {
                    write!(f, "Return your last destroyed creature to hand")
                }
            }
        }
    }
}
