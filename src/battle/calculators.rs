use schema::Element;

/// A creature's combat-ready numbers, after passives, abilities and status adjustments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combatant {
    pub element: Element,
    pub attack: f64,
    pub defense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatOutcome {
    pub multiplier: f64,
    pub effective_attack: u32,
    pub effective_defense: u32,
    pub attacker_destroyed: bool,
    pub defender_destroyed: bool,
    pub damage_to_attacker_owner: u32,
    pub damage_to_defender_owner: u32,
}

/// Resolve one creature-vs-creature strike.
///
/// Pure: the same inputs always give the same outcome. Defense absorbs the strike,
/// and whatever is not absorbed spills over onto the losing creature's owner.
pub fn resolve_combat(attacker: &Combatant, defender: &Combatant) -> CombatOutcome {
    let multiplier = Element::type_effectiveness(attacker.element, defender.element);
    let effective_attack = round_stat(attacker.attack * multiplier);
    let effective_defense = round_stat(defender.defense);

    let mut outcome = CombatOutcome {
        multiplier,
        effective_attack,
        effective_defense,
        attacker_destroyed: false,
        defender_destroyed: false,
        damage_to_attacker_owner: 0,
        damage_to_defender_owner: 0,
    };

    if effective_attack > effective_defense {
        outcome.defender_destroyed = true;
        outcome.damage_to_defender_owner = effective_attack - effective_defense;
    } else if effective_attack < effective_defense {
        outcome.attacker_destroyed = true;
        outcome.damage_to_attacker_owner = effective_defense - effective_attack;
    } else {
        outcome.attacker_destroyed = true;
        outcome.defender_destroyed = true;
    }

    outcome
}

/// Damage from a strike at the opposing player. No type multiplier applies.
pub fn direct_attack_damage(attacker: &Combatant) -> u32 {
    round_stat(attacker.attack)
}

fn round_stat(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}
