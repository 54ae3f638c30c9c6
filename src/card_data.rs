use crate::errors::{CardDataError, CardDataResult};
use schema::{CardId, CardKind, CardTemplate, TrapCondition, TrapEffect};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{LazyLock, RwLock};
use tracing::{error, warn};

const BUILTIN_CARDS: &str = include_str!("../data/cards.ron");

// Global card library - seeded from the compiled-in data, replaceable at startup
static CARD_DATA: LazyLock<RwLock<HashMap<CardId, CardTemplate>>> =
    LazyLock::new(|| RwLock::new(builtin_library()));

fn builtin_library() -> HashMap<CardId, CardTemplate> {
    match parse_card_list(BUILTIN_CARDS) {
        Ok(cards) => cards,
        Err(e) => {
            error!("Built-in card library failed to parse: {}", e);
            HashMap::new()
        }
    }
}

/// Parse a RON list of card templates into a library keyed by id.
pub fn parse_card_list(source: &str) -> CardDataResult<HashMap<CardId, CardTemplate>> {
    let templates: Vec<CardTemplate> =
        ron::from_str(source).map_err(|e| CardDataError::MalformedData(e.to_string()))?;

    let mut library = HashMap::with_capacity(templates.len());
    for template in templates {
        if !check_payload(&template) {
            continue;
        }
        let id = template.id;
        if library.insert(id, template).is_some() {
            return Err(CardDataError::DuplicateCardId(id));
        }
    }
    Ok(library)
}

// Missing payloads are tolerated; the engine ignores the missing effect when the card is played.
// A survive-at-1 trap only ever fires on attacks, so any other condition drops the card.
fn check_payload(template: &CardTemplate) -> bool {
    let missing = match template.kind {
        CardKind::Creature => false,
        CardKind::Spell => template.spell.is_none(),
        CardKind::Trap => template.trap.is_none(),
    };
    if missing {
        warn!(
            "Card {} '{}' is a {} without an effect payload",
            template.id, template.name, template.kind
        );
    }

    if let Some(trap) = &template.trap {
        let attack_condition = matches!(trap.condition, TrapCondition::OnAttack | TrapCondition::OnDirectAttack);
        if trap.effect == TrapEffect::SurviveAtOne && !attack_condition {
            warn!(
                "Card {} '{}' skipped: a survive trap cannot wait for {:?}",
                template.id, template.name, trap.condition
            );
            return false;
        }
    }
    true
}

/// Replace the global library with cards loaded from disk.
/// `data_path` may be a single `.ron` file or a directory of them.
pub fn initialize_card_data(data_path: &Path) -> CardDataResult<usize> {
    let mut library = HashMap::new();

    let files: Vec<_> = if data_path.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(data_path)
            .map_err(|e| CardDataError::Io(e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("ron"))
            .collect();
        entries.sort();
        entries
    } else {
        vec![data_path.to_path_buf()]
    };

    for file in files {
        let content = fs::read_to_string(&file).map_err(|e| CardDataError::Io(e.to_string()))?;
        for (id, template) in parse_card_list(&content)? {
            if library.insert(id, template).is_some() {
                return Err(CardDataError::DuplicateCardId(id));
            }
        }
    }

    let count = library.len();
    let mut global_data = CARD_DATA.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *global_data = library;
    Ok(count)
}

/// Get the template for a card id from the global library
pub fn get_card_data(id: CardId) -> CardDataResult<CardTemplate> {
    let global_data = CARD_DATA.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    global_data
        .get(&id)
        .cloned()
        .ok_or(CardDataError::CardNotFound(id))
}

/// Case-insensitive lookup by card name.
pub fn find_card_by_name(name: &str) -> CardDataResult<CardTemplate> {
    let global_data = CARD_DATA.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    global_data
        .values()
        .find(|template| template.name.eq_ignore_ascii_case(name.trim()))
        .cloned()
        .ok_or_else(|| CardDataError::CardNameNotFound(name.to_string()))
}

/// Every card in the library, ordered by id.
pub fn all_cards() -> Vec<CardTemplate> {
    let global_data = CARD_DATA.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut cards: Vec<CardTemplate> = global_data.values().cloned().collect();
    cards.sort_by_key(|template| template.id);
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schema::{AbilityTrigger, SpellEffect};

    #[test]
    fn test_builtin_library_parses() {
        let library = parse_card_list(BUILTIN_CARDS).expect("built-in cards should parse");
        assert!(library.len() >= 30);

        for template in library.values() {
            match template.kind {
                CardKind::Creature => assert!(template.spell.is_none() && template.trap.is_none()),
                CardKind::Spell => assert!(template.spell.is_some(), "{}", template.name),
                CardKind::Trap => assert!(template.trap.is_some(), "{}", template.name),
            }
        }
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let by_id = get_card_data(42).expect("card 42 exists");
        let by_name = find_card_by_name("fireball").expect("lookup is case-insensitive");
        assert_eq!(by_id, by_name);
        assert!(matches!(by_id.spell, Some(SpellEffect::Damage { amount: 800, .. })));
    }

    #[test]
    fn test_missing_card_is_an_error() {
        assert_eq!(get_card_data(9999), Err(CardDataError::CardNotFound(9999)));
        assert!(matches!(
            find_card_by_name("Nonexistent Card"),
            Err(CardDataError::CardNameNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let source = r#"[
            (id: 1, name: "A", kind: Creature, attack: 100, defense: 100),
            (id: 1, name: "B", kind: Creature, attack: 200, defense: 200),
        ]"#;
        assert_eq!(parse_card_list(source), Err(CardDataError::DuplicateCardId(1)));
    }

    #[test]
    fn test_defaults_fill_optional_fields() {
        let source = r#"[
            (id: 5, name: "Plain", kind: Creature, attack: 100, defense: 100),
            (id: 6, name: "Snare", kind: Trap, trap: Some((condition: OnAttack, effect: NegateAttack))),
        ]"#;
        let library = parse_card_list(source).expect("valid RON");
        let plain = &library[&5];
        assert_eq!(plain.level, 1);
        assert_eq!(plain.element, schema::Element::Neutral);
        assert!(plain.ability.is_none());
        assert_eq!(
            library[&6].trap.as_ref().map(|t| t.effect.clone()),
            Some(TrapEffect::NegateAttack)
        );
    }

    #[test]
    fn test_survive_trap_needs_an_attack_condition() {
        let source = r#"[
            (id: 7, name: "Grit", kind: Trap, trap: Some((condition: OnAttack, effect: SurviveAtOne))),
            (id: 8, name: "Misplaced Grit", kind: Trap, trap: Some((condition: OnSummon, effect: SurviveAtOne))),
            (id: 9, name: "Buried Grit", kind: Trap, trap: Some((condition: OnDestroy, effect: SurviveAtOne))),
        ]"#;
        let library = parse_card_list(source).expect("valid RON");
        let mut ids: Vec<CardId> = library.keys().copied().collect();
        ids.sort();
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn test_phoenix_revives_on_destroy() {
        let phoenix = find_card_by_name("Phoenix Ascendant").expect("exists");
        assert_eq!(phoenix.level, 3);
        assert_eq!(
            phoenix.ability.map(|a| a.trigger),
            Some(AbilityTrigger::OnDestroy)
        );
    }
}
