//! Text front-end for the MCP server
//!
//! Display, lookup and action helpers that turn battle state and events into plain text
//! for a conversational client. The human always sits at index 0 and the computer opponent
//! at index 1.

use crate::battle::ai::ScoringAI;
use crate::battle::runner::{BattleRunner, ExecutionResult};
use crate::battle::state::{BattleEvent, BattleState};
use crate::battle::view::BattleView;
use crate::card::Uid;
use crate::card_data::find_card_by_name;
use crate::config::{BattleConfig, Difficulty};
use crate::decks::{get_available_decks, PlayerSetup};
use crate::player::{PlayerAction, PlayerType};
use schema::{CardKind, CardTemplate};

pub const HUMAN: usize = 0;
pub const OPPONENT: usize = 1;

/// Returns formatted text listing the prebuilt decks
pub fn get_available_decks_display() -> String {
    let mut output = String::from("Available Decks:\n");
    for (i, deck) in get_available_decks().iter().enumerate() {
        output.push_str(&format!("  {}. {} - {}\n", i + 1, deck.name, deck.description));
    }
    output
}

pub fn parse_difficulty(name: &str) -> Result<Difficulty, String> {
    match name.trim().to_lowercase().as_str() {
        "" | "normal" => Ok(Difficulty::Normal),
        "easy" => Ok(Difficulty::Easy),
        "hard" => Ok(Difficulty::Hard),
        other => Err(format!("Unknown difficulty '{}'. Use easy, normal or hard.", other)),
    }
}

/// Creates a battle against the computer with the chosen deck and returns the opening text.
/// The opponent plays the next deck in the list.
pub fn create_battle(deck_choice: usize, difficulty: Difficulty, seed: Option<u64>) -> Result<(BattleRunner, String), String> {
    let decks = get_available_decks();
    if deck_choice == 0 || deck_choice > decks.len() {
        return Err(format!("Invalid deck choice. Please choose 1-{}", decks.len()));
    }
    let player_deck = &decks[deck_choice - 1];
    let opponent_deck = &decks[deck_choice % decks.len()];

    let human = PlayerSetup::from_deck(&player_deck.name, "human_player", "Player", PlayerType::Human)
        .map_err(|e| format!("Failed to build your deck: {}", e))?;
    let npc = PlayerSetup::from_deck(&opponent_deck.name, "npc_opponent", "Rival Duelist", PlayerType::Npc)
        .map_err(|e| format!("Failed to build the opponent deck: {}", e))?;

    let config = BattleConfig {
        difficulty,
        rng_seed: seed,
        ..BattleConfig::default()
    };
    let mut runner = BattleRunner::new("mcp_battle", config, [human, npc])
        .with_strategy(OPPONENT, Box::new(ScoringAI::new(difficulty)));

    let mut intro = format!(
        "Welcome to the Card Battle Engine!\n\nYou chose {}. {} answers with {}.\n",
        player_deck.name,
        runner.state().player_name(OPPONENT),
        opponent_deck.name
    );
    if runner.state().first_player == HUMAN {
        intro.push_str("You go first, but you cannot attack this turn.\n");
    } else {
        intro.push_str("Your opponent goes first.\n\n");
        let result = runner.play_npc_turn();
        intro.push_str(&format_events(&result.events, runner.state()));
    }
    intro.push('\n');
    intro.push_str(&get_battle_status_summary(&runner));

    Ok((runner, intro))
}

/// Header line plus the public board and the human's private zones
pub fn get_battle_status_summary(runner: &BattleRunner) -> String {
    let state = runner.state();
    let mut output = String::new();

    match state.winner() {
        Some(HUMAN) => output.push_str("Battle Over - You Won!\n"),
        Some(_) => output.push_str("Battle Over - You Lost!\n"),
        None if state.turn_owner == HUMAN => output.push_str("Your turn\n"),
        None => output.push_str("Opponent's turn\n"),
    }

    output.push_str(&state.to_string());
    output.push_str(&display_hand(&runner.view(HUMAN)));
    output
}

/// The human's hand and set traps, with the ids the action tools expect
pub fn display_hand(view: &BattleView) -> String {
    let mut output = String::from("--- Your Hand ---\n");
    if view.me.hand.is_empty() {
        output.push_str("  (empty)\n");
    }
    for card in &view.me.hand {
        output.push_str(&format!("  {}\n", card));
    }
    if !view.me.trap_zone.is_empty() {
        output.push_str("--- Your Set Traps ---\n");
        for card in &view.me.trap_zone {
            output.push_str(&format!("  {}\n", card));
        }
    }
    output
}

/// Every action the human could take right now
pub fn display_valid_actions(runner: &BattleRunner) -> String {
    let actions = runner.valid_actions(HUMAN);
    if actions.is_empty() {
        return "You have no actions available right now.".to_string();
    }
    let mut output = String::from("--- Legal Actions ---\n");
    for action in actions {
        output.push_str(&format!("  {}\n", action));
    }
    output
}

/// The most recent `count` log lines, oldest first
pub fn display_battle_log(state: &BattleState, count: usize) -> String {
    let entries: Vec<String> = state
        .log
        .entries()
        .map(|entry| format!("[{}] {}", entry.category, entry.message))
        .collect();
    if entries.is_empty() {
        return "The battle log is empty.".to_string();
    }
    let skip = entries.len().saturating_sub(count);
    let mut output = String::from("--- Battle Log ---\n");
    for line in &entries[skip..] {
        output.push_str(line);
        output.push('\n');
    }
    output
}

/// The human's view of the battle as JSON
pub fn view_as_json(runner: &BattleRunner) -> Result<String, String> {
    serde_json::to_string_pretty(&runner.view(HUMAN)).map_err(|e| format!("Could not encode the view: {}", e))
}

fn describe_template(card: &CardTemplate) -> String {
    let mut output = format!("--- {} (#{}) ---\n", card.name, card.id);
    match card.kind {
        CardKind::Creature => {
            output.push_str(&format!(
                "Creature | {} | Level {} | ATK {} / DEF {}\n",
                card.element, card.level, card.attack, card.defense
            ));
            let sacrifices = card.sacrifice_required();
            if sacrifices > 0 {
                output.push_str(&format!("Requires {} sacrifice(s) to summon\n", sacrifices));
            }
            if let Some(ability) = &card.ability {
                output.push_str(&format!(
                    "Ability: {} ({:?}) {:?}\n",
                    ability.name, ability.trigger, ability.effect
                ));
            }
        }
        CardKind::Spell => match &card.spell {
            Some(effect) => output.push_str(&format!("Spell | {}\n", effect)),
            None => output.push_str("Spell | no effect\n"),
        },
        CardKind::Trap => match &card.trap {
            Some(trap) => output.push_str(&format!("Trap | {:?} -> {:?}\n", trap.condition, trap.effect)),
            None => output.push_str("Trap | no effect\n"),
        },
    }
    if !card.description.is_empty() {
        output.push_str(&card.description);
        output.push('\n');
    }
    output
}

/// Handles the "lookup card" command
pub fn handle_lookup_card_command(card_name: &str) -> String {
    if card_name.trim().is_empty() {
        return "What card do you want to look up? (e.g., 'Ember Imp')".to_string();
    }
    match find_card_by_name(card_name) {
        Ok(card) => describe_template(&card),
        Err(_) => format!("The card '{}' was not found.", card_name),
    }
}

pub fn execute_summon_action(runner: &mut BattleRunner, card_id: Uid, sacrifices: Vec<Uid>) -> Result<String, String> {
    execute_player_action(runner, PlayerAction::Summon { card_id, sacrifices })
}

pub fn execute_spell_action(runner: &mut BattleRunner, card_id: Uid, target_id: Option<Uid>) -> Result<String, String> {
    execute_player_action(runner, PlayerAction::UseSpell { card_id, target_id })
}

pub fn execute_set_trap_action(runner: &mut BattleRunner, card_id: Uid) -> Result<String, String> {
    execute_player_action(runner, PlayerAction::SetTrap { card_id })
}

pub fn execute_attack_action(runner: &mut BattleRunner, card_id: Uid, target_id: Option<Uid>) -> Result<String, String> {
    execute_player_action(runner, PlayerAction::Attack { card_id, target_id })
}

pub fn execute_go_to_battle_action(runner: &mut BattleRunner) -> Result<String, String> {
    execute_player_action(runner, PlayerAction::GoToBattle)
}

pub fn execute_end_turn_action(runner: &mut BattleRunner) -> Result<String, String> {
    execute_player_action(runner, PlayerAction::EndTurn)
}

/// Internal helper: run the human's action, then the opponent's whole turn if it came up
fn execute_player_action(runner: &mut BattleRunner, action: PlayerAction) -> Result<String, String> {
    let result = runner
        .submit_action(HUMAN, action)
        .map_err(|e| format!("Invalid action: {}", e))?;
    let mut output = format_events(&result.events, runner.state());

    if runner.npc_to_move() == Some(OPPONENT) {
        output.push_str("\n--- Opponent's Turn ---\n");
        let npc_turn = runner.play_npc_turn();
        output.push_str(&format_events(&npc_turn.events, runner.state()));
    }

    output.push_str(&outcome_text(runner));
    Ok(output)
}

fn outcome_text(runner: &BattleRunner) -> String {
    let state = runner.state();
    match (state.winner(), runner.report()) {
        (Some(HUMAN), Some(report)) if report.perfect => "\nYou won the battle without taking a scratch!\n".to_string(),
        (Some(HUMAN), _) => "\nYou won the battle!\n".to_string(),
        (Some(_), _) => "\nYou lost the battle!\n".to_string(),
        (None, _) if state.turn_owner == HUMAN => format!("\nYour turn ({} phase).\n", state.phase),
        (None, _) => String::new(),
    }
}

/// Formats a list of events, dropping the silent ones
pub fn format_events(events: &[BattleEvent], state: &BattleState) -> String {
    let mut output = String::new();
    for event in events {
        if let Some(text) = event.format(state) {
            output.push_str(&text);
            output.push('\n');
        }
    }
    output
}

/// Checks if the battle is over
pub fn is_battle_over(runner: &BattleRunner) -> bool {
    runner.is_battle_ended()
}

/// One-line summary of a step, used by the demo binary
pub fn summarize_result(result: &ExecutionResult, state: &BattleState) -> String {
    match result.winner {
        Some(winner) => format!("{} wins on turn {}", state.player_name(winner), state.turn_number),
        None => format!(
            "Turn {}: {} in {} phase",
            state.turn_number,
            state.player_name(result.turn_owner),
            result.phase
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deck_list_numbers_every_deck() {
        let text = get_available_decks_display();
        assert!(text.contains("1. Blazing Fury"));
        assert!(text.contains("3. Twilight Pact"));
    }

    #[test]
    fn test_invalid_deck_choice() {
        assert!(create_battle(0, Difficulty::Normal, Some(1)).is_err());
        assert!(create_battle(9, Difficulty::Normal, Some(1)).is_err());
    }

    #[test]
    fn test_new_battle_waits_for_the_human() {
        let (runner, intro) = create_battle(1, Difficulty::Normal, Some(5)).expect("valid deck");

        assert!(intro.contains("Blazing Fury"));
        assert_eq!(runner.state().turn_owner, HUMAN);
        assert!(!runner.is_battle_ended());
    }

    #[test]
    fn test_illegal_action_is_explained() {
        let (mut runner, _) = create_battle(2, Difficulty::Easy, Some(5)).expect("valid deck");

        let result = execute_attack_action(&mut runner, 9999, None);

        assert!(result.is_err());
    }

    #[test]
    fn test_ending_turn_lets_the_opponent_play() {
        let (mut runner, _) = create_battle(2, Difficulty::Normal, Some(8)).expect("valid deck");
        let turn_before = runner.state().turn_number;

        let text = execute_end_turn_action(&mut runner).expect("ending the turn is legal");

        assert!(text.contains("Opponent's Turn"));
        assert!(runner.is_battle_ended() || runner.state().turn_number == turn_before + 2);
    }

    #[test]
    fn test_lookup_card() {
        assert!(handle_lookup_card_command("").starts_with("What card"));
        assert!(handle_lookup_card_command("No Such Card").contains("was not found"));
        assert!(handle_lookup_card_command("ember imp").starts_with("--- Ember Imp"));
    }

    #[test]
    fn test_parse_difficulty() {
        assert_eq!(parse_difficulty("HARD"), Ok(Difficulty::Hard));
        assert_eq!(parse_difficulty(""), Ok(Difficulty::Normal));
        assert!(parse_difficulty("brutal").is_err());
    }
}
