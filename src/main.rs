use card_battle::battle::ai::ScoringAI;
use card_battle::battle::runner::BattleRunner;
use card_battle::battle::stats::{GameReport, MatchObserver};
use card_battle::card_data::initialize_card_data;
use card_battle::config::BattleConfig;
use card_battle::decks::{get_available_decks, PlayerSetup};
use card_battle::player::PlayerType;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MAX_TURNS: u32 = 200;

struct ReportPrinter;

impl MatchObserver for ReportPrinter {
    fn on_game_end(&mut self, report: &GameReport) {
        info!(
            winner = report.winner,
            reason = %report.reason,
            turns = report.turns,
            damage_dealt = report.damage_dealt,
            cards_destroyed = report.cards_destroyed,
            perfect = report.perfect,
            "game report"
        );
    }
}

/// Usage: card-battle [config.ron] [cards.ron | card directory]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => match BattleConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading config {}: {}", path, e);
                return;
            }
        },
        None => BattleConfig::default(),
    };

    if let Some(path) = args.next() {
        match initialize_card_data(Path::new(&path)) {
            Ok(count) => info!("Loaded {} cards from {}", count, path),
            Err(e) => {
                error!("Error loading cards from {}: {}", path, e);
                return;
            }
        }
    }

    let decks = get_available_decks();
    let (Some(first), Some(second)) = (decks.first(), decks.get(1)) else {
        error!("Need at least two decks to run a demo battle");
        return;
    };

    let setups = match (
        PlayerSetup::from_deck(&first.name, "npc_1", "Challenger", PlayerType::Npc),
        PlayerSetup::from_deck(&second.name, "npc_2", "Defender", PlayerType::Npc),
    ) {
        (Ok(a), Ok(b)) => [a, b],
        (Err(e), _) | (_, Err(e)) => {
            error!("Error building decks: {}", e);
            return;
        }
    };

    println!("{} vs {}", first.name, second.name);
    println!();

    let difficulty = config.difficulty;
    let mut runner = BattleRunner::new("demo", config, setups)
        .with_strategy(0, Box::new(ScoringAI::new(difficulty)))
        .with_strategy(1, Box::new(ScoringAI::new(difficulty)));
    runner.add_observer(Box::new(ReportPrinter));

    while !runner.is_battle_ended() && runner.state().turn_number <= MAX_TURNS {
        if runner.npc_to_move().is_none() {
            break;
        }
        let result = runner.play_npc_turn();
        for event in &result.events {
            if let Some(line) = event.format(runner.state()) {
                println!("{}", line);
            }
        }
    }

    println!();
    println!("{}", runner.state());
    match runner.get_winner() {
        Some(winner) => println!("Winner: {}", runner.state().player_name(winner)),
        None => println!("No winner after {} turns", MAX_TURNS),
    }
}
