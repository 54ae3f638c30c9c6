//! Card Battle MCP Server
//!
//! A Model Context Protocol server over stdio that lets an LLM client play a battle
//! against the built-in opponent through plain-text tool results.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard};

use card_battle::battle::runner::BattleRunner;
use card_battle::mcp_interface::*;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, *},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

const NO_BATTLE: &str = "No battle is currently active. Use 'start_battle' to begin.";

#[derive(Clone)]
pub struct CardBattleService {
    tool_router: ToolRouter<CardBattleService>,
    battle: Arc<Mutex<Option<BattleRunner>>>,
}

// Tool request structures
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StartBattleRequest {
    #[schemars(description = "Deck number to play (1-3)")]
    pub deck_choice: u8,
    #[schemars(description = "Opponent difficulty: easy, normal or hard (default normal)")]
    pub difficulty: Option<String>,
    #[schemars(description = "Optional seed for a reproducible battle")]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LookupCardRequest {
    #[schemars(description = "Name of the card to look up")]
    pub card_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SummonRequest {
    #[schemars(description = "Id of the creature in your hand, as shown after '#'")]
    pub card_id: u32,
    #[schemars(description = "Ids of the hand or field cards to sacrifice (level 2 needs 1, level 3 needs 2)")]
    #[serde(default)]
    pub sacrifices: Vec<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CastSpellRequest {
    #[schemars(description = "Id of the spell in your hand")]
    pub card_id: u32,
    #[schemars(description = "Id of the target creature, for spells that need one")]
    pub target_id: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetTrapRequest {
    #[schemars(description = "Id of the trap in your hand")]
    pub card_id: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AttackRequest {
    #[schemars(description = "Id of your attacking creature")]
    pub card_id: u32,
    #[schemars(description = "Id of the enemy creature to attack; omit for a direct attack on an empty field")]
    pub target_id: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BattleLogRequest {
    #[schemars(description = "How many recent lines to show (default 20)")]
    pub count: Option<usize>,
}

fn text_result(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn internal_error(message: String) -> McpError {
    McpError {
        code: ErrorCode(-32603),
        message: Cow::from(message),
        data: None,
    }
}

#[tool_router]
impl CardBattleService {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
            battle: Arc::new(Mutex::new(None)),
        }
    }

    fn lock_battle(&self) -> MutexGuard<'_, Option<BattleRunner>> {
        self.battle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run an action against the active battle, reporting failures as text.
    fn act<F>(&self, action: F) -> Result<CallToolResult, McpError>
    where
        F: FnOnce(&mut BattleRunner) -> Result<String, String>,
    {
        let text = match self.lock_battle().as_mut() {
            Some(runner) => match action(runner) {
                Ok(result) => result,
                Err(e) => format!("Error: {}", e),
            },
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "List all available pre-built decks")]
    async fn list_decks(&self) -> Result<CallToolResult, McpError> {
        text_result(get_available_decks_display())
    }

    #[tool(description = "Start a new battle against the computer with the selected deck")]
    async fn start_battle(
        &self,
        Parameters(request): Parameters<StartBattleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let difficulty = parse_difficulty(request.difficulty.as_deref().unwrap_or(""))
            .map_err(internal_error)?;
        match create_battle(request.deck_choice as usize, difficulty, request.seed) {
            Ok((runner, intro_text)) => {
                *self.lock_battle() = Some(runner);
                text_result(intro_text)
            }
            Err(e) => Err(internal_error(format!("Error starting battle: {}", e))),
        }
    }

    #[tool(description = "Get the board, both players' HP and your hand")]
    async fn get_battle_state(&self) -> Result<CallToolResult, McpError> {
        let text = match self.lock_battle().as_ref() {
            Some(runner) => get_battle_status_summary(runner),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "List every action you can legally take right now")]
    async fn legal_actions(&self) -> Result<CallToolResult, McpError> {
        let text = match self.lock_battle().as_ref() {
            Some(runner) => display_valid_actions(runner),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "Get your view of the battle as JSON")]
    async fn get_battle_view(&self) -> Result<CallToolResult, McpError> {
        match self.lock_battle().as_ref() {
            Some(runner) => text_result(view_as_json(runner).map_err(internal_error)?),
            None => text_result(NO_BATTLE.to_string()),
        }
    }

    #[tool(description = "Show the most recent battle log lines")]
    async fn battle_log(
        &self,
        Parameters(request): Parameters<BattleLogRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = match self.lock_battle().as_ref() {
            Some(runner) => display_battle_log(runner.state(), request.count.unwrap_or(20)),
            None => NO_BATTLE.to_string(),
        };
        text_result(text)
    }

    #[tool(description = "Look up detailed information about a card")]
    async fn lookup_card(
        &self,
        Parameters(request): Parameters<LookupCardRequest>,
    ) -> Result<CallToolResult, McpError> {
        text_result(handle_lookup_card_command(&request.card_name))
    }

    #[tool(description = "Summon a creature from your hand during your MAIN phase")]
    async fn summon(
        &self,
        Parameters(request): Parameters<SummonRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.act(|runner| execute_summon_action(runner, request.card_id, request.sacrifices))
    }

    #[tool(description = "Cast a spell from your hand during your MAIN phase")]
    async fn cast_spell(
        &self,
        Parameters(request): Parameters<CastSpellRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.act(|runner| execute_spell_action(runner, request.card_id, request.target_id))
    }

    #[tool(description = "Set a trap face-down during your MAIN phase")]
    async fn set_trap(
        &self,
        Parameters(request): Parameters<SetTrapRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.act(|runner| execute_set_trap_action(runner, request.card_id))
    }

    #[tool(description = "Move from your MAIN phase to your BATTLE phase")]
    async fn go_to_battle(&self) -> Result<CallToolResult, McpError> {
        self.act(execute_go_to_battle_action)
    }

    #[tool(description = "Attack with one of your creatures during your BATTLE phase")]
    async fn attack(
        &self,
        Parameters(request): Parameters<AttackRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.act(|runner| execute_attack_action(runner, request.card_id, request.target_id))
    }

    #[tool(description = "End your turn; the opponent then plays its turn")]
    async fn end_turn(&self) -> Result<CallToolResult, McpError> {
        self.act(execute_end_turn_action)
    }

    #[tool(description = "Start the current battle over with the same decks")]
    async fn restart_battle(&self) -> Result<CallToolResult, McpError> {
        self.act(|runner| {
            if !runner.restart() {
                return Err("this battle cannot be restarted".to_string());
            }
            if runner.npc_to_move() == Some(OPPONENT) {
                runner.play_npc_turn();
            }
            Ok(format!("Battle restarted.\n\n{}", get_battle_status_summary(runner)))
        })
    }
}

#[tool_handler]
impl ServerHandler for CardBattleService {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!("Card Battle MCP Server starting");

    let service = CardBattleService::new();
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;

    info!("Server running, waiting for shutdown");
    let quit_reason = server.waiting().await?;

    info!(?quit_reason, "Card Battle MCP Server exiting");
    Ok(())
}
