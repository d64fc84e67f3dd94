//! Mini-game handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{GameAction, MiniGameKind};
use std::sync::Arc;

use super::handlers::{normalize_code, reject};

pub async fn handle_start(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
    kind: MiniGameKind,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    reject(
        "start_mini_game",
        state.start_mini_game(connection_id, &code, kind).await,
    )
}

/// Inputs arrive at key-repeat rates, so only failures are logged
pub async fn handle_input(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
    entity_id: Option<String>,
    action: GameAction,
    pressed: bool,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    reject(
        "mini_game_input",
        state
            .mini_game_input(connection_id, &code, entity_id.as_deref(), action, pressed)
            .await,
    )
}
