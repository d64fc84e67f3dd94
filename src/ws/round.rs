//! Voting and round progression handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::Vote;
use std::sync::Arc;

use super::handlers::{normalize_code, reject};

pub async fn handle_vote(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
    value: Vote,
    item_id: Option<String>,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    tracing::debug!("Vote {} in {} for item {:?}", value, code, item_id);
    reject("vote", state.submit_vote(connection_id, &code, value).await)
}

pub async fn handle_reveal(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    reject("reveal", state.reveal(connection_id, &code).await)
}

pub async fn handle_force_resolve(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
    value: Vote,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    reject(
        "force_resolve",
        state.force_resolve(connection_id, &code, value).await,
    )
}

pub async fn handle_next_round(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    reject(
        "request_next_round",
        state.advance_round(connection_id, &code).await,
    )
}
