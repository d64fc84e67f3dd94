//! Room membership handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::handlers::{normalize_code, reject};

pub async fn handle_create_room(
    state: &Arc<AppState>,
    connection_id: &str,
    display_name: String,
) -> Option<ServerMessage> {
    let result = state
        .create_room(connection_id, &display_name)
        .await
        .map(|_| ());
    reject("create_room", result)
}

/// Join failures get a `join_error` rather than a generic error frame
pub async fn handle_join_room(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
    display_name: String,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    match state.join_room(connection_id, &code, &display_name).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Join to {} as {:?} failed: {}", code, display_name, e);
            Some(ServerMessage::JoinError {
                message: e.to_string(),
            })
        }
    }
}

pub async fn handle_leave_room(
    state: &Arc<AppState>,
    connection_id: &str,
    room_code: String,
) -> Option<ServerMessage> {
    let code = normalize_code(&room_code);
    reject("leave_room", state.leave_room(connection_id, &code).await)
}
