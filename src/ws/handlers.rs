//! WebSocket message dispatch
//!
//! Every client message lands here and is routed to the room, round or
//! mini-game handlers. Successful actions answer through the room broadcast;
//! the return value is only ever a reply for the sender itself.

use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{game, room, round};

/// Room codes are matched case-insensitively
pub(super) fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Turn a refused action into an error frame for its sender
pub(super) fn reject(action: &str, result: Result<(), RoomError>) -> Option<ServerMessage> {
    match result {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Rejected {}: {}", action, e);
            Some(e.into())
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    connection_id: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Membership
        ClientMessage::CreateRoom { display_name } => {
            room::handle_create_room(state, connection_id, display_name).await
        }

        ClientMessage::JoinRoom {
            room_code,
            display_name,
        } => room::handle_join_room(state, connection_id, room_code, display_name).await,

        ClientMessage::LeaveRoom { room_code } => {
            room::handle_leave_room(state, connection_id, room_code).await
        }

        // Rounds
        ClientMessage::Vote {
            room_code,
            value,
            item_id,
            ..
        } => round::handle_vote(state, connection_id, room_code, value, item_id).await,

        ClientMessage::Reveal { room_code } => {
            round::handle_reveal(state, connection_id, room_code).await
        }

        ClientMessage::ForceResolve { room_code, value } => {
            round::handle_force_resolve(state, connection_id, room_code, value).await
        }

        ClientMessage::RequestNextRound { room_code } => {
            round::handle_next_round(state, connection_id, room_code).await
        }

        // Mini-games
        ClientMessage::StartMiniGame { room_code, kind } => {
            game::handle_start(state, connection_id, room_code, kind).await
        }

        ClientMessage::MiniGameInput {
            room_code,
            entity_id,
            action,
            pressed,
        } => game::handle_input(state, connection_id, room_code, entity_id, action, pressed).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" ab3cd "), "AB3CD");
    }

    #[test]
    fn test_reject_maps_error_frame() {
        assert!(reject("vote", Ok(())).is_none());
        match reject("vote", Err(RoomError::VotingClosed)) {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "VOTING_CLOSED"),
            other => panic!("expected error frame, got {:?}", other),
        }
    }
}
