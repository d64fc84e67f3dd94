use super::{AppState, Participant, Room};
use crate::config::MAX_NAME_LEN;
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 5;

/// Generate a random room code (5 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trimmed display name, 1..=MAX_NAME_LEN characters
fn validate_name(raw: &str) -> Result<DisplayName, RoomError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(RoomError::InvalidName(MAX_NAME_LEN));
    }
    Ok(name.to_string())
}

impl AppState {
    /// Open a room with the caller as its first participant
    pub async fn create_room(
        &self,
        connection_id: &str,
        display_name: &str,
    ) -> Result<RoomCode, RoomError> {
        let name = validate_name(display_name)?;

        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(connection_id)
            .ok_or(RoomError::NotInRoom)?;
        if let Some(code) = &connection.room_code {
            return Err(RoomError::AlreadyInRoom(code.clone()));
        }

        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let mut room = Room::new(code.clone(), self.config.backlog_size);
        room.add_participant(Participant {
            connection_id: connection_id.to_string(),
            display_name: name,
            outbox: connection.outbox.clone(),
        })?;
        room.send_to(
            connection_id,
            ServerMessage::RoomCreated {
                room_code: code.clone(),
                snapshot: room.snapshot(),
            },
        );
        room.broadcast(ServerMessage::ParticipantsUpdate {
            participants: room.participant_names(),
        });

        tracing::info!("Room {} created by {}", code, connection_id);
        rooms.insert(code.clone(), room);
        connection.room_code = Some(code.clone());
        Ok(code)
    }

    /// Seat the caller in an existing room. The joiner gets the full
    /// snapshot (and the round result, if the round is settled) before
    /// anyone sees the new roster.
    pub async fn join_room(
        &self,
        connection_id: &str,
        room_code: &str,
        display_name: &str,
    ) -> Result<(), RoomError> {
        let name = validate_name(display_name)?;

        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(connection_id)
            .ok_or(RoomError::NotInRoom)?;
        if let Some(code) = &connection.room_code {
            return Err(RoomError::AlreadyInRoom(code.clone()));
        }

        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_code)
            .ok_or_else(|| RoomError::RoomNotFound(room_code.to_string()))?;
        room.add_participant(Participant {
            connection_id: connection_id.to_string(),
            display_name: name,
            outbox: connection.outbox.clone(),
        })?;

        room.send_to(
            connection_id,
            ServerMessage::RoomJoined {
                room_code: room.code.clone(),
                snapshot: room.snapshot(),
            },
        );
        if room.winning_value().is_some() {
            room.send_to(connection_id, room.round_result());
        }
        room.broadcast(ServerMessage::ParticipantsUpdate {
            participants: room.participant_names(),
        });
        room.broadcast(room.votes_update());

        connection.room_code = Some(room.code.clone());
        Ok(())
    }

    pub async fn leave_room(&self, connection_id: &str, room_code: &str) -> Result<(), RoomError> {
        if self.room_of(connection_id).await.as_deref() != Some(room_code) {
            return Err(RoomError::NotInRoom);
        }
        self.remove_from_room(connection_id).await;
        Ok(())
    }

    /// Take the connection out of whatever room it's in. An emptied room is
    /// deleted, which also stops its mini-game timer.
    pub(crate) async fn remove_from_room(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        let Some(code) = connections
            .get_mut(connection_id)
            .and_then(|c| c.room_code.take())
        else {
            return;
        };

        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&code) else {
            return;
        };
        room.remove_participant(connection_id);
        if room.is_empty() {
            rooms.remove(&code);
            tracing::info!("Room {} is empty, deleted", code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_room_code_shape() {
        for _ in 0..100 {
            let code = generate_room_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Alice "), Ok("Alice".to_string()));
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert_eq!(
            validate_name(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(RoomError::InvalidName(MAX_NAME_LEN))
        );
    }

    #[tokio::test]
    async fn test_create_room_sends_snapshot_to_creator() {
        let state = test_state();
        let (id, mut rx) = state.connect().await;
        let code = state.create_room(&id, "Alice").await.unwrap();

        let msgs = drain(&mut rx);
        match &msgs[0] {
            ServerMessage::RoomCreated {
                room_code,
                snapshot,
            } => {
                assert_eq!(room_code, &code);
                assert_eq!(snapshot.participants, vec!["Alice".to_string()]);
                assert_eq!(snapshot.round_index, 1);
                assert!(!snapshot.revealed);
            }
            other => panic!("expected room_created, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let state = test_state();
        let (id, _rx) = state.connect().await;
        assert_eq!(
            state.join_room(&id, "NOPE1", "Alice").await,
            Err(RoomError::RoomNotFound("NOPE1".into()))
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let state = test_state();
        let (code, _seats) = seated(&state, &["Alice"]).await;
        let (id, _rx) = state.connect().await;
        assert_eq!(
            state.join_room(&id, &code, "Alice").await,
            Err(RoomError::NameTaken("Alice".into()))
        );
        assert!(state.room_of(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_cannot_join_twice() {
        let state = test_state();
        let (code, seats) = seated(&state, &["Alice"]).await;
        assert_eq!(
            state.join_room(&seats[0].0, &code, "Alicia").await,
            Err(RoomError::AlreadyInRoom(code.clone()))
        );
    }

    #[tokio::test]
    async fn test_joiner_gets_snapshot_before_roster() {
        let state = test_state();
        let (code, mut seats) = seated(&state, &["Alice"]).await;
        drain(&mut seats[0].1);

        let (id, mut rx) = state.connect().await;
        state.join_room(&id, &code, "Bob").await.unwrap();

        let msgs = drain(&mut rx);
        assert!(matches!(msgs[0], ServerMessage::RoomJoined { .. }));
        assert!(matches!(msgs[1], ServerMessage::ParticipantsUpdate { .. }));

        let alice = drain(&mut seats[0].1);
        assert!(alice.iter().any(|m| matches!(
            m,
            ServerMessage::ParticipantsUpdate { participants } if participants.len() == 2
        )));
    }

    #[tokio::test]
    async fn test_leave_other_room_is_rejected() {
        let state = test_state();
        let (_code, seats) = seated(&state, &["Alice"]).await;
        assert_eq!(
            state.leave_room(&seats[0].0, "OTHER").await,
            Err(RoomError::NotInRoom)
        );
    }
}
