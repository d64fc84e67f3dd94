mod minigame;
mod registry;
mod room;
mod round;
mod vote;

pub use room::{ActiveMiniGame, Outbox, Participant, Room, TickOutcome};

use crate::config::ServerConfig;
use crate::error::RoomError;
use crate::games::MiniGameSnapshot;
use crate::protocol::{RoomSnapshot, ServerMessage};
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Frames queued per connection before fan-out starts dropping
pub const OUTBOX_CAPACITY: usize = 256;

/// One live WebSocket
#[derive(Debug, Clone)]
pub struct Connection {
    pub outbox: Outbox,
    pub room_code: Option<RoomCode>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub rooms: usize,
    pub connections: usize,
    pub active_games: usize,
}

/// Shared application state
///
/// Lock order is `connections` then `rooms`; never the other way round.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub rooms: Arc<RwLock<HashMap<RoomCode, Room>>>,
    pub connections: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new connection and hand back its outbound queue
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = ulid::Ulid::new().to_string();
        self.connections.write().await.insert(
            id.clone(),
            Connection {
                outbox: tx,
                room_code: None,
            },
        );
        tracing::debug!("Connection {} opened", id);
        (id, rx)
    }

    /// Forget a connection, leaving its room first
    pub async fn disconnect(&self, connection_id: &str) {
        self.remove_from_room(connection_id).await;
        self.connections.write().await.remove(connection_id);
        tracing::debug!("Connection {} closed", connection_id);
    }

    pub async fn stats(&self) -> Stats {
        let connections = self.connections.read().await.len();
        let rooms = self.rooms.read().await;
        Stats {
            rooms: rooms.len(),
            connections,
            active_games: rooms.values().filter(|r| r.has_active_game()).count(),
        }
    }

    pub async fn room_snapshot(&self, room_code: &str) -> Option<RoomSnapshot> {
        self.rooms.read().await.get(room_code).map(Room::snapshot)
    }

    pub async fn mini_game_snapshot(&self, room_code: &str) -> Option<MiniGameSnapshot> {
        self.rooms
            .read()
            .await
            .get(room_code)?
            .active_game()
            .map(|active| active.game.snapshot())
    }

    pub async fn room_of(&self, connection_id: &str) -> Option<RoomCode> {
        self.connections
            .read()
            .await
            .get(connection_id)?
            .room_code
            .clone()
    }

    /// Run `f` on the room, provided `connection_id` is seated in it
    async fn with_member_room<T>(
        &self,
        connection_id: &str,
        room_code: &str,
        f: impl FnOnce(&mut Room) -> Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_code)
            .ok_or_else(|| RoomError::RoomNotFound(room_code.to_string()))?;
        if room.participant(connection_id).is_none() {
            return Err(RoomError::NotInRoom);
        }
        f(room)
    }
}
