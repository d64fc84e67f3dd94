use super::{AppState, TickOutcome};
use crate::error::RoomError;
use crate::types::*;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

impl AppState {
    /// Start the round's tie-break game on request, e.g. a rematch after a
    /// game that ended without a winner
    pub async fn start_mini_game(
        &self,
        connection_id: &str,
        room_code: &str,
        kind: MiniGameKind,
    ) -> Result<(), RoomError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_code)
            .ok_or_else(|| RoomError::RoomNotFound(room_code.to_string()))?;
        if room.participant(connection_id).is_none() {
            return Err(RoomError::NotInRoom);
        }

        let game_id = room.request_mini_game(kind)?;
        if let Some(ticker) = self.spawn_ticker(room_code, &game_id) {
            room.attach_ticker(&game_id, ticker);
        }
        Ok(())
    }

    pub async fn mini_game_input(
        &self,
        connection_id: &str,
        room_code: &str,
        entity_id: Option<&str>,
        action: GameAction,
        pressed: bool,
    ) -> Result<(), RoomError> {
        self.with_member_room(connection_id, room_code, |room| {
            room.apply_input(connection_id, entity_id, action, pressed)
        })
        .await
    }

    /// Advance a room's game by one tick. With `game_id` set, only that game
    /// is ticked; anything else (gone room, finished or replaced game) is
    /// [`TickOutcome::Inactive`].
    pub async fn tick_room(&self, room_code: &str, game_id: Option<&str>) -> TickOutcome {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(room_code) {
            Some(room) => room.tick_mini_game(game_id),
            None => TickOutcome::Inactive,
        }
    }

    /// One timer task per game. It stops on its own once the game is over
    /// and is aborted when the game is dropped.
    pub(crate) fn spawn_ticker(&self, room_code: &str, game_id: &str) -> Option<AbortHandle> {
        if !self.config.drive_ticks {
            return None;
        }

        let state = self.clone();
        let room_code = room_code.to_string();
        let game_id = game_id.to_string();
        let period = self.config.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let outcome = state.tick_room(&room_code, Some(&game_id)).await;
                if outcome != TickOutcome::Running {
                    tracing::debug!("Ticker for {} in {} stopped: {:?}", game_id, room_code, outcome);
                    break;
                }
            }
        });
        Some(handle.abort_handle())
    }
}
