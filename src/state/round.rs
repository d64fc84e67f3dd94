use super::AppState;
use crate::error::RoomError;
use crate::types::*;

impl AppState {
    /// Settle a revealed round that is still pending
    pub async fn force_resolve(
        &self,
        connection_id: &str,
        room_code: &str,
        value: Vote,
    ) -> Result<(), RoomError> {
        self.with_member_room(connection_id, room_code, |room| room.force_resolve(value))
            .await
    }

    /// Close the current round and open the next backlog item
    pub async fn advance_round(&self, connection_id: &str, room_code: &str) -> Result<(), RoomError> {
        self.with_member_room(connection_id, room_code, |room| room.advance_round())
            .await
    }
}
