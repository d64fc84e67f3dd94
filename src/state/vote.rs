use super::AppState;
use crate::error::RoomError;
use crate::types::*;

impl AppState {
    /// Record (or replace) the caller's vote for the open round
    pub async fn submit_vote(
        &self,
        connection_id: &str,
        room_code: &str,
        value: Vote,
    ) -> Result<(), RoomError> {
        self.with_member_room(connection_id, room_code, |room| {
            room.submit_vote(connection_id, value)
        })
        .await
    }

    /// Reveal the round and run the tie-break policy. A mini-game started
    /// here gets its timer before the lock is released.
    pub async fn reveal(&self, connection_id: &str, room_code: &str) -> Result<(), RoomError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_code)
            .ok_or_else(|| RoomError::RoomNotFound(room_code.to_string()))?;
        if room.participant(connection_id).is_none() {
            return Err(RoomError::NotInRoom);
        }

        if let Some(game_id) = room.reveal()? {
            if let Some(ticker) = self.spawn_ticker(room_code, &game_id) {
                room.attach_ticker(&game_id, ticker);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::RoomError;
    use crate::protocol::ServerMessage;
    use crate::types::*;

    #[tokio::test]
    async fn test_unanimous_reveal_is_consensus() {
        let state = test_state();
        let (code, mut seats) = seated(&state, &["Alice", "Bob"]).await;
        state.submit_vote(&seats[0].0, &code, Vote::Five).await.unwrap();
        state.submit_vote(&seats[1].0, &code, Vote::Five).await.unwrap();
        drain(&mut seats[0].1);

        state.reveal(&seats[1].0, &code).await.unwrap();

        let msgs = drain(&mut seats[0].1);
        assert!(matches!(
            msgs[0],
            ServerMessage::VotesUpdate { revealed: true, .. }
        ));
        match &msgs[1] {
            ServerMessage::RoundResult {
                winning_value,
                consensus,
                ledger,
                ..
            } => {
                assert_eq!(*winning_value, Some(Vote::Five));
                assert!(*consensus);
                assert_eq!(ledger.resolved_value(1), Some(Vote::Five));
            }
            other => panic!("expected round_result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_agreement_resolves_directly() {
        let state = test_state();
        let (code, mut seats) = seated(&state, &["Alice", "Bob", "Carol"]).await;
        state.submit_vote(&seats[0].0, &code, Vote::Three).await.unwrap();
        state.submit_vote(&seats[1].0, &code, Vote::Three).await.unwrap();
        state.reveal(&seats[0].0, &code).await.unwrap();

        let msgs = drain(&mut seats[2].1);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::RoundResult {
                winning_value: Some(Vote::Three),
                consensus: false,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_lone_vote_stays_pending() {
        let state = test_state();
        let (code, mut seats) = seated(&state, &["Alice", "Bob"]).await;
        state.submit_vote(&seats[0].0, &code, Vote::Eight).await.unwrap();
        state.reveal(&seats[0].0, &code).await.unwrap();

        let msgs = drain(&mut seats[1].1);
        assert!(!msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::RoundResult { .. })));
        let snapshot = state.room_snapshot(&code).await.unwrap();
        assert!(snapshot.revealed);
        assert!(snapshot.winning_value.is_none());
    }

    #[tokio::test]
    async fn test_two_groups_start_paddle_duel() {
        let state = test_state();
        let (code, mut seats) = seated(&state, &["Alice", "Bob"]).await;
        state.submit_vote(&seats[0].0, &code, Vote::Three).await.unwrap();
        state.submit_vote(&seats[1].0, &code, Vote::Eight).await.unwrap();
        state.reveal(&seats[0].0, &code).await.unwrap();

        let msgs = drain(&mut seats[1].1);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::MiniGameStarted {
                kind: MiniGameKind::PaddleDuel,
                countdown: 3,
                ..
            }
        )));
        assert_eq!(state.stats().await.active_games, 1);
    }

    #[tokio::test]
    async fn test_vote_from_outsider_rejected() {
        let state = test_state();
        let (code, _seats) = seated(&state, &["Alice"]).await;
        let (stranger, _rx) = state.connect().await;
        assert_eq!(
            state.submit_vote(&stranger, &code, Vote::One).await,
            Err(RoomError::NotInRoom)
        );
    }
}
