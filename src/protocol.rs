use crate::games::MiniGameSnapshot;
use crate::ledger::Ledger;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        display_name: String,
    },
    JoinRoom {
        room_code: RoomCode,
        display_name: String,
    },
    LeaveRoom {
        room_code: RoomCode,
    },
    Vote {
        room_code: RoomCode,
        /// Informational; the vote is stored under the connection's own name
        #[serde(default)]
        display_name: Option<DisplayName>,
        value: Vote,
        #[serde(default)]
        item_id: Option<String>,
    },
    Reveal {
        room_code: RoomCode,
    },
    /// Start (or restart after a no-winner game) the round's tie-break
    StartMiniGame {
        room_code: RoomCode,
        kind: MiniGameKind,
    },
    MiniGameInput {
        room_code: RoomCode,
        #[serde(default)]
        entity_id: Option<String>,
        action: GameAction,
        pressed: bool,
    },
    /// Settle a pending round by hand
    ForceResolve {
        room_code: RoomCode,
        value: Vote,
    },
    RequestNextRound {
        room_code: RoomCode,
    },
}

/// Full room state for a joiner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_code: RoomCode,
    /// Join order
    pub participants: Vec<DisplayName>,
    pub votes: BTreeMap<DisplayName, Vote>,
    pub revealed: bool,
    pub round_index: u32,
    pub backlog_size: u32,
    pub winning_value: Option<Vote>,
    pub ledger: Ledger,
    pub mini_game: Option<MiniGameSnapshot>,
    pub session_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        connection_id: ConnectionId,
        server_now: String,
    },
    RoomCreated {
        room_code: RoomCode,
        snapshot: RoomSnapshot,
    },
    RoomJoined {
        room_code: RoomCode,
        snapshot: RoomSnapshot,
    },
    JoinError {
        message: String,
    },
    ParticipantsUpdate {
        participants: Vec<DisplayName>,
    },
    VotesUpdate {
        votes: BTreeMap<DisplayName, Vote>,
        revealed: bool,
    },
    RoundResult {
        round_index: u32,
        teams: TeamGrouping,
        winning_value: Option<Vote>,
        consensus: bool,
        ledger: Ledger,
    },
    MiniGameStarted {
        kind: MiniGameKind,
        snapshot: MiniGameSnapshot,
        countdown: u32,
    },
    MiniGameTick {
        kind: MiniGameKind,
        snapshot: MiniGameSnapshot,
    },
    MiniGameOver {
        kind: MiniGameKind,
        winning_value: Option<Vote>,
        winner: Option<DisplayName>,
    },
    MiniGameAbandoned {
        kind: MiniGameKind,
        reason: String,
    },
    NextRoundStarted {
        round_index: u32,
        ledger: Ledger,
    },
    SessionComplete {
        ledger: Ledger,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<crate::error::RoomError> for ServerMessage {
    fn from(err: crate::error::RoomError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_vote_parses_number_or_string() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"vote","room_code":"ABCDE","value":13}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Vote {
                value: Vote::Thirteen,
                ..
            }
        ));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"vote","room_code":"ABCDE","display_name":"Alice","value":"coffee","item_id":"item-1"}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Vote {
                value: Vote::Coffee,
                ..
            }
        ));
    }

    #[test]
    fn test_input_entity_is_optional() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"mini_game_input","room_code":"ABCDE","action":"drop_obstacle","pressed":true}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::MiniGameInput {
                entity_id, action, ..
            } => {
                assert!(entity_id.is_none());
                assert_eq!(action, GameAction::DropObstacle);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_frame_from_room_error() {
        let msg = ServerMessage::from(crate::error::RoomError::VotingClosed);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["code"], "VOTING_CLOSED");
    }

    #[test]
    fn test_round_result_wire_shape() {
        let mut teams = TeamGrouping::new();
        teams.insert(Vote::Five, vec!["Alice".into(), "Bob".into()]);
        let msg = ServerMessage::RoundResult {
            round_index: 1,
            teams,
            winning_value: Some(Vote::Five),
            consensus: true,
            ledger: Ledger::new(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "round_result");
        assert_eq!(json["winning_value"], "5");
        assert_eq!(json["teams"]["5"][1], "Bob");
    }
}
