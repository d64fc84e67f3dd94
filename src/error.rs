use crate::types::MiniGameKind;

/// Why a room operation was refused. Surfaced to the originating
/// connection only, as an `error` frame carrying [`RoomError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} does not exist")]
    RoomNotFound(String),

    #[error("Name '{0}' is already taken in this room")]
    NameTaken(String),

    #[error("Display name must be 1-{0} characters")]
    InvalidName(usize),

    #[error("Connection is not in a room")]
    NotInRoom,

    #[error("Connection is already in room {0}")]
    AlreadyInRoom(String),

    #[error("Votes are already revealed for this round")]
    VotingClosed,

    #[error("Round is not revealed yet")]
    NotRevealed,

    #[error("Round already resolved")]
    AlreadyResolved,

    #[error("A mini-game is already running")]
    MiniGameActive,

    #[error("No mini-game is running")]
    NoActiveMiniGame,

    #[error("This round is not decided by {requested}")]
    ModeMismatch {
        expected: Option<MiniGameKind>,
        requested: MiniGameKind,
    },

    #[error("You don't control anything in this mini-game")]
    UnauthorizedInput,

    #[error("Session is complete")]
    SessionComplete,
}

impl RoomError {
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RoomError::NameTaken(_) => "NAME_TAKEN",
            RoomError::InvalidName(_) => "INVALID_NAME",
            RoomError::NotInRoom => "NOT_IN_ROOM",
            RoomError::AlreadyInRoom(_) => "ALREADY_IN_ROOM",
            RoomError::VotingClosed => "VOTING_CLOSED",
            RoomError::NotRevealed => "NOT_REVEALED",
            RoomError::AlreadyResolved => "ALREADY_RESOLVED",
            RoomError::MiniGameActive => "MINI_GAME_ACTIVE",
            RoomError::NoActiveMiniGame => "NO_ACTIVE_MINI_GAME",
            RoomError::ModeMismatch { .. } => "MODE_MISMATCH",
            RoomError::UnauthorizedInput => "UNAUTHORIZED_INPUT",
            RoomError::SessionComplete => "SESSION_COMPLETE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_screaming_snake() {
        let errors = [
            RoomError::RoomNotFound("ABCDE".into()),
            RoomError::NameTaken("Alice".into()),
            RoomError::ModeMismatch {
                expected: Some(MiniGameKind::LapRace),
                requested: MiniGameKind::PaddleDuel,
            },
            RoomError::UnauthorizedInput,
        ];
        for err in errors {
            assert!(err
                .code()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_message_names_the_room() {
        let err = RoomError::RoomNotFound("ZZZZZ".into());
        assert!(err.to_string().contains("ZZZZZ"));
    }
}
