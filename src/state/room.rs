//! One room: roster, votes, round progression and the active mini-game.
//!
//! Everything here is synchronous and runs under the registry's write lock,
//! so one call is one atomic step for the room.

use crate::error::RoomError;
use crate::games::{game_seed, Controller, ControllerLoss, MiniGame, TickStatus, Winner};
use crate::ledger::{Ledger, RoundRecord};
use crate::protocol::{RoomSnapshot, ServerMessage};
use crate::tiebreak::{select_mode, team_grouping, Mode};
use crate::types::*;
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::AbortHandle;

pub type Outbox = mpsc::Sender<ServerMessage>;

#[derive(Debug, Clone)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: DisplayName,
    pub(crate) outbox: Outbox,
}

impl Participant {
    /// Best-effort delivery; a full queue drops the frame
    fn deliver(&self, msg: ServerMessage) {
        match self.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Outbox full for {}, dropping frame", self.connection_id);
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Result of driving one tick for a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No such room or game (already torn down); nothing happened
    Inactive,
    Running,
    Finished,
}

pub struct ActiveMiniGame {
    pub id: GameId,
    pub game: MiniGame,
    ticker: Option<AbortHandle>,
}

impl Drop for ActiveMiniGame {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

pub struct Room {
    pub code: RoomCode,
    participants: Vec<Participant>,
    votes: BTreeMap<DisplayName, Vote>,
    revealed: bool,
    round_index: u32,
    winning_value: Option<Vote>,
    consensus: bool,
    ledger: Ledger,
    mini_game: Option<ActiveMiniGame>,
    backlog_size: u32,
    session_complete: bool,
}

impl Room {
    pub fn new(code: RoomCode, backlog_size: u32) -> Self {
        Self {
            code,
            participants: Vec::new(),
            votes: BTreeMap::new(),
            revealed: false,
            round_index: 1,
            winning_value: None,
            consensus: false,
            ledger: Ledger::new(),
            mini_game: None,
            backlog_size,
            session_complete: false,
        }
    }

    // Roster

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant_names(&self) -> Vec<DisplayName> {
        self.participants
            .iter()
            .map(|p| p.display_name.clone())
            .collect()
    }

    pub fn participant(&self, connection_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    pub fn has_name(&self, display_name: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.display_name == display_name)
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), RoomError> {
        if self.has_name(&participant.display_name) {
            return Err(RoomError::NameTaken(participant.display_name));
        }
        tracing::info!(
            "{} joined room {} ({} participants)",
            participant.display_name,
            self.code,
            self.participants.len() + 1
        );
        self.participants.push(participant);
        Ok(())
    }

    /// Drop a connection from the room. An open-round vote goes with it; a
    /// mini-game loses the entity (or is abandoned) it drove.
    pub fn remove_participant(&mut self, connection_id: &str) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        let participant = self.participants.remove(index);
        tracing::info!("{} left room {}", participant.display_name, self.code);

        if !self.revealed {
            self.votes.remove(&participant.display_name);
        }

        let loss = self
            .mini_game
            .as_mut()
            .map(|active| active.game.remove_controller(connection_id))
            .unwrap_or(ControllerLoss::Unaffected);
        if loss == ControllerLoss::Abandon {
            self.stop_mini_game("controller_left");
        }

        if !self.is_empty() {
            self.broadcast(ServerMessage::ParticipantsUpdate {
                participants: self.participant_names(),
            });
            self.broadcast(self.votes_update());
        }
        Some(participant)
    }

    // Delivery

    pub fn broadcast(&self, msg: ServerMessage) {
        for participant in &self.participants {
            participant.deliver(msg.clone());
        }
    }

    pub fn send_to(&self, connection_id: &str, msg: ServerMessage) {
        if let Some(participant) = self.participant(connection_id) {
            participant.deliver(msg);
        }
    }

    // Views

    pub fn revealed(&self) -> bool {
        self.revealed
    }

    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    pub fn winning_value(&self) -> Option<Vote> {
        self.winning_value
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn votes(&self) -> &BTreeMap<DisplayName, Vote> {
        &self.votes
    }

    pub fn is_session_complete(&self) -> bool {
        self.session_complete
    }

    pub fn has_active_game(&self) -> bool {
        self.mini_game.is_some()
    }

    pub fn active_game(&self) -> Option<&ActiveMiniGame> {
        self.mini_game.as_ref()
    }

    pub fn teams(&self) -> TeamGrouping {
        team_grouping(
            self.participants.iter().map(|p| &p.display_name),
            &self.votes,
        )
    }

    pub fn mode(&self) -> Mode {
        select_mode(&self.teams(), self.participants.len())
    }

    pub fn votes_update(&self) -> ServerMessage {
        ServerMessage::VotesUpdate {
            votes: self.votes.clone(),
            revealed: self.revealed,
        }
    }

    pub fn round_result(&self) -> ServerMessage {
        ServerMessage::RoundResult {
            round_index: self.round_index,
            teams: self.teams(),
            winning_value: self.winning_value,
            consensus: self.consensus,
            ledger: self.ledger.clone(),
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_code: self.code.clone(),
            participants: self.participant_names(),
            votes: self.votes.clone(),
            revealed: self.revealed,
            round_index: self.round_index,
            backlog_size: self.backlog_size,
            winning_value: self.winning_value,
            ledger: self.ledger.clone(),
            mini_game: self.mini_game.as_ref().map(|g| g.game.snapshot()),
            session_complete: self.session_complete,
        }
    }

    fn ensure_open(&self) -> Result<(), RoomError> {
        if self.session_complete {
            Err(RoomError::SessionComplete)
        } else {
            Ok(())
        }
    }

    fn name_of(&self, connection_id: &str) -> Result<DisplayName, RoomError> {
        self.participant(connection_id)
            .map(|p| p.display_name.clone())
            .ok_or(RoomError::NotInRoom)
    }

    // Voting

    /// Last write wins per participant
    pub fn submit_vote(&mut self, connection_id: &str, value: Vote) -> Result<(), RoomError> {
        let name = self.name_of(connection_id)?;
        self.ensure_open()?;
        if self.mini_game.is_some() {
            return Err(RoomError::MiniGameActive);
        }
        if self.revealed {
            return Err(RoomError::VotingClosed);
        }

        tracing::debug!("{} voted {} in room {}", name, value, self.code);
        self.votes.insert(name, value);
        self.broadcast(self.votes_update());
        Ok(())
    }

    /// Flip the reveal flag and dispatch the tie-break policy. Returns the id
    /// of a mini-game that was started, if any. Revealing twice is a no-op.
    pub fn reveal(&mut self) -> Result<Option<GameId>, RoomError> {
        self.ensure_open()?;
        if self.mini_game.is_some() {
            return Err(RoomError::MiniGameActive);
        }
        if self.revealed {
            return Ok(None);
        }

        self.revealed = true;
        tracing::info!("Room {} revealed round {}", self.code, self.round_index);
        self.broadcast(self.votes_update());

        match self.mode() {
            Mode::Consensus(value) => {
                self.resolve_round(Some(value), true);
                Ok(None)
            }
            Mode::Direct(value) => {
                self.resolve_round(Some(value), false);
                Ok(None)
            }
            Mode::MiniGame(kind) => self.launch_mini_game(kind).map(Some),
            Mode::Pending => {
                tracing::info!("Room {} round {} left pending", self.code, self.round_index);
                Ok(None)
            }
        }
    }

    // Rounds

    /// First value wins. A `None` outcome is announced but settles nothing.
    /// Returns whether the round is now resolved.
    pub fn resolve_round(&mut self, value: Option<Vote>, consensus: bool) -> bool {
        if self.winning_value.is_some() {
            return true;
        }

        self.ledger
            .absorb(self.round_index, RoundRecord::new(self.votes.clone(), value));
        if let Some(value) = value {
            tracing::info!(
                "Room {} round {} resolved to {}",
                self.code,
                self.round_index,
                value
            );
            self.winning_value = Some(value);
            self.consensus = consensus;
        }
        self.broadcast(self.round_result());
        self.winning_value.is_some()
    }

    pub fn force_resolve(&mut self, value: Vote) -> Result<(), RoomError> {
        self.ensure_open()?;
        if self.mini_game.is_some() {
            return Err(RoomError::MiniGameActive);
        }
        if !self.revealed {
            return Err(RoomError::NotRevealed);
        }
        if self.winning_value.is_some() {
            return Err(RoomError::AlreadyResolved);
        }
        self.resolve_round(Some(value), false);
        Ok(())
    }

    /// Move to the next backlog item, or close the session after the last one
    pub fn advance_round(&mut self) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.stop_mini_game("round_advanced");

        self.ledger.absorb(
            self.round_index,
            RoundRecord::new(std::mem::take(&mut self.votes), self.winning_value),
        );
        self.revealed = false;
        self.winning_value = None;
        self.consensus = false;

        if self.round_index >= self.backlog_size {
            self.session_complete = true;
            tracing::info!("Room {} finished its session", self.code);
            self.broadcast(ServerMessage::SessionComplete {
                ledger: self.ledger.clone(),
            });
        } else {
            self.round_index += 1;
            tracing::info!("Room {} moved to round {}", self.code, self.round_index);
            self.broadcast(ServerMessage::NextRoundStarted {
                round_index: self.round_index,
                ledger: self.ledger.clone(),
            });
        }
        Ok(())
    }

    // Mini-games

    /// Client-requested start; also serves as a rematch after a no-winner game
    pub fn request_mini_game(&mut self, kind: MiniGameKind) -> Result<GameId, RoomError> {
        self.ensure_open()?;
        if !self.revealed {
            return Err(RoomError::NotRevealed);
        }
        if self.winning_value.is_some() {
            return Err(RoomError::AlreadyResolved);
        }
        if self.mini_game.is_some() {
            return Err(RoomError::MiniGameActive);
        }
        match self.mode() {
            Mode::MiniGame(expected) if expected == kind => self.launch_mini_game(kind),
            Mode::MiniGame(expected) => Err(RoomError::ModeMismatch {
                expected: Some(expected),
                requested: kind,
            }),
            _ => Err(RoomError::ModeMismatch {
                expected: None,
                requested: kind,
            }),
        }
    }

    /// Seat the first member of each vote group and announce the game
    fn launch_mini_game(&mut self, kind: MiniGameKind) -> Result<GameId, RoomError> {
        let controllers: Vec<Controller> = self
            .teams()
            .into_iter()
            .filter_map(|(vote, names)| {
                let driver = names.into_iter().next()?;
                let participant = self.participants.iter().find(|p| p.display_name == driver)?;
                Some(Controller {
                    connection_id: participant.connection_id.clone(),
                    display_name: driver,
                    vote,
                })
            })
            .collect();

        let game = MiniGame::start(kind, controllers, game_seed(&self.code, self.round_index))
            .ok_or(RoomError::ModeMismatch {
                expected: None,
                requested: kind,
            })?;

        let id = ulid::Ulid::new().to_string();
        tracing::info!("Room {} started {} ({})", self.code, kind, id);
        self.broadcast(ServerMessage::MiniGameStarted {
            kind,
            snapshot: game.snapshot(),
            countdown: game.countdown_seconds(),
        });
        self.mini_game = Some(ActiveMiniGame {
            id: id.clone(),
            game,
            ticker: None,
        });
        Ok(id)
    }

    /// Hand the game its timer. Ignored if that game is no longer running.
    pub fn attach_ticker(&mut self, game_id: &str, ticker: AbortHandle) {
        match self.mini_game.as_mut() {
            Some(active) if active.id == game_id => active.ticker = Some(ticker),
            _ => ticker.abort(),
        }
    }

    pub fn apply_input(
        &mut self,
        connection_id: &str,
        entity_id: Option<&str>,
        action: GameAction,
        pressed: bool,
    ) -> Result<(), RoomError> {
        let active = self
            .mini_game
            .as_mut()
            .ok_or(RoomError::NoActiveMiniGame)?;
        active
            .game
            .apply_input(connection_id, entity_id, action, pressed)
    }

    /// Advance the active game one step. `game_id` pins the tick to a
    /// specific game so a stale timer can't drive its successor.
    pub fn tick_mini_game(&mut self, game_id: Option<&str>) -> TickOutcome {
        let Some(active) = self.mini_game.as_mut() else {
            return TickOutcome::Inactive;
        };
        if game_id.is_some_and(|id| id != active.id) {
            return TickOutcome::Inactive;
        }

        let status = active.game.tick();
        let kind = active.game.kind();
        let snapshot = active.game.snapshot();
        self.broadcast(ServerMessage::MiniGameTick { kind, snapshot });

        match status {
            TickStatus::Running => TickOutcome::Running,
            TickStatus::Finished(winner) => {
                self.finish_mini_game(kind, winner);
                TickOutcome::Finished
            }
        }
    }

    fn finish_mini_game(&mut self, kind: MiniGameKind, winner: Option<Winner>) {
        if let Some(active) = self.mini_game.take() {
            tracing::info!(
                "Room {} {} over after {} ticks, winner: {:?}",
                self.code,
                kind,
                active.game.ticks(),
                winner.as_ref().map(|w| &w.display_name)
            );
        }
        self.broadcast(ServerMessage::MiniGameOver {
            kind,
            winning_value: winner.as_ref().map(|w| w.vote),
            winner: winner.as_ref().map(|w| w.display_name.clone()),
        });
        self.resolve_round(winner.map(|w| w.vote), false);
    }

    /// Tear down the active game, if any, without a winner
    pub fn stop_mini_game(&mut self, reason: &str) -> bool {
        let Some(active) = self.mini_game.take() else {
            return false;
        };
        let kind = active.game.kind();
        drop(active);
        tracing::info!("Room {} {} abandoned: {}", self.code, kind, reason);
        self.broadcast(ServerMessage::MiniGameAbandoned {
            kind,
            reason: reason.to_string(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(conn: &str, name: &str) -> (Participant, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Participant {
                connection_id: conn.to_string(),
                display_name: name.to_string(),
                outbox: tx,
            },
            rx,
        )
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn room_with(names: &[&str]) -> (Room, Vec<mpsc::Receiver<ServerMessage>>) {
        let mut room = Room::new("ABCDE".into(), 5);
        let mut receivers = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let (p, rx) = participant(&format!("c{}", i), name);
            room.add_participant(p).unwrap();
            receivers.push(rx);
        }
        (room, receivers)
    }

    #[test]
    fn test_latest_vote_wins() {
        let (mut room, _rx) = room_with(&["Alice"]);
        room.submit_vote("c0", Vote::Three).unwrap();
        room.submit_vote("c0", Vote::Eight).unwrap();
        room.submit_vote("c0", Vote::Five).unwrap();
        assert_eq!(room.votes().len(), 1);
        assert_eq!(room.votes()["Alice"], Vote::Five);
    }

    #[test]
    fn test_vote_after_reveal_is_rejected() {
        let (mut room, _rx) = room_with(&["Alice", "Bob"]);
        room.submit_vote("c0", Vote::Five).unwrap();
        room.reveal().unwrap();
        assert_eq!(
            room.submit_vote("c1", Vote::Eight),
            Err(RoomError::VotingClosed)
        );
        assert!(!room.votes().contains_key("Bob"));
    }

    #[test]
    fn test_second_reveal_is_silent() {
        let (mut room, mut rx) = room_with(&["Alice"]);
        room.reveal().unwrap();
        let first = drain(&mut rx[0]).len();
        assert!(first > 0);
        assert_eq!(room.reveal(), Ok(None));
        assert!(room.revealed());
        assert!(drain(&mut rx[0]).is_empty());
    }

    #[test]
    fn test_resolve_is_first_value_wins() {
        let (mut room, _rx) = room_with(&["Alice", "Bob"]);
        room.revealed = true;
        assert!(room.resolve_round(Some(Vote::Three), false));
        assert!(room.resolve_round(Some(Vote::Eight), false));
        assert_eq!(room.winning_value(), Some(Vote::Three));
        assert_eq!(room.ledger().resolved_value(1), Some(Vote::Three));
    }

    #[test]
    fn test_none_resolution_keeps_round_pending() {
        let (mut room, _rx) = room_with(&["Alice", "Bob"]);
        room.revealed = true;
        assert!(!room.resolve_round(None, false));
        assert!(room.winning_value().is_none());
        assert!(room.force_resolve(Vote::Two).is_ok());
        assert_eq!(room.winning_value(), Some(Vote::Two));
        assert_eq!(room.force_resolve(Vote::Three), Err(RoomError::AlreadyResolved));
    }

    #[test]
    fn test_leaving_voter_takes_open_vote() {
        let (mut room, mut rx) = room_with(&["Alice", "Bob"]);
        room.submit_vote("c1", Vote::Eight).unwrap();
        drain(&mut rx[0]);
        room.remove_participant("c1").unwrap();
        assert!(room.votes().is_empty());
        let msgs = drain(&mut rx[0]);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::ParticipantsUpdate { participants } if participants == &vec!["Alice".to_string()]
        )));
    }

    #[tokio::test]
    async fn test_dropping_active_game_aborts_ticker() {
        let (mut room, _rx) = room_with(&["Alice", "Bob"]);
        room.submit_vote("c0", Vote::Three).unwrap();
        room.submit_vote("c1", Vote::Eight).unwrap();
        let id = room.reveal().unwrap().expect("paddle duel starts");

        let task = tokio::spawn(std::future::pending::<()>());
        room.attach_ticker(&id, task.abort_handle());
        drop(room);

        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_stale_game_id_is_inactive() {
        let (mut room, _rx) = room_with(&["Alice", "Bob"]);
        room.submit_vote("c0", Vote::Three).unwrap();
        room.submit_vote("c1", Vote::Eight).unwrap();
        room.reveal().unwrap();
        assert_eq!(room.tick_mini_game(Some("not-this-game")), TickOutcome::Inactive);
        assert_eq!(room.tick_mini_game(None), TickOutcome::Running);
    }

    #[test]
    fn test_advance_clears_round_and_closes_session() {
        let mut room = Room::new("ABCDE".into(), 2);
        let (p, _rx) = participant("c0", "Alice");
        room.add_participant(p).unwrap();

        room.submit_vote("c0", Vote::Five).unwrap();
        room.advance_round().unwrap();
        assert_eq!(room.round_index(), 2);
        assert!(room.votes().is_empty());
        assert!(!room.revealed());
        assert_eq!(room.ledger().get(1).unwrap().votes["Alice"], Vote::Five);

        room.advance_round().unwrap();
        assert!(room.is_session_complete());
        assert_eq!(room.advance_round(), Err(RoomError::SessionComplete));
        assert_eq!(room.submit_vote("c0", Vote::One), Err(RoomError::SessionComplete));
    }
}
