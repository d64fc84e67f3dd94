//! Authoritative tie-break mini-games.
//!
//! Every variant implements [`TickSimulation`]; [`MiniGame`] wraps one with the
//! pieces they all share: input authorization and the held-key buffer. The
//! room layer owns the timer and the broadcast.

pub mod chase;
pub mod geometry;
pub mod pong;
pub mod race;

use crate::error::RoomError;
use crate::types::{ConnectionId, DisplayName, GameAction, MiniGameKind, Vote};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use chase::{ChaseEvasion, ChaseSnapshot};
pub use pong::{PaddleDuel, PaddleDuelSnapshot};
pub use race::{LapRace, LapRaceSnapshot};

pub const TICKS_PER_SECOND: u32 = 30;

/// Seconds of simulated time per tick
pub const TICK_SECONDS: f64 = 1.0 / TICKS_PER_SECOND as f64;

pub const fn seconds_to_ticks(seconds: u32) -> u64 {
    seconds as u64 * TICKS_PER_SECOND as u64
}

/// The participant driving one entity: the first member of a vote group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    pub connection_id: ConnectionId,
    pub display_name: DisplayName,
    pub vote: Vote,
}

/// Latest pressed/released state of one connection's controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Latched until the simulation consumes it
    pub drop_requested: bool,
}

impl HeldKeys {
    fn set(&mut self, action: GameAction, pressed: bool) {
        match action {
            GameAction::Up => self.up = pressed,
            GameAction::Down => self.down = pressed,
            GameAction::Left => self.left = pressed,
            GameAction::Right => self.right = pressed,
            GameAction::DropObstacle => {
                if pressed {
                    self.drop_requested = true;
                }
            }
        }
    }

    /// Screen-space direction from the arrow keys (y grows downward)
    pub fn direction(&self) -> geometry::Vec2 {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f64;
        geometry::Vec2::new(axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Per-connection input, coalesced to the latest state before each tick
#[derive(Debug, Default)]
pub struct InputBuffer {
    keys: HashMap<ConnectionId, HeldKeys>,
}

impl InputBuffer {
    pub fn press(&mut self, connection_id: &str, action: GameAction, pressed: bool) {
        self.keys
            .entry(connection_id.to_string())
            .or_default()
            .set(action, pressed);
    }

    pub fn held(&self, connection_id: &str) -> HeldKeys {
        self.keys.get(connection_id).copied().unwrap_or_default()
    }

    /// Consume a latched obstacle drop
    pub fn take_drop(&mut self, connection_id: &str) -> bool {
        match self.keys.get_mut(connection_id) {
            Some(keys) => std::mem::take(&mut keys.drop_requested),
            None => false,
        }
    }

    pub fn forget(&mut self, connection_id: &str) {
        self.keys.remove(connection_id);
    }
}

/// Pre-start freeze, counted in ticks
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    remaining_ticks: u64,
}

impl Countdown {
    pub fn seconds(seconds: u32) -> Self {
        Self {
            remaining_ticks: seconds_to_ticks(seconds),
        }
    }

    /// Burn one tick. Returns false once the countdown is over.
    pub fn consume(&mut self) -> bool {
        if self.remaining_ticks == 0 {
            return false;
        }
        self.remaining_ticks -= 1;
        true
    }

    pub fn is_over(&self) -> bool {
        self.remaining_ticks == 0
    }

    pub fn whole_seconds(&self) -> u32 {
        self.remaining_ticks.div_ceil(TICKS_PER_SECOND as u64) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub vote: Vote,
    pub display_name: DisplayName,
}

impl From<&Controller> for Winner {
    fn from(controller: &Controller) -> Self {
        Self {
            vote: controller.vote,
            display_name: controller.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    /// Game over; `None` when nobody won
    Finished(Option<Winner>),
}

/// What losing a controller's connection does to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerLoss {
    /// The connection drove nothing
    Unaffected,
    EntityRemoved,
    /// The game can't continue without that controller
    Abandon,
}

pub trait TickSimulation: Send + Sync {
    fn kind(&self) -> MiniGameKind;

    /// Entity id driven by this connection, if any
    fn entity_for(&self, connection_id: &str) -> Option<&str>;

    /// One fixed step: input, integrate, collide, check the win condition
    fn tick(&mut self, input: &mut InputBuffer) -> TickStatus;

    fn snapshot(&self) -> MiniGameSnapshot;

    fn countdown_seconds(&self) -> u32;

    fn remove_controller(&mut self, connection_id: &str) -> ControllerLoss;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MiniGameSnapshot {
    PaddleDuel(PaddleDuelSnapshot),
    LapRace(LapRaceSnapshot),
    ChaseEvasion(ChaseSnapshot),
}

/// A running simulation plus its input buffer
pub struct MiniGame {
    simulation: Box<dyn TickSimulation>,
    input: InputBuffer,
    ticks: u64,
}

impl MiniGame {
    /// Seat one controller per vote group. `None` when the number of
    /// controllers doesn't fit the variant.
    pub fn start(kind: MiniGameKind, controllers: Vec<Controller>, seed: u64) -> Option<Self> {
        let simulation: Box<dyn TickSimulation> = match kind {
            MiniGameKind::PaddleDuel => {
                let [left, right]: [Controller; 2] = controllers.try_into().ok()?;
                Box::new(PaddleDuel::new(left, right))
            }
            MiniGameKind::LapRace => {
                if !(2..=race::MAX_CARS).contains(&controllers.len()) {
                    return None;
                }
                Box::new(LapRace::new(controllers))
            }
            MiniGameKind::ChaseEvasion => {
                if !(1..=chase::MAX_ESCAPEES).contains(&controllers.len()) {
                    return None;
                }
                Box::new(ChaseEvasion::new(controllers, seed))
            }
        };
        Some(Self {
            simulation,
            input: InputBuffer::default(),
            ticks: 0,
        })
    }

    pub fn kind(&self) -> MiniGameKind {
        self.simulation.kind()
    }

    /// Buffer a key state from `connection_id`. When `entity_id` is given it
    /// must match the entity that connection drives.
    pub fn apply_input(
        &mut self,
        connection_id: &str,
        entity_id: Option<&str>,
        action: GameAction,
        pressed: bool,
    ) -> Result<(), RoomError> {
        let owned = self
            .simulation
            .entity_for(connection_id)
            .ok_or(RoomError::UnauthorizedInput)?;
        if entity_id.is_some_and(|requested| requested != owned) {
            return Err(RoomError::UnauthorizedInput);
        }
        self.input.press(connection_id, action, pressed);
        Ok(())
    }

    pub fn tick(&mut self) -> TickStatus {
        self.ticks += 1;
        self.simulation.tick(&mut self.input)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> MiniGameSnapshot {
        self.simulation.snapshot()
    }

    pub fn countdown_seconds(&self) -> u32 {
        self.simulation.countdown_seconds()
    }

    pub fn remove_controller(&mut self, connection_id: &str) -> ControllerLoss {
        self.input.forget(connection_id);
        self.simulation.remove_controller(connection_id)
    }
}

/// FNV-1a over the room code and round, so a room replays the same spawns
pub fn game_seed(room_code: &str, round_index: u32) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in room_code
        .bytes()
        .chain(round_index.to_le_bytes().into_iter())
    {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}


#[cfg(test)]
mod tests {
    use super::test_support::controller;
    use super::*;

    #[test]
    fn test_held_keys_coalesce_to_latest() {
        let mut input = InputBuffer::default();
        input.press("c1", GameAction::Up, true);
        input.press("c1", GameAction::Up, false);
        input.press("c1", GameAction::Up, true);
        input.press("c1", GameAction::Left, true);
        let held = input.held("c1");
        assert!(held.up && held.left && !held.down);
        assert_eq!(held.direction(), geometry::Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn test_drop_is_latched_once() {
        let mut input = InputBuffer::default();
        input.press("c1", GameAction::DropObstacle, true);
        input.press("c1", GameAction::DropObstacle, false);
        assert!(input.take_drop("c1"));
        assert!(!input.take_drop("c1"));
        assert!(!input.take_drop("nobody"));
    }

    #[test]
    fn test_countdown() {
        let mut countdown = Countdown::seconds(1);
        assert_eq!(countdown.whole_seconds(), 1);
        for _ in 0..TICKS_PER_SECOND {
            assert!(countdown.consume());
        }
        assert!(countdown.is_over());
        assert!(!countdown.consume());
        assert_eq!(countdown.whole_seconds(), 0);
    }

    #[test]
    fn test_unauthorized_input_rejected() {
        let mut game = MiniGame::start(
            MiniGameKind::PaddleDuel,
            vec![
                controller("c1", "Alice", Vote::Three),
                controller("c2", "Bob", Vote::Eight),
            ],
            1,
        )
        .unwrap();

        assert_eq!(
            game.apply_input("c3", None, GameAction::Up, true),
            Err(RoomError::UnauthorizedInput)
        );
        assert_eq!(
            game.apply_input("c1", Some("right"), GameAction::Up, true),
            Err(RoomError::UnauthorizedInput)
        );
        assert!(game.apply_input("c1", Some("left"), GameAction::Up, true).is_ok());
        assert!(game.apply_input("c2", None, GameAction::Down, true).is_ok());
    }

    #[test]
    fn test_start_rejects_wrong_controller_count() {
        let one = vec![controller("c1", "Alice", Vote::Three)];
        assert!(MiniGame::start(MiniGameKind::PaddleDuel, one.clone(), 1).is_none());
        assert!(MiniGame::start(MiniGameKind::LapRace, one, 1).is_none());
    }

    #[test]
    fn test_seed_is_stable_per_room_and_round() {
        assert_eq!(game_seed("ABCDE", 1), game_seed("ABCDE", 1));
        assert_ne!(game_seed("ABCDE", 1), game_seed("ABCDE", 2));
        assert_ne!(game_seed("ABCDE", 1), game_seed("ABCDF", 1));
    }
}
