//! Lap race around an elliptical ring, one car per vote group.
//!
//! Laps are tracked with an ordered checkpoint sequence (right, top, left,
//! then the finish at the bottom). A checkpoint only counts when it is the
//! next one expected, so driving the ring backwards never scores.

use super::geometry::{circles_overlap, Vec2};
use super::{
    Controller, ControllerLoss, Countdown, InputBuffer, MiniGameSnapshot, TickSimulation,
    TickStatus, Winner, TICK_SECONDS,
};
use crate::types::{DisplayName, MiniGameKind, Vote};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

pub const FIELD_WIDTH: f64 = 800.0;
pub const FIELD_HEIGHT: f64 = 600.0;
pub const TRACK_CENTER: Vec2 = Vec2::new(400.0, 300.0);
pub const OUTER_SEMI_AXES: Vec2 = Vec2::new(330.0, 230.0);
pub const INNER_SEMI_AXES: Vec2 = Vec2::new(250.0, 150.0);
/// Racing line, halfway between the walls
const MID_SEMI_AXES: Vec2 = Vec2::new(290.0, 190.0);

pub const CAR_RADIUS: f64 = 12.0;
/// px/s
pub const MAX_SPEED: f64 = 200.0;
/// px/s²
pub const ACCELERATION: f64 = 300.0;
pub const BRAKING: f64 = 450.0;
pub const FRICTION: f64 = 150.0;
/// rad/s at full speed
pub const TURN_RATE: f64 = 3.5;
pub const COLLISION_SPEED_PENALTY: f64 = 0.5;
pub const LAPS_TO_WIN: u32 = 3;
pub const COUNTDOWN_SECONDS: u32 = 3;
pub const MAX_CARS: usize = 8;

/// Ring angles in driving order; the last one is the finish line
const CHECKPOINTS: [f64; 4] = [0.0, -FRAC_PI_2, PI, FRAC_PI_2];
const CHECKPOINT_WINDOW: f64 = 0.3;

/// Angle around the ring, measured on the racing line's ellipse
pub fn ring_angle(p: Vec2) -> f64 {
    let d = p - TRACK_CENTER;
    (d.y / MID_SEMI_AXES.y).atan2(d.x / MID_SEMI_AXES.x)
}

/// Point on the racing line at a ring angle
pub fn ring_point(angle: f64) -> Vec2 {
    TRACK_CENTER + Vec2::new(MID_SEMI_AXES.x * angle.cos(), MID_SEMI_AXES.y * angle.sin())
}

fn ellipse_value(p: Vec2, axes: Vec2) -> f64 {
    let d = p - TRACK_CENTER;
    (d.x / axes.x).powi(2) + (d.y / axes.y).powi(2)
}

pub fn on_track(p: Vec2) -> bool {
    ellipse_value(p, OUTER_SEMI_AXES) <= 1.0 && ellipse_value(p, INNER_SEMI_AXES) >= 1.0
}

fn angle_between(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(2.0 * PI);
    diff.min(2.0 * PI - diff)
}

#[derive(Debug)]
struct Car {
    id: String,
    controller: Controller,
    position: Vec2,
    heading: f64,
    speed: f64,
    lap: u32,
    next_checkpoint: usize,
}

impl Car {
    fn throttle(&mut self, input: &InputBuffer) {
        let held = input.held(&self.controller.connection_id);
        self.speed = if held.up {
            (self.speed + ACCELERATION * TICK_SECONDS).min(MAX_SPEED)
        } else if held.down {
            (self.speed - BRAKING * TICK_SECONDS).max(0.0)
        } else {
            (self.speed - FRICTION * TICK_SECONDS).max(0.0)
        };

        if self.speed > 0.1 {
            let turn = TURN_RATE * (self.speed / MAX_SPEED) * TICK_SECONDS;
            if held.left {
                self.heading -= turn;
            }
            if held.right {
                self.heading += turn;
            }
        }
    }

    fn intended_position(&self) -> Vec2 {
        self.position + Vec2::new(self.heading.cos(), self.heading.sin()) * (self.speed * TICK_SECONDS)
    }

    /// Advance the checkpoint sequence; true when a lap completes
    fn record_progress(&mut self) -> bool {
        let target = CHECKPOINTS[self.next_checkpoint];
        if angle_between(ring_angle(self.position), target) > CHECKPOINT_WINDOW {
            return false;
        }
        if self.next_checkpoint == CHECKPOINTS.len() - 1 {
            self.next_checkpoint = 0;
            self.lap += 1;
            true
        } else {
            self.next_checkpoint += 1;
            false
        }
    }

    fn view(&self) -> CarView {
        CarView {
            id: self.id.clone(),
            display_name: self.controller.display_name.clone(),
            vote: self.controller.vote,
            position: self.position,
            heading: self.heading,
            speed: self.speed,
            lap: self.lap,
            next_checkpoint: self.next_checkpoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarView {
    pub id: String,
    pub display_name: DisplayName,
    pub vote: Vote,
    pub position: Vec2,
    pub heading: f64,
    pub speed: f64,
    pub lap: u32,
    pub next_checkpoint: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRaceSnapshot {
    pub cars: Vec<CarView>,
    pub laps_to_win: u32,
    pub countdown: u32,
}

pub struct LapRace {
    cars: Vec<Car>,
    countdown: Countdown,
}

impl LapRace {
    /// Grid the cars just behind the finish line, alternating lanes
    pub fn new(controllers: Vec<Controller>) -> Self {
        let cars = controllers
            .into_iter()
            .enumerate()
            .map(|(i, controller)| {
                let lane = if i % 2 == 0 { -20.0 } else { 20.0 };
                Car {
                    id: controller.vote.to_string(),
                    position: Vec2::new(360.0 - 30.0 * i as f64, 490.0 + lane),
                    heading: 0.0,
                    speed: 0.0,
                    lap: 0,
                    next_checkpoint: 0,
                    controller,
                }
            })
            .collect();
        Self {
            cars,
            countdown: Countdown::seconds(COUNTDOWN_SECONDS),
        }
    }

    fn blocked(&self, index: usize, candidate: Vec2) -> bool {
        !on_track(candidate)
            || self.cars.iter().enumerate().any(|(j, other)| {
                j != index && circles_overlap(candidate, CAR_RADIUS, other.position, CAR_RADIUS)
            })
    }
}

impl TickSimulation for LapRace {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::LapRace
    }

    fn entity_for(&self, connection_id: &str) -> Option<&str> {
        self.cars
            .iter()
            .find(|car| car.controller.connection_id == connection_id)
            .map(|car| car.id.as_str())
    }

    fn tick(&mut self, input: &mut InputBuffer) -> TickStatus {
        if self.cars.is_empty() {
            return TickStatus::Finished(None);
        }
        if self.countdown.consume() {
            return TickStatus::Running;
        }

        for i in 0..self.cars.len() {
            self.cars[i].throttle(input);
            let candidate = self.cars[i].intended_position();

            if self.blocked(i, candidate) {
                self.cars[i].speed *= COLLISION_SPEED_PENALTY;
                continue;
            }

            let car = &mut self.cars[i];
            car.position = candidate;
            if car.record_progress() && car.lap >= LAPS_TO_WIN {
                tracing::debug!("Car {} finished lap {}", car.id, car.lap);
                return TickStatus::Finished(Some(Winner::from(&car.controller)));
            }
        }
        TickStatus::Running
    }

    fn snapshot(&self) -> MiniGameSnapshot {
        MiniGameSnapshot::LapRace(LapRaceSnapshot {
            cars: self.cars.iter().map(Car::view).collect(),
            laps_to_win: LAPS_TO_WIN,
            countdown: self.countdown.whole_seconds(),
        })
    }

    fn countdown_seconds(&self) -> u32 {
        self.countdown.whole_seconds()
    }

    fn remove_controller(&mut self, connection_id: &str) -> ControllerLoss {
        let before = self.cars.len();
        self.cars
            .retain(|car| car.controller.connection_id != connection_id);
        if self.cars.len() < before {
            ControllerLoss::EntityRemoved
        } else {
            ControllerLoss::Unaffected
        }
    }
}
